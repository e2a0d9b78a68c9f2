//! The `{code, msg, data}` envelope every cloud endpoint answers with.

use serde::Deserialize;

use mconnect_shared::constants::{INVALID_TOKEN_MESSAGE, SUCCESS_CODE};
use mconnect_shared::wire::opt_code;

use crate::error::{ClientError, Result};
use crate::phrases::translate;

#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, deserialize_with = "opt_code")]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        match self.code {
            Some(code) => code == SUCCESS_CODE,
            None => self.success == Some(true),
        }
    }

    /// First non-empty of `msg`, `message`, `error`.
    pub fn text(&self) -> Option<&str> {
        [&self.msg, &self.message, &self.error]
            .into_iter()
            .filter_map(|m| m.as_deref())
            .find(|m| !m.trim().is_empty())
    }

    pub fn is_invalid_token(&self) -> bool {
        self.text().is_some_and(|m| m.trim() == INVALID_TOKEN_MESSAGE)
    }

    /// Turn a failed envelope into the matching error.
    pub fn rejection(&self) -> ClientError {
        if self.is_invalid_token() {
            return ClientError::InvalidToken;
        }
        ClientError::Api {
            code: self.code.unwrap_or(-1),
            message: self
                .text()
                .map(translate)
                .unwrap_or_else(|| "Failed".to_string()),
        }
    }

    pub fn into_data(self, what: &str) -> Result<T> {
        if !self.is_ok() {
            return Err(self.rejection());
        }
        self.data
            .ok_or_else(|| ClientError::UnexpectedResponse(format!("missing {what}")))
    }

    pub fn into_data_or_default(self) -> Result<T>
    where
        T: Default,
    {
        if !self.is_ok() {
            return Err(self.rejection());
        }
        Ok(self.data.unwrap_or_default())
    }

    pub fn into_ack(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self.rejection())
        }
    }
}
