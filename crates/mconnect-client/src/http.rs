//! reqwest implementation of the cloud API.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use mconnect_shared::{
    CommunityId, Department, DriverRecord, EmployeeId, EmployeeRow, Page, PageQuery,
};

use crate::backend::CommunityBackend;
use crate::envelope::ApiEnvelope;
use crate::error::{ClientError, Result};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
    community_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: String,
    expires_in: Value,
}

impl CloudClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            community_uuid: None,
        }
    }

    /// `extCommunityUuid` sent with employee list queries.
    pub fn with_community_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.community_uuid = Some(uuid.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Read an envelope, mapping transport-level token rejections.
    pub(crate) async fn decode<T: DeserializeOwned>(resp: Response) -> Result<ApiEnvelope<T>> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::InvalidToken);
        }

        let body = resp.text().await?;
        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) if envelope.is_invalid_token() => Err(ClientError::InvalidToken),
            Ok(envelope) if !status.is_success() && envelope.is_ok() => Err(ClientError::Api {
                code: i64::from(status.as_u16()),
                message: format!("Server responded {status}"),
            }),
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(ClientError::UnexpectedResponse(e.to_string())),
            Err(_) => Err(ClientError::Api {
                code: i64::from(status.as_u16()),
                message: format!("Server responded {status}"),
            }),
        }
    }

    /// Exchange operator credentials for a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let resp = self
            .http
            .post(self.url("api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let data: LoginData = Self::decode(resp).await?.into_data("login data")?;
        let issued_at = parse_issued_at(&data.expires_in).ok_or_else(|| {
            ClientError::UnexpectedResponse("Invalid session. Please log in again.".into())
        })?;

        info!(user = %username, "Logged in");
        Session::new(data.access_token, issued_at, username)
    }

    /// Hand the token to the backend's scheduled jobs. Best effort.
    pub async fn push_cloud_token(&self, session: &Session) {
        let result = self
            .http
            .post(self.url("api/set-cloud-token"))
            .json(&json!({ "token": session.access_token() }))
            .send()
            .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to push cloud token");
        }
    }

    fn employee_body(
        session: &Session,
        community: &CommunityId,
        record: &DriverRecord,
    ) -> serde_json::Map<String, Value> {
        let mut body = serde_json::Map::new();
        body.insert("accessToken".into(), session.access_token().into());
        body.insert("extCommunityId".into(), community.as_str().into());
        body.insert("name".into(), record.name.trim().into());
        body.insert("cardNo".into(), record.card_no.trim().into());
        body.insert("empNo".into(), record.emp_no.trim().into());
        body.insert("uuid".into(), record.emp_no.trim().into());
        body.insert("dept".into(), record.department.as_str().into());
        body.insert("gender".into(), record.gender.code().into());
        if let Some(job) = record.job.as_deref() {
            body.insert("job".into(), job.into());
        }
        if let Some(phone) = record.phone.as_deref() {
            body.insert("phone".into(), phone.into());
        }
        body
    }
}

impl CommunityBackend for CloudClient {
    async fn departments(
        &self,
        session: &Session,
        community: &CommunityId,
    ) -> Result<Vec<Department>> {
        let resp = self
            .http
            .get(self.url("api/departments"))
            .query(&[
                ("accessToken", session.access_token()),
                ("extCommunityId", community.as_str()),
            ])
            .send()
            .await?;

        let departments: Vec<Department> = Self::decode(resp).await?.into_data_or_default()?;
        debug!(community = %community, count = departments.len(), "Loaded departments");
        Ok(departments)
    }

    async fn list_employees(
        &self,
        session: &Session,
        community: &CommunityId,
        query: &PageQuery,
    ) -> Result<Page<EmployeeRow>> {
        let page = query.page.max(1).to_string();
        let page_size = query.page_size.to_string();

        let mut params: Vec<(&str, &str)> = vec![
            ("accessToken", session.access_token()),
            ("extCommunityId", community.as_str()),
            ("currPage", &page),
            ("pageSize", &page_size),
        ];
        if let Some(uuid) = self.community_uuid.as_deref() {
            params.push(("extCommunityUuid", uuid));
        }
        params.extend(query.filters());

        let resp = self
            .http
            .get(self.url("api/employees"))
            .query(&params)
            .send()
            .await?;

        Self::decode(resp).await?.into_data_or_default()
    }

    async fn get_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
    ) -> Result<EmployeeRow> {
        let resp = self
            .http
            .get(self.url(&format!("api/employees/{id}")))
            .query(&[
                ("accessToken", session.access_token()),
                ("extCommunityId", community.as_str()),
                ("id", id.as_str()),
            ])
            .send()
            .await?;

        Self::decode(resp).await?.into_data("employee")
    }

    async fn add_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        record: &DriverRecord,
    ) -> Result<()> {
        let body = Self::employee_body(session, community, record);
        let resp = self
            .http
            .post(self.url("api/employees/add"))
            .json(&body)
            .send()
            .await?;

        Self::decode::<Value>(resp).await?.into_ack()
    }

    async fn update_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
        record: &DriverRecord,
    ) -> Result<()> {
        let mut body = Self::employee_body(session, community, record);
        body.insert("id".into(), id.as_str().into());

        let resp = self
            .http
            .post(self.url("api/employees/update"))
            .json(&body)
            .send()
            .await?;

        Self::decode::<Value>(resp).await?.into_ack()
    }

    async fn remove_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
    ) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("api/employees/{id}")))
            .query(&[
                ("accessToken", session.access_token()),
                ("extCommunityId", community.as_str()),
            ])
            .send()
            .await?;

        Self::decode::<Value>(resp).await?.into_ack()
    }
}

/// `expiresIn` is an issue timestamp: RFC-3339 text, or epoch milliseconds
/// as a number or numeric string.
fn parse_issued_at(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return Utc.timestamp_millis_opt(ms).single();
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        }
        _ => None,
    }
}
