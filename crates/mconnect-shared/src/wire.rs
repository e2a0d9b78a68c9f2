//! Serde helpers for the loosely typed cloud payloads.
//!
//! The backend is inconsistent about identifiers and enum codes: the same
//! field arrives as a JSON number on one endpoint and as a string on another.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::Str(s) => s,
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Accept `"42"` or `42` and produce `"42"`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

/// Like [`string_or_number`] but `null`, a missing field and `""` become `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(raw
        .map(StringOrNumber::into_string)
        .filter(|s| !s.is_empty()))
}

/// String field that tolerates numbers and `null` (which becomes `""`).
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(raw.map(StringOrNumber::into_string).unwrap_or_default())
}

/// Accept `-1`, `"-1"` and friends as an integer code. Unparseable strings
/// become `None`.
pub fn opt_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(StringOrNumber::Int(n)) => Some(n),
        Some(StringOrNumber::Float(f)) => Some(f as i64),
        Some(StringOrNumber::Str(s)) => s.trim().parse().ok(),
    })
}

/// String-valued map whose values may arrive as strings or numbers. `null`
/// values are dropped.
pub fn lenient_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<StringOrNumber>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v.into_string())))
        .collect())
}
