use std::str::FromStr;

use serde::Serialize;

/// What an edit does in a community where no record with the original card
/// number exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMissPolicy {
    /// Create the record there, bringing the community back in line.
    #[default]
    CreateMissing,
    /// Leave the community alone and report it as failed ("Not found").
    ReportMissing,
}

impl FromStr for EditMissPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "create_missing" => Ok(Self::CreateMissing),
            "report" | "report_missing" => Ok(Self::ReportMissing),
            other => Err(format!("unknown edit-miss policy: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub edit_miss: EditMissPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        assert_eq!("create".parse(), Ok(EditMissPolicy::CreateMissing));
        assert_eq!(" Report ".parse(), Ok(EditMissPolicy::ReportMissing));
        assert!("ignore".parse::<EditMissPolicy>().is_err());
    }
}
