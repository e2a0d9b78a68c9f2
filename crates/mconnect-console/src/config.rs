//! Console configuration loaded from environment variables.
//!
//! Every setting has a default so the console starts with zero
//! configuration against a local cloud proxy.

use std::net::SocketAddr;
use std::path::PathBuf;

use mconnect_shared::constants::{
    DEFAULT_CLOUD_API_BASE, DEFAULT_HTTP_PORT, DEFAULT_SESSION_MAX_AGE_SECS,
};
use mconnect_shared::SiteDirectory;
use mconnect_sync::EditMissPolicy;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Socket address of the console HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Base URL of the cloud API.
    /// Env: `CLOUD_API_BASE`
    /// Default: `http://localhost:5000`
    pub cloud_api_base: String,

    /// SQLite file for the session and last-seen cache.
    /// Env: `DB_PATH`
    /// Default: platform data directory.
    pub db_path: Option<PathBuf>,

    /// Env: `SESSION_MAX_AGE_SECS`
    /// Default: `7200`
    pub session_max_age_secs: i64,

    /// Env: `EDIT_MISS_POLICY` (`create` | `report`)
    /// Default: `create`
    pub edit_miss_policy: EditMissPolicy,

    /// `extCommunityUuid` sent with employee list queries.
    /// Env: `COMMUNITY_UUID`
    pub community_uuid: Option<String>,

    /// Env: `SITE_COMMUNITIES` (`Label=id,id;Label=id`)
    /// Default: Bulim, Mandai and Sentosa.
    pub sites: SiteDirectory,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            cloud_api_base: DEFAULT_CLOUD_API_BASE.to_string(),
            db_path: None,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            edit_miss_policy: EditMissPolicy::default(),
            community_uuid: None,
            sites: SiteDirectory::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source, falling back to defaults.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(base) = var("CLOUD_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.cloud_api_base = base.trim().to_string();
        }

        if let Some(path) = var("DB_PATH").filter(|v| !v.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(val) = var("SESSION_MAX_AGE_SECS") {
            match val.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => config.session_max_age_secs = secs,
                _ => tracing::warn!(value = %val, "Invalid SESSION_MAX_AGE_SECS, using default"),
            }
        }

        if let Some(val) = var("EDIT_MISS_POLICY") {
            match val.parse() {
                Ok(policy) => config.edit_miss_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Invalid EDIT_MISS_POLICY, using default"),
            }
        }

        if let Some(uuid) = var("COMMUNITY_UUID").filter(|v| !v.trim().is_empty()) {
            config.community_uuid = Some(uuid.trim().to_string());
        }

        if let Some(sites) = var("SITE_COMMUNITIES") {
            match SiteDirectory::parse(&sites) {
                Ok(sites) => config.sites = sites,
                Err(e) => tracing::warn!(error = %e, "Invalid SITE_COMMUNITIES, using default"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> ConsoleConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ConsoleConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.cloud_api_base, "http://localhost:5000");
        assert_eq!(config.session_max_age_secs, 7200);
        assert_eq!(config.edit_miss_policy, EditMissPolicy::CreateMissing);
        assert_eq!(config.sites.resolve_partitions("Sentosa").len(), 1);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("CLOUD_API_BASE", "https://cloud.example"),
            ("EDIT_MISS_POLICY", "report"),
            ("SESSION_MAX_AGE_SECS", "600"),
            ("SITE_COMMUNITIES", "Depot=1,2"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.cloud_api_base, "https://cloud.example");
        assert_eq!(config.edit_miss_policy, EditMissPolicy::ReportMissing);
        assert_eq!(config.session_max_age_secs, 600);
        assert_eq!(config.sites.resolve_partitions("Depot").len(), 2);
        assert!(config.sites.resolve_partitions("Bulim").is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_map(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("EDIT_MISS_POLICY", "ignore"),
            ("SESSION_MAX_AGE_SECS", "-5"),
            ("SITE_COMMUNITIES", "Depot"),
        ]);
        let defaults = ConsoleConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.edit_miss_policy, defaults.edit_miss_policy);
        assert_eq!(config.session_max_age_secs, 7200);
        assert_eq!(config.sites, defaults.sites);
    }
}
