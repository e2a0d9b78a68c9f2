/// Application name
pub const APP_NAME: &str = "MConnect";

/// Backend envelope `code` that means success
pub const SUCCESS_CODE: i64 = 0;

/// Message the backend uses for a rejected access token
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Session lifetime counted from the `expiresIn` issue timestamp (2 hours)
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 7200;

/// Default rows per page for list views
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page size used when walking every page of a filtered list
pub const FETCH_ALL_BATCH_SIZE: u32 = 500;

/// Page size used for the building-unit (position) picker
pub const POSITION_PAGE_SIZE: u32 = 100;

/// Default local proxy of the cloud API
pub const DEFAULT_CLOUD_API_BASE: &str = "http://localhost:5000";

/// Default HTTP API port of the console
pub const DEFAULT_HTTP_PORT: u16 = 8080;
