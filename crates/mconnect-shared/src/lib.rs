//! # mconnect-shared
//!
//! Domain types shared by every MConnect crate: authorized-driver records,
//! department catalogs, devices, paging, the site directory and record
//! validation.

pub mod constants;
pub mod directory;
pub mod error;
pub mod types;
pub mod wire;

pub use directory::SiteDirectory;
pub use error::{SharedError, ValidationError};
pub use types::*;
