//! # mconnect-store
//!
//! Local persistence of the console, backed by SQLite.
//!
//! Two things survive a restart: the operator session (bearer token and its
//! issue timestamp) and the device last-seen map, which is stored verbatim
//! as the backend returned it.

pub mod database;
pub mod last_seen;
pub mod migrations;
pub mod models;
pub mod sessions;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
