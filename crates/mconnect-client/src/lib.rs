//! # mconnect-client
//!
//! HTTP client of the MConnect cloud API.
//!
//! - [`CommunityBackend`] is the seam the synchronization procedure talks to;
//!   [`CloudClient`] implements it over reqwest
//! - [`Session`] / [`SessionHolder`] carry the bearer token explicitly
//! - [`LatestOnly`] keeps at most one list query in flight
//! - [`phrases::translate`] turns backend domain messages into English

pub mod backend;
pub mod devices;
pub mod envelope;
pub mod error;
pub mod http;
pub mod paging;
pub mod phrases;
pub mod session;
pub mod supersede;

pub use backend::CommunityBackend;
pub use error::ClientError;
pub use http::CloudClient;
pub use session::{Session, SessionHolder};
pub use supersede::LatestOnly;
