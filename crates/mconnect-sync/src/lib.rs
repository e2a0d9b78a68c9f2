//! # mconnect-sync
//!
//! Keeps one authorized-driver record consistent across every community of
//! a site.
//!
//! A save or delete runs in two phases. First every community's department
//! catalog and card-number matches are fetched concurrently and joined, with
//! failures kept per community. Then every community's write is issued
//! concurrently. The per-community results are folded into a single
//! [`Outcome`]. Nothing is retried or rolled back.

pub mod catalog;
pub mod error;
pub mod matcher;
pub mod outcome;
pub mod policy;
pub mod procedure;
pub mod writer;

pub use catalog::{load_catalogs, CatalogRequest, Fetched, PartitionCatalog};
pub use error::SyncError;
pub use matcher::match_department;
pub use outcome::{aggregate, Outcome, PartitionResult, PartitionStatus, SyncAction, Verdict};
pub use policy::{EditMissPolicy, SyncOptions};
pub use procedure::{BulkOutcome, BulkTarget, DeleteRequest, SaveMode, SaveRequest, Synchronizer};
pub use writer::write_to_partition;
