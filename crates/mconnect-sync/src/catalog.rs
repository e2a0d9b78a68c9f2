//! Concurrent read phase.

use futures::future::join_all;
use tracing::{debug, warn};

use mconnect_client::{ClientError, CommunityBackend, Session};
use mconnect_shared::{CommunityId, Department, EmployeeRow, PageQuery};

use crate::error::SyncError;

/// Result of one read against one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Loaded(T),
    Failed(String),
    NotRequested,
}

impl<T> Fetched<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// What the read phase knows about one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCatalog {
    pub community: CommunityId,
    pub departments: Fetched<Vec<Department>>,
    /// Rows whose card number equals the looked-up one.
    pub matches: Fetched<Vec<EmployeeRow>>,
}

impl PartitionCatalog {
    pub fn first_match(&self) -> Option<&EmployeeRow> {
        self.matches.loaded().and_then(|rows| rows.first())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogRequest<'a> {
    pub departments: bool,
    /// Card number to look up in every community.
    pub card_no: Option<&'a str>,
}

/// Fetch the requested catalogs of every community concurrently.
///
/// Results come back in `communities` order, one per community, with each
/// failure recorded against its community. A rejected session in any
/// community fails the whole load.
pub async fn load_catalogs<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    communities: &[CommunityId],
    request: CatalogRequest<'_>,
) -> Result<Vec<PartitionCatalog>, SyncError> {
    let loads: Vec<_> = communities
        .iter()
        .map(|community| load_one(backend, session, community, request))
        .collect();

    join_all(loads).await.into_iter().collect()
}

async fn load_one<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    community: &CommunityId,
    request: CatalogRequest<'_>,
) -> Result<PartitionCatalog, SyncError> {
    let departments = async {
        if request.departments {
            Some(backend.departments(session, community).await)
        } else {
            None
        }
    };
    let matches = async {
        match request.card_no {
            Some(card_no) => Some(find_by_card(backend, session, community, card_no).await),
            None => None,
        }
    };
    let (departments, matches) = futures::join!(departments, matches);

    Ok(PartitionCatalog {
        community: community.clone(),
        departments: settle(community, "departments", departments)?,
        matches: settle(community, "employees", matches)?,
    })
}

async fn find_by_card<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    community: &CommunityId,
    card_no: &str,
) -> Result<Vec<EmployeeRow>, ClientError> {
    let card_no = card_no.trim();
    let page = backend
        .list_employees(session, community, &PageQuery::by_card_no(card_no))
        .await?;

    // The backend filter is not guaranteed to be exact.
    Ok(page
        .list
        .into_iter()
        .filter(|row| row.card_no.trim() == card_no)
        .collect())
}

fn settle<T>(
    community: &CommunityId,
    what: &str,
    fetched: Option<Result<T, ClientError>>,
) -> Result<Fetched<T>, SyncError> {
    match fetched {
        None => Ok(Fetched::NotRequested),
        Some(Ok(value)) => {
            debug!(community = %community, what, "Catalog loaded");
            Ok(Fetched::Loaded(value))
        }
        Some(Err(e)) if e.is_session_failure() => Err(SyncError::Session(e)),
        Some(Err(e)) => {
            warn!(community = %community, what, error = %e, "Catalog fetch failed");
            Ok(Fetched::Failed(e.to_string()))
        }
    }
}
