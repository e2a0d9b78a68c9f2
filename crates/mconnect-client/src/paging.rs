use tracing::debug;

use mconnect_shared::constants::FETCH_ALL_BATCH_SIZE;
use mconnect_shared::{CommunityId, EmployeeRow, PageQuery};

use crate::backend::CommunityBackend;
use crate::error::Result;
use crate::session::Session;

/// Every employee of `community` matching the filters of `query`.
///
/// Walks pages of [`FETCH_ALL_BATCH_SIZE`] and stops on an empty page, once
/// `totalCount` rows are collected, or after a short page.
pub async fn fetch_all_employees<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    community: &CommunityId,
    query: &PageQuery,
) -> Result<Vec<EmployeeRow>> {
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        let batch = backend
            .list_employees(
                session,
                community,
                &query.with_page(page, FETCH_ALL_BATCH_SIZE),
            )
            .await?;

        let received = batch.list.len();
        if received == 0 {
            break;
        }
        all.extend(batch.list);

        if batch.total_count > 0 && all.len() as u64 >= batch.total_count {
            break;
        }
        if received < FETCH_ALL_BATCH_SIZE as usize {
            break;
        }
        page += 1;
    }

    debug!(community = %community, rows = all.len(), "Fetched all pages");
    Ok(all)
}
