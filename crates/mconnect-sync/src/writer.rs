//! Per-community writes.

use tracing::{debug, warn};

use mconnect_client::{ClientError, CommunityBackend, Session};
use mconnect_shared::{CommunityId, DepartmentId, DriverRecord, EmployeeId};

use crate::error::SyncError;
use crate::outcome::PartitionResult;

/// Create or update `record` in `community` under that community's
/// `department`. An `existing` id routes the write to an update.
pub async fn write_to_partition<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    community: &CommunityId,
    record: &DriverRecord,
    department: &DepartmentId,
    existing: Option<&EmployeeId>,
) -> Result<PartitionResult, SyncError> {
    let local = record.with_department(department.clone());
    let result = match existing {
        Some(id) => {
            debug!(community = %community, employee = %id, "Updating employee");
            backend.update_employee(session, community, id, &local).await
        }
        None => {
            debug!(community = %community, "Creating employee");
            backend.add_employee(session, community, &local).await
        }
    };
    settle(community, result)
}

/// Remove employee `id` from `community`.
pub async fn delete_from_partition<B: CommunityBackend>(
    backend: &B,
    session: &Session,
    community: &CommunityId,
    id: &EmployeeId,
) -> Result<PartitionResult, SyncError> {
    debug!(community = %community, employee = %id, "Removing employee");
    let result = backend.remove_employee(session, community, id).await;
    settle(community, result)
}

fn settle(
    community: &CommunityId,
    result: Result<(), ClientError>,
) -> Result<PartitionResult, SyncError> {
    match result {
        Ok(()) => Ok(PartitionResult::succeeded(community.clone())),
        Err(e) if e.is_session_failure() => Err(SyncError::Session(e)),
        Err(e) => {
            warn!(community = %community, error = %e, "Write failed");
            Ok(PartitionResult::failed(community.clone(), e.to_string()))
        }
    }
}
