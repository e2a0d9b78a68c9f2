//! The per-community employee API as seen by the synchronization procedure.

use std::future::Future;

use mconnect_shared::{
    CommunityId, Department, DriverRecord, EmployeeId, EmployeeRow, Page, PageQuery,
};

use crate::error::Result;
use crate::session::Session;

/// Employee and department operations of one backend, addressed per
/// community.
///
/// Every call carries the session explicitly. Implementations must report
/// token rejections as [`ClientError::InvalidToken`](crate::ClientError) so callers
/// can tell session failures from per-community failures.
pub trait CommunityBackend: Send + Sync {
    fn departments(
        &self,
        session: &Session,
        community: &CommunityId,
    ) -> impl Future<Output = Result<Vec<Department>>> + Send;

    fn list_employees(
        &self,
        session: &Session,
        community: &CommunityId,
        query: &PageQuery,
    ) -> impl Future<Output = Result<Page<EmployeeRow>>> + Send;

    fn get_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
    ) -> impl Future<Output = Result<EmployeeRow>> + Send;

    fn add_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        record: &DriverRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
        record: &DriverRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    fn remove_employee(
        &self,
        session: &Session,
        community: &CommunityId,
        id: &EmployeeId,
    ) -> impl Future<Output = Result<()>> + Send;
}
