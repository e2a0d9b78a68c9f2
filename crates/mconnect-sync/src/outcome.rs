//! Per-community results and their aggregate.

use serde::Serialize;

use mconnect_shared::CommunityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum PartitionStatus {
    Succeeded,
    Failed(String),
}

/// What happened in one community. Every community of a site yields exactly
/// one of these per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionResult {
    pub community: CommunityId,
    #[serde(flatten)]
    pub status: PartitionStatus,
}

impl PartitionResult {
    pub fn succeeded(community: CommunityId) -> Self {
        Self {
            community,
            status: PartitionStatus::Succeeded,
        }
    }

    pub fn failed(community: CommunityId, reason: impl Into<String>) -> Self {
        Self {
            community,
            status: PartitionStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, PartitionStatus::Succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    FullSuccess,
    PartialSuccess,
    FullFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Add,
    Update,
    Delete,
}

/// Aggregate of one operation over all communities of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub verdict: Verdict,
    pub results: Vec<PartitionResult>,
}

/// Fold per-community results. No results at all counts as a full failure.
pub fn aggregate(results: Vec<PartitionResult>) -> Outcome {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let verdict = if succeeded == 0 {
        Verdict::FullFailure
    } else if succeeded == results.len() {
        Verdict::FullSuccess
    } else {
        Verdict::PartialSuccess
    };
    Outcome { verdict, results }
}

impl Outcome {
    pub fn succeeded(&self) -> impl Iterator<Item = &CommunityId> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| &r.community)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&CommunityId, &str)> {
        self.results.iter().filter_map(|r| match &r.status {
            PartitionStatus::Failed(reason) => Some((&r.community, reason.as_str())),
            PartitionStatus::Succeeded => None,
        })
    }

    /// One-line operator message.
    pub fn summary(&self, action: SyncAction, site: &str) -> String {
        let ok = self
            .succeeded()
            .map(CommunityId::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let failed = self
            .failed()
            .map(|(id, reason)| format!("{id}: {reason}"))
            .collect::<Vec<_>>()
            .join("; ");

        match (action, self.verdict) {
            (SyncAction::Delete, Verdict::FullSuccess) => {
                format!("Employee deleted successfully from all ({site}) communities!")
            }
            (SyncAction::Delete, Verdict::PartialSuccess) => {
                format!("Deleted in {ok}, failed in {failed}")
            }
            (SyncAction::Delete, Verdict::FullFailure) => {
                format!("Failed to delete employee in communities: {failed}")
            }
            (SyncAction::Add, Verdict::FullSuccess) => {
                format!("Employee added successfully in all communities ({ok})")
            }
            (SyncAction::Update, Verdict::FullSuccess) => {
                format!("Employee updated successfully in all communities ({ok})")
            }
            (_, Verdict::PartialSuccess) => format!("Saved in {ok}; failed/skipped: {failed}"),
            (_, Verdict::FullFailure) => format!("Failed in all communities: {failed}"),
        }
    }
}
