//! Save, delete and bulk delete across all communities of a site.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mconnect_client::paging::fetch_all_employees;
use mconnect_client::{CommunityBackend, Session};
use mconnect_shared::{
    is_zero_card, CommunityId, DepartmentId, DriverRecord, EmployeeId, PageQuery, SiteDirectory,
    ValidationError,
};

use crate::catalog::{load_catalogs, CatalogRequest, Fetched, PartitionCatalog};
use crate::error::SyncError;
use crate::matcher::match_department;
use crate::outcome::{aggregate, Outcome, PartitionResult, SyncAction};
use crate::policy::{EditMissPolicy, SyncOptions};
use crate::writer::{delete_from_partition, write_to_partition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SaveMode {
    Add,
    /// Edit the record currently stored under `original_card_no`, which may
    /// differ from the card number of the submitted record.
    Edit {
        #[serde(rename = "originalCardNo")]
        original_card_no: String,
    },
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub site: String,
    pub mode: SaveMode,
    /// The record with its home-community department.
    pub record: DriverRecord,
    /// Name of the home department as the caller last saw it. Only used when
    /// the home catalog cannot be loaded.
    pub department_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub site: String,
    pub card_no: String,
}

/// Records to remove in a bulk delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BulkTarget {
    Cards(Vec<String>),
    /// Every record of the home community matching the filters.
    Matching(PageQuery),
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkRecordOutcome {
    pub card_no: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub records: Vec<BulkRecordOutcome>,
}

impl BulkOutcome {
    pub fn summary(&self) -> String {
        let complete = self
            .records
            .iter()
            .filter(|r| r.outcome.failed().next().is_none())
            .count();
        format!(
            "Delete attempt finished. {complete} of {} records removed from every community.",
            self.records.len()
        )
    }
}

/// Name of the selected department, taken from the home catalog by id.
///
/// The caller's name is a fallback for a home catalog that failed to load.
fn home_department_name(
    home: &PartitionCatalog,
    request: &SaveRequest,
) -> Result<String, SyncError> {
    let selected = &request.record.department;
    match &home.departments {
        Fetched::Loaded(departments) => {
            let department = departments
                .iter()
                .find(|d| d.id.as_str().trim() == selected.as_str().trim())
                .ok_or_else(|| SyncError::UnknownDepartment(selected.clone()))?;
            let name = department.name.trim();
            if name.is_empty() {
                return Err(SyncError::HomeDepartmentUnresolved);
            }
            Ok(name.to_string())
        }
        Fetched::Failed(_) | Fetched::NotRequested => {
            let name = request
                .department_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or(SyncError::HomeDepartmentUnresolved)?;
            warn!(
                community = %home.community,
                department = %selected,
                "Home catalog unavailable, matching by the submitted department name"
            );
            Ok(name.to_string())
        }
    }
}

enum Plan {
    Write {
        department: DepartmentId,
        existing: Option<EmployeeId>,
    },
    Skip(String),
}

/// Runs the synchronization procedures against one backend.
#[derive(Debug)]
pub struct Synchronizer<'a, B> {
    backend: &'a B,
    directory: &'a SiteDirectory,
    options: SyncOptions,
}

impl<'a, B: CommunityBackend> Synchronizer<'a, B> {
    pub fn new(backend: &'a B, directory: &'a SiteDirectory, options: SyncOptions) -> Self {
        Self {
            backend,
            directory,
            options,
        }
    }

    fn partitions(&self, site: &str) -> Result<Vec<CommunityId>, SyncError> {
        let partitions = self.directory.resolve_partitions(site);
        if partitions.is_empty() {
            return Err(SyncError::NoCommunities(site.trim().to_string()));
        }
        Ok(partitions)
    }

    /// Add or edit one record in every community of the site.
    pub async fn save(&self, session: &Session, request: &SaveRequest) -> Result<Outcome, SyncError> {
        let partitions = self.partitions(&request.site)?;
        request.record.validate()?;
        let lookup = match &request.mode {
            SaveMode::Add => None,
            SaveMode::Edit { original_card_no } => Some(original_card_no.trim())
                .filter(|card| !card.is_empty())
                .or(Some(request.record.card_no.trim())),
        };

        let catalogs = load_catalogs(
            self.backend,
            session,
            &partitions,
            CatalogRequest {
                departments: true,
                card_no: lookup,
            },
        )
        .await?;

        let home = catalogs.first().ok_or(SyncError::HomeDepartmentUnresolved)?;
        let home_name = home_department_name(home, request)?;
        let home_name = home_name.as_str();

        let plans: Vec<(CommunityId, Plan)> = catalogs
            .iter()
            .enumerate()
            .map(|(index, catalog)| {
                let plan = self.plan_save(index == 0, catalog, request, home_name);
                (catalog.community.clone(), plan)
            })
            .collect();

        let writes: Vec<_> = plans
            .into_iter()
            .map(|(community, plan)| async move {
                match plan {
                    Plan::Write {
                        department,
                        existing,
                    } => {
                        write_to_partition(
                            self.backend,
                            session,
                            &community,
                            &request.record,
                            &department,
                            existing.as_ref(),
                        )
                        .await
                    }
                    Plan::Skip(reason) => {
                        warn!(community = %community, %reason, "Skipping community");
                        Ok(PartitionResult::failed(community, reason))
                    }
                }
            })
            .collect();
        let results = join_all(writes)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = aggregate(results);
        let action = match request.mode {
            SaveMode::Add => SyncAction::Add,
            SaveMode::Edit { .. } => SyncAction::Update,
        };
        info!(
            site = %request.site,
            card = %request.record.card_no,
            verdict = ?outcome.verdict,
            "{}",
            outcome.summary(action, &request.site)
        );
        Ok(outcome)
    }

    fn plan_save(
        &self,
        is_home: bool,
        catalog: &PartitionCatalog,
        request: &SaveRequest,
        home_name: &str,
    ) -> Plan {
        let department = if is_home {
            request.record.department.clone()
        } else {
            match &catalog.departments {
                Fetched::Loaded(departments) => match match_department(home_name, departments) {
                    Some(found) => found.id.clone(),
                    None => return Plan::Skip(format!("Department \"{home_name}\" not found")),
                },
                Fetched::Failed(reason) => {
                    return Plan::Skip(format!("Failed to load departments: {reason}"))
                }
                Fetched::NotRequested => return Plan::Skip("Failed to load departments".into()),
            }
        };

        let existing = match (&request.mode, &catalog.matches) {
            (SaveMode::Add, _) => None,
            (SaveMode::Edit { .. }, Fetched::Failed(reason)) => {
                return Plan::Skip(format!("Failed to fetch employee list: {reason}"))
            }
            (SaveMode::Edit { .. }, _) => match catalog.first_match() {
                Some(row) => Some(row.id.clone()),
                None if self.options.edit_miss == EditMissPolicy::ReportMissing => {
                    return Plan::Skip("Not found".into())
                }
                None => None,
            },
        };

        debug!(
            community = %catalog.community,
            department = %department,
            update = existing.is_some(),
            "Planned write"
        );
        Plan::Write {
            department,
            existing,
        }
    }

    /// Delete the record with `card_no` from every community of the site.
    pub async fn delete(
        &self,
        session: &Session,
        request: &DeleteRequest,
    ) -> Result<Outcome, SyncError> {
        let partitions = self.partitions(&request.site)?;
        let outcome = self
            .delete_in(session, &partitions, &request.card_no)
            .await?;
        info!(
            site = %request.site,
            card = %request.card_no,
            verdict = ?outcome.verdict,
            "{}",
            outcome.summary(SyncAction::Delete, &request.site)
        );
        Ok(outcome)
    }

    async fn delete_in(
        &self,
        session: &Session,
        partitions: &[CommunityId],
        card_no: &str,
    ) -> Result<Outcome, SyncError> {
        let card_no = card_no.trim();
        if card_no.is_empty() {
            return Err(ValidationError::CardNoRequired.into());
        }
        if is_zero_card(card_no) {
            return Err(ValidationError::CardNoZero.into());
        }

        let catalogs = load_catalogs(
            self.backend,
            session,
            partitions,
            CatalogRequest {
                departments: false,
                card_no: Some(card_no),
            },
        )
        .await?;

        let removals: Vec<_> = catalogs
            .iter()
            .map(|catalog| async move {
                let community = catalog.community.clone();
                match (&catalog.matches, catalog.first_match()) {
                    (Fetched::Failed(reason), _) => Ok(PartitionResult::failed(
                        community,
                        format!("Failed to fetch employee list: {reason}"),
                    )),
                    (_, Some(row)) => {
                        delete_from_partition(self.backend, session, &community, &row.id).await
                    }
                    (_, None) => Ok(PartitionResult::failed(community, "Not found")),
                }
            })
            .collect();
        let results = join_all(removals)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(aggregate(results))
    }

    /// Delete several records, one after another. Each record fans out over
    /// all communities of the site.
    pub async fn bulk_delete(
        &self,
        session: &Session,
        site: &str,
        target: &BulkTarget,
    ) -> Result<BulkOutcome, SyncError> {
        let partitions = self.partitions(site)?;

        let cards: Vec<String> = match target {
            BulkTarget::Cards(cards) => cards.clone(),
            BulkTarget::Matching(query) => {
                fetch_all_employees(self.backend, session, &partitions[0], query)
                    .await
                    .map_err(SyncError::from_client)?
                    .into_iter()
                    .map(|row| row.card_no)
                    .collect()
            }
        };

        let mut bulk = BulkOutcome::default();
        for card_no in cards
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && !is_zero_card(c))
        {
            let outcome = self.delete_in(session, &partitions, card_no).await?;
            debug!(card = %card_no, verdict = ?outcome.verdict, "Bulk delete record done");
            bulk.records.push(BulkRecordOutcome {
                card_no: card_no.to_string(),
                outcome,
            });
        }

        info!(site = %site, records = bulk.records.len(), "{}", bulk.summary());
        Ok(bulk)
    }
}
