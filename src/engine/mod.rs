mod availability;
mod error;
mod housekeeping;
mod mutations;
mod overlap;
mod pricing;
mod queries;
mod status;
mod store;
mod transitions;
#[cfg(test)]
mod tests;

pub use availability::{available_count, is_category_bookable, search, summarize, unit_board, CategoryAvailability};
pub use error::EngineError;
pub use housekeeping::{
    maintenance_start, new_maintenance_task, plan_reconcile, MaintenanceRequest, ReconcilePlan, SkipReason,
    SkippedUnit,
};
pub use mutations::{ReconcileReport, UnitRef};
pub use overlap::{contains, overlaps, StayWindow};
pub use pricing::{price_for_night, price_for_stay, round2, NightCharge, Quote, QuoteOptions};
pub use queries::UnitBoardEntry;
pub use status::{conflicting_reservations, resolve_status, Resolution, UnitStatus};
pub use store::{InMemoryStore, Repository, StoreError};
pub use transitions::{check_record_transition, check_task_transition};

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tokio::sync::Mutex;
use tracing::warn;

use crate::limits::*;
use crate::model::*;
use crate::settings::StayPolicy;

/// Property-local wall clock. Every stored instant is naive local time.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Cleaning window granted to a checkout task before it auto-completes.
    pub cleaning_buffer: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cleaning_buffer: Duration::minutes(DEFAULT_CLEANING_BUFFER_MINS),
        }
    }
}

/// Availability, pricing, and housekeeping over a [`Repository`].
///
/// Reads go straight to the repository. Writes (booking lifecycle, task
/// lifecycle, reconcile) are serialized so each one is a single
/// read-compute-write step against the store.
pub struct Engine {
    repo: Arc<dyn Repository>,
    config: EngineConfig,
    write_lock: Mutex<()>,
}

impl Engine {
    pub fn new(repo: Arc<dyn Repository>, config: EngineConfig) -> Self {
        let config = if config.cleaning_buffer <= Duration::zero() {
            warn!(
                "cleaning buffer must be positive, using {DEFAULT_CLEANING_BUFFER_MINS} minutes"
            );
            EngineConfig::default()
        } else if config.cleaning_buffer > Duration::minutes(MAX_CLEANING_BUFFER_MINS) {
            warn!(
                "cleaning buffer of {} minutes is too long, capping at {MAX_CLEANING_BUFFER_MINS}",
                config.cleaning_buffer.num_minutes()
            );
            EngineConfig {
                cleaning_buffer: Duration::minutes(MAX_CLEANING_BUFFER_MINS),
            }
        } else {
            config
        };
        Self {
            repo,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(super) async fn policy(&self) -> Result<StayPolicy, EngineError> {
        Ok(self.repo.load_settings().await?.policy())
    }

    pub(super) async fn category(&self, id: &str) -> Result<Category, EngineError> {
        self.repo
            .get_category(id)
            .await?
            .ok_or_else(|| EngineError::CategoryNotFound(id.to_string()))
    }

    pub(super) async fn task(&self, id: ulid::Ulid) -> Result<HousekeepingTask, EngineError> {
        self.repo
            .get_task(id)
            .await?
            .ok_or(EngineError::TaskNotFound(id))
    }
}

pub(super) fn unit_not_found(category_id: &str, unit_number: &str) -> EngineError {
    EngineError::UnitNotFound {
        category_id: category_id.to_string(),
        unit_number: unit_number.to_string(),
    }
}

pub(crate) fn validate_range(range: &DateRange) -> Result<(), EngineError> {
    if range.to < range.from {
        return Err(EngineError::InvalidRange(format!(
            "{} is before {}",
            range.to, range.from
        )));
    }
    if range.night_count() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

pub(crate) fn validate_reference(reference: &str) -> Result<(), EngineError> {
    if reference.trim().is_empty() {
        return Err(EngineError::InvalidInput("empty booking reference"));
    }
    if reference.len() > MAX_REFERENCE_LEN {
        return Err(EngineError::LimitExceeded("booking reference too long"));
    }
    Ok(())
}
