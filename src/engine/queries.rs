use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::*;
use crate::settings::StayPolicy;

use super::availability::{search, summarize, unit_board, CategoryAvailability};
use super::housekeeping::maintenance_start;
use super::pricing::{price_for_stay, Quote, QuoteOptions};
use super::status::{conflicting_reservations, resolve_status, UnitStatus};
use super::{unit_not_found, validate_range, Engine, EngineError};

/// One row of the housekeeping/front-desk grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBoardEntry {
    pub unit_number: String,
    pub status: UnitStatus,
    pub booking_ref: Option<String>,
}

/// Warn about units holding more than one reservation for the same window.
/// The resolver reports only the first; the double booking stays visible here.
fn audit_double_bookings(category: &Category, range: &DateRange, policy: &StayPolicy) {
    for unit in &category.units {
        let hits = conflicting_reservations(unit, range, policy);
        if hits.len() > 1 {
            let refs: Vec<&str> = hits
                .iter()
                .map(|r| r.booking_ref.as_deref().unwrap_or("-"))
                .collect();
            warn!(
                "unit {} in {} has overlapping reservations {:?} for {}..{}",
                unit.unit_number, category.id, refs, range.from, range.to
            );
        }
    }
}

impl Engine {
    pub async fn availability(
        &self,
        category_id: &str,
        range: DateRange,
        required_units: usize,
    ) -> Result<CategoryAvailability, EngineError> {
        validate_range(&range)?;
        let category = self.category(category_id).await?;
        let policy = self.policy().await?;
        audit_double_bookings(&category, &range, &policy);
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL).increment(1);
        Ok(summarize(&category, &range, required_units, &policy))
    }

    /// Bookable categories for a stay, ordered by name.
    pub async fn search(
        &self,
        range: DateRange,
        required_units: usize,
    ) -> Result<Vec<CategoryAvailability>, EngineError> {
        validate_range(&range)?;
        let categories = self.repo.list_categories().await?;
        let policy = self.policy().await?;
        for category in &categories {
            audit_double_bookings(category, &range, &policy);
        }
        metrics::counter!(crate::observability::AVAILABILITY_QUERIES_TOTAL).increment(1);
        Ok(search(&categories, &range, required_units, &policy))
    }

    pub async fn quote(
        &self,
        category_id: &str,
        range: DateRange,
        options: QuoteOptions,
    ) -> Result<Quote, EngineError> {
        validate_range(&range)?;
        let category = self.category(category_id).await?;
        let policy = self.policy().await?;
        metrics::counter!(crate::observability::QUOTES_TOTAL).increment(1);
        Ok(price_for_stay(&category, &range, &policy, &options))
    }

    pub async fn unit_status(
        &self,
        category_id: &str,
        unit_number: &str,
        range: DateRange,
    ) -> Result<UnitStatus, EngineError> {
        validate_range(&range)?;
        let category = self.category(category_id).await?;
        let unit = category
            .unit(unit_number)
            .ok_or_else(|| unit_not_found(category_id, unit_number))?;
        let policy = self.policy().await?;
        let status = resolve_status(unit, &range, &policy).status;
        metrics::counter!(
            crate::observability::UNIT_STATUS_LOOKUPS_TOTAL,
            "status" => status.as_str()
        )
        .increment(1);
        Ok(status)
    }

    pub async fn unit_board(
        &self,
        category_id: &str,
        range: DateRange,
    ) -> Result<Vec<UnitBoardEntry>, EngineError> {
        validate_range(&range)?;
        let category = self.category(category_id).await?;
        let policy = self.policy().await?;
        audit_double_bookings(&category, &range, &policy);
        Ok(unit_board(&category, &range, &policy)
            .into_iter()
            .map(|(unit, resolution)| UnitBoardEntry {
                unit_number: unit.unit_number.clone(),
                status: resolution.status,
                booking_ref: resolution.record.and_then(|r| r.booking_ref.clone()),
            })
            .collect())
    }

    /// When maintenance on a unit could start. `None` only if the unit
    /// does not exist.
    pub async fn maintenance_start(
        &self,
        category_id: &str,
        unit_number: &str,
        now: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>, EngineError> {
        let Some(category) = self.repo.get_category(category_id).await? else {
            return Ok(None);
        };
        let Some(unit) = category.unit(unit_number) else {
            return Ok(None);
        };
        let policy = self.policy().await?;
        Ok(Some(maintenance_start(unit, &policy, now)))
    }

    pub async fn tasks(&self, open_only: bool) -> Result<Vec<HousekeepingTask>, EngineError> {
        let mut tasks = self.repo.list_tasks().await?;
        if open_only {
            tasks.retain(HousekeepingTask::is_open);
        }
        Ok(tasks)
    }
}
