use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::housekeeping::{maintenance_start, new_maintenance_task, plan_reconcile, MaintenanceRequest, SkippedUnit};
use super::overlap::StayWindow;
use super::status::{resolve_status, UnitStatus};
use super::transitions::{check_record_transition, check_task_transition};
use super::{unit_not_found, validate_range, validate_reference, Engine, EngineError};

/// Address of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRef {
    pub category_id: String,
    pub unit_number: String,
}

impl UnitRef {
    pub fn new(category_id: impl Into<String>, unit_number: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            unit_number: unit_number.into(),
        }
    }
}

/// Outcome of one reconciliation pass, after it has been written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub auto_completed: Vec<HousekeepingTask>,
    pub created: Vec<HousekeepingTask>,
    pub skipped: Vec<SkippedUnit>,
}

impl Engine {
    /// Load a category and pull one unit out of it for editing.
    async fn unit_for_update(&self, at: &UnitRef) -> Result<(Category, Unit), EngineError> {
        let category = self.category(&at.category_id).await?;
        let unit = category
            .unit(&at.unit_number)
            .cloned()
            .ok_or_else(|| unit_not_found(&at.category_id, &at.unit_number))?;
        Ok((category, unit))
    }

    // ── Booking lifecycle ────────────────────────────────────

    /// Attach a `booked` record for `range`. The unit must resolve to
    /// available, and the stay must end before any scheduled maintenance.
    pub async fn book_unit(
        &self,
        at: &UnitRef,
        booking_ref: &str,
        range: DateRange,
        occupancy: Option<Occupancy>,
    ) -> Result<(), EngineError> {
        validate_range(&range)?;
        validate_reference(booking_ref)?;
        let _guard = self.write_lock.lock().await;
        let (_, mut unit) = self.unit_for_update(at).await?;
        if unit.status_records.len() >= MAX_RECORDS_PER_UNIT {
            return Err(EngineError::LimitExceeded("too many status records on unit"));
        }
        if unit.record(booking_ref).is_some() {
            return Err(EngineError::AlreadyExists(booking_ref.to_string()));
        }

        let policy = self.policy().await?;
        let resolution = resolve_status(&unit, &range, &policy);
        if !resolution.is_available() {
            return Err(EngineError::Unavailable {
                unit_number: unit.unit_number.clone(),
                status: resolution.status,
            });
        }
        let window = StayWindow::new(&range, &policy.clock);
        let check_out = policy.clock.check_out_at(range.end_date());
        let blocked_by_maintenance = unit.status_records.iter().any(|r| {
            r.status == RecordStatus::Maintenance && r.check_in.is_none_or(|start| start < check_out)
        });
        if blocked_by_maintenance {
            return Err(EngineError::Unavailable {
                unit_number: unit.unit_number.clone(),
                status: UnitStatus::Maintenance,
            });
        }
        check_record_transition(RecordStatus::Available, RecordStatus::Booked)?;

        let mut record =
            StatusRecord::reservation(booking_ref, window.check_in, check_out, RecordStatus::Booked);
        record.occupancy = occupancy;
        unit.status_records.push(record);
        self.repo.save_unit(&at.category_id, unit).await?;
        info!("booked unit {} in {} as {booking_ref}", at.unit_number, at.category_id);
        Ok(())
    }

    /// Move a booking's record to `to`, editing it in place unless `to` removes it.
    async fn advance_record(
        &self,
        at: &UnitRef,
        booking_ref: &str,
        to: RecordStatus,
        edit: impl FnOnce(&mut StatusRecord),
    ) -> Result<(), EngineError> {
        let _guard = self.write_lock.lock().await;
        let (_, mut unit) = self.unit_for_update(at).await?;
        let record = unit
            .record_mut(booking_ref)
            .ok_or_else(|| EngineError::BookingNotFound(booking_ref.to_string()))?;
        // Checkout and pending records are released by housekeeping only.
        if to == RecordStatus::Available && record.status != RecordStatus::Booked {
            return Err(EngineError::IllegalTransition {
                from: record.status.as_str(),
                to: to.as_str(),
            });
        }
        check_record_transition(record.status, to)?;
        if to == RecordStatus::Available {
            unit.remove_records(booking_ref, |_| true);
        } else {
            record.status = to;
            edit(record);
        }
        self.repo.save_unit(&at.category_id, unit).await?;
        Ok(())
    }

    pub async fn check_in(&self, at: &UnitRef, booking_ref: &str) -> Result<(), EngineError> {
        self.advance_record(at, booking_ref, RecordStatus::CheckIn, |_| {})
            .await
    }

    /// Guest departure. Stamps the actual departure time; the next
    /// reconcile pass turns the record into a cleaning task.
    pub async fn check_out(
        &self,
        at: &UnitRef,
        booking_ref: &str,
        departed: NaiveDateTime,
    ) -> Result<(), EngineError> {
        self.advance_record(at, booking_ref, RecordStatus::CheckOut, |r| {
            r.check_out = Some(departed);
        })
        .await
    }

    /// Drop a booking that has not started. Only `booked` records qualify.
    pub async fn cancel_booking(&self, at: &UnitRef, booking_ref: &str) -> Result<(), EngineError> {
        self.advance_record(at, booking_ref, RecordStatus::Available, |_| {})
            .await
    }

    // ── Task lifecycle ───────────────────────────────────────

    pub async fn schedule_maintenance(
        &self,
        at: &UnitRef,
        duration: Duration,
        priority: TaskPriority,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Result<HousekeepingTask, EngineError> {
        if duration <= Duration::zero() || duration > Duration::days(MAX_MAINTENANCE_DAYS) {
            return Err(EngineError::LimitExceeded("maintenance duration out of range"));
        }
        if notes.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
            return Err(EngineError::LimitExceeded("note too long"));
        }
        let _guard = self.write_lock.lock().await;
        let (category, mut unit) = self.unit_for_update(at).await?;
        check_record_transition(RecordStatus::Available, RecordStatus::Maintenance)?;

        let policy = self.policy().await?;
        let start = maintenance_start(&unit, &policy, now);
        let task = new_maintenance_task(
            &category,
            &unit.unit_number,
            MaintenanceRequest {
                start,
                duration,
                priority,
                notes,
            },
        );
        let mut record = StatusRecord::maintenance(Some(task.booking_ref.clone()), Some(start));
        record.check_out = Some(task.expected_end);
        unit.status_records.push(record);

        self.repo.save_unit(&at.category_id, unit).await?;
        self.repo.upsert_task(task.clone()).await?;
        info!(
            "maintenance {} scheduled on unit {} from {start}",
            task.booking_ref, at.unit_number
        );
        Ok(task)
    }

    pub async fn start_task(
        &self,
        task_id: Ulid,
        assignee: Option<String>,
        now: NaiveDateTime,
    ) -> Result<HousekeepingTask, EngineError> {
        if assignee.as_ref().is_some_and(|a| a.len() > MAX_ASSIGNEE_LEN) {
            return Err(EngineError::LimitExceeded("assignee too long"));
        }
        let _guard = self.write_lock.lock().await;
        let mut task = self.task(task_id).await?;
        check_task_transition(task.status, TaskStatus::InProgress)?;
        task.status = TaskStatus::InProgress;
        task.actual_start = Some(now);
        if assignee.is_some() {
            task.assignee = assignee;
        }
        self.repo.upsert_task(task.clone()).await?;
        Ok(task)
    }

    /// Staff closes a task. The unit's matching checkout or maintenance
    /// record is released before the task is marked completed.
    pub async fn complete_task(
        &self,
        task_id: Ulid,
        note: Option<String>,
        now: NaiveDateTime,
    ) -> Result<HousekeepingTask, EngineError> {
        if note.as_ref().is_some_and(|n| n.len() > MAX_NOTE_LEN) {
            return Err(EngineError::LimitExceeded("note too long"));
        }
        let _guard = self.write_lock.lock().await;
        let mut task = self.task(task_id).await?;
        check_task_transition(task.status, TaskStatus::Completed)?;

        let at = UnitRef::new(task.category_id.clone(), task.unit_number.clone());
        match self.unit_for_update(&at).await {
            Ok((_, mut unit)) => {
                let removed = unit.remove_records(&task.booking_ref, |s| {
                    s.awaits_cleaning() || s == RecordStatus::Maintenance
                });
                if removed > 0 {
                    self.repo.save_unit(&at.category_id, unit).await?;
                }
            }
            Err(EngineError::CategoryNotFound(_)) | Err(EngineError::UnitNotFound { .. }) => {
                warn!(
                    "task {task_id} targets missing unit {} in {}",
                    at.unit_number, at.category_id
                );
            }
            Err(e) => return Err(e),
        }

        task.status = TaskStatus::Completed;
        task.actual_end = Some(now);
        if task.actual_start.is_none() {
            task.actual_start = Some(now);
        }
        task.notes.extend(note);
        self.repo.upsert_task(task.clone()).await?;
        Ok(task)
    }

    // ── Reconcile ────────────────────────────────────────────

    /// Run one housekeeping reconciliation pass at `now`.
    ///
    /// Writes land in the order units, completed tasks, new tasks, so a
    /// pass interrupted midway is finished by the next one without
    /// creating duplicates.
    pub async fn reconcile(&self, now: NaiveDateTime) -> Result<ReconcileReport, EngineError> {
        let started = std::time::Instant::now();
        let _guard = self.write_lock.lock().await;
        let categories = self.repo.list_categories().await?;
        let tasks = self.repo.list_tasks().await?;
        let plan = plan_reconcile(&categories, &tasks, now, self.config.cleaning_buffer);

        for skipped in &plan.skipped {
            warn!(
                "reconcile skipped unit {} in {}: {}",
                skipped.unit_number, skipped.category_id, skipped.reason
            );
        }
        for (category_id, unit) in &plan.released_units {
            self.repo.save_unit(category_id, unit.clone()).await?;
        }
        for task in plan.auto_completed.iter().chain(&plan.created) {
            self.repo.upsert_task(task.clone()).await?;
        }

        metrics::counter!(crate::observability::RECONCILE_PASSES_TOTAL).increment(1);
        metrics::counter!(crate::observability::TASKS_CREATED_TOTAL).increment(plan.created.len() as u64);
        metrics::counter!(crate::observability::TASKS_AUTO_COMPLETED_TOTAL)
            .increment(plan.auto_completed.len() as u64);
        metrics::counter!(crate::observability::RECONCILE_SKIPPED_UNITS_TOTAL)
            .increment(plan.skipped.len() as u64);
        metrics::histogram!(crate::observability::RECONCILE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        if !plan.is_empty() || !plan.skipped.is_empty() {
            info!(
                "reconcile at {now}: {} created, {} auto-completed, {} skipped",
                plan.created.len(),
                plan.auto_completed.len(),
                plan.skipped.len()
            );
        }

        Ok(ReconcileReport {
            auto_completed: plan.auto_completed,
            created: plan.created,
            skipped: plan.skipped,
        })
    }
}
