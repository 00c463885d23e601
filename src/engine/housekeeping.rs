use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ulid::Ulid;

use crate::limits::MAINTENANCE_REF_PREFIX;
use crate::model::*;
use crate::settings::StayPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// A checkout record has no booking reference to link a task to.
    MissingBookingReference,
    /// The unit number appears more than once in its category.
    DuplicateUnitNumber,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingBookingReference => f.write_str("checkout record without booking reference"),
            SkipReason::DuplicateUnitNumber => f.write_str("duplicate unit number in category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedUnit {
    pub category_id: String,
    pub unit_number: String,
    pub reason: SkipReason,
}

/// Deltas computed by one reconciliation pass. Nothing has been written yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub auto_completed: Vec<HousekeepingTask>,
    pub created: Vec<HousekeepingTask>,
    /// Units whose stale checkout records were removed, keyed by category id.
    pub released_units: Vec<(String, Unit)>,
    pub skipped: Vec<SkippedUnit>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.auto_completed.is_empty() && self.created.is_empty() && self.released_units.is_empty()
    }
}

type TaskKey = (String, String, String);

fn key(category_id: &str, unit_number: &str, booking_ref: &str) -> TaskKey {
    (category_id.to_string(), unit_number.to_string(), booking_ref.to_string())
}

/// Plan one reconciliation pass at the fixed instant `now`.
///
/// 1. Open checkout tasks whose `expected_end <= now` are completed and
///    their unit's checkout record is released.
/// 2. Every checkout record with a set `check_out` and no open task for the
///    same unit and reference gets a new `pending` task ending at
///    `now + cleaning_buffer`.
///
/// Planning against its own output is a no-op as long as `cleaning_buffer`
/// is positive.
pub fn plan_reconcile(
    categories: &[Category],
    tasks: &[HousekeepingTask],
    now: NaiveDateTime,
    cleaning_buffer: Duration,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let malformed = find_malformed_units(categories);
    let is_malformed = |category_id: &str, unit_number: &str| {
        malformed
            .iter()
            .any(|s| s.category_id == category_id && s.unit_number == unit_number)
    };

    // ── Auto-completion pass ─────────────────────────────────
    let mut released: HashMap<(String, String), Unit> = HashMap::new();
    for task in tasks {
        if !task.is_open()
            || task.reservation_status != RecordStatus::CheckOut
            || task.expected_end > now
        {
            continue;
        }
        let mut done = task.clone();
        done.status = TaskStatus::Completed;
        done.actual_end = Some(now);
        done.notes.push(format!(
            "auto-completed at {now}: cleaning window ended at {}",
            task.expected_end
        ));
        plan.auto_completed.push(done);

        if is_malformed(&task.category_id, &task.unit_number) {
            continue;
        }
        let unit_key = (task.category_id.clone(), task.unit_number.clone());
        if !released.contains_key(&unit_key) {
            let Some(unit) = categories
                .iter()
                .find(|c| c.id == task.category_id)
                .and_then(|c| c.unit(&task.unit_number))
            else {
                continue;
            };
            released.insert(unit_key.clone(), unit.clone());
        }
        if let Some(unit) = released.get_mut(&unit_key) {
            unit.remove_records(&task.booking_ref, RecordStatus::awaits_cleaning);
        }
    }

    // Only keep units that actually lost a record.
    for ((category_id, unit_number), unit) in released {
        let original = categories
            .iter()
            .find(|c| c.id == category_id)
            .and_then(|c| c.unit(&unit_number));
        if original.is_some_and(|o| o.status_records.len() != unit.status_records.len()) {
            plan.released_units.push((category_id, unit));
        }
    }
    plan.released_units
        .sort_by(|a, b| (&a.0, &a.1.unit_number).cmp(&(&b.0, &b.1.unit_number)));

    // ── Creation pass ────────────────────────────────────────
    let completed_now: HashSet<Ulid> = plan.auto_completed.iter().map(|t| t.id).collect();
    let mut open: HashMap<TaskKey, usize> = HashMap::new();
    for task in tasks.iter().filter(|t| t.is_open() && !completed_now.contains(&t.id)) {
        *open
            .entry(key(&task.category_id, &task.unit_number, &task.booking_ref))
            .or_default() += 1;
    }
    for ((category_id, unit_number, booking_ref), count) in &open {
        if *count > 1 {
            warn!(
                "unit {unit_number} in {category_id} has {count} open tasks for {booking_ref}, not creating more"
            );
        }
    }

    for category in categories {
        for unit in &category.units {
            if is_malformed(&category.id, &unit.unit_number) {
                continue;
            }
            let unit = plan
                .released_units
                .iter()
                .find(|(cid, u)| *cid == category.id && u.unit_number == unit.unit_number)
                .map_or(unit, |(_, u)| u);

            for record in &unit.status_records {
                if record.status != RecordStatus::CheckOut || record.check_out.is_none() {
                    continue;
                }
                let Some(booking_ref) = record.booking_ref.as_deref() else {
                    continue;
                };
                let task_key = key(&category.id, &unit.unit_number, booking_ref);
                if open.contains_key(&task_key) {
                    continue;
                }
                open.insert(task_key, 1);
                let expected_end = now
                    .checked_add_signed(cleaning_buffer)
                    .unwrap_or(NaiveDateTime::MAX);
                plan.created.push(HousekeepingTask {
                    id: Ulid::new(),
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    unit_number: unit.unit_number.clone(),
                    booking_ref: booking_ref.to_string(),
                    reservation_status: RecordStatus::CheckOut,
                    status: TaskStatus::Pending,
                    priority: TaskPriority::Medium,
                    expected_start: now,
                    expected_end,
                    actual_start: None,
                    actual_end: None,
                    assignee: None,
                    notes: Vec::new(),
                });
            }
        }
    }

    plan.skipped = malformed;
    plan
}

fn find_malformed_units(categories: &[Category]) -> Vec<SkippedUnit> {
    let mut skipped = Vec::new();
    for category in categories {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates: HashSet<&str> = HashSet::new();
        for unit in &category.units {
            if !seen.insert(unit.unit_number.as_str()) {
                duplicates.insert(unit.unit_number.as_str());
            }
        }
        for unit in &category.units {
            let reason = if duplicates.contains(unit.unit_number.as_str()) {
                SkipReason::DuplicateUnitNumber
            } else if unit.status_records.iter().any(|r| {
                r.status == RecordStatus::CheckOut
                    && r.check_out.is_some()
                    && r.booking_ref.as_deref().is_none_or(str::is_empty)
            }) {
                SkipReason::MissingBookingReference
            } else {
                continue;
            };
            let already = skipped
                .iter()
                .any(|s: &SkippedUnit| s.category_id == category.id && s.unit_number == unit.unit_number);
            if !already {
                skipped.push(SkippedUnit {
                    category_id: category.id.clone(),
                    unit_number: unit.unit_number.clone(),
                    reason,
                });
            }
        }
    }
    skipped
}

// ── Maintenance ──────────────────────────────────────────────────

/// Earliest instant maintenance may begin: the latest clock-normalized
/// check-out among the unit's future reservations, or `now`.
pub fn maintenance_start(unit: &Unit, policy: &StayPolicy, now: NaiveDateTime) -> NaiveDateTime {
    unit.status_records
        .iter()
        .filter(|r| r.status.is_reservation())
        .filter_map(|r| r.check_out)
        .map(|out| policy.clock.check_out_at(out.date()))
        .filter(|out| *out > now)
        .max()
        .unwrap_or(now)
}

pub struct MaintenanceRequest {
    pub start: NaiveDateTime,
    pub duration: Duration,
    pub priority: TaskPriority,
    pub notes: Option<String>,
}

pub fn new_maintenance_task(category: &Category, unit_number: &str, request: MaintenanceRequest) -> HousekeepingTask {
    let id = Ulid::new();
    HousekeepingTask {
        id,
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        unit_number: unit_number.to_string(),
        booking_ref: format!("{MAINTENANCE_REF_PREFIX}{id}"),
        reservation_status: RecordStatus::Maintenance,
        status: TaskStatus::Maintenance,
        priority: request.priority,
        expected_start: request.start,
        expected_end: request.start + request.duration,
        actual_start: None,
        actual_end: None,
        assignee: None,
        notes: request.notes.into_iter().collect(),
    }
}
