use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::settings::RoomSettings;

/// Requested stay by calendar date. `from == to` is a single-date lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        debug_assert!(from <= to, "DateRange from must not be after to");
        Self { from, to }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { from: date, to: date }
    }

    pub fn is_single_date(&self) -> bool {
        self.from == self.to
    }

    /// Departure date. A single-date lookup departs the following day.
    pub fn end_date(&self) -> NaiveDate {
        if self.is_single_date() {
            self.from.checked_add_days(Days::new(1)).unwrap_or(self.from)
        } else {
            self.to
        }
    }

    /// Every billable night in `[from, end_date)`.
    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end_date();
        self.from.iter_days().take_while(move |d| *d < end)
    }

    pub fn night_count(&self) -> i64 {
        (self.end_date() - self.from).num_days()
    }
}

// ── Status records ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Available,
    Booked,
    #[serde(rename = "checkin")]
    CheckIn,
    #[serde(rename = "checkout")]
    CheckOut,
    Pending,
    Maintenance,
}

impl RecordStatus {
    /// Statuses that hold a guest reservation on the unit.
    pub fn is_reservation(self) -> bool {
        matches!(self, RecordStatus::Booked | RecordStatus::CheckIn | RecordStatus::CheckOut)
    }

    /// The guest has left and the unit is waiting for housekeeping.
    pub fn awaits_cleaning(self) -> bool {
        matches!(self, RecordStatus::CheckOut | RecordStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Available => "available",
            RecordStatus::Booked => "booked",
            RecordStatus::CheckIn => "checkin",
            RecordStatus::CheckOut => "checkout",
            RecordStatus::Pending => "pending",
            RecordStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Occupancy {
    pub adults: u32,
    pub children: u32,
}

/// One reservation- or maintenance-linked entry on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    #[serde(default, rename = "bookingReference")]
    pub booking_ref: Option<String>,
    #[serde(default)]
    pub check_in: Option<NaiveDateTime>,
    /// `None` while a departed guest's unit is waiting to be cleaned.
    #[serde(default)]
    pub check_out: Option<NaiveDateTime>,
    pub status: RecordStatus,
    #[serde(default)]
    pub occupancy: Option<Occupancy>,
}

impl StatusRecord {
    pub fn reservation(
        booking_ref: impl Into<String>,
        check_in: NaiveDateTime,
        check_out: NaiveDateTime,
        status: RecordStatus,
    ) -> Self {
        Self {
            booking_ref: Some(booking_ref.into()),
            check_in: Some(check_in),
            check_out: Some(check_out),
            status,
            occupancy: None,
        }
    }

    pub fn maintenance(reference: Option<String>, start: Option<NaiveDateTime>) -> Self {
        Self {
            booking_ref: reference,
            check_in: start,
            check_out: None,
            status: RecordStatus::Maintenance,
            occupancy: None,
        }
    }

    pub fn has_reference(&self, reference: &str) -> bool {
        self.booking_ref.as_deref() == Some(reference)
    }
}

/// One physical room or hall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub unit_number: String,
    #[serde(default)]
    pub status_records: Vec<StatusRecord>,
}

impl Unit {
    pub fn new(unit_number: impl Into<String>) -> Self {
        Self {
            unit_number: unit_number.into(),
            status_records: Vec::new(),
        }
    }

    pub fn with_record(mut self, record: StatusRecord) -> Self {
        self.status_records.push(record);
        self
    }

    pub fn record(&self, reference: &str) -> Option<&StatusRecord> {
        self.status_records.iter().find(|r| r.has_reference(reference))
    }

    pub fn record_mut(&mut self, reference: &str) -> Option<&mut StatusRecord> {
        self.status_records.iter_mut().find(|r| r.has_reference(reference))
    }

    /// Remove every record carrying `reference` whose status satisfies `pred`.
    /// Returns how many were removed.
    pub fn remove_records(&mut self, reference: &str, pred: impl Fn(RecordStatus) -> bool) -> usize {
        let before = self.status_records.len();
        self.status_records
            .retain(|r| !(r.has_reference(reference) && pred(r.status)));
        before - self.status_records.len()
    }
}

// ── Categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Room,
    Hall,
}

/// Tax rates as percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRates {
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
}

impl TaxRates {
    pub fn total_percent(&self) -> f64 {
        self.cgst + self.sgst + self.igst
    }
}

/// A room or hall type and its physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: CategoryKind,
    pub base_rate: f64,
    /// Flat per-stay charge for each guest beyond the standard occupancy.
    #[serde(default)]
    pub extra_guest_charge: f64,
    #[serde(default)]
    pub taxes: TaxRates,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl Category {
    pub fn unit(&self, unit_number: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.unit_number == unit_number)
    }

    pub fn unit_mut(&mut self, unit_number: &str) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.unit_number == unit_number)
    }
}

// ── Housekeeping ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Maintenance,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Append-only operational log entry: tasks are completed, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingTask {
    pub id: Ulid,
    pub category_id: String,
    pub category_name: String,
    pub unit_number: String,
    /// Booking reference, or a synthesized `MNT-` reference for maintenance.
    pub booking_ref: String,
    /// The record status that caused the task (`checkout` or `maintenance`).
    pub reservation_status: RecordStatus,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub expected_start: NaiveDateTime,
    pub expected_end: NaiveDateTime,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_end: Option<NaiveDateTime>,
    pub assignee: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl HousekeepingTask {
    pub fn is_open(&self) -> bool {
        self.status != TaskStatus::Completed
    }

    pub fn targets(&self, category_id: &str, unit_number: &str, booking_ref: &str) -> bool {
        self.category_id == category_id
            && self.unit_number == unit_number
            && self.booking_ref == booking_ref
    }
}

/// Journal record format. Each event replaces the whole entity it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CategorySaved { category: Category },
    UnitSaved { category_id: String, unit: Unit },
    TaskUpserted { task: HousekeepingTask },
    SettingsSaved { settings: RoomSettings },
}
