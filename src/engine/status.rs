use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::settings::StayPolicy;

use super::overlap::StayWindow;

/// Operational status of one unit for a requested stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitStatus {
    Available,
    Booked,
    CheckedIn,
    CheckedOut,
    /// Guest has left; the unit is dirty until housekeeping clears it.
    /// Only records without a departure time reach this, such as imported
    /// ones; `check_out` stamps the departure, which reads as `CheckedOut`.
    Housekeeping,
    Maintenance,
}

impl UnitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Booked => "booked",
            UnitStatus::CheckedIn => "checked-in",
            UnitStatus::CheckedOut => "checked-out",
            UnitStatus::Housekeeping => "housekeeping",
            UnitStatus::Maintenance => "maintenance",
        }
    }

    fn from_reservation(status: RecordStatus) -> Self {
        match status {
            RecordStatus::CheckIn => UnitStatus::CheckedIn,
            RecordStatus::CheckOut => UnitStatus::CheckedOut,
            _ => UnitStatus::Booked,
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub status: UnitStatus,
    /// The record that decided the status, if any.
    pub record: Option<&'a StatusRecord>,
}

impl Resolution<'_> {
    pub fn is_available(&self) -> bool {
        self.status == UnitStatus::Available
    }
}

/// Resolve a unit's status for `range`. First match wins:
/// housekeeping, then maintenance, then reservations, else available.
pub fn resolve_status<'a>(unit: &'a Unit, range: &DateRange, policy: &StayPolicy) -> Resolution<'a> {
    let window = StayWindow::new(range, &policy.clock);

    if let Some(record) = unit
        .status_records
        .iter()
        .find(|r| awaiting_cleaning(r, range))
    {
        return Resolution {
            status: UnitStatus::Housekeeping,
            record: Some(record),
        };
    }

    if let Some(record) = unit
        .status_records
        .iter()
        .find(|r| maintenance_in_effect(r, range, &window, policy))
    {
        return Resolution {
            status: UnitStatus::Maintenance,
            record: Some(record),
        };
    }

    if let Some(record) = unit
        .status_records
        .iter()
        .find(|r| reservation_conflicts(r, &window, policy))
    {
        return Resolution {
            status: UnitStatus::from_reservation(record.status),
            record: Some(record),
        };
    }

    Resolution {
        status: UnitStatus::Available,
        record: None,
    }
}

/// Every reservation record that conflicts with `range`. More than one means
/// the unit was double-booked; the resolver still reports only the first.
pub fn conflicting_reservations<'a>(
    unit: &'a Unit,
    range: &DateRange,
    policy: &StayPolicy,
) -> Vec<&'a StatusRecord> {
    let window = StayWindow::new(range, &policy.clock);
    unit.status_records
        .iter()
        .filter(|r| reservation_conflicts(r, &window, policy))
        .collect()
}

fn awaiting_cleaning(record: &StatusRecord, range: &DateRange) -> bool {
    if !record.status.awaits_cleaning() || record.check_out.is_some() {
        return false;
    }
    match record.check_in {
        Some(check_in) => range.from >= check_in.date(),
        None => true,
    }
}

fn maintenance_in_effect(
    record: &StatusRecord,
    range: &DateRange,
    window: &StayWindow,
    policy: &StayPolicy,
) -> bool {
    if record.status != RecordStatus::Maintenance {
        return false;
    }
    match record.check_in {
        None => true,
        Some(start) if policy.clock.is_precise() => window.check_in >= start,
        Some(start) => range.from >= start.date(),
    }
}

fn reservation_conflicts(record: &StatusRecord, window: &StayWindow, policy: &StayPolicy) -> bool {
    if !record.status.is_reservation() {
        return false;
    }
    let (Some(check_in), Some(check_out)) = (record.check_in, record.check_out) else {
        return false;
    };
    let booked_in = policy.clock.check_in_at(check_in.date());
    let booked_out = policy.clock.check_out_at(check_out.date());
    window.conflicts_with(booked_in, booked_out)
}
