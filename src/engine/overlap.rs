use chrono::{Days, NaiveDateTime};

use crate::model::DateRange;
use crate::settings::Clock;

/// Whether a requested stay conflicts with a booked one.
///
/// Strict overlap, plus any exactly equal boundary: back-to-back stays that
/// touch at the same instant conflict, leaving no zero-length turnover.
/// Inputs are clock-normalized instants; the caller guarantees
/// `check_in <= check_out` on both sides.
pub fn overlaps(
    requested_in: NaiveDateTime,
    requested_out: NaiveDateTime,
    booked_in: NaiveDateTime,
    booked_out: NaiveDateTime,
) -> bool {
    (requested_in < booked_out && requested_out > booked_in)
        || requested_in == booked_out
        || requested_out == booked_in
        || requested_in == booked_in
        || requested_out == booked_out
}

/// Day-level containment in `[booked_in, booked_out)`.
pub fn contains(instant: NaiveDateTime, booked_in: NaiveDateTime, booked_out: NaiveDateTime) -> bool {
    booked_in <= instant && instant < booked_out
}

/// A requested [`DateRange`] normalized to instants under a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayWindow {
    pub check_in: NaiveDateTime,
    pub check_out: NaiveDateTime,
    pub single_date: bool,
}

impl StayWindow {
    pub fn new(range: &DateRange, clock: &Clock) -> Self {
        let check_in = clock.check_in_at(range.from);
        let check_out = if range.is_single_date() {
            check_in.checked_add_days(Days::new(1)).unwrap_or(check_in)
        } else {
            clock.check_out_at(range.to)
        };
        Self {
            check_in,
            check_out,
            single_date: range.is_single_date(),
        }
    }

    /// Conflict test against a booked interval already normalized by the same clock.
    pub fn conflicts_with(&self, booked_in: NaiveDateTime, booked_out: NaiveDateTime) -> bool {
        if self.single_date {
            contains(self.check_in, booked_in, booked_out)
        } else {
            overlaps(self.check_in, self.check_out, booked_in, booked_out)
        }
    }
}
