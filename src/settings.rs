use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Global room settings as stored by the property dashboard.
///
/// Clock times are `"HH:mm"` strings and weekend days are weekday
/// abbreviations (`"Sat"`, `"Sun"`). Anything missing or unparseable
/// degrades instead of failing; see [`RoomSettings::policy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    #[serde(default)]
    pub check_in: Option<String>,
    #[serde(default)]
    pub check_out: Option<String>,
    #[serde(default)]
    pub weekend: Vec<String>,
    #[serde(default)]
    pub weekend_price_hike: f64,
}

/// How calendar dates become comparable instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Precise {
        check_in: NaiveTime,
        check_out: NaiveTime,
    },
    /// Settings are incomplete: every instant is midnight of its date.
    DateOnly,
}

impl Clock {
    pub fn is_precise(&self) -> bool {
        matches!(self, Clock::Precise { .. })
    }

    pub fn check_in_at(&self, date: NaiveDate) -> NaiveDateTime {
        match self {
            Clock::Precise { check_in, .. } => date.and_time(*check_in),
            Clock::DateOnly => date.and_time(NaiveTime::MIN),
        }
    }

    pub fn check_out_at(&self, date: NaiveDate) -> NaiveDateTime {
        match self {
            Clock::Precise { check_out, .. } => date.and_time(*check_out),
            Clock::DateOnly => date.and_time(NaiveTime::MIN),
        }
    }
}

/// Parsed, validated form of [`RoomSettings`] consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StayPolicy {
    pub clock: Clock,
    pub weekend: Vec<Weekday>,
    pub weekend_hike_percent: f64,
}

impl Default for StayPolicy {
    fn default() -> Self {
        Self {
            clock: Clock::DateOnly,
            weekend: Vec::new(),
            weekend_hike_percent: 0.0,
        }
    }
}

impl StayPolicy {
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.weekend.contains(&date.weekday())
    }
}

impl RoomSettings {
    pub fn policy(&self) -> StayPolicy {
        let check_in = self.check_in.as_deref().and_then(|s| parse_clock("checkIn", s));
        let check_out = self.check_out.as_deref().and_then(|s| parse_clock("checkOut", s));
        let clock = match (check_in, check_out) {
            (Some(check_in), Some(check_out)) => Clock::Precise { check_in, check_out },
            _ => {
                warn!("room settings lack check-in/check-out clock times, comparing by date only");
                Clock::DateOnly
            }
        };

        let mut weekend = Vec::with_capacity(self.weekend.len());
        for name in &self.weekend {
            match name.trim().parse::<Weekday>() {
                Ok(day) if !weekend.contains(&day) => weekend.push(day),
                Ok(_) => {}
                Err(_) => warn!("ignoring unknown weekend day {name:?}"),
            }
        }

        let weekend_hike_percent = if self.weekend_price_hike.is_finite() {
            self.weekend_price_hike
        } else {
            warn!("weekend price hike is not a number, using 0");
            0.0
        };

        StayPolicy {
            clock,
            weekend,
            weekend_hike_percent,
        }
    }
}

fn parse_clock(field: &str, raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("unparseable {field} clock time {raw:?}: {e}");
            None
        }
    }
}
