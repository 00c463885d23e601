use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::settings::StayPolicy;

/// Per-quote adjustments supplied by the booking form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteOptions {
    /// Guests beyond standard occupancy, each charged once per stay.
    pub extra_guests: u32,
    /// Flat service charges, added after tax and never discounted.
    pub service_charge: f64,
    /// Percentage off the pre-tax subtotal.
    pub discount_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightCharge {
    pub date: NaiveDate,
    pub weekend: bool,
    pub rate: f64,
    pub tax: f64,
}

/// Full-precision stay quote. Call [`Quote::rounded`] before display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub per_night: Vec<NightCharge>,
    pub extra_guest_charge: f64,
    /// Nightly rates plus extra-guest charge, before discount.
    pub subtotal: f64,
    pub discount: f64,
    pub service_charge: f64,
    pub tax_total: f64,
    pub grand_total: f64,
}

impl Quote {
    pub fn rounded(&self) -> Quote {
        Quote {
            per_night: self
                .per_night
                .iter()
                .map(|n| NightCharge {
                    rate: round2(n.rate),
                    tax: round2(n.tax),
                    ..*n
                })
                .collect(),
            extra_guest_charge: round2(self.extra_guest_charge),
            subtotal: round2(self.subtotal),
            discount: round2(self.discount),
            service_charge: round2(self.service_charge),
            tax_total: round2(self.tax_total),
            grand_total: round2(self.grand_total),
        }
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Nightly rate for `date`, with the weekend surcharge when it applies.
pub fn price_for_night(category: &Category, date: NaiveDate, policy: &StayPolicy) -> f64 {
    if policy.is_weekend(date) {
        category.base_rate * (1.0 + policy.weekend_hike_percent / 100.0)
    } else {
        category.base_rate
    }
}

pub fn price_for_stay(
    category: &Category,
    range: &DateRange,
    policy: &StayPolicy,
    options: &QuoteOptions,
) -> Quote {
    let tax_percent = category.taxes.total_percent();
    let per_night: Vec<NightCharge> = range
        .nights()
        .map(|date| {
            let rate = price_for_night(category, date, policy);
            NightCharge {
                date,
                weekend: policy.is_weekend(date),
                rate,
                tax: rate * tax_percent / 100.0,
            }
        })
        .collect();

    let nightly: f64 = per_night.iter().map(|n| n.rate).sum();
    let tax_total: f64 = per_night.iter().map(|n| n.tax).sum();
    let extra_guest_charge = category.extra_guest_charge * f64::from(options.extra_guests);
    let subtotal = nightly + extra_guest_charge;
    let discount = subtotal * options.discount_percent.clamp(0.0, 100.0) / 100.0;
    let service_charge = options.service_charge.max(0.0);

    Quote {
        per_night,
        extra_guest_charge,
        subtotal,
        discount,
        service_charge,
        tax_total,
        grand_total: subtotal - discount + tax_total + service_charge,
    }
}
