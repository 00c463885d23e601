use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::settings::StayPolicy;

use super::status::{resolve_status, Resolution};

// ── Availability Aggregator ──────────────────────────────────────
//
// Every call rescans all units and their records. Unit and record counts
// are property-scale, so nothing is cached.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAvailability {
    pub category_id: String,
    pub category_name: String,
    pub available_count: usize,
    pub total_units: usize,
    pub bookable: bool,
}

pub fn available_count(category: &Category, range: &DateRange, policy: &StayPolicy) -> usize {
    category
        .units
        .iter()
        .filter(|unit| resolve_status(unit, range, policy).is_available())
        .count()
}

pub fn is_category_bookable(
    category: &Category,
    range: &DateRange,
    required_units: usize,
    policy: &StayPolicy,
) -> bool {
    available_count(category, range, policy) >= required_units
}

pub fn summarize(
    category: &Category,
    range: &DateRange,
    required_units: usize,
    policy: &StayPolicy,
) -> CategoryAvailability {
    let available_count = available_count(category, range, policy);
    CategoryAvailability {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        available_count,
        total_units: category.units.len(),
        bookable: available_count >= required_units,
    }
}

/// Bookable categories only, ordered by name.
pub fn search(
    categories: &[Category],
    range: &DateRange,
    required_units: usize,
    policy: &StayPolicy,
) -> Vec<CategoryAvailability> {
    let mut hits: Vec<CategoryAvailability> = categories
        .iter()
        .map(|c| summarize(c, range, required_units, policy))
        .filter(|s| s.bookable)
        .collect();
    hits.sort_by(|a, b| a.category_name.cmp(&b.category_name));
    hits
}

/// Per-unit resolution for a category, in unit order.
pub fn unit_board<'a>(
    category: &'a Category,
    range: &DateRange,
    policy: &StayPolicy,
) -> Vec<(&'a Unit, Resolution<'a>)> {
    category
        .units
        .iter()
        .map(|unit| (unit, resolve_status(unit, range, policy)))
        .collect()
}
