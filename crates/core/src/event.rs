use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::Lead;

/// A scheduled future conversion: at `fire_at`, `lead` converts for
/// `amount_cents`.
///
/// The event owns a snapshot of the lead (by value, no back-reference) and
/// is immutable once enqueued. Events are totally ordered by `fire_at`
/// ascending; ties have unspecified relative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEvent {
    /// When the conversion should be finalized.
    pub fire_at: DateTime<Utc>,
    /// Snapshot of the lead this conversion concerns.
    pub lead: Lead,
    /// Conversion amount in currency minor units.
    pub amount_cents: i64,
}

impl ConversionEvent {
    /// Queue ordering: earlier `fire_at` drains first. Kept as an explicit
    /// comparator (rather than an `Ord` impl on the event itself) so the
    /// ordering relation is independently testable and ties stay visible.
    pub fn fire_order(&self, other: &ConversionEvent) -> Ordering {
        self.fire_at.cmp(&other.fire_at)
    }
}
