use serde::{Deserialize, Serialize};

/// A lead that has not been written to the database yet.
///
/// Carries only the attribution attributes; the identifier is assigned by
/// the store on insert, which promotes this into a [`Lead`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    /// Synthetic email address.
    pub email: String,
    /// Acquisition channel family (e.g. "social", "organic").
    pub utm_medium: String,
    /// Acquisition source within the channel (e.g. "facebook.com").
    pub utm_source: String,
}

/// A persisted lead with its database-assigned identifier.
///
/// Every downstream operation (predictions, coupons, conversions) requires
/// a `Lead`; the `NewLead`/`Lead` split guarantees the id is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub email: String,
    pub utm_medium: String,
    pub utm_source: String,
}

impl NewLead {
    /// Promote into a [`Lead`] once the store has assigned an id.
    pub fn with_id(self, id: i64) -> Lead {
        Lead {
            id,
            email: self.email,
            utm_medium: self.utm_medium,
            utm_source: self.utm_source,
        }
    }
}
