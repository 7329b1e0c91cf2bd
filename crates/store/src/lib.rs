//! Persistence collaborator for the funnel generator.
//!
//! The [`FunnelStore`] trait is the narrow interface the pipeline and the
//! scheduler loop depend on; [`PgFunnelStore`] is the PostgreSQL
//! implementation used in production.

pub mod error;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use funnel_core::NewLead;

pub use error::StoreError;
pub use postgres::PgFunnelStore;

/// Relational store the funnel generator writes to.
#[async_trait]
pub trait FunnelStore: Send + Sync {
    /// Insert a lead and return its assigned identifier.
    ///
    /// The id must be visible to the caller synchronously; an insert that
    /// yields no id is an error, never a silent success.
    async fn create_lead(&self, lead: &NewLead) -> Result<i64, StoreError>;

    /// Mark a lead as converted right now, for the given amount.
    async fn finalize_conversion(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError>;

    /// Record a coupon issued to a lead.
    async fn create_coupon(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError>;
}

/// Blanket implementation so `Arc<dyn FunnelStore>` can be used directly.
#[async_trait]
impl<T: FunnelStore + ?Sized> FunnelStore for Arc<T> {
    async fn create_lead(&self, lead: &NewLead) -> Result<i64, StoreError> {
        (**self).create_lead(lead).await
    }

    async fn finalize_conversion(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError> {
        (**self).finalize_conversion(lead_id, amount_cents).await
    }

    async fn create_coupon(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError> {
        (**self).create_coupon(lead_id, amount_cents).await
    }
}
