use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use funnel_core::config::PostgresConfig;
use funnel_core::NewLead;

use crate::error::StoreError;
use crate::FunnelStore;

/// PostgreSQL-backed [`FunnelStore`].
#[derive(Debug, Clone)]
pub struct PgFunnelStore {
    pool: PgPool,
}

impl PgFunnelStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the given config.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;
        Ok(Self { pool })
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FunnelStore for PgFunnelStore {
    async fn create_lead(&self, lead: &NewLead) -> Result<i64, StoreError> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO leads (email, utm_medium, utm_source)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(&lead.email)
        .bind(&lead.utm_medium)
        .bind(&lead.utm_source)
        .fetch_optional(&self.pool)
        .await?;

        let id = id.ok_or(StoreError::MissingLeadId)?;
        debug!(lead_id = id, email = %lead.email, "created lead");
        Ok(id)
    }

    async fn finalize_conversion(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE leads
             SET converted_at = NOW(), conversion_amount = $1
             WHERE id = $2",
        )
        .bind(amount_cents)
        .bind(lead_id)
        .execute(&self.pool)
        .await?;

        debug!(lead_id, amount_cents, "finalized conversion");
        Ok(())
    }

    async fn create_coupon(&self, lead_id: i64, amount_cents: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO coupons (lead_id, amount) VALUES ($1, $2)")
            .bind(lead_id)
            .bind(amount_cents)
            .execute(&self.pool)
            .await?;

        debug!(lead_id, amount_cents, "created coupon");
        Ok(())
    }
}
