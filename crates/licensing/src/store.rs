//! License persistence boundary
//!
//! The engine is handed already-fetched records everywhere else; this is
//! the one module that talks to the `licenses` table. Enum columns are
//! decoded lossily at this boundary (see `RawLicenseRecord::from_row`) so
//! a malformed row degrades to Free instead of failing the read.

use async_trait::async_trait;
use slate_shared::{AccountId, BillingCycle, PlanTier};
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::{LicenseError, LicenseResult};
use crate::reconciler::RecordSource;
use crate::record::RawLicenseRecord;

const RECORD_COLUMNS: &str = r#"
    account_id, plan_tier, billing_cycle, status,
    external_subscription_id, external_customer_id,
    cancel_at_period_end, current_period_end, trial_ends_at,
    admin_valid_until_override, admin_override_reason,
    admin_override_by, admin_override_at,
    pending_downgrade_plan, pending_downgrade_cycle, pending_downgrade_at
"#;

/// Store for license rows
#[derive(Debug, Clone)]
pub struct LicenseStore {
    pool: PgPool,
}

impl LicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the license row for an account, if one exists
    ///
    /// Absence is not an error; the resolver treats a missing row as an
    /// implicit Free record.
    pub async fn fetch(&self, account_id: AccountId) -> LicenseResult<Option<RawLicenseRecord>> {
        let record: Option<RawLicenseRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM licenses WHERE account_id = $1"
        ))
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = &record {
            if let Some(anomaly) = record.scheduled_change_anomaly() {
                warn!(
                    account_id = %account_id,
                    current_tier = %anomaly.current_tier,
                    target_tier = %anomaly.target_tier,
                    "Rank-violating scheduled downgrade on license row"
                );
            }
        }

        Ok(record)
    }

    /// Create the signup row: Free, no cycle, no dates
    ///
    /// Idempotent; an existing row is left untouched.
    pub async fn create_default(&self, account_id: AccountId) -> LicenseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO licenses (account_id, plan_tier, billing_cycle, status)
            VALUES ($1, 'free', 'none', 'none')
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(account_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a scheduled downgrade to take effect at the next renewal
    ///
    /// The target must rank strictly below the current tier; an equal or
    /// higher target is rejected before any write. The scheduling job that
    /// applies the change at `effective_at` is an external collaborator.
    pub async fn schedule_change(
        &self,
        account_id: AccountId,
        target_tier: PlanTier,
        target_cycle: BillingCycle,
        effective_at: OffsetDateTime,
    ) -> LicenseResult<()> {
        let record = self
            .fetch(account_id)
            .await?
            .ok_or(LicenseError::AccountNotFound(account_id))?;

        if target_tier.rank() >= record.plan_tier.rank() {
            return Err(LicenseError::ScheduledChangeRankViolation {
                current: record.plan_tier,
                requested: target_tier,
            });
        }

        sqlx::query(
            r#"
            UPDATE licenses
            SET pending_downgrade_plan = $2,
                pending_downgrade_cycle = $3,
                pending_downgrade_at = $4,
                updated_at = NOW()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.0)
        .bind(target_tier.to_string())
        .bind(target_cycle.to_string())
        .bind(effective_at)
        .execute(&self.pool)
        .await?;

        info!(
            account_id = %account_id,
            target_tier = %target_tier,
            target_cycle = %target_cycle,
            effective_at = %effective_at,
            "Downgrade scheduled for next renewal"
        );
        Ok(())
    }

    /// Clear a scheduled change without applying it
    pub async fn cancel_scheduled_change(&self, account_id: AccountId) -> LicenseResult<()> {
        sqlx::query(
            r#"
            UPDATE licenses
            SET pending_downgrade_plan = NULL,
                pending_downgrade_cycle = NULL,
                pending_downgrade_at = NULL,
                updated_at = NOW()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.0)
        .execute(&self.pool)
        .await?;

        info!(account_id = %account_id, "Scheduled downgrade cancelled");
        Ok(())
    }
}

#[async_trait]
impl RecordSource for LicenseStore {
    async fn fetch(&self, account_id: AccountId) -> LicenseResult<Option<RawLicenseRecord>> {
        LicenseStore::fetch(self, account_id).await
    }
}
