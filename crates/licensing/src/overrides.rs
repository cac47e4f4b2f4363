//! Admin validity-date overrides
//!
//! An override is an administrator-granted manual extension (or shortening)
//! of access, independent of the payment processor. It is defined to grant
//! access, never to merely annotate, so applying one forces the license
//! status to active. Every override carries a mandatory reason and lands in
//! the audit log in the same transaction as the license write.

use serde::Serialize;
use slate_shared::{AccountId, AdminSession, LicenseStatus};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditLog, OverrideAuditEntry};
use crate::error::{LicenseError, LicenseResult};
use crate::record::RawLicenseRecord;
use crate::resolver;

/// Result of an applied override
#[derive(Debug, Clone, Serialize)]
pub struct OverrideOutcome {
    pub account_id: AccountId,
    pub previous_valid_until: Option<OffsetDateTime>,
    pub new_valid_until: OffsetDateTime,
    pub audit_id: Uuid,
}

/// Validate an override reason
///
/// A blank reason makes the override unauditable, so this is a hard
/// failure rejected before any write.
pub fn validate_reason(reason: &str) -> LicenseResult<()> {
    if reason.trim().is_empty() {
        return Err(LicenseError::MissingOverrideReason);
    }
    Ok(())
}

/// Compute the new validity date for a delta
///
/// Base is the account's current effective validity, falling back to `now`
/// when there is none. A zero delta is valid (re-anchors validity at the
/// base) and a negative delta shortens access.
pub fn compute_new_valid_until(
    current_valid_until: Option<OffsetDateTime>,
    delta_days: i64,
    now: OffsetDateTime,
) -> OffsetDateTime {
    current_valid_until.unwrap_or(now) + Duration::days(delta_days)
}

/// Service for applying admin overrides
pub struct AdminOverrideManager {
    pool: PgPool,
}

impl AdminOverrideManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply a manual validity-date adjustment
    ///
    /// Persists the override block, forces `status = active`, and appends
    /// the audit entry in one transaction, so an override can never be
    /// observed without its audit row. An account with no license row gets
    /// the implicit Free row created first.
    pub async fn apply_override(
        &self,
        account_id: AccountId,
        delta_days: i64,
        reason: &str,
        actor: &AdminSession,
    ) -> LicenseResult<OverrideOutcome> {
        validate_reason(reason).inspect_err(|_| {
            warn!(
                account_id = %account_id,
                admin = %actor.user_id,
                "Override rejected: missing reason"
            );
        })?;

        let now = OffsetDateTime::now_utc();
        let mut tx = self.pool.begin().await?;

        let record: Option<RawLicenseRecord> = sqlx::query_as(
            r#"
            SELECT account_id, plan_tier, billing_cycle, status,
                   external_subscription_id, external_customer_id,
                   cancel_at_period_end, current_period_end, trial_ends_at,
                   admin_valid_until_override, admin_override_reason,
                   admin_override_by, admin_override_at,
                   pending_downgrade_plan, pending_downgrade_cycle,
                   pending_downgrade_at
            FROM licenses
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        if record.is_none() {
            sqlx::query(
                r#"
                INSERT INTO licenses (account_id, plan_tier, billing_cycle, status)
                VALUES ($1, 'free', 'none', 'none')
                "#,
            )
            .bind(account_id.0)
            .execute(&mut *tx)
            .await?;
        }

        let previous_valid_until = resolver::resolve(record.as_ref()).effective_valid_until;
        let new_valid_until = compute_new_valid_until(previous_valid_until, delta_days, now);

        sqlx::query(
            r#"
            UPDATE licenses
            SET admin_valid_until_override = $2,
                admin_override_reason = $3,
                admin_override_by = $4,
                admin_override_at = $5,
                status = $6,
                updated_at = $5
            WHERE account_id = $1
            "#,
        )
        .bind(account_id.0)
        .bind(new_valid_until)
        .bind(reason)
        .bind(actor.user_id.0)
        .bind(now)
        .bind(LicenseStatus::Active.to_string())
        .execute(&mut *tx)
        .await?;

        let entry = OverrideAuditEntry {
            id: Uuid::new_v4(),
            account_id,
            admin_user_id: actor.user_id,
            admin_email: actor.email.clone(),
            delta_days,
            reason: reason.to_string(),
            previous_valid_until,
            new_valid_until,
            created_at: now,
        };
        AuditLog::append(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(
            account_id = %account_id,
            admin = %actor.user_id,
            delta_days = delta_days,
            new_valid_until = %new_valid_until,
            "Admin override applied"
        );

        Ok(OverrideOutcome {
            account_id,
            previous_valid_until,
            new_valid_until,
            audit_id: entry.id,
        })
    }
}
