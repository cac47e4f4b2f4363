//! Raw license records as persisted
//!
//! One row per account, mutated by processor webhooks (out of scope), the
//! admin override manager, and the scheduling job that applies pending
//! changes at renewal (out of scope). Never deleted except with the account.

use serde::{Deserialize, Serialize};
use slate_shared::{AccountId, BillingCycle, LicenseStatus, PlanTier, UserId};
use time::OffsetDateTime;

/// A license row exactly as persisted
///
/// Fields partially overlap and can be stale relative to each other (an
/// admin override set before a subscription existed, for example). The
/// resolver is the only place allowed to reconcile them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLicenseRecord {
    pub account_id: AccountId,
    pub plan_tier: PlanTier,
    pub billing_cycle: BillingCycle,
    pub status: LicenseStatus,
    /// Presence implies the record is under payment-processor management
    pub external_subscription_id: Option<String>,
    pub external_customer_id: Option<String>,
    pub cancel_at_period_end: bool,
    /// Authoritative expiry while the subscription is processor-managed
    pub current_period_end: Option<OffsetDateTime>,
    pub trial_ends_at: Option<OffsetDateTime>,
    pub admin_valid_until_override: Option<OffsetDateTime>,
    pub admin_override_reason: Option<String>,
    pub admin_override_by: Option<UserId>,
    pub admin_override_at: Option<OffsetDateTime>,
    pub pending_downgrade_plan: Option<PlanTier>,
    pub pending_downgrade_cycle: Option<BillingCycle>,
    pub pending_downgrade_at: Option<OffsetDateTime>,
}

impl RawLicenseRecord {
    /// Signup-shaped record: Free, no cycle, no dates
    pub fn new_free(account_id: AccountId) -> Self {
        Self {
            account_id,
            plan_tier: PlanTier::Free,
            billing_cycle: BillingCycle::None,
            status: LicenseStatus::None,
            external_subscription_id: None,
            external_customer_id: None,
            cancel_at_period_end: false,
            current_period_end: None,
            trial_ends_at: None,
            admin_valid_until_override: None,
            admin_override_reason: None,
            admin_override_by: None,
            admin_override_at: None,
            pending_downgrade_plan: None,
            pending_downgrade_cycle: None,
            pending_downgrade_at: None,
        }
    }

    /// Detect a rank-violating scheduled downgrade
    ///
    /// A pending "downgrade" whose target ranks equal to or above the
    /// current tier is a data error, not a valid state. The write path
    /// rejects it; this read-side check surfaces rows that predate that
    /// validation or were written by another collaborator.
    pub fn scheduled_change_anomaly(&self) -> Option<ScheduledChangeAnomaly> {
        let target = self.pending_downgrade_plan?;
        if target.rank() >= self.plan_tier.rank() {
            Some(ScheduledChangeAnomaly {
                current_tier: self.plan_tier,
                target_tier: target,
            })
        } else {
            None
        }
    }
}

/// A pending downgrade that does not actually rank below the current tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledChangeAnomaly {
    pub current_tier: PlanTier,
    pub target_tier: PlanTier,
}

// Boundary decoding: enum columns arrive as VARCHAR and are parsed with
// lossy defaulting (unknown tier -> Free, unknown status/cycle -> None) so
// a malformed row can never make the resolver partial.
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for RawLicenseRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let plan_tier: String = row.try_get("plan_tier")?;
        let billing_cycle: String = row.try_get("billing_cycle")?;
        let status: String = row.try_get("status")?;
        let pending_plan: Option<String> = row.try_get("pending_downgrade_plan")?;
        let pending_cycle: Option<String> = row.try_get("pending_downgrade_cycle")?;
        let admin_override_by: Option<uuid::Uuid> = row.try_get("admin_override_by")?;
        let account_id: uuid::Uuid = row.try_get("account_id")?;

        Ok(Self {
            account_id: AccountId(account_id),
            plan_tier: PlanTier::from_str_lossy(&plan_tier),
            billing_cycle: BillingCycle::from_str_lossy(&billing_cycle),
            status: LicenseStatus::from_str_lossy(&status),
            external_subscription_id: row.try_get("external_subscription_id")?,
            external_customer_id: row.try_get("external_customer_id")?,
            cancel_at_period_end: row.try_get("cancel_at_period_end")?,
            current_period_end: row.try_get("current_period_end")?,
            trial_ends_at: row.try_get("trial_ends_at")?,
            admin_valid_until_override: row.try_get("admin_valid_until_override")?,
            admin_override_reason: row.try_get("admin_override_reason")?,
            admin_override_by: admin_override_by.map(UserId),
            admin_override_at: row.try_get("admin_override_at")?,
            pending_downgrade_plan: pending_plan.as_deref().map(PlanTier::from_str_lossy),
            pending_downgrade_cycle: pending_cycle.as_deref().map(BillingCycle::from_str_lossy),
            pending_downgrade_at: row.try_get("pending_downgrade_at")?,
        })
    }
}
