//! License state resolution
//!
//! Provides a unified view of what an account can do based on its license
//! state. This module answers the question: "What can this account do right
//! now?"
//!
//! ## Design Principles
//!
//! 1. **Single Source of Truth**: `resolve()` is THE function that reconciles
//!    the overlapping fields of a raw record into one consistent view
//! 2. **Total**: every input, including a missing record and partially
//!    populated rows, produces a view; there is no error path
//! 3. **Deterministic**: same inputs always produce same outputs
//! 4. **Pure**: no clock reads, no I/O; time-dependent questions are helper
//!    methods on the view that take `now` explicitly

use serde::{Deserialize, Serialize};
use slate_shared::{BillingCycle, LicenseStatus, PlanTier, TierFeatures};
use time::OffsetDateTime;

use crate::record::RawLicenseRecord;

/// Effective, internally-consistent license view
///
/// Derived on every read, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveLicenseView {
    pub tier: PlanTier,
    pub cycle: BillingCycle,
    pub status: LicenseStatus,
    /// Single resolved expiry date. `None` is unbounded for the Free tier
    /// and expired for any other tier.
    pub effective_valid_until: Option<OffsetDateTime>,
    pub is_processor_managed: bool,
    pub has_scheduled_change: bool,
    /// Feature flags for the effective tier
    pub features: TierFeatures,
}

impl EffectiveLicenseView {
    /// Whether access has lapsed as of `now`
    ///
    /// `None` validity is unbounded for Free and already-expired for paid
    /// tiers (a paid tier with no resolvable expiry has nothing vouching
    /// for it).
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        match self.effective_valid_until {
            Some(until) => until <= now,
            None => self.tier != PlanTier::Free,
        }
    }

    /// Whole days of access remaining as of `now`, for "days left" badges
    ///
    /// `None` when there is no bounded expiry; zero when already expired.
    pub fn days_left(&self, now: OffsetDateTime) -> Option<i64> {
        let until = self.effective_valid_until?;
        let remaining = until - now;
        Some(remaining.whole_days().max(0))
    }
}

/// Format check for a processor-managed subscription identifier
///
/// This is a shape check ("sub_" prefix with a non-empty suffix), not an
/// existence check against the processor. Records written before checkout
/// completes can carry empty or placeholder ids; those are not managed.
pub fn is_processor_subscription_id(id: &str) -> bool {
    id.strip_prefix("sub_").is_some_and(|rest| !rest.is_empty())
}

/// Resolve a raw record (or its absence) into an effective license view
///
/// The precedence order for `effective_valid_until` is load-bearing and
/// must not be reordered: a processor-managed record's admin override may
/// be stale (set before the subscription existed) and must never shadow a
/// live billing date.
///
/// 1. Processor-managed -> `current_period_end`
/// 2. Trial -> `trial_ends_at`
/// 3. Otherwise -> `admin_valid_until_override`
pub fn resolve(record: Option<&RawLicenseRecord>) -> EffectiveLicenseView {
    let Some(record) = record else {
        // No record at all is an implicit Free account, never an error
        return EffectiveLicenseView {
            tier: PlanTier::Free,
            cycle: BillingCycle::None,
            status: LicenseStatus::None,
            effective_valid_until: None,
            is_processor_managed: false,
            has_scheduled_change: false,
            features: TierFeatures::for_tier(PlanTier::Free),
        };
    };

    let is_processor_managed = record
        .external_subscription_id
        .as_deref()
        .is_some_and(is_processor_subscription_id);

    let effective_valid_until = if is_processor_managed {
        record.current_period_end
    } else if record.status == LicenseStatus::Trial {
        record.trial_ends_at
    } else {
        record.admin_valid_until_override
    };

    EffectiveLicenseView {
        tier: record.plan_tier,
        cycle: record.billing_cycle,
        status: record.status,
        effective_valid_until,
        is_processor_managed,
        has_scheduled_change: record.pending_downgrade_plan.is_some(),
        features: TierFeatures::for_tier(record.plan_tier),
    }
}
