//! Transition planning
//!
//! Decides which action is legal when a customer requests a plan or cycle
//! change. The tie-breaks all follow one rule: any change that could reduce
//! processor revenue before the customer has consumed the already-paid
//! period is deferred to renewal; any change that is revenue-neutral or
//! positive, or happens on a not-yet-paying account, is immediate.

use serde::{Deserialize, Serialize};
use slate_shared::{BillingCycle, PlanTier};

use crate::resolver::EffectiveLicenseView;

/// Legal action for a requested (tier, cycle) change
///
/// Closed set: callers match exhaustively and route each case to the
/// external flow that handles it (hosted checkout, self-service portal, or
/// an internal schedule-change request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum TransitionAction {
    /// Requested tier and cycle exactly match current; nothing to offer
    NoOp,
    /// Not processor-managed: route straight to external checkout
    DirectPurchase,
    /// Takes effect now via the processor's self-service portal
    ImmediateUpgrade,
    /// Recorded now, takes effect at next renewal, never immediately
    ScheduledDowngrade,
    /// Same tier, monthly -> yearly: longer prepaid cycle, handled
    /// immediately via the portal
    ImmediateCycleSwitchUp,
    /// Identical to current plan; rendered as an inert control, never
    /// hidden, so customers can see what they already have
    Disabled,
}

impl TransitionAction {
    /// Collapse `Disabled` into `NoOp` for callers that hide the control
    /// instead of rendering it inert
    pub fn collapse_hidden(self) -> Self {
        match self {
            Self::Disabled => Self::NoOp,
            other => other,
        }
    }

    /// Whether this action defers to the next renewal boundary
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::ScheduledDowngrade)
    }
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOp => write!(f, "no_op"),
            Self::DirectPurchase => write!(f, "direct_purchase"),
            Self::ImmediateUpgrade => write!(f, "immediate_upgrade"),
            Self::ScheduledDowngrade => write!(f, "scheduled_downgrade"),
            Self::ImmediateCycleSwitchUp => write!(f, "immediate_cycle_switch_up"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Plan the legal action for a requested (tier, cycle) change
///
/// First match wins:
/// 1. exact match -> `Disabled`
/// 2. not processor-managed -> `DirectPurchase`
/// 3. same tier, yearly -> monthly -> `ScheduledDowngrade`
/// 4. same tier, monthly -> yearly -> `ImmediateCycleSwitchUp`
/// 5. tier rank increases -> `ImmediateUpgrade` (cycle irrelevant)
/// 6. tier rank decreases -> `ScheduledDowngrade` (any cycle)
pub fn plan(
    current: &EffectiveLicenseView,
    requested_tier: PlanTier,
    requested_cycle: BillingCycle,
) -> TransitionAction {
    if requested_tier == current.tier && requested_cycle == current.cycle {
        return TransitionAction::Disabled;
    }

    // Free accounts and unmanaged trials go straight to checkout; there is
    // no live subscription to modify through the portal.
    if !current.is_processor_managed {
        return TransitionAction::DirectPurchase;
    }

    if requested_tier == current.tier {
        return match (current.cycle, requested_cycle) {
            (BillingCycle::Yearly, BillingCycle::Monthly) => TransitionAction::ScheduledDowngrade,
            (BillingCycle::Monthly, BillingCycle::Yearly) => {
                TransitionAction::ImmediateCycleSwitchUp
            }
            // A managed record with cycle `none` on either side is a data
            // anomaly; offer no action rather than guess at revenue impact.
            _ => TransitionAction::Disabled,
        };
    }

    if requested_tier.rank() > current.tier.rank() {
        TransitionAction::ImmediateUpgrade
    } else {
        TransitionAction::ScheduledDowngrade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::record::RawLicenseRecord;
    use slate_shared::{AccountId, LicenseStatus};
    use time::{Duration, OffsetDateTime};

    fn managed_view(tier: PlanTier, cycle: BillingCycle) -> EffectiveLicenseView {
        let mut record = RawLicenseRecord::new_free(AccountId::new());
        record.plan_tier = tier;
        record.billing_cycle = cycle;
        record.status = LicenseStatus::Active;
        record.external_subscription_id = Some("sub_1GqL9xZvK".to_string());
        record.current_period_end = Some(OffsetDateTime::now_utc() + Duration::days(30));
        resolve(Some(&record))
    }

    #[test]
    fn test_exact_match_is_disabled() {
        let current = managed_view(PlanTier::Budget, BillingCycle::Yearly);
        let action = plan(&current, PlanTier::Budget, BillingCycle::Yearly);
        assert_eq!(action, TransitionAction::Disabled);
        assert_eq!(action.collapse_hidden(), TransitionAction::NoOp);
    }

    #[test]
    fn test_free_account_goes_to_checkout() {
        let current = resolve(None);
        for tier in [PlanTier::Budget, PlanTier::CostControl, PlanTier::Production] {
            for cycle in [BillingCycle::Monthly, BillingCycle::Yearly] {
                assert_eq!(plan(&current, tier, cycle), TransitionAction::DirectPurchase);
            }
        }
    }

    #[test]
    fn test_unmanaged_trial_goes_to_checkout() {
        let mut record = RawLicenseRecord::new_free(AccountId::new());
        record.plan_tier = PlanTier::CostControl;
        record.status = LicenseStatus::Trial;
        record.trial_ends_at = Some(OffsetDateTime::now_utc() + Duration::days(7));
        let current = resolve(Some(&record));

        let action = plan(&current, PlanTier::CostControl, BillingCycle::Yearly);
        assert_eq!(action, TransitionAction::DirectPurchase);
    }

    #[test]
    fn test_rank_monotonicity_for_managed_upgrades() {
        for current_tier in PlanTier::all() {
            for requested_tier in PlanTier::all() {
                if requested_tier.rank() <= current_tier.rank() {
                    continue;
                }
                for cycle in [BillingCycle::Monthly, BillingCycle::Yearly] {
                    let current = managed_view(current_tier, BillingCycle::Monthly);
                    assert_eq!(
                        plan(&current, requested_tier, cycle),
                        TransitionAction::ImmediateUpgrade,
                        "{current_tier} -> {requested_tier} ({cycle}) must be an immediate upgrade"
                    );
                }
            }
        }
    }

    #[test]
    fn test_downgrades_are_never_immediate() {
        // Tier rank decrease, any cycle
        for current_tier in PlanTier::all() {
            for requested_tier in PlanTier::all() {
                if requested_tier.rank() >= current_tier.rank() {
                    continue;
                }
                for cycle in [BillingCycle::Monthly, BillingCycle::Yearly, BillingCycle::None] {
                    let current = managed_view(current_tier, BillingCycle::Yearly);
                    let action = plan(&current, requested_tier, cycle);
                    assert_eq!(action, TransitionAction::ScheduledDowngrade);
                    assert!(action.is_deferred());
                }
            }
        }

        // Same tier, yearly -> monthly
        let current = managed_view(PlanTier::Production, BillingCycle::Yearly);
        let action = plan(&current, PlanTier::Production, BillingCycle::Monthly);
        assert_eq!(action, TransitionAction::ScheduledDowngrade);
    }

    #[test]
    fn test_cycle_switch_up_is_immediate() {
        let current = managed_view(PlanTier::CostControl, BillingCycle::Monthly);
        let action = plan(&current, PlanTier::CostControl, BillingCycle::Yearly);
        assert_eq!(action, TransitionAction::ImmediateCycleSwitchUp);
    }

    #[test]
    fn test_managed_none_cycle_offers_nothing_at_same_tier() {
        let current = managed_view(PlanTier::Budget, BillingCycle::None);
        assert_eq!(
            plan(&current, PlanTier::Budget, BillingCycle::Monthly),
            TransitionAction::Disabled
        );
        assert_eq!(
            plan(&current, PlanTier::Budget, BillingCycle::Yearly),
            TransitionAction::Disabled
        );
    }

    #[test]
    fn test_upgrade_ignores_cycle_direction() {
        // Budget yearly -> Production monthly is still an upgrade even
        // though the cycle gets shorter
        let current = managed_view(PlanTier::Budget, BillingCycle::Yearly);
        assert_eq!(
            plan(&current, PlanTier::Production, BillingCycle::Monthly),
            TransitionAction::ImmediateUpgrade
        );
    }

    #[test]
    fn test_spec_end_to_end_example() {
        // Budget/yearly, processor-managed, active
        let current = managed_view(PlanTier::Budget, BillingCycle::Yearly);

        assert_eq!(
            plan(&current, PlanTier::Production, BillingCycle::Yearly),
            TransitionAction::ImmediateUpgrade
        );
        assert_eq!(
            plan(&current, PlanTier::Budget, BillingCycle::Monthly),
            TransitionAction::ScheduledDowngrade
        );
        assert_eq!(
            plan(&current, PlanTier::Budget, BillingCycle::Yearly),
            TransitionAction::Disabled
        );
    }
}
