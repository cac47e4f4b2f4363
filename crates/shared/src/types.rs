//! Common types used across Slate

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Account ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Plan tier for licensing
///
/// Tiers form a total order used to classify a requested change as an
/// upgrade or a downgrade: Free < Budget < CostControl < Production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Budget,
    CostControl,
    Production,
}

impl Default for PlanTier {
    fn default() -> Self {
        Self::Free
    }
}

impl PlanTier {
    /// Rank within the tier ladder (higher = more capable)
    /// Free: 0, Budget: 1, CostControl: 2, Production: 3
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Budget => 1,
            Self::CostControl => 2,
            Self::Production => 3,
        }
    }

    /// Whether this tier requires a paid subscription
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    /// All tiers, in ascending rank order
    pub fn all() -> [Self; 4] {
        [Self::Free, Self::Budget, Self::CostControl, Self::Production]
    }

    /// Parse a tier from string, defaulting to Free for unknown values
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::Free)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Budget => write!(f, "budget"),
            Self::CostControl => write!(f, "cost_control"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "budget" => Ok(Self::Budget),
            "cost_control" | "costcontrol" => Ok(Self::CostControl),
            "production" => Ok(Self::Production),
            _ => Err(format!("Invalid plan tier: {}", s)),
        }
    }
}

/// Billing cycle for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    /// Not on a billing cycle (Free tier or unmanaged trial)
    None,
}

impl Default for BillingCycle {
    fn default() -> Self {
        Self::None
    }
}

impl BillingCycle {
    /// Parse a cycle from string, defaulting to None for unknown values
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::None)
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" => Ok(Self::Yearly),
            "none" => Ok(Self::None),
            _ => Err(format!("Invalid billing cycle: {}", s)),
        }
    }
}

/// License status as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// No subscription has ever existed for this account
    None,
    Trial,
    Active,
    PastDue,
    Canceled,
}

impl Default for LicenseStatus {
    fn default() -> Self {
        Self::None
    }
}

impl LicenseStatus {
    /// Parse a status from string, defaulting to None for unknown values
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(Self::None)
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Trial => write!(f, "trial"),
            Self::Active => write!(f, "active"),
            Self::PastDue => write!(f, "past_due"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for LicenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "trial" | "trialing" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid license status: {}", s)),
        }
    }
}

// =============================================================================
// Admin session
// =============================================================================

/// Authenticated administrator identity, passed explicitly into engine
/// calls rather than read from ambient global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub user_id: UserId,
    pub email: String,
}

impl AdminSession {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

// =============================================================================
// Tier features
// =============================================================================

/// Feature flags based on tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFeatures {
    /// Maximum number of active projects (u32::MAX = unlimited)
    pub max_projects: u32,
    /// Exports carry a Slate watermark
    pub watermarked_exports: bool,
    /// PDF and CSV budget export
    pub budget_export: bool,
    /// Actuals tracking against budget lines
    pub actuals_tracking: bool,
    /// Purchase-order management
    pub purchase_orders: bool,
    /// Custom budget templates
    pub custom_templates: bool,
    /// Multi-currency budgets
    pub multi_currency: bool,
    /// Priority support
    pub priority_support: bool,
}

impl TierFeatures {
    /// Get features for a tier
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                max_projects: 1,
                watermarked_exports: true,
                budget_export: false,
                actuals_tracking: false,
                purchase_orders: false,
                custom_templates: false,
                multi_currency: false,
                priority_support: false,
            },
            PlanTier::Budget => Self {
                max_projects: u32::MAX,
                watermarked_exports: false,
                budget_export: true,
                actuals_tracking: false,
                purchase_orders: false,
                custom_templates: false,
                multi_currency: false,
                priority_support: false,
            },
            PlanTier::CostControl => Self {
                max_projects: u32::MAX,
                watermarked_exports: false,
                budget_export: true,
                actuals_tracking: true,
                purchase_orders: true,
                custom_templates: false,
                multi_currency: false,
                priority_support: false,
            },
            PlanTier::Production => Self {
                max_projects: u32::MAX,
                watermarked_exports: false,
                budget_export: true,
                actuals_tracking: true,
                purchase_orders: true,
                custom_templates: true,
                multi_currency: true,
                priority_support: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_rank_order() {
        assert!(PlanTier::Free.rank() < PlanTier::Budget.rank());
        assert!(PlanTier::Budget.rank() < PlanTier::CostControl.rank());
        assert!(PlanTier::CostControl.rank() < PlanTier::Production.rank());
        // Derived Ord matches rank()
        assert!(PlanTier::Free < PlanTier::Production);
    }

    #[test]
    fn test_tier_display_roundtrip() {
        for tier in PlanTier::all() {
            let parsed: PlanTier = tier.to_string().parse().unwrap();
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn test_tier_lossy_parse_defaults_to_free() {
        assert_eq!(PlanTier::from_str_lossy("enterprise"), PlanTier::Free);
        assert_eq!(PlanTier::from_str_lossy(""), PlanTier::Free);
        assert_eq!(PlanTier::from_str_lossy("COST_CONTROL"), PlanTier::CostControl);
    }

    #[test]
    fn test_cycle_parse_accepts_annual_alias() {
        assert_eq!("annual".parse::<BillingCycle>().unwrap(), BillingCycle::Yearly);
        assert_eq!(BillingCycle::from_str_lossy("weekly"), BillingCycle::None);
    }

    #[test]
    fn test_status_parse_accepts_stripe_spellings() {
        assert_eq!("trialing".parse::<LicenseStatus>().unwrap(), LicenseStatus::Trial);
        assert_eq!("cancelled".parse::<LicenseStatus>().unwrap(), LicenseStatus::Canceled);
        assert_eq!(LicenseStatus::from_str_lossy("incomplete"), LicenseStatus::None);
    }

    #[test]
    fn test_free_tier_features() {
        let features = TierFeatures::for_tier(PlanTier::Free);
        assert_eq!(features.max_projects, 1);
        assert!(features.watermarked_exports);
        assert!(!features.actuals_tracking);
    }

    #[test]
    fn test_production_tier_features() {
        let features = TierFeatures::for_tier(PlanTier::Production);
        assert_eq!(features.max_projects, u32::MAX);
        assert!(features.multi_currency);
        assert!(features.priority_support);
    }
}
