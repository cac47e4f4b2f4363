// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared domain types for Slate
//!
//! Types used by both the licensing engine and its callers: ID wrappers,
//! the plan-tier ladder, billing cycle and license status enums, the
//! admin session object, and per-tier feature flags.

pub mod types;

pub use types::{
    AccountId, AdminSession, BillingCycle, LicenseStatus, PlanTier, TierFeatures, UserId,
};
