// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Slate Licensing Engine
//!
//! Turns several partially-overlapping, sometimes-stale data sources
//! (payment-processor fields, trial window, admin manual override,
//! scheduled future change) into one authoritative "what can this account
//! do right now" answer, and decides which action is legal when a customer
//! requests a plan or billing-cycle change.
//!
//! ## Components
//!
//! - **Resolver** (`resolver`): pure. Raw record to effective view
//! - **Planner** (`planner`): pure. Effective view + requested plan to a
//!   legal transition action
//! - **Override manager** (`overrides`): stateful. Audited manual
//!   validity-date adjustments
//! - **Reconciler** (`reconciler`): time-driven. Bounded polling after an
//!   external checkout/portal redirect
//!
//! The engine is a library consumed by thin callers; it owns no wire format
//! and never talks to the payment processor.

pub mod audit;
pub mod error;
pub mod overrides;
pub mod planner;
pub mod reconciler;
pub mod record;
pub mod resolver;
pub mod store;


// Audit
pub use audit::{AuditLog, OverrideAuditEntry};

// Error
pub use error::{LicenseError, LicenseResult};

// Overrides
pub use overrides::{AdminOverrideManager, OverrideOutcome};

// Planner
pub use planner::{plan, TransitionAction};

// Reconciler
pub use reconciler::{
    CheckoutReconciler, CheckoutReturnSignal, ReconcilerConfig, RecordSource, SyncOutcome,
};

// Record
pub use record::{RawLicenseRecord, ScheduledChangeAnomaly};

// Resolver
pub use resolver::{is_processor_subscription_id, resolve, EffectiveLicenseView};

// Store
pub use store::LicenseStore;

use sqlx::PgPool;

/// Main licensing service that combines the stateful components
///
/// The pure components (`resolve`, `plan`) are free functions and need no
/// service handle.
pub struct LicensingService {
    pub overrides: AdminOverrideManager,
    pub store: LicenseStore,
    pub audit: AuditLog,
    pub reconciler: CheckoutReconciler,
}

impl LicensingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            overrides: AdminOverrideManager::new(pool.clone()),
            store: LicenseStore::new(pool.clone()),
            audit: AuditLog::new(pool),
            reconciler: CheckoutReconciler::default(),
        }
    }

    /// Create a service with a non-default reconciler polling policy
    pub fn with_reconciler_config(pool: PgPool, config: ReconcilerConfig) -> Self {
        let mut service = Self::new(pool);
        service.reconciler = CheckoutReconciler::new(config);
        service
    }
}
