//! Post-checkout reconciliation
//!
//! The payment processor's webhook delivery is asynchronous relative to the
//! customer's browser redirect, so after a checkout or portal return the UI
//! has nothing to wait on except its own resolved state. The reconciler
//! re-fetches and re-resolves the license record on a fixed interval until
//! the backend update is observed, the attempt budget runs out, or the view
//! that started it is torn down.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slate_shared::{AccountId, BillingCycle, LicenseStatus, PlanTier};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LicenseResult;
use crate::record::RawLicenseRecord;
use crate::resolver::{self, EffectiveLicenseView};

/// Parsed post-checkout return signal
///
/// Built from the redirect URL's query string. Holding one is the marker
/// that polling should run; `CheckoutReconciler::run` consumes it by value,
/// so re-entering the page without a fresh redirect cannot restart polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutReturnSignal {
    /// Tier the customer checked out for, when the redirect carries it
    pub tier: Option<PlanTier>,
    pub cycle: Option<BillingCycle>,
    /// Processor-issued session identifier, used downstream as a
    /// project-name correlation token
    pub session_id: Option<String>,
}

impl CheckoutReturnSignal {
    /// Parse a redirect query string, e.g. `checkout=success&tier=budget`
    ///
    /// Returns `None` unless the query carries a success marker
    /// (`checkout=success` or `stripe_success=true`). Unrelated parameters
    /// are ignored.
    pub fn from_query(query: &str) -> Option<Self> {
        let mut success = false;
        let mut tier = None;
        let mut cycle = None;
        let mut session_id = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "checkout" if value == "success" => success = true,
                "stripe_success" if value == "true" => success = true,
                "tier" => tier = value.parse::<PlanTier>().ok(),
                "cycle" => cycle = value.parse::<BillingCycle>().ok(),
                "session_id" => session_id = Some(value.into_owned()),
                _ => {}
            }
        }

        success.then_some(Self {
            tier,
            cycle,
            session_id,
        })
    }
}

/// Where the reconciliation loop ended up
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The backend update was observed
    Settled(EffectiveLicenseView),
    /// Attempt budget exhausted; the UI should surface "still syncing"
    TimedOut,
    /// The owning view was torn down before settling
    Cancelled,
}

/// Source of fresh license records, implemented by the persistence layer
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, account_id: AccountId) -> LicenseResult<Option<RawLicenseRecord>>;
}

/// Polling policy for the reconciler
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    /// Hard upper bound on polls; exceeding it yields `SyncOutcome::TimedOut`
    pub max_attempts: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Whether a fetched record shows the checkout/portal action has landed
///
/// Settled means either the subscription is processor-managed and active
/// (a purchase or upgrade went through) or a cancellation has been
/// acknowledged via `cancel_at_period_end`.
pub fn is_settled(record: &RawLicenseRecord) -> bool {
    let view = resolver::resolve(Some(record));
    (view.is_processor_managed && view.status == LicenseStatus::Active)
        || record.cancel_at_period_end
}

/// Cancellable polling loop over a [`RecordSource`]
pub struct CheckoutReconciler {
    config: ReconcilerConfig,
}

impl CheckoutReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Poll until the post-checkout state settles
    ///
    /// Consumes the return signal so the marker cannot trigger a second
    /// loop. Fetch errors count against the attempt budget rather than
    /// aborting; a transient read failure during webhook races is expected.
    pub async fn run<S: RecordSource>(
        &self,
        signal: CheckoutReturnSignal,
        account_id: AccountId,
        source: &S,
        cancel: &CancellationToken,
    ) -> SyncOutcome {
        info!(
            account_id = %account_id,
            tier = ?signal.tier,
            session_id = ?signal.session_id,
            "Reconciling post-checkout license state"
        );

        for attempt in 1..=self.config.max_attempts {
            if cancel.is_cancelled() {
                return SyncOutcome::Cancelled;
            }

            match source.fetch(account_id).await {
                Ok(Some(record)) if is_settled(&record) => {
                    let view = resolver::resolve(Some(&record));
                    info!(
                        account_id = %account_id,
                        attempt = attempt,
                        tier = %view.tier,
                        status = %view.status,
                        "License state settled"
                    );
                    return SyncOutcome::Settled(view);
                }
                Ok(_) => {
                    debug!(account_id = %account_id, attempt = attempt, "Not yet settled");
                }
                Err(e) => {
                    warn!(
                        account_id = %account_id,
                        attempt = attempt,
                        error = %e,
                        "Record fetch failed during reconciliation"
                    );
                }
            }

            if attempt == self.config.max_attempts {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => return SyncOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        warn!(
            account_id = %account_id,
            attempts = self.config.max_attempts,
            "Reconciliation timed out; backend update not observed"
        );
        SyncOutcome::TimedOut
    }
}

impl Default for CheckoutReconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}
