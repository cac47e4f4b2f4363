//! Licensing error types

use slate_shared::{AccountId, PlanTier};

/// Result type for licensing operations
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Errors produced by the licensing engine
///
/// Validation failures are deliberately distinct variants from persistence
/// failures: validation failures are not retryable without new input, while
/// persistence failures are.
#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    /// An admin override without a reason is unauditable, so this is a hard
    /// validation failure rejected before any write.
    #[error("Override reason must be a non-empty string")]
    MissingOverrideReason,

    /// A scheduled downgrade target must rank strictly below the current tier
    #[error("Scheduled change target '{requested}' does not rank below current tier '{current}'")]
    ScheduledChangeRankViolation {
        current: PlanTier,
        requested: PlanTier,
    },

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    /// Database error (from sqlx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LicenseError {
    /// Whether retrying the operation without new input can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_not_retryable() {
        assert!(!LicenseError::MissingOverrideReason.is_retryable());
        assert!(!LicenseError::ScheduledChangeRankViolation {
            current: PlanTier::Budget,
            requested: PlanTier::Budget,
        }
        .is_retryable());
    }

    #[test]
    fn test_database_errors_retryable() {
        assert!(LicenseError::Database(sqlx::Error::PoolTimedOut).is_retryable());
    }
}
