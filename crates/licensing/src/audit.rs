//! Override audit log
//!
//! Append-only trail of admin validity-date adjustments. Entries are never
//! mutated or deleted by this engine. Inserts happen inside the same
//! transaction as the license write so an override can never land without
//! its audit row.

use serde::Serialize;
use slate_shared::{AccountId, UserId};
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::LicenseResult;

/// One audit-log row for an applied override
#[derive(Debug, Clone, Serialize)]
pub struct OverrideAuditEntry {
    pub id: Uuid,
    pub account_id: AccountId,
    pub admin_user_id: UserId,
    pub admin_email: String,
    pub delta_days: i64,
    pub reason: String,
    pub previous_valid_until: Option<OffsetDateTime>,
    pub new_valid_until: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OverrideAuditEntry {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let account_id: Uuid = row.try_get("account_id")?;
        let admin_user_id: Uuid = row.try_get("admin_user_id")?;
        Ok(Self {
            id: row.try_get("id")?,
            account_id: AccountId(account_id),
            admin_user_id: UserId(admin_user_id),
            admin_email: row.try_get("admin_email")?,
            delta_days: row.try_get("delta_days")?,
            reason: row.try_get("reason")?,
            previous_valid_until: row.try_get("previous_valid_until")?,
            new_valid_until: row.try_get("new_valid_until")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Audit log over the `license_override_audit` table
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: PgPool,
}

impl AuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry within an open transaction
    ///
    /// Takes a connection rather than the pool so the caller controls
    /// atomicity with the license write.
    pub async fn append(
        conn: &mut PgConnection,
        entry: &OverrideAuditEntry,
    ) -> LicenseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO license_override_audit
                (id, account_id, admin_user_id, admin_email, delta_days, reason,
                 previous_valid_until, new_valid_until, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.account_id.0)
        .bind(entry.admin_user_id.0)
        .bind(&entry.admin_email)
        .bind(entry.delta_days)
        .bind(&entry.reason)
        .bind(entry.previous_valid_until)
        .bind(entry.new_valid_until)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// List audit entries for an account, newest first
    pub async fn list_for_account(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> LicenseResult<Vec<OverrideAuditEntry>> {
        let entries: Vec<OverrideAuditEntry> = sqlx::query_as(
            r#"
            SELECT id, account_id, admin_user_id, admin_email, delta_days, reason,
                   previous_valid_until, new_valid_until, created_at
            FROM license_override_audit
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
