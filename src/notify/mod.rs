//! Notification sink
//!
//! One-way "inform user" events emitted by the loan engine. Writes are
//! fire-and-forget from the caller's point of view: a failed insert is
//! logged and never fails the business operation that triggered it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Notification kinds emitted by the loan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    LoanRequest,
    LoanDecision,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::LoanRequest => "LOAN_REQUEST",
            NotificationKind::LoanDecision => "LOAN_DECISION",
        }
    }
}

/// A stored notification, as returned to its recipient.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Service for writing and reading notifications.
#[derive(Debug, Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Notify the configured admin target about a new loan request.
    pub async fn loan_requested(
        &self,
        to_user: Uuid,
        loan_id: Uuid,
        applicant: Uuid,
        applicant_name: &str,
        amount: Decimal,
        months: i32,
        apr: Decimal,
        purpose: &str,
    ) -> Result<(), sqlx::Error> {
        let message = format!(
            "{} requests {} over {} months ({}% APR)",
            applicant_name, amount, months, apr
        );
        let meta = json!({
            "loanId": loan_id,
            "applicant": applicant,
            "amount": amount,
            "months": months,
            "interestAPR": apr,
            "purpose": purpose,
        });

        self.insert(
            to_user,
            NotificationKind::LoanRequest,
            "New loan request",
            &message,
            meta,
        )
        .await
    }

    /// Notify the applicant about a loan decision.
    pub async fn loan_decided(
        &self,
        to_user: Uuid,
        loan_id: Uuid,
        approved: bool,
        monthly_payment: Decimal,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let message = if approved {
            format!(
                "Your loan has been approved; monthly payment {}",
                monthly_payment
            )
        } else {
            match reason {
                Some(reason) => format!("Your loan has been rejected ({})", reason),
                None => "Your loan has been rejected".to_string(),
            }
        };
        let meta = json!({
            "loanId": loan_id,
            "status": if approved { "APPROVED" } else { "REJECTED" },
        });

        self.insert(
            to_user,
            NotificationKind::LoanDecision,
            "Loan decision",
            &message,
            meta,
        )
        .await
    }

    async fn insert(
        &self,
        to_user: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        meta: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, to_user, kind, title, message, read, meta)
            VALUES ($1, $2, $3, $4, $5, false, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(to_user)
        .bind(kind.as_str())
        .bind(title)
        .bind(message)
        .bind(meta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Latest notifications for a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, sqlx::Error> {
        let rows: Vec<(
            Uuid,
            String,
            String,
            String,
            bool,
            serde_json::Value,
            DateTime<Utc>,
        )> = sqlx::query_as(
            r#"
            SELECT id, kind, title, message, read, meta, created_at
            FROM notifications
            WHERE to_user = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, kind, title, message, read, meta, created_at)| Notification {
                    id,
                    kind,
                    title,
                    message,
                    read,
                    meta,
                    created_at,
                },
            )
            .collect())
    }

    /// Mark one of the user's notifications as read. Returns false when the
    /// notification does not exist or belongs to someone else.
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = true WHERE id = $1 AND to_user = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(NotificationKind::LoanRequest.as_str(), "LOAN_REQUEST");
        assert_eq!(NotificationKind::LoanDecision.as_str(), "LOAN_DECISION");
    }
}
