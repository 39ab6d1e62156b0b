//! Loan Handler
//!
//! Loan requests and the admin approval workflow. A loan is a small state
//! machine: PENDING -> APPROVED | REJECTED, transitioned at most once. The
//! decision runs under a row lock so two concurrent decisions cannot both
//! pass the PENDING check.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{loan_terms, Amount};
use crate::error::AppError;
use crate::ledger::LedgerStore;
use crate::notify::NotificationService;

use super::{DecideLoanCommand, LoanAction, RequestLoanCommand};

/// Loan lifecycle status. CANCELLED is declared for completeness but no
/// operation currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(LoanStatus::Pending),
            "APPROVED" => Some(LoanStatus::Approved),
            "REJECTED" => Some(LoanStatus::Rejected),
            "CANCELLED" => Some(LoanStatus::Cancelled),
            _ => None,
        }
    }
}

/// Full loan view, as stored
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    pub id: Uuid,
    pub applicant: Uuid,
    pub amount: Decimal,
    pub months: i32,
    pub purpose: String,
    pub status: LoanStatus,
    pub interest_apr: Decimal,
    pub monthly_payment: Decimal,
    pub total_to_pay: Decimal,
    pub remaining_to_pay: Decimal,
    pub started_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

const LOAN_COLUMNS: &str = "id, applicant, amount, months, purpose, status, interest_apr, \
     monthly_payment, total_to_pay, remaining_to_pay, started_at, decided_at, decided_by, \
     decision_reason, created_at";

type LoanTuple = (
    Uuid,
    Uuid,
    Decimal,
    i32,
    String,
    String,
    Decimal,
    Decimal,
    Decimal,
    Decimal,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<Uuid>,
    Option<String>,
    DateTime<Utc>,
);

fn loan_from_tuple(row: LoanTuple) -> LoanView {
    let (
        id,
        applicant,
        amount,
        months,
        purpose,
        status,
        interest_apr,
        monthly_payment,
        total_to_pay,
        remaining_to_pay,
        started_at,
        decided_at,
        decided_by,
        decision_reason,
        created_at,
    ) = row;
    LoanView {
        id,
        applicant,
        amount,
        months,
        purpose,
        status: LoanStatus::parse(&status).unwrap_or(LoanStatus::Pending),
        interest_apr,
        monthly_payment,
        total_to_pay,
        remaining_to_pay,
        started_at,
        decided_at,
        decided_by,
        decision_reason,
        created_at,
    }
}

/// Handler for the loan workflow
pub struct LoanHandler {
    pool: PgPool,
    ledger: LedgerStore,
    notifier: NotificationService,
}

impl LoanHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool.clone()),
            notifier: NotificationService::new(pool.clone()),
            pool,
        }
    }

    /// Create a PENDING loan request with precomputed repayment figures.
    ///
    /// `notify_target` is the configured admin recipient for the request
    /// notification; when unset, the request is still created.
    pub async fn request(
        &self,
        command: RequestLoanCommand,
        user_id: Uuid,
        notify_target: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        let amount = Amount::new(command.amount)?;

        if command.months <= 0 {
            return Err(AppError::InvalidRequest(
                "Term must be a positive number of months".to_string(),
            ));
        }
        if command.apr < Decimal::ZERO {
            return Err(AppError::InvalidRequest("APR cannot be negative".to_string()));
        }
        let purpose = command.purpose.trim().to_string();
        if purpose.is_empty() {
            return Err(AppError::InvalidRequest(
                "Loan purpose is required".to_string(),
            ));
        }

        // A requester without an active main account has nothing to disburse to
        self.ledger
            .find_main_account(user_id)
            .await?
            .ok_or(AppError::NoMainAccount)?;

        let terms = loan_terms(amount.value(), command.months as u32, command.apr);

        let loan_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO loans (
                id, applicant, amount, months, purpose, status,
                interest_apr, monthly_payment, total_to_pay, remaining_to_pay
            )
            VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $7, $8, $8)
            "#,
        )
        .bind(loan_id)
        .bind(user_id)
        .bind(amount.value())
        .bind(command.months)
        .bind(&purpose)
        .bind(command.apr)
        .bind(terms.monthly_payment)
        .bind(terms.total_to_pay)
        .execute(&self.pool)
        .await?;

        if let Some(admin_id) = notify_target {
            let applicant_name = self
                .ledger
                .owner_display_name(user_id)
                .await?
                .unwrap_or_else(|| "A user".to_string());

            if let Err(e) = self
                .notifier
                .loan_requested(
                    admin_id,
                    loan_id,
                    user_id,
                    &applicant_name,
                    amount.value(),
                    command.months,
                    command.apr,
                    &purpose,
                )
                .await
            {
                tracing::warn!(loan_id = %loan_id, "Failed to notify admin of loan request: {}", e);
            }
        } else {
            tracing::warn!(loan_id = %loan_id, "ADMIN_NOTIFY_USER_ID not set; skipping loan request notification");
        }

        Ok(loan_id)
    }

    /// Decide a PENDING loan. The transition happens at most once; a second
    /// decision fails with a conflict and leaves the first one untouched.
    pub async fn decide(
        &self,
        loan_id: Uuid,
        command: DecideLoanCommand,
        admin_id: Uuid,
    ) -> Result<LoanView, AppError> {
        let mut tx = self.pool.begin().await?;

        let loan = Self::lock_loan(&mut tx, loan_id).await?;

        if loan.status != LoanStatus::Pending {
            return Err(AppError::LoanAlreadyDecided);
        }

        let updated = match command.action {
            LoanAction::Approve => {
                let apr = match command.apr {
                    Some(apr) if apr < Decimal::ZERO => {
                        return Err(AppError::InvalidRequest("APR cannot be negative".to_string()))
                    }
                    Some(apr) => apr,
                    None => loan.interest_apr,
                };

                let terms = loan_terms(loan.amount, loan.months as u32, apr);

                // A loan with repayments in flight keeps its remaining figure;
                // otherwise it starts at the recomputed total.
                let remaining = if loan.remaining_to_pay > Decimal::ZERO
                    && loan.remaining_to_pay != loan.total_to_pay
                {
                    loan.remaining_to_pay
                } else {
                    terms.total_to_pay
                };

                let row: LoanTuple = sqlx::query_as(&format!(
                    r#"
                    UPDATE loans
                    SET status = 'APPROVED',
                        interest_apr = $2,
                        monthly_payment = $3,
                        total_to_pay = $4,
                        remaining_to_pay = $5,
                        started_at = NOW(),
                        decided_at = NOW(),
                        decided_by = $6,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING {LOAN_COLUMNS}
                    "#
                ))
                .bind(loan_id)
                .bind(apr)
                .bind(terms.monthly_payment)
                .bind(terms.total_to_pay)
                .bind(remaining)
                .bind(admin_id)
                .fetch_one(&mut *tx)
                .await?;

                loan_from_tuple(row)
            }
            LoanAction::Reject => {
                let row: LoanTuple = sqlx::query_as(&format!(
                    r#"
                    UPDATE loans
                    SET status = 'REJECTED',
                        decided_at = NOW(),
                        decided_by = $2,
                        decision_reason = $3,
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING {LOAN_COLUMNS}
                    "#
                ))
                .bind(loan_id)
                .bind(admin_id)
                .bind(command.reason.as_deref().unwrap_or(""))
                .fetch_one(&mut *tx)
                .await?;

                loan_from_tuple(row)
            }
        };

        tx.commit().await?;

        let approved = updated.status == LoanStatus::Approved;
        if let Err(e) = self
            .notifier
            .loan_decided(
                updated.applicant,
                updated.id,
                approved,
                updated.monthly_payment,
                updated.decision_reason.as_deref().filter(|r| !r.is_empty()),
            )
            .await
        {
            tracing::warn!(loan_id = %loan_id, "Failed to notify applicant of decision: {}", e);
        }

        Ok(updated)
    }

    /// The caller's open loans (pending or approved), newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<LoanView>, AppError> {
        let rows: Vec<LoanTuple> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE applicant = $1 AND status IN ('PENDING', 'APPROVED') \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(loan_from_tuple).collect())
    }

    /// The admin queue: all pending requests, newest first.
    pub async fn list_pending(&self) -> Result<Vec<LoanView>, AppError> {
        let rows: Vec<LoanTuple> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE status = 'PENDING' ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(loan_from_tuple).collect())
    }

    async fn lock_loan(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: Uuid,
    ) -> Result<LoanView, AppError> {
        let row: Option<LoanTuple> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1 FOR UPDATE"
        ))
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(loan_from_tuple)
            .ok_or_else(|| AppError::LoanNotFound(loan_id.to_string()))
    }
}
