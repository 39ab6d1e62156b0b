//! Ledger store implementation
//!
//! Lookups plus the one write path that touches balances. The dual-account
//! mutation runs in a single transaction: both rows are locked with
//! `SELECT ... FOR UPDATE` (always in ascending id order so two simultaneous
//! opposite-direction movements cannot deadlock), every business rule is
//! re-checked under the lock, and the debit, credit and record insert commit
//! or roll back together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, Balance, Iban, Phone};

use super::account::{Account, AccountStatus};
use super::movement::{MovementReceipt, MovementRecord};

/// Errors from the ledger write path.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Account is not active: {0}")]
    AccountNotActive(Uuid),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("Source and destination account are the same")]
    SameAccount,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Store for accounts and movement records.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

const ACCOUNT_COLUMNS: &str = "id, owner_id, iban, account_number, currency, balance, \
     alias, status, is_main, created_at";

type AccountTuple = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    Decimal,
    Option<String>,
    String,
    bool,
    DateTime<Utc>,
);

fn account_from_tuple(row: AccountTuple) -> Account {
    let (id, owner_id, iban, account_number, currency, balance, alias, status, is_main, created_at) =
        row;
    let status = AccountStatus::parse(&status).unwrap_or(AccountStatus::Blocked);
    Account {
        id,
        owner_id,
        iban,
        account_number,
        currency,
        balance,
        alias,
        status,
        is_main,
        created_at,
    }
}

impl LedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user's active main account, the default source for movements.
    pub async fn find_main_account(&self, owner_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountTuple> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE owner_id = $1 AND is_main AND status = 'active'"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_tuple))
    }

    /// Resolve an active account by its normalized IBAN.
    pub async fn find_account_by_iban(&self, iban: &Iban) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountTuple> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE iban = $1 AND status = 'active'"
        ))
        .bind(iban.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_tuple))
    }

    /// All accounts owned by a user, main account first.
    pub async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, sqlx::Error> {
        let rows: Vec<AccountTuple> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE owner_id = $1 ORDER BY is_main DESC, created_at"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(account_from_tuple).collect())
    }

    /// Resolve a user by normalized phone number. Returns (user_id, full name).
    pub async fn find_user_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<Option<(Uuid, String)>, sqlx::Error> {
        let row: Option<(Uuid, String, String)> =
            sqlx::query_as("SELECT id, name, surname FROM users WHERE phone = $1")
                .bind(phone.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, surname)| (id, format!("{} {}", name, surname).trim().to_string())))
    }

    /// Full name of an account owner, for counterpart display.
    pub async fn owner_display_name(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT name, surname FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(name, surname)| format!("{} {}", name, surname).trim().to_string()))
    }

    // =========================================================================
    // Atomic dual-account movement
    // =========================================================================

    /// Move `amount` from one account to another and append the movement
    /// record, all in one transaction.
    ///
    /// Callers resolve and pre-validate the accounts; everything that could
    /// have changed since (status, balance) is validated again under the row
    /// locks. On any error the transaction rolls back and no effect remains.
    pub async fn execute_movement(
        &self,
        from_account: Uuid,
        to_account: Uuid,
        amount: &Amount,
        record: MovementRecord,
    ) -> Result<MovementReceipt, LedgerError> {
        if from_account == to_account {
            return Err(LedgerError::SameAccount);
        }

        let mut tx = self.pool.begin().await?;

        // Lock ordering: always take the lower account id first.
        let (first, second) = if from_account < to_account {
            (from_account, to_account)
        } else {
            (to_account, from_account)
        };
        let first_row = Self::lock_account(&mut tx, first).await?;
        let second_row = Self::lock_account(&mut tx, second).await?;

        let (from_row, to_row) = if first == from_account {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        if !from_row.is_active() {
            return Err(LedgerError::AccountNotActive(from_row.id));
        }
        if !to_row.is_active() {
            return Err(LedgerError::AccountNotActive(to_row.id));
        }
        // A stored balance that fails the Balance invariant reads as empty
        let available = Balance::new(from_row.balance).unwrap_or_default();
        if !available.is_sufficient_for(amount) {
            return Err(LedgerError::InsufficientBalance {
                required: amount.value(),
                available: from_row.balance,
            });
        }

        sqlx::query(
            "UPDATE accounts SET balance = balance - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(from_account)
        .bind(amount.value())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE accounts SET balance = balance + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(to_account)
        .bind(amount.value())
        .execute(&mut *tx)
        .await?;

        let record_id = Uuid::new_v4();
        let created_at = match record {
            MovementRecord::Transfer {
                currency,
                concept,
                counterpart_name,
                counterpart_iban,
            } => {
                sqlx::query_scalar::<_, DateTime<Utc>>(
                    r#"
                    INSERT INTO transfers (
                        id, from_account, to_account, amount, currency,
                        concept, counterpart_name, counterpart_iban, status
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'completed')
                    RETURNING created_at
                    "#,
                )
                .bind(record_id)
                .bind(from_account)
                .bind(to_account)
                .bind(amount.value())
                .bind(&currency)
                .bind(&concept)
                .bind(&counterpart_name)
                .bind(&counterpart_iban)
                .fetch_one(&mut *tx)
                .await?
            }
            MovementRecord::Bizum {
                from_user,
                to_user,
                concept,
                to_phone,
            } => {
                sqlx::query_scalar::<_, DateTime<Utc>>(
                    r#"
                    INSERT INTO bizums (
                        id, from_user, to_user, from_account, to_account,
                        amount, concept, to_phone, status
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'COMPLETED')
                    RETURNING created_at
                    "#,
                )
                .bind(record_id)
                .bind(from_user)
                .bind(to_user)
                .bind(from_account)
                .bind(to_account)
                .bind(amount.value())
                .bind(&concept)
                .bind(&to_phone)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(MovementReceipt {
            record_id,
            amount: amount.value(),
            from_balance: from_row.balance - amount.value(),
            to_balance: to_row.balance + amount.value(),
            created_at,
        })
    }

    async fn lock_account(
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Account, LedgerError> {
        let row: Option<AccountTuple> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(account_from_tuple)
            .ok_or(LedgerError::AccountNotFound(account_id))
    }
}
