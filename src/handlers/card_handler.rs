//! Card Handler
//!
//! Card issuance and management. Business rule: at most one active DEBIT
//! card and at most three active CREDIT cards per owner. Debit cards link
//! to the owner's main account; credit cards carry a credit limit instead.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Amount;
use crate::error::AppError;
use crate::ledger::LedgerStore;

use super::{CardBrand, CardType, CreateCardCommand};

const MAX_ACTIVE_CREDIT_CARDS: i64 = 3;

/// A card as returned to its owner. The PAN is never stored; only the last
/// four digits are. The CVV is kept in clear, which is acceptable only
/// because this is a demo system.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub id: Uuid,
    pub owner: Uuid,
    pub account: Option<Uuid>,
    pub alias: String,
    pub card_type: String,
    pub brand: String,
    pub last4: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub cvv: String,
    pub status: String,
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

type CardTuple = (
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    String,
    String,
    String,
    i32,
    i32,
    String,
    String,
    Option<Decimal>,
    DateTime<Utc>,
);

const CARD_COLUMNS: &str = "id, owner, account, alias, card_type, brand, last4, \
     expiry_month, expiry_year, cvv, status, credit_limit, created_at";

fn card_from_tuple(row: CardTuple) -> CardView {
    let (
        id,
        owner,
        account,
        alias,
        card_type,
        brand,
        last4,
        expiry_month,
        expiry_year,
        cvv,
        status,
        credit_limit,
        created_at,
    ) = row;
    CardView {
        id,
        owner,
        account,
        alias,
        card_type,
        brand,
        last4,
        expiry_month,
        expiry_year,
        cvv,
        status,
        credit_limit,
        created_at,
    }
}

/// Handler for card issuance
pub struct CardHandler {
    pool: PgPool,
    ledger: LedgerStore,
}

impl CardHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool.clone()),
            pool,
        }
    }

    /// Issue a new card for the authenticated user.
    pub async fn create(
        &self,
        command: CreateCardCommand,
        user_id: Uuid,
    ) -> Result<CardView, AppError> {
        let alias = command.alias.trim().to_string();
        if alias.is_empty() {
            return Err(AppError::InvalidRequest("Card alias is required".to_string()));
        }

        let credit_limit = match command.card_type {
            CardType::Credit => {
                let limit = command.credit_limit.ok_or_else(|| {
                    AppError::InvalidRequest("Credit cards require a credit limit".to_string())
                })?;
                Some(Amount::new(limit)?.value())
            }
            CardType::Debit => None,
        };

        match command.card_type {
            CardType::Credit => {
                let active: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM cards \
                     WHERE owner = $1 AND card_type = 'CREDIT' AND status = 'active'",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

                if active >= MAX_ACTIVE_CREDIT_CARDS {
                    return Err(AppError::CardLimitReached(
                        "maximum of three active credit cards".to_string(),
                    ));
                }
            }
            CardType::Debit => {
                let existing: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM cards \
                     WHERE owner = $1 AND card_type = 'DEBIT' AND status = 'active')",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

                if existing {
                    return Err(AppError::CardLimitReached(
                        "an active debit card already exists".to_string(),
                    ));
                }
            }
        }

        // Debit cards draw on the main account; credit cards stand alone
        let account = match command.card_type {
            CardType::Debit => self
                .ledger
                .find_main_account(user_id)
                .await?
                .map(|account| account.id),
            CardType::Credit => None,
        };

        let (last4, expiry_month, expiry_year, cvv) = generate_card_numbers();

        let card_id = Uuid::new_v4();
        let row: CardTuple = sqlx::query_as(&format!(
            r#"
            INSERT INTO cards (
                id, owner, account, alias, card_type, brand,
                last4, expiry_month, expiry_year, cvv, status, credit_limit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', $11)
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(card_id)
        .bind(user_id)
        .bind(account)
        .bind(&alias)
        .bind(command.card_type.as_str())
        .bind(command.brand.as_str())
        .bind(&last4)
        .bind(expiry_month)
        .bind(expiry_year)
        .bind(&cvv)
        .bind(credit_limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(card_from_tuple(row))
    }

    /// The caller's cards, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CardView>, AppError> {
        let rows: Vec<CardTuple> = sqlx::query_as(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE owner = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(card_from_tuple).collect())
    }

    /// Delete one of the caller's cards.
    pub async fn delete(&self, card_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1 AND owner = $2")
            .bind(card_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CardNotFound(card_id.to_string()));
        }

        Ok(())
    }
}

/// Generate the printable card data: last four digits, expiry 2-6 years
/// out, and a three-digit CVV.
fn generate_card_numbers() -> (String, i32, i32, String) {
    let mut rng = rand::thread_rng();
    let last4 = format!("{:04}", rng.gen_range(0..=9999));
    let expiry_month = rng.gen_range(1..=12);
    let expiry_year = Utc::now().year() + rng.gen_range(2..=6);
    let cvv = format!("{:03}", rng.gen_range(0..=999));
    (last4, expiry_month, expiry_year, cvv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_card_numbers_shape() {
        for _ in 0..32 {
            let (last4, month, year, cvv) = generate_card_numbers();
            assert_eq!(last4.len(), 4);
            assert!(last4.chars().all(|c| c.is_ascii_digit()));
            assert!((1..=12).contains(&month));
            assert!(year > Utc::now().year());
            assert_eq!(cvv.len(), 3);
        }
    }
}
