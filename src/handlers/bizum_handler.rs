//! Bizum Handler
//!
//! Phone-addressed instant transfers between two users' main accounts.
//! Shares the transfer's atomic mutation contract; only the destination
//! resolution (phone -> user -> main account) and the record differ.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, Phone};
use crate::error::AppError;
use crate::ledger::{LedgerStore, MovementRecord};

use super::{BizumCommand, BizumResult};

/// Handler for bizums
pub struct BizumHandler {
    ledger: LedgerStore,
}

impl BizumHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool),
        }
    }

    /// Execute the bizum command for the authenticated user.
    pub async fn execute(
        &self,
        command: BizumCommand,
        user_id: Uuid,
    ) -> Result<BizumResult, AppError> {
        let amount = Amount::new(command.amount)?;
        let to_phone = Phone::parse(&command.to_phone)?;

        // Unknown phone is a distinct not-found case from a missing account
        let (to_user, _to_name) = self
            .ledger
            .find_user_by_phone(&to_phone)
            .await?
            .ok_or_else(|| AppError::PhoneNotFound(to_phone.to_string()))?;

        if to_user == user_id {
            return Err(AppError::SelfTransfer);
        }

        let from_account = self
            .ledger
            .find_main_account(user_id)
            .await?
            .ok_or(AppError::NoMainAccount)?;

        let to_account = self
            .ledger
            .find_main_account(to_user)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(to_user.to_string()))?;

        let concept = command
            .concept
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_default();

        let record = MovementRecord::Bizum {
            from_user: user_id,
            to_user,
            concept: concept.clone(),
            to_phone: to_phone.to_string(),
        };

        let receipt = self
            .ledger
            .execute_movement(from_account.id, to_account.id, &amount, record)
            .await?;

        Ok(BizumResult {
            bizum_id: receipt.record_id,
            from_user: user_id,
            to_user,
            from_account: from_account.id,
            to_account: to_account.id,
            amount: receipt.amount,
            concept,
            to_phone: to_phone.to_string(),
            status: "COMPLETED".to_string(),
            created_at: receipt.created_at,
        })
    }
}
