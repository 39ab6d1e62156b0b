//! Transfer Handler
//!
//! IBAN-addressed transfers from the caller's main account.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, Iban};
use crate::error::AppError;
use crate::ledger::{Direction, LedgerStore, MovementRecord};

use super::{TransferCommand, TransferResult};

const DEFAULT_CONCEPT: &str = "Bank transfer";

/// Handler for IBAN transfers
pub struct TransferHandler {
    ledger: LedgerStore,
}

impl TransferHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool),
        }
    }

    /// Execute the transfer command for the authenticated user.
    ///
    /// All business rules are checked up front, then re-checked by the
    /// ledger under row locks; no balance is touched unless the whole
    /// movement commits.
    pub async fn execute(
        &self,
        command: TransferCommand,
        user_id: Uuid,
    ) -> Result<TransferResult, AppError> {
        let amount = Amount::new(command.amount)?;
        let to_iban = Iban::parse(&command.to_iban)?;

        let from_account = self
            .ledger
            .find_main_account(user_id)
            .await?
            .ok_or(AppError::NoMainAccount)?;

        let to_account = self
            .ledger
            .find_account_by_iban(&to_iban)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(to_iban.to_string()))?;

        if to_account.id == from_account.id {
            return Err(AppError::SelfTransfer);
        }

        let counterpart_name = self.ledger.owner_display_name(to_account.owner_id).await?;

        let concept = command
            .concept
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONCEPT.to_string());

        let record = MovementRecord::Transfer {
            currency: from_account.currency.clone(),
            concept: concept.clone(),
            counterpart_name: counterpart_name.clone(),
            counterpart_iban: to_account.iban.clone(),
        };

        let receipt = self
            .ledger
            .execute_movement(from_account.id, to_account.id, &amount, record)
            .await?;

        Ok(TransferResult {
            transfer_id: receipt.record_id,
            from_account: from_account.id,
            to_account: to_account.id,
            amount: receipt.amount,
            currency: from_account.currency,
            concept,
            counterpart_name,
            counterpart_iban: to_account.iban,
            status: "completed".to_string(),
            direction: Direction::Out.as_str().to_string(),
            created_at: receipt.created_at,
        })
    }
}
