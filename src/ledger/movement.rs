//! Movement records
//!
//! A movement is one atomic debit/credit pair plus the immutable record row
//! appended alongside it. Transfers and bizums share the same mutation
//! contract and differ only in how the destination was resolved and which
//! table records the movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Direction of a movement relative to the account (or user) viewing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

/// The record to append inside the same transaction as the balance mutation.
#[derive(Debug, Clone)]
pub enum MovementRecord {
    /// IBAN-addressed transfer, written with status `completed`.
    Transfer {
        currency: String,
        concept: String,
        counterpart_name: Option<String>,
        counterpart_iban: String,
    },
    /// Phone-addressed bizum, written with status `COMPLETED`.
    Bizum {
        from_user: Uuid,
        to_user: Uuid,
        concept: String,
        to_phone: String,
    },
}

/// Outcome of a committed movement.
#[derive(Debug, Clone)]
pub struct MovementReceipt {
    pub record_id: Uuid,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
    pub created_at: DateTime<Utc>,
}
