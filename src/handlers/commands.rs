//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts arrive
//! as `Decimal` (rust_decimal accepts both JSON numbers and strings) and are
//! promoted to validated `Amount`s inside the handlers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =========================================================================
// Money movement
// =========================================================================

/// Command to transfer money to an IBAN
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferCommand {
    /// Destination IBAN, free-form (whitespace-insensitive)
    pub to_iban: String,
    /// Amount in major currency units
    pub amount: Decimal,
    /// Optional concept shown on both sides
    #[serde(default)]
    pub concept: Option<String>,
}

/// Result of a completed transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub concept: String,
    pub counterpart_name: Option<String>,
    pub counterpart_iban: String,
    pub status: String,
    pub direction: String,
    pub created_at: DateTime<Utc>,
}

/// Command to send a bizum to a phone number
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BizumCommand {
    /// Destination mobile number, free-form
    pub to_phone: String,
    /// Amount in major currency units
    pub amount: Decimal,
    #[serde(default)]
    pub concept: Option<String>,
}

/// Result of a completed bizum
#[derive(Debug, Clone, Serialize)]
pub struct BizumResult {
    pub bizum_id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: Decimal,
    pub concept: String,
    pub to_phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// =========================================================================
// Loans
// =========================================================================

/// Command to request a consumer loan
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestLoanCommand {
    pub amount: Decimal,
    pub months: i32,
    pub apr: Decimal,
    pub purpose: String,
}

/// Admin decision on a pending loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanAction {
    Approve,
    Reject,
}

/// Command to decide a pending loan
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecideLoanCommand {
    pub action: LoanAction,
    /// APPROVE only: overrides the requested APR
    #[serde(default)]
    pub apr: Option<Decimal>,
    /// REJECT only: reason relayed to the applicant
    #[serde(default)]
    pub reason: Option<String>,
}

// =========================================================================
// Cards
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    Debit,
    Credit,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Debit => "DEBIT",
            CardType::Credit => "CREDIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBrand {
    Visa,
    Mastercard,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MASTERCARD",
        }
    }
}

/// Command to issue a new card
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCardCommand {
    pub alias: String,
    pub card_type: CardType,
    pub brand: CardBrand,
    /// Required for CREDIT cards
    #[serde(default)]
    pub credit_limit: Option<Decimal>,
}

// =========================================================================
// Registration / login
// =========================================================================

/// Command to register a new user with their main account
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterCommand {
    pub name: String,
    pub surname: String,
    pub birth_date: NaiveDate,
    pub dni: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default = "default_currency")]
    pub main_currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Result of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct RegisterResult {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub iban: String,
}

/// Command to log in
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Public view of a user, safe to return to clients
#[derive(Debug, Clone, Serialize)]
pub struct SafeUser {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: String,
    pub main_currency: String,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: SafeUser,
}
