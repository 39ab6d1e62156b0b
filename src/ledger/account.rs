//! Account row model

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Account lifecycle status. Accounts are never deleted, only closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Blocked,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Blocked => "blocked",
            AccountStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "blocked" => Some(AccountStatus::Blocked),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

/// An account row as read from the store.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub iban: String,
    pub account_number: String,
    pub currency: String,
    pub balance: Decimal,
    pub alias: Option<String>,
    pub status: AccountStatus,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Generate a fresh 10-digit account number for provisioning.
pub fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    (0..10).map(|_| rng.gen_range(0..=9).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Blocked,
            AccountStatus::Closed,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("frozen"), None);
    }

    #[test]
    fn test_generate_account_number_shape() {
        let number = generate_account_number();
        assert_eq!(number.len(), 10);
        assert!(number.chars().all(|c| c.is_ascii_digit()));
    }
}
