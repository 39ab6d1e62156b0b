//! IBAN type
//!
//! Normalized account addressing for direct transfers. Input is accepted in
//! free form (users paste IBANs with spaces); the stored form is always the
//! compact uppercase representation.

use rand::Rng;
use std::fmt;

/// Minimum/maximum IBAN length after normalization (ISO 13616)
const MIN_LEN: usize = 15;
const MAX_LEN: usize = 34;

/// A normalized IBAN: uppercase, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iban(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IbanError {
    #[error("IBAN is required")]
    Missing,

    #[error("Invalid IBAN format: {0}")]
    InvalidFormat(String),
}

impl Iban {
    /// Parse a free-form IBAN: strips whitespace, uppercases, then checks the
    /// basic shape (country code, check digits, alphanumeric BBAN).
    pub fn parse(raw: &str) -> Result<Self, IbanError> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        if compact.is_empty() {
            return Err(IbanError::Missing);
        }

        if compact.len() < MIN_LEN || compact.len() > MAX_LEN {
            return Err(IbanError::InvalidFormat(compact));
        }

        let bytes = compact.as_bytes();
        let country_ok = bytes[0].is_ascii_uppercase() && bytes[1].is_ascii_uppercase();
        let check_ok = bytes[2].is_ascii_digit() && bytes[3].is_ascii_digit();
        let bban_ok = compact[4..].chars().all(|c| c.is_ascii_alphanumeric());

        if !(country_ok && check_ok && bban_ok) {
            return Err(IbanError::InvalidFormat(compact));
        }

        Ok(Self(compact))
    }

    /// Generate a Spanish IBAN for a freshly provisioned account.
    ///
    /// Uses a fixed demo bank/branch code and the 10-digit account number as
    /// the BBAN tail. Check digits are random; this is a demo system, not a
    /// MOD-97 implementation.
    pub fn generate_spanish(account_number: &str) -> Self {
        let check: u8 = rand::thread_rng().gen_range(10..=99);
        Self(format!("ES{:02}1111222200{}", check, account_number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
