//! Domain types
//!
//! Validated primitives for the banking domain. Invalid values cannot be
//! constructed, so code past the parsing boundary can trust them.

mod amortization;
mod amount;
mod iban;
mod phone;

pub use amortization::{loan_terms, LoanTerms};
pub use amount::{Amount, AmountError, Balance};
pub use iban::{Iban, IbanError};
pub use phone::{Phone, PhoneError};
