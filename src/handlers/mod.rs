//! Command Handlers module
//!
//! One handler per business operation. Each handler validates the command,
//! resolves the accounts or rows it touches, and delegates every balance or
//! status mutation to a single transactional unit.

mod auth_handler;
mod bizum_handler;
mod card_handler;
mod commands;
mod loan_handler;
mod transfer_handler;

pub use auth_handler::{hash_password, hash_token, LoginHandler, RegisterHandler};
pub use bizum_handler::BizumHandler;
pub use card_handler::{CardHandler, CardView};
pub use commands::*;
pub use loan_handler::{LoanHandler, LoanStatus, LoanView};
pub use transfer_handler::TransferHandler;
