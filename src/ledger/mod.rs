//! Ledger store
//!
//! Persistent record of users' accounts and the append-only movement history
//! (transfers and bizums). All balance mutations go through
//! [`LedgerStore::execute_movement`], which is the single transactional
//! primitive of the system.

mod account;
mod movement;
mod store;

pub use account::{generate_account_number, Account, AccountStatus};
pub use movement::{Direction, MovementReceipt, MovementRecord};
pub use store::{LedgerError, LedgerStore};
