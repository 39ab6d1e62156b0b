//! banca_core Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod ledger;
pub mod notify;

mod error;

pub use api::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
