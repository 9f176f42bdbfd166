//! The HopeStream donation DAO, assembled.
//!
//! [`Dao`] owns the vault (and through it the credential ledger and admission
//! gate) and the governance engine (and through it the timelock). Every
//! operation reads the time from one injected clock, and every event the
//! components emit lands in a single ordered audit trail.

pub mod config;
pub mod dao;
pub mod error;
pub mod logging;

pub use config::DaoConfig;
pub use dao::{Dao, DaoSnapshot};
pub use error::DaoError;
pub use logging::{init_logging, LogFormat};
