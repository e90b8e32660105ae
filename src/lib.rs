pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::{Cli, Command, PoolCommand};

pub use crate::adapters::memory_store::MemoryLedgerStore;
pub use crate::adapters::rest::{ApiResponse, RestApi};
pub use crate::adapters::target_table::TargetTable;
pub use crate::config::LedgerConfig;
pub use crate::core::service::ComplianceService;
pub use crate::utils::error::{LedgerError, Result};
