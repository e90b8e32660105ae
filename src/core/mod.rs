pub mod aggregator;
pub mod banking;
pub mod calculator;
pub mod locks;
pub mod pooling;
pub mod service;

pub use crate::domain::model::{BankEntry, ComplianceBalance, Confirmation, Pool, RouteRecord};
pub use crate::domain::ports::{LedgerStore, TargetIntensity};
pub use crate::utils::error::Result;

/// Slack allowed when comparing balances that went through float sums.
pub const BALANCE_EPSILON: f64 = 1e-6;
