use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("No route data for ship {ship_id} in {year}")]
    NoData { ship_id: String, year: i32 },

    #[error("Invalid amount {amount}: amount must be a positive number")]
    InvalidAmount { amount: f64 },

    #[error(
        "Insufficient surplus for ship {ship_id} in {year}: requested {requested:.2}, bankable {available:.2}"
    )]
    InsufficientSurplus {
        ship_id: String,
        year: i32,
        requested: f64,
        available: f64,
    },

    #[error(
        "Insufficient banked balance for ship {ship_id} in {year}: requested {requested:.2}, available {available:.2}"
    )]
    InsufficientBankedBalance {
        ship_id: String,
        year: i32,
        requested: f64,
        available: f64,
    },

    #[error("Invalid pool: {reason}")]
    InvalidPool { reason: String },

    #[error("Ship {ship_id} already belongs to pool {pool_id} for {year}")]
    AlreadyPooled {
        ship_id: String,
        year: i32,
        pool_id: String,
    },

    #[error("Route {id} not found")]
    RouteNotFound { id: u64 },

    #[error("Pool {pool_id} not found")]
    PoolNotFound { pool_id: String },

    #[error("No target intensity configured for {year}")]
    NoTarget { year: i32 },

    #[error("Validation error on {field}: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Who is at fault for an error: the caller's request or the ledger itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::NoData { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::InsufficientSurplus { .. }
            | LedgerError::InsufficientBankedBalance { .. }
            | LedgerError::InvalidPool { .. }
            | LedgerError::AlreadyPooled { .. }
            | LedgerError::RouteNotFound { .. }
            | LedgerError::PoolNotFound { .. }
            | LedgerError::NoTarget { .. }
            | LedgerError::ValidationError { .. } => ErrorCategory::Client,
            LedgerError::StorageError { .. }
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_)
            | LedgerError::CsvError(_)
            | LedgerError::ConfigError { .. } => ErrorCategory::Server,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LedgerError::NoData { .. }
            | LedgerError::RouteNotFound { .. }
            | LedgerError::PoolNotFound { .. } => ErrorSeverity::Low,
            LedgerError::InvalidAmount { .. }
            | LedgerError::InsufficientSurplus { .. }
            | LedgerError::InsufficientBankedBalance { .. }
            | LedgerError::InvalidPool { .. }
            | LedgerError::AlreadyPooled { .. }
            | LedgerError::NoTarget { .. }
            | LedgerError::ValidationError { .. } => ErrorSeverity::Medium,
            LedgerError::CsvError(_) | LedgerError::ConfigError { .. } => ErrorSeverity::High,
            LedgerError::StorageError { .. }
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::NoData { .. }
            | LedgerError::RouteNotFound { .. }
            | LedgerError::PoolNotFound { .. } => 404,
            LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidPool { .. }
            | LedgerError::ValidationError { .. } => 400,
            LedgerError::AlreadyPooled { .. } => 409,
            LedgerError::InsufficientSurplus { .. }
            | LedgerError::InsufficientBankedBalance { .. }
            | LedgerError::NoTarget { .. } => 422,
            _ => 500,
        }
    }

    /// Message shown to callers. Server faults hide their internals.
    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Client => self.to_string(),
            ErrorCategory::Server => {
                "The ledger is temporarily unavailable, please retry later".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            LedgerError::NoData { .. } => "Import routes for this ship and year first",
            LedgerError::InvalidAmount { .. } => "Use an amount greater than zero",
            LedgerError::InsufficientSurplus { .. } => {
                "Fetch the current compliance balance and bank at most the remaining surplus"
            }
            LedgerError::InsufficientBankedBalance { .. } => {
                "Check the available banked balance for this year before applying"
            }
            LedgerError::InvalidPool { .. } => {
                "Use distinct members whose combined compliance balance is non-negative"
            }
            LedgerError::AlreadyPooled { .. } => "Remove the ship from the member list",
            LedgerError::RouteNotFound { .. } | LedgerError::PoolNotFound { .. } => {
                "Check the identifier"
            }
            LedgerError::NoTarget { .. } => "Add a target intensity for the year to the config",
            LedgerError::ValidationError { .. } | LedgerError::ConfigError { .. } => {
                "Check the configuration file"
            }
            LedgerError::CsvError(_) => "Check the route CSV headers and values",
            LedgerError::StorageError { .. }
            | LedgerError::IoError(_)
            | LedgerError::SerializationError(_) => "Check the snapshot file and retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
