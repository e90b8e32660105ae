use crate::config::{LedgerConfig, LogFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fuel-ledger")]
#[command(about = "Compliance balance banking and pooling ledger")]
pub struct Cli {
    #[arg(long, short, help = "Path to the TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override store.snapshot_path")]
    pub snapshot: Option<String>,

    #[arg(long, help = "Override routes.seed_csv")]
    pub seed_csv: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List routes (GET /routes)
    Routes {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        vessel_type: Option<String>,
        #[arg(long)]
        fuel_type: Option<String>,
    },
    /// Import routes from a CSV file
    ImportRoutes { path: PathBuf },
    /// Mark a route as its ship-year baseline (POST /routes/:id/baseline)
    Baseline { id: u64 },
    /// Compare routes against their year's baselines (GET /routes/comparison)
    Compare {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Current compliance balance (GET /compliance/cb)
    Cb {
        #[arg(long)]
        ship_id: String,
        #[arg(long)]
        year: i32,
    },
    /// Bank surplus (POST /compliance/banking/bank)
    Bank {
        #[arg(long)]
        ship_id: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        amount: f64,
    },
    /// Apply banked surplus (POST /compliance/banking/apply)
    Apply {
        #[arg(long)]
        ship_id: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        amount: f64,
    },
    /// Banked amount applicable to a year
    Available {
        #[arg(long)]
        ship_id: String,
        #[arg(long)]
        year: i32,
    },
    /// Bank entries of a ship
    BankRecords {
        #[arg(long)]
        ship_id: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Pool operations
    #[command(subcommand)]
    Pool(PoolCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum PoolCommand {
    /// Create a pool (POST /pools)
    Create {
        #[arg(long)]
        year: i32,
        #[arg(long = "member", required = true)]
        members: Vec<String>,
    },
    /// List pools (GET /pools)
    List {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show one pool (GET /pools/:id)
    Show { pool_id: String },
}

impl Cli {
    /// Command line flags win over the config file.
    pub fn apply_overrides(&self, config: &mut LedgerConfig) {
        if let Some(path) = &self.snapshot {
            config.store.snapshot_path = Some(path.clone());
        }
        if let Some(path) = &self.seed_csv {
            config.routes.seed_csv = Some(path.clone());
        }
        if self.verbose {
            config.logging.verbose = true;
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }
    }
}
