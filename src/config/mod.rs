#[cfg(feature = "cli")]
pub mod cli;

use crate::core::aggregator::DEFAULT_ENERGY_PER_TONNE_MJ;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{validate_path, validate_positive_f64, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub regulation: RegulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file. The store stays in memory only when unset.
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Imported on start-up when the store holds no routes yet.
    pub seed_csv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulationConfig {
    #[serde(default = "default_energy_per_tonne_mj")]
    pub energy_per_tonne_mj: f64,
    /// Year (as a string key, TOML tables need them) to gCO2e/MJ target.
    #[serde(default)]
    pub targets: BTreeMap<String, f64>,
}

fn default_energy_per_tonne_mj() -> f64 {
    DEFAULT_ENERGY_PER_TONNE_MJ
}

impl Default for RegulationConfig {
    fn default() -> Self {
        Self {
            energy_per_tonne_mj: DEFAULT_ENERGY_PER_TONNE_MJ,
            targets: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub verbose: bool,
}

impl LedgerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            LedgerError::ConfigError {
                message: format!("cannot read {}: {}", path.as_ref().display(), e),
            }
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| LedgerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LEDGER_SNAPSHOT}); unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LedgerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for LedgerConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.store.snapshot_path {
            validate_path("store.snapshot_path", path)?;
        }
        if let Some(path) = &self.routes.seed_csv {
            validate_path("routes.seed_csv", path)?;
        }

        validate_positive_f64(
            "regulation.energy_per_tonne_mj",
            self.regulation.energy_per_tonne_mj,
        )?;

        for (year, target) in &self.regulation.targets {
            if year.trim().parse::<i32>().is_err() {
                return Err(LedgerError::ValidationError {
                    field: format!("regulation.targets.{}", year),
                    reason: "target keys must be years".to_string(),
                });
            }
            validate_positive_f64(&format!("regulation.targets.{}", year), *target)?;
        }

        Ok(())
    }
}
