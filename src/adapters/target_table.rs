use crate::config::RegulationConfig;
use crate::domain::ports::TargetIntensity;
use crate::utils::error::{LedgerError, Result};
use std::collections::BTreeMap;

/// Reference intensity the reduction steps are measured from (gCO2e/MJ).
pub const REFERENCE_INTENSITY: f64 = 91.16;

/// Default step curve: 2 % below reference from 2025, then tightening every
/// five years.
const DEFAULT_TARGETS: [(i32, f64); 7] = [
    (2024, REFERENCE_INTENSITY),
    (2025, 89.3368),
    (2030, 85.6904),
    (2035, 77.9444),
    (2040, 62.9004),
    (2045, 34.6408),
    (2050, 18.232),
];

/// Target lookup by year. A year uses the latest entry at or before it.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetTable {
    targets: BTreeMap<i32, f64>,
}

impl Default for TargetTable {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.into_iter().collect(),
        }
    }
}

impl TargetTable {
    pub fn new(targets: BTreeMap<i32, f64>) -> Self {
        Self { targets }
    }

    /// Uses the configured table, or the default curve when none is given.
    pub fn from_config(config: &RegulationConfig) -> Result<Self> {
        if config.targets.is_empty() {
            return Ok(Self::default());
        }

        let mut targets = BTreeMap::new();
        for (key, value) in &config.targets {
            let year: i32 = key.trim().parse().map_err(|_| LedgerError::ValidationError {
                field: format!("regulation.targets.{}", key),
                reason: "target keys must be years".to_string(),
            })?;
            targets.insert(year, *value);
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl TargetIntensity for TargetTable {
    fn target_for(&self, year: i32) -> Result<f64> {
        self.targets
            .range(..=year)
            .next_back()
            .map(|(_, target)| *target)
            .ok_or(LedgerError::NoTarget { year })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_lookup() {
        let table = TargetTable::default();
        assert_eq!(table.target_for(2025).unwrap(), 89.3368);
        assert_eq!(table.target_for(2029).unwrap(), 89.3368);
        assert_eq!(table.target_for(2030).unwrap(), 85.6904);
        assert_eq!(table.target_for(2070).unwrap(), 18.232);
    }

    #[test]
    fn test_year_before_table() {
        let table = TargetTable::default();
        assert!(matches!(
            table.target_for(2020),
            Err(LedgerError::NoTarget { year: 2020 })
        ));
    }

    #[test]
    fn test_from_config() {
        let mut config = RegulationConfig::default();
        config.targets.insert("2024".to_string(), 100.0);
        let table = TargetTable::from_config(&config).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.target_for(2031).unwrap(), 100.0);

        config.targets.insert("next-year".to_string(), 1.0);
        assert!(TargetTable::from_config(&config).is_err());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let table = TargetTable::from_config(&RegulationConfig::default()).unwrap();
        assert_eq!(table, TargetTable::default());
    }
}
