use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: u64,
    pub route_id: String,
    pub ship_id: String,
    pub vessel_type: String,
    pub fuel_type: String,
    pub year: i32,
    /// Reported well-to-wake intensity in gCO2e/MJ.
    pub ghg_intensity: f64,
    /// Tonnes of fuel.
    pub fuel_consumption: f64,
    /// Kilometres.
    pub distance: f64,
    /// Tonnes CO2e.
    pub total_emissions: f64,
    #[serde(default)]
    pub is_baseline: bool,
}

impl Validate for RouteRecord {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("routeId", &self.route_id)?;
        validate_non_empty_string("shipId", &self.ship_id)?;
        validate_range("year", self.year, 1900, 2100)?;

        for (field, value) in [
            ("ghgIntensity", self.ghg_intensity),
            ("fuelConsumption", self.fuel_consumption),
            ("distance", self.distance),
            ("totalEmissions", self.total_emissions),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LedgerError::ValidationError {
                    field: format!("route {}: {}", self.route_id, field),
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// Optional filters for route listings. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFilter {
    pub year: Option<i32>,
    pub vessel_type: Option<String>,
    pub fuel_type: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, route: &RouteRecord) -> bool {
        self.year.map_or(true, |y| route.year == y)
            && self
                .vessel_type
                .as_deref()
                .map_or(true, |v| route.vessel_type.eq_ignore_ascii_case(v))
            && self
                .fuel_type
                .as_deref()
                .map_or(true, |f| route.fuel_type.eq_ignore_ascii_case(f))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAggregate {
    pub ship_id: String,
    pub year: i32,
    pub route_count: usize,
    pub fuel_consumption: f64,
    pub distance: f64,
    pub total_emissions: f64,
    /// `total_emissions / fuel_consumption`.
    pub ghg_intensity: f64,
    /// Fuel-weighted mean of the routes' reported gCO2e/MJ intensities.
    pub reported_intensity: f64,
    pub energy_mj: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceBalance {
    pub ship_id: String,
    pub year: i32,
    pub cb_gco2eq: f64,
}

impl ComplianceBalance {
    pub fn is_surplus(&self) -> bool {
        self.cb_gco2eq > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankEntry {
    pub id: u64,
    pub ship_id: String,
    pub origin_year: i32,
    pub amount: f64,
    pub remaining: f64,
    pub created_at: DateTime<Utc>,
}

/// A bank entry before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankEntry {
    pub ship_id: String,
    pub origin_year: i32,
    pub amount: f64,
}

/// One slice of an `apply`: take `amount` out of entry `entry_id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub entry_id: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub message: String,
    pub ship_id: String,
    pub year: i32,
    pub amount: f64,
    /// Entries created or drawn down, as they are after the operation.
    pub entries: Vec<BankEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMember {
    pub ship_id: String,
    pub cb_before: f64,
    pub cb_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub pool_id: String,
    pub year: i32,
    pub members: Vec<PoolMember>,
    #[serde(rename = "totalCB")]
    pub total_cb: f64,
    pub created_at: DateTime<Utc>,
}

impl Pool {
    pub fn contains(&self, ship_id: &str) -> bool {
        self.members.iter().any(|m| m.ship_id == ship_id)
    }
}

/// A validated pool awaiting an id from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPool {
    pub year: i32,
    pub members: Vec<PoolMember>,
    pub total_cb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComparison {
    pub route_id: String,
    pub baseline_route_id: String,
    pub year: i32,
    pub baseline_intensity: f64,
    pub comparison_intensity: f64,
    pub percent_diff: f64,
    pub compliant: bool,
}
