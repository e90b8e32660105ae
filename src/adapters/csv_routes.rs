use crate::domain::model::RouteRecord;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One CSV row. `shipId` and `isBaseline` columns are optional; a route
/// without a ship id belongs to the ship named by its `routeId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteRow {
    id: u64,
    route_id: String,
    #[serde(default)]
    ship_id: Option<String>,
    vessel_type: String,
    fuel_type: String,
    year: i32,
    ghg_intensity: f64,
    fuel_consumption: f64,
    distance: f64,
    total_emissions: f64,
    #[serde(default)]
    is_baseline: Option<bool>,
}

impl From<RouteRow> for RouteRecord {
    fn from(row: RouteRow) -> Self {
        let ship_id = row
            .ship_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| row.route_id.clone());

        RouteRecord {
            id: row.id,
            route_id: row.route_id,
            ship_id,
            vessel_type: row.vessel_type,
            fuel_type: row.fuel_type,
            year: row.year,
            ghg_intensity: row.ghg_intensity,
            fuel_consumption: row.fuel_consumption,
            distance: row.distance,
            total_emissions: row.total_emissions,
            is_baseline: row.is_baseline.unwrap_or(false),
        }
    }
}

pub fn read_routes<R: Read>(reader: R) -> Result<Vec<RouteRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut routes = Vec::new();
    for row in csv_reader.deserialize::<RouteRow>() {
        let route = RouteRecord::from(row?);
        route.validate()?;
        routes.push(route);
    }
    Ok(routes)
}

pub fn load_routes_csv(path: impl AsRef<Path>) -> Result<Vec<RouteRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let routes = read_routes(file)?;
    tracing::debug!(path = %path.display(), routes = routes.len(), "route CSV loaded");
    Ok(routes)
}
