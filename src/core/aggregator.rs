use crate::domain::model::{RouteAggregate, RouteFilter, RouteRecord};
use crate::domain::ports::RouteRepository;
use crate::utils::error::{LedgerError, Result};
use std::sync::Arc;

/// Lower heating value used to turn tonnes of fuel into MJ when nothing else
/// is configured.
pub const DEFAULT_ENERGY_PER_TONNE_MJ: f64 = 41_000.0;

pub struct RouteAggregator<R: RouteRepository> {
    routes: Arc<R>,
    energy_per_tonne_mj: f64,
}

impl<R: RouteRepository> Clone for RouteAggregator<R> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            energy_per_tonne_mj: self.energy_per_tonne_mj,
        }
    }
}

impl<R: RouteRepository> RouteAggregator<R> {
    pub fn new(routes: Arc<R>, energy_per_tonne_mj: f64) -> Self {
        Self {
            routes,
            energy_per_tonne_mj,
        }
    }

    pub async fn aggregate(&self, ship_id: &str, year: i32) -> Result<RouteAggregate> {
        let routes = self.routes.routes_for(ship_id, year).await?;
        tracing::debug!(ship_id, year, routes = routes.len(), "aggregating routes");
        aggregate_routes(ship_id, year, &routes, self.energy_per_tonne_mj)
    }

    pub async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<RouteRecord>> {
        self.routes.list_routes(filter).await
    }

    pub async fn set_baseline(&self, id: u64) -> Result<RouteRecord> {
        let route = self.routes.set_baseline(id).await?;
        tracing::info!(
            route_id = %route.route_id,
            ship_id = %route.ship_id,
            year = route.year,
            "baseline set"
        );
        Ok(route)
    }
}

/// Sums one ship-year. `routes` must already be restricted to that ship-year;
/// they are folded in the order given, so the caller fixes the order to keep
/// the result reproducible.
pub fn aggregate_routes(
    ship_id: &str,
    year: i32,
    routes: &[RouteRecord],
    energy_per_tonne_mj: f64,
) -> Result<RouteAggregate> {
    let mut fuel = 0.0;
    let mut distance = 0.0;
    let mut emissions = 0.0;
    let mut weighted_intensity = 0.0;

    for route in routes {
        fuel += route.fuel_consumption;
        distance += route.distance;
        emissions += route.total_emissions;
        weighted_intensity += route.ghg_intensity * route.fuel_consumption;
    }

    if routes.is_empty() || fuel <= 0.0 {
        return Err(LedgerError::NoData {
            ship_id: ship_id.to_string(),
            year,
        });
    }

    Ok(RouteAggregate {
        ship_id: ship_id.to_string(),
        year,
        route_count: routes.len(),
        fuel_consumption: fuel,
        distance,
        total_emissions: emissions,
        ghg_intensity: emissions / fuel,
        reported_intensity: weighted_intensity / fuel,
        energy_mj: fuel * energy_per_tonne_mj,
    })
}
