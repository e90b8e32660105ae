use crate::core::aggregator::RouteAggregator;
use crate::domain::model::{ComplianceBalance, RouteAggregate, RouteComparison, RouteFilter};
use crate::domain::ports::{RouteRepository, TargetIntensity};
use crate::utils::error::Result;
use std::sync::Arc;

/// Derives compliance balances from route aggregates. Holds no state of its
/// own: every call re-reads the routes.
pub struct CbCalculator<R: RouteRepository, T: TargetIntensity> {
    aggregator: RouteAggregator<R>,
    targets: Arc<T>,
}

impl<R: RouteRepository, T: TargetIntensity> Clone for CbCalculator<R, T> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            targets: self.targets.clone(),
        }
    }
}

impl<R: RouteRepository, T: TargetIntensity> CbCalculator<R, T> {
    pub fn new(aggregator: RouteAggregator<R>, targets: Arc<T>) -> Self {
        Self {
            aggregator,
            targets,
        }
    }

    pub fn aggregator(&self) -> &RouteAggregator<R> {
        &self.aggregator
    }

    pub async fn compute_cb(&self, ship_id: &str, year: i32) -> Result<ComplianceBalance> {
        let aggregate = self.aggregator.aggregate(ship_id, year).await?;
        let target = self.targets.target_for(year)?;
        let cb = balance_from_aggregate(&aggregate, target);
        tracing::debug!(ship_id, year, target, cb = cb.cb_gco2eq, "computed compliance balance");
        Ok(cb)
    }

    /// Compares every route of a year against that year's baseline routes.
    pub async fn compare_to_baseline(&self, year: Option<i32>) -> Result<Vec<RouteComparison>> {
        let routes = self
            .aggregator
            .list_routes(&RouteFilter {
                year,
                ..Default::default()
            })
            .await?;

        let mut comparisons = Vec::new();
        for baseline in routes.iter().filter(|r| r.is_baseline) {
            if baseline.ghg_intensity <= 0.0 {
                tracing::warn!(
                    route_id = %baseline.route_id,
                    "skipping baseline with non-positive intensity"
                );
                continue;
            }
            let target = self.targets.target_for(baseline.year)?;

            for other in routes
                .iter()
                .filter(|r| r.year == baseline.year && r.id != baseline.id)
            {
                comparisons.push(RouteComparison {
                    route_id: other.route_id.clone(),
                    baseline_route_id: baseline.route_id.clone(),
                    year: baseline.year,
                    baseline_intensity: baseline.ghg_intensity,
                    comparison_intensity: other.ghg_intensity,
                    percent_diff: (other.ghg_intensity / baseline.ghg_intensity - 1.0) * 100.0,
                    compliant: other.ghg_intensity <= target,
                });
            }
        }
        Ok(comparisons)
    }
}

/// `(target - actual) * energy`; positive when the ship beat the target.
pub fn balance_from_aggregate(aggregate: &RouteAggregate, target: f64) -> ComplianceBalance {
    ComplianceBalance {
        ship_id: aggregate.ship_id.clone(),
        year: aggregate.year,
        cb_gco2eq: (target - aggregate.reported_intensity) * aggregate.energy_mj,
    }
}
