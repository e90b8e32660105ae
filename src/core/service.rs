use crate::core::aggregator::RouteAggregator;
use crate::core::banking::BankingLedger;
use crate::core::calculator::CbCalculator;
use crate::core::locks::ShipLocks;
use crate::core::pooling::PoolingEngine;
use crate::domain::model::{
    BankEntry, ComplianceBalance, Confirmation, Pool, RouteAggregate, RouteComparison,
    RouteFilter, RouteRecord,
};
use crate::domain::ports::{LedgerStore, TargetIntensity};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;

/// Entry point for callers: wires the aggregator, calculator, banking ledger
/// and pooling engine over one store.
pub struct ComplianceService<S: LedgerStore, T: TargetIntensity> {
    store: Arc<S>,
    calculator: CbCalculator<S, T>,
    banking: BankingLedger<S, T>,
    pooling: PoolingEngine<S, T>,
}

impl<S: LedgerStore, T: TargetIntensity> ComplianceService<S, T> {
    pub fn new(store: Arc<S>, targets: Arc<T>, energy_per_tonne_mj: f64) -> Self {
        let locks = Arc::new(ShipLocks::new());
        let aggregator = RouteAggregator::new(store.clone(), energy_per_tonne_mj);
        let calculator = CbCalculator::new(aggregator, targets);

        Self {
            banking: BankingLedger::new(store.clone(), calculator.clone(), locks.clone()),
            pooling: PoolingEngine::new(store.clone(), calculator.clone(), locks),
            calculator,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // Routes

    pub async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<RouteRecord>> {
        self.calculator.aggregator().list_routes(filter).await
    }

    pub async fn set_baseline(&self, id: u64) -> Result<RouteRecord> {
        self.calculator.aggregator().set_baseline(id).await
    }

    pub async fn import_routes(&self, routes: Vec<RouteRecord>) -> Result<usize> {
        for route in &routes {
            route.validate()?;
        }
        let written = self.store.insert_routes(routes).await?;
        tracing::info!(routes = written, "routes imported");
        Ok(written)
    }

    pub async fn aggregate(&self, ship_id: &str, year: i32) -> Result<RouteAggregate> {
        self.calculator.aggregator().aggregate(ship_id, year).await
    }

    pub async fn compare_to_baseline(&self, year: Option<i32>) -> Result<Vec<RouteComparison>> {
        self.calculator.compare_to_baseline(year).await
    }

    // Compliance balance

    pub async fn compute_cb(&self, ship_id: &str, year: i32) -> Result<ComplianceBalance> {
        self.calculator.compute_cb(ship_id, year).await
    }

    // Banking

    pub async fn bank(&self, ship_id: &str, year: i32, amount: f64) -> Result<Confirmation> {
        self.banking.bank(ship_id, year, amount).await
    }

    pub async fn apply(&self, ship_id: &str, year: i32, amount: f64) -> Result<Confirmation> {
        self.banking.apply(ship_id, year, amount).await
    }

    pub async fn available_to_apply(&self, ship_id: &str, year: i32) -> Result<f64> {
        self.banking.available_to_apply(ship_id, year).await
    }

    pub async fn bank_records(
        &self,
        ship_id: &str,
        origin_year: Option<i32>,
    ) -> Result<Vec<BankEntry>> {
        self.banking.records(ship_id, origin_year).await
    }

    // Pooling

    pub async fn create_pool(&self, year: i32, members: &[String]) -> Result<Pool> {
        self.pooling.create_pool(year, members).await
    }

    pub async fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.pooling.get_pool(pool_id).await
    }

    pub async fn list_pools(&self, year: Option<i32>) -> Result<Vec<Pool>> {
        self.pooling.list_pools(year).await
    }
}
