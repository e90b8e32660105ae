use crate::domain::model::{
    BankEntry, Draw, NewBankEntry, NewPool, Pool, RouteFilter, RouteRecord,
};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<RouteRecord>>;

    /// All routes of one ship-year, ordered by `id`, read from a single snapshot.
    async fn routes_for(&self, ship_id: &str, year: i32) -> Result<Vec<RouteRecord>>;

    /// Marks `id` as the baseline of its ship-year and clears every other
    /// baseline of that ship-year.
    async fn set_baseline(&self, id: u64) -> Result<RouteRecord>;

    /// Inserts new routes. A route whose `id` is already stored must match the
    /// stored record (baseline flag aside) and is skipped; any other content
    /// rejects the whole batch. Returns how many routes were added.
    async fn insert_routes(&self, routes: Vec<RouteRecord>) -> Result<usize>;
}

#[async_trait]
pub trait BankRepository: Send + Sync {
    /// Entries of one ship ordered by `(origin_year, id)`.
    async fn bank_entries(&self, ship_id: &str) -> Result<Vec<BankEntry>>;

    async fn insert_bank_entry(&self, entry: NewBankEntry) -> Result<BankEntry>;

    /// Applies every draw or none of them. A draw larger than its entry's
    /// `remaining` fails the whole batch.
    async fn commit_draws(&self, ship_id: &str, draws: &[Draw]) -> Result<Vec<BankEntry>>;
}

#[async_trait]
pub trait PoolRepository: Send + Sync {
    /// The pool `ship_id` belongs to for `year`, if any.
    async fn pool_of(&self, ship_id: &str, year: i32) -> Result<Option<String>>;

    /// Persists the pool and assigns its id. Fails with `AlreadyPooled` if a
    /// member was pooled for the year in the meantime.
    async fn insert_pool(&self, pool: NewPool) -> Result<Pool>;

    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>>;

    async fn list_pools(&self, year: Option<i32>) -> Result<Vec<Pool>>;
}

/// Everything the ledger persists.
pub trait LedgerStore: RouteRepository + BankRepository + PoolRepository {}

impl<T: RouteRepository + BankRepository + PoolRepository> LedgerStore for T {}

/// Regulatory target intensity (gCO2e/MJ) per reporting year.
pub trait TargetIntensity: Send + Sync {
    fn target_for(&self, year: i32) -> Result<f64>;
}
