use crate::core::BALANCE_EPSILON;
use crate::domain::model::{
    BankEntry, Draw, NewBankEntry, NewPool, Pool, RouteFilter, RouteRecord,
};
use crate::domain::ports::{BankRepository, PoolRepository, RouteRepository};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    routes: BTreeMap<u64, RouteRecord>,
    bank_entries: BTreeMap<u64, BankEntry>,
    pools: BTreeMap<String, Pool>,
    next_entry_id: u64,
    next_pool_seq: u64,
}

/// Ledger store held in memory, optionally mirrored to a JSON snapshot file.
///
/// Every mutation is staged on a copy of the state, written to the snapshot
/// (temp file + rename) and only then published, all under the write lock.
/// A failed write leaves both the file and the in-memory state untouched.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<LedgerState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a snapshot-backed store, starting empty when the file does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let data = fs::read(&path)?;
            serde_json::from_slice(&data)?
        } else {
            LedgerState::default()
        };
        tracing::debug!(path = %path.display(), "ledger snapshot opened");

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub async fn route_count(&self) -> usize {
        self.state.read().await.routes.len()
    }

    async fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<T>,
    {
        let mut guard = self.state.write().await;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        self.persist(&staged)?;
        *guard = staged;
        Ok(out)
    }

    fn persist(&self, state: &LedgerState) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(state)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn entries_of(state: &LedgerState, ship_id: &str) -> Vec<BankEntry> {
    let mut entries: Vec<BankEntry> = state
        .bank_entries
        .values()
        .filter(|e| e.ship_id == ship_id)
        .cloned()
        .collect();
    entries.sort_by_key(|e| (e.origin_year, e.id));
    entries
}

/// Route equality ignoring the baseline flag, which `set_baseline` owns.
fn same_content(stored: &RouteRecord, incoming: &RouteRecord) -> bool {
    let mut incoming = incoming.clone();
    incoming.is_baseline = stored.is_baseline;
    *stored == incoming
}

fn pool_of(state: &LedgerState, ship_id: &str, year: i32) -> Option<String> {
    state
        .pools
        .values()
        .find(|p| p.year == year && p.contains(ship_id))
        .map(|p| p.pool_id.clone())
}

#[async_trait]
impl RouteRepository for MemoryLedgerStore {
    async fn list_routes(&self, filter: &RouteFilter) -> Result<Vec<RouteRecord>> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn routes_for(&self, ship_id: &str, year: i32) -> Result<Vec<RouteRecord>> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .values()
            .filter(|r| r.ship_id == ship_id && r.year == year)
            .cloned()
            .collect())
    }

    async fn set_baseline(&self, id: u64) -> Result<RouteRecord> {
        self.mutate(|state| {
            let (ship_id, year) = match state.routes.get(&id) {
                Some(route) => (route.ship_id.clone(), route.year),
                None => return Err(LedgerError::RouteNotFound { id }),
            };

            for route in state
                .routes
                .values_mut()
                .filter(|r| r.ship_id == ship_id && r.year == year)
            {
                route.is_baseline = route.id == id;
            }

            state
                .routes
                .get(&id)
                .cloned()
                .ok_or(LedgerError::RouteNotFound { id })
        })
        .await
    }

    async fn insert_routes(&self, routes: Vec<RouteRecord>) -> Result<usize> {
        self.mutate(|state| {
            let mut added = 0;
            for route in routes {
                match state.routes.get(&route.id) {
                    Some(stored) if same_content(stored, &route) => continue,
                    Some(stored) => {
                        return Err(LedgerError::ValidationError {
                            field: "id".to_string(),
                            reason: format!(
                                "route {} ({}) is already recorded with different data",
                                stored.id, stored.route_id
                            ),
                        });
                    }
                    None => {
                        state.routes.insert(route.id, route);
                        added += 1;
                    }
                }
            }
            Ok(added)
        })
        .await
    }
}

#[async_trait]
impl BankRepository for MemoryLedgerStore {
    async fn bank_entries(&self, ship_id: &str) -> Result<Vec<BankEntry>> {
        let state = self.state.read().await;
        Ok(entries_of(&state, ship_id))
    }

    async fn insert_bank_entry(&self, entry: NewBankEntry) -> Result<BankEntry> {
        self.mutate(|state| {
            state.next_entry_id += 1;
            let stored = BankEntry {
                id: state.next_entry_id,
                ship_id: entry.ship_id,
                origin_year: entry.origin_year,
                amount: entry.amount,
                remaining: entry.amount,
                created_at: Utc::now(),
            };
            state.bank_entries.insert(stored.id, stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn commit_draws(&self, ship_id: &str, draws: &[Draw]) -> Result<Vec<BankEntry>> {
        self.mutate(|state| {
            let mut touched = Vec::with_capacity(draws.len());
            for draw in draws {
                let entry = state
                    .bank_entries
                    .get_mut(&draw.entry_id)
                    .filter(|e| e.ship_id == ship_id)
                    .ok_or_else(|| LedgerError::StorageError {
                        message: format!(
                            "bank entry {} does not belong to ship {}",
                            draw.entry_id, ship_id
                        ),
                    })?;

                if draw.amount <= 0.0 || draw.amount > entry.remaining + BALANCE_EPSILON {
                    return Err(LedgerError::StorageError {
                        message: format!(
                            "draw of {} exceeds remaining {} on bank entry {}",
                            draw.amount, entry.remaining, entry.id
                        ),
                    });
                }

                entry.remaining = (entry.remaining - draw.amount).max(0.0);
                touched.push(entry.clone());
            }
            Ok(touched)
        })
        .await
    }
}

#[async_trait]
impl PoolRepository for MemoryLedgerStore {
    async fn pool_of(&self, ship_id: &str, year: i32) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(pool_of(&state, ship_id, year))
    }

    async fn insert_pool(&self, pool: NewPool) -> Result<Pool> {
        self.mutate(|state| {
            for member in &pool.members {
                if let Some(pool_id) = pool_of(state, &member.ship_id, pool.year) {
                    return Err(LedgerError::AlreadyPooled {
                        ship_id: member.ship_id.clone(),
                        year: pool.year,
                        pool_id,
                    });
                }
            }

            state.next_pool_seq += 1;
            let stored = Pool {
                pool_id: format!("POOL-{}-{:04}", pool.year, state.next_pool_seq),
                year: pool.year,
                members: pool.members,
                total_cb: pool.total_cb,
                created_at: Utc::now(),
            };
            state.pools.insert(stored.pool_id.clone(), stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn get_pool(&self, pool_id: &str) -> Result<Option<Pool>> {
        let state = self.state.read().await;
        Ok(state.pools.get(pool_id).cloned())
    }

    async fn list_pools(&self, year: Option<i32>) -> Result<Vec<Pool>> {
        let state = self.state.read().await;
        let mut pools: Vec<Pool> = state
            .pools
            .values()
            .filter(|p| year.map_or(true, |y| p.year == y))
            .cloned()
            .collect();
        pools.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.pool_id.cmp(&b.pool_id)));
        Ok(pools)
    }
}
