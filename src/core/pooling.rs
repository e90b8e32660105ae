//! Pooling engine: nets the compliance balances of several ships for one year.
//!
//! Redistribution policy: deficit members, in the order given by the caller,
//! are each raised to exactly zero. Surplus is drawn from surplus members in
//! the same input order, so the first surplus holder is drained before the
//! second is touched. Whatever surplus is left stays with the member it
//! belongs to. Members at zero are never changed.
//!
//! A ship that has banked surplus from the pool year cannot join a pool for
//! that year, and banking after pooling starts from the member's `cb_after`,
//! so no surplus is counted by both the bank and a pool.

use crate::core::calculator::CbCalculator;
use crate::core::locks::ShipLocks;
use crate::core::BALANCE_EPSILON;
use crate::domain::model::{NewPool, Pool, PoolMember};
use crate::domain::ports::{LedgerStore, TargetIntensity};
use crate::utils::error::{LedgerError, Result};
use std::collections::HashSet;
use std::sync::Arc;

pub struct PoolingEngine<S: LedgerStore, T: TargetIntensity> {
    store: Arc<S>,
    calculator: CbCalculator<S, T>,
    locks: Arc<ShipLocks>,
}

impl<S: LedgerStore, T: TargetIntensity> PoolingEngine<S, T> {
    pub fn new(store: Arc<S>, calculator: CbCalculator<S, T>, locks: Arc<ShipLocks>) -> Self {
        Self {
            store,
            calculator,
            locks,
        }
    }

    pub async fn create_pool(&self, year: i32, members: &[String]) -> Result<Pool> {
        validate_members(members)?;

        // Held until the pool is persisted: the membership check and the
        // insert form one critical section per member.
        let _guards = self.locks.lock_all(members).await;

        for ship_id in members {
            if let Some(pool_id) = self.store.pool_of(ship_id, year).await? {
                tracing::warn!(ship_id = %ship_id, year, pool_id = %pool_id, "ship already pooled");
                return Err(LedgerError::AlreadyPooled {
                    ship_id: ship_id.clone(),
                    year,
                    pool_id,
                });
            }
        }

        // 已存入銀行的盈餘不可再分配
        for ship_id in members {
            let banked: f64 = self
                .store
                .bank_entries(ship_id)
                .await?
                .iter()
                .filter(|e| e.origin_year == year)
                .map(|e| e.amount)
                .sum();
            if banked > 0.0 {
                tracing::warn!(ship_id = %ship_id, year, banked, "pool rejected, surplus already banked");
                return Err(LedgerError::InvalidPool {
                    reason: format!(
                        "ship {} has already banked {:.2} of its {} surplus",
                        ship_id, banked, year
                    ),
                });
            }
        }

        let mut before = Vec::with_capacity(members.len());
        for ship_id in members {
            before.push(self.calculator.compute_cb(ship_id, year).await?.cb_gco2eq);
        }

        let total_cb: f64 = before.iter().sum();
        if total_cb < 0.0 {
            tracing::warn!(year, total_cb, members = members.len(), "pool rejected");
            return Err(LedgerError::InvalidPool {
                reason: format!(
                    "combined compliance balance {:.2} is negative",
                    total_cb
                ),
            });
        }

        let after = redistribute(&before);
        let pool_members: Vec<PoolMember> = members
            .iter()
            .zip(before.iter().zip(after.iter()))
            .map(|(ship_id, (&cb_before, &cb_after))| PoolMember {
                ship_id: ship_id.clone(),
                cb_before,
                cb_after,
            })
            .collect();
        check_pool_invariants(&pool_members)?;

        let pool = self
            .store
            .insert_pool(NewPool {
                year,
                members: pool_members,
                total_cb,
            })
            .await?;

        tracing::info!(pool_id = %pool.pool_id, year, total_cb, members = pool.members.len(), "pool created");
        Ok(pool)
    }

    pub async fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.store
            .get_pool(pool_id)
            .await?
            .ok_or_else(|| LedgerError::PoolNotFound {
                pool_id: pool_id.to_string(),
            })
    }

    pub async fn list_pools(&self, year: Option<i32>) -> Result<Vec<Pool>> {
        self.store.list_pools(year).await
    }
}

fn validate_members(members: &[String]) -> Result<()> {
    if members.is_empty() {
        return Err(LedgerError::InvalidPool {
            reason: "a pool needs at least one member".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(members.len());
    for ship_id in members {
        if ship_id.trim().is_empty() {
            return Err(LedgerError::InvalidPool {
                reason: "member shipId cannot be empty".to_string(),
            });
        }
        if !seen.insert(ship_id.as_str()) {
            return Err(LedgerError::InvalidPool {
                reason: format!("ship {} is listed more than once", ship_id),
            });
        }
    }
    Ok(())
}

/// Deficit-covering redistribution, see the module docs. The output has the
/// same length and order as `before`.
pub fn redistribute(before: &[f64]) -> Vec<f64> {
    let mut after = before.to_vec();
    let donors: Vec<usize> = (0..before.len()).filter(|&i| before[i] > 0.0).collect();
    let mut next_donor = 0;

    for i in 0..before.len() {
        if before[i] >= 0.0 {
            continue;
        }

        let mut need = -before[i];
        while need > 0.0 && next_donor < donors.len() {
            let d = donors[next_donor];
            let take = need.min(after[d]);
            after[d] -= take;
            need -= take;
            if after[d] <= 0.0 {
                after[d] = 0.0;
                next_donor += 1;
            }
        }
        after[i] = if need > 0.0 { -need } else { 0.0 };
    }
    after
}

/// Post-conditions every persisted pool satisfies.
pub fn check_pool_invariants(members: &[PoolMember]) -> Result<()> {
    let sum_before: f64 = members.iter().map(|m| m.cb_before).sum();
    let sum_after: f64 = members.iter().map(|m| m.cb_after).sum();
    let magnitude: f64 = members.iter().map(|m| m.cb_before.abs()).sum();
    let tolerance = BALANCE_EPSILON * magnitude.max(1.0);

    if (sum_before - sum_after).abs() > tolerance {
        return Err(LedgerError::InvalidPool {
            reason: format!(
                "redistribution changed the total from {} to {}",
                sum_before, sum_after
            ),
        });
    }

    for m in members {
        if m.cb_before >= 0.0 && m.cb_after < 0.0 {
            return Err(LedgerError::InvalidPool {
                reason: format!("surplus ship {} would end in deficit", m.ship_id),
            });
        }
        if m.cb_before < 0.0 && (m.cb_after < m.cb_before || m.cb_after > 0.0) {
            return Err(LedgerError::InvalidPool {
                reason: format!("deficit ship {} would end worse off", m.ship_id),
            });
        }
    }
    Ok(())
}
