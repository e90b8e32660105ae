//! Banking ledger: carries surplus compliance balance forward as bank entries
//! and draws them down in later years.
//!
//! Every mutation runs under the ship's lock and re-derives what it needs
//! (current CB, current entries) inside that lock, so two concurrent calls for
//! the same ship can never both spend the same `remaining`.

use crate::core::calculator::CbCalculator;
use crate::core::locks::ShipLocks;
use crate::core::BALANCE_EPSILON;
use crate::domain::model::{BankEntry, Confirmation, Draw, NewBankEntry};
use crate::domain::ports::{LedgerStore, TargetIntensity};
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::validate_amount;
use std::sync::Arc;

pub struct BankingLedger<S: LedgerStore, T: TargetIntensity> {
    store: Arc<S>,
    calculator: CbCalculator<S, T>,
    locks: Arc<ShipLocks>,
}

impl<S: LedgerStore, T: TargetIntensity> BankingLedger<S, T> {
    pub fn new(store: Arc<S>, calculator: CbCalculator<S, T>, locks: Arc<ShipLocks>) -> Self {
        Self {
            store,
            calculator,
            locks,
        }
    }

    pub async fn bank(&self, ship_id: &str, year: i32, amount: f64) -> Result<Confirmation> {
        validate_amount(amount)?;
        let _guard = self.locks.lock(ship_id).await;

        let cb = self.calculator.compute_cb(ship_id, year).await?;
        let balance = self.pooled_balance(ship_id, year).await?.unwrap_or(cb.cb_gco2eq);
        let entries = self.store.bank_entries(ship_id).await?;
        let bankable = bankable_surplus(balance, &entries, year);

        if amount > bankable + BALANCE_EPSILON || bankable <= 0.0 {
            tracing::warn!(ship_id, year, amount, bankable, "bank rejected");
            return Err(LedgerError::InsufficientSurplus {
                ship_id: ship_id.to_string(),
                year,
                requested: amount,
                available: bankable,
            });
        }
        // 容差內的超額以可存量為準
        let amount = amount.min(bankable);

        let entry = self
            .store
            .insert_bank_entry(NewBankEntry {
                ship_id: ship_id.to_string(),
                origin_year: year,
                amount,
            })
            .await?;

        tracing::info!(ship_id, year, amount, entry_id = entry.id, "surplus banked");
        Ok(Confirmation {
            message: format!(
                "Banked {:.2} gCO2e of {} surplus for ship {}",
                amount, year, ship_id
            ),
            ship_id: ship_id.to_string(),
            year,
            amount,
            entries: vec![entry],
        })
    }

    pub async fn apply(&self, ship_id: &str, year: i32, amount: f64) -> Result<Confirmation> {
        validate_amount(amount)?;
        let _guard = self.locks.lock(ship_id).await;

        let entries = self.store.bank_entries(ship_id).await?;
        let draws = plan_fifo_draws(&entries, year, amount).map_err(|available| {
            tracing::warn!(ship_id, year, amount, available, "apply rejected");
            LedgerError::InsufficientBankedBalance {
                ship_id: ship_id.to_string(),
                year,
                requested: amount,
                available,
            }
        })?;

        let touched = self.store.commit_draws(ship_id, &draws).await?;
        let amount: f64 = draws.iter().map(|d| d.amount).sum();

        tracing::info!(ship_id, year, amount, entries = draws.len(), "banked surplus applied");
        Ok(Confirmation {
            message: format!(
                "Applied {:.2} gCO2e of banked surplus to {} for ship {}",
                amount, year, ship_id
            ),
            ship_id: ship_id.to_string(),
            year,
            amount,
            entries: touched,
        })
    }

    /// The ship's post-pool balance when it belongs to a pool for `year`.
    async fn pooled_balance(&self, ship_id: &str, year: i32) -> Result<Option<f64>> {
        let Some(pool_id) = self.store.pool_of(ship_id, year).await? else {
            return Ok(None);
        };
        let pool = self
            .store
            .get_pool(&pool_id)
            .await?
            .ok_or_else(|| LedgerError::StorageError {
                message: format!("pool {} of ship {} is missing", pool_id, ship_id),
            })?;
        Ok(pool
            .members
            .iter()
            .find(|m| m.ship_id == ship_id)
            .map(|m| m.cb_after))
    }

    pub async fn available_to_apply(&self, ship_id: &str, year: i32) -> Result<f64> {
        let entries = self.store.bank_entries(ship_id).await?;
        Ok(available_before(&entries, year))
    }

    pub async fn records(&self, ship_id: &str, origin_year: Option<i32>) -> Result<Vec<BankEntry>> {
        let entries = self.store.bank_entries(ship_id).await?;
        Ok(entries
            .into_iter()
            .filter(|e| origin_year.map_or(true, |y| e.origin_year == y))
            .collect())
    }
}

/// Surplus of `year` not yet banked. `cb` is the ship's balance for the year,
/// after pooling when it is in a pool. Never negative.
pub fn bankable_surplus(cb: f64, entries: &[BankEntry], year: i32) -> f64 {
    let already: f64 = entries
        .iter()
        .filter(|e| e.origin_year == year)
        .map(|e| e.amount)
        .sum();
    (cb - already).max(0.0)
}

/// Sum of `remaining` over entries that originated strictly before `year`.
pub fn available_before(entries: &[BankEntry], year: i32) -> f64 {
    entries
        .iter()
        .filter(|e| e.origin_year < year)
        .map(|e| e.remaining)
        .sum()
}

/// Splits `amount` over the eligible entries, oldest origin year first (ties
/// by entry id). Returns the available total when it does not cover `amount`.
/// An `amount` within `BALANCE_EPSILON` above the total draws the total.
pub fn plan_fifo_draws(
    entries: &[BankEntry],
    year: i32,
    amount: f64,
) -> std::result::Result<Vec<Draw>, f64> {
    let available = available_before(entries, year);
    if amount > available + BALANCE_EPSILON || available <= 0.0 {
        return Err(available);
    }

    let mut eligible: Vec<&BankEntry> = entries
        .iter()
        .filter(|e| e.origin_year < year && e.remaining > 0.0)
        .collect();
    eligible.sort_by_key(|e| (e.origin_year, e.id));

    let mut left = amount;
    let mut draws = Vec::new();
    for entry in eligible {
        if left <= 0.0 {
            break;
        }
        let take = left.min(entry.remaining);
        draws.push(Draw {
            entry_id: entry.id,
            amount: take,
        });
        left -= take;
    }
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: u64, origin_year: i32, amount: f64, remaining: f64) -> BankEntry {
        BankEntry {
            id,
            ship_id: "R001".to_string(),
            origin_year,
            amount,
            remaining,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fifo_drains_oldest_first() {
        let entries = vec![entry(2, 2023, 80.0, 80.0), entry(1, 2022, 50.0, 50.0)];
        let draws = plan_fifo_draws(&entries, 2024, 70.0).unwrap();
        assert_eq!(
            draws,
            vec![
                Draw {
                    entry_id: 1,
                    amount: 50.0
                },
                Draw {
                    entry_id: 2,
                    amount: 20.0
                },
            ]
        );
    }

    #[test]
    fn test_fifo_single_entry_when_it_covers() {
        let entries = vec![entry(1, 2022, 50.0, 50.0), entry(2, 2023, 80.0, 80.0)];
        let draws = plan_fifo_draws(&entries, 2024, 40.0).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].entry_id, 1);
    }

    #[test]
    fn test_same_year_entries_are_not_eligible() {
        let entries = vec![entry(1, 2024, 100.0, 100.0)];
        assert_eq!(available_before(&entries, 2024), 0.0);
        assert_eq!(plan_fifo_draws(&entries, 2024, 10.0), Err(0.0));
        assert_eq!(available_before(&entries, 2025), 100.0);
    }

    #[test]
    fn test_insufficient_reports_available() {
        let entries = vec![entry(1, 2022, 50.0, 30.0)];
        assert_eq!(plan_fifo_draws(&entries, 2024, 31.0), Err(30.0));
    }

    #[test]
    fn test_exhausted_entries_are_skipped() {
        let entries = vec![entry(1, 2022, 50.0, 0.0), entry(2, 2023, 80.0, 80.0)];
        let draws = plan_fifo_draws(&entries, 2024, 10.0).unwrap();
        assert_eq!(draws, vec![Draw { entry_id: 2, amount: 10.0 }]);
    }

    #[test]
    fn test_draws_never_exceed_available() {
        let entries = vec![entry(1, 2022, 60.0, 60.0), entry(2, 2023, 40.0, 40.0)];
        let draws = plan_fifo_draws(&entries, 2024, 100.000_000_9).unwrap();
        let drawn: f64 = draws.iter().map(|d| d.amount).sum();
        assert_eq!(drawn, 100.0);
        assert_eq!(plan_fifo_draws(&[], 2024, 1e-7), Err(0.0));
    }

    #[test]
    fn test_bankable_subtracts_same_year_entries() {
        let entries = vec![entry(1, 2024, 30.0, 0.0), entry(2, 2023, 500.0, 500.0)];
        assert_eq!(bankable_surplus(100.0, &entries, 2024), 70.0);
        assert_eq!(bankable_surplus(20.0, &entries, 2024), 0.0);
        assert_eq!(bankable_surplus(-5.0, &[], 2024), 0.0);
    }
}
