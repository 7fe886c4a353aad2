// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use parlay_matching::store::{Mutation, Store};
use parlay_sdk::types::{OutcomeId, Trade, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{SettlementEngine, SettlementError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedProfitRepair {
	pub outcome_id: OutcomeId,
	pub user_id: UserId,
	pub stored: i64,
	pub recomputed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedProfitReport {
	pub outcomes_checked: usize,
	/// Outcomes with trades that carry no risk-off fields
	pub outcomes_skipped: Vec<OutcomeId>,
	pub repairs: Vec<ClosedProfitRepair>,
}

/// Sum of realized deltas per user, or None if any trade lacks them
fn realized_by_user(trades: &[Trade], system_user: UserId) -> Option<HashMap<UserId, i64>> {
	let mut sums: HashMap<UserId, i64> = HashMap::new();
	for trade in trades {
		let risk_off = trade.risk_off?;
		*sums.entry(trade.taker_user_id).or_default() += risk_off.taker_realized;
		*sums
			.entry(trade.maker_user_id.unwrap_or(system_user))
			.or_default() += risk_off.maker_realized;
	}
	Some(sums)
}

impl<S: Store> SettlementEngine<S> {
	/// Check every position's closed profit against its trades' realized deltas
	///
	/// Mismatches are overwritten with the summed deltas. Basis and net
	/// position are left alone; use replay to re-derive those.
	pub async fn recompute_closed_profit(&self) -> Result<ClosedProfitReport, SettlementError> {
		if !self.capabilities.trade_risk_off {
			return Err(SettlementError::Unsupported(
				"trades carry no risk-off fields".to_string(),
			));
		}

		let mut report = ClosedProfitReport::default();
		for outcome in self.store.outcomes().await? {
			let trades = self.store.outcome_trades(outcome.id).await?;
			let Some(sums) = realized_by_user(&trades, self.config.system_user_id) else {
				warn!(
					target: "settlement",
					"Skipping outcome {}: trades without risk-off fields",
					outcome.id
				);
				report.outcomes_skipped.push(outcome.id);
				continue;
			};
			report.outcomes_checked += 1;

			let mut mutations = Vec::new();
			for mut position in self.store.outcome_positions(outcome.id).await? {
				let recomputed = sums.get(&position.user_id).copied().unwrap_or(0);
				if position.closed_profit == recomputed {
					continue;
				}
				report.repairs.push(ClosedProfitRepair {
					outcome_id: outcome.id,
					user_id: position.user_id,
					stored: position.closed_profit,
					recomputed,
				});
				position.closed_profit = recomputed;
				mutations.push(Mutation::UpsertPosition(position));
			}
			if !mutations.is_empty() {
				self.store.batch(mutations).await?;
			}
		}

		info!(
			target: "settlement",
			"Closed profit check: {} outcomes, {} skipped, {} repaired",
			report.outcomes_checked,
			report.outcomes_skipped.len(),
			report.repairs.len()
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use parlay_sdk::types::{RiskOff, Side};

	use super::*;

	fn trade(taker: UserId, maker: Option<UserId>, risk_off: Option<RiskOff>) -> Trade {
		Trade {
			id: 1,
			outcome_id: 1,
			price: 5000,
			contracts: 1,
			created_at: Utc::now(),
			taker_user_id: taker,
			maker_user_id: maker,
			taker_side: Side::Buy,
			taker_order_id: None,
			maker_order_id: None,
			risk_off,
		}
	}

	#[test]
	fn test_sums_per_user() {
		let trades = vec![
			trade(1, Some(2), Some(RiskOff { taker_realized: 100, maker_realized: -100 })),
			trade(2, None, Some(RiskOff { taker_realized: 40, maker_realized: -40 })),
		];
		let sums = realized_by_user(&trades, 0).unwrap();
		assert_eq!(sums[&1], 100);
		assert_eq!(sums[&2], -60);
		assert_eq!(sums[&0], -40);
	}

	#[test]
	fn test_missing_risk_off_gives_none() {
		let trades = vec![trade(1, Some(2), None)];
		assert!(realized_by_user(&trades, 0).is_none());
	}
}
