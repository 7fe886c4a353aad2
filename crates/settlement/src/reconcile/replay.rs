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

use parlay_matching::store::Store;
use parlay_sdk::types::{OutcomeId, Position};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{rebuild, risk_off_updates};
use crate::{
	engine::{SettlementEngine, SettlementError},
	settle::settle_position,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
	pub outcome_id: OutcomeId,
	pub trades_replayed: usize,
	/// Trades whose stored risk-off fields were rewritten
	pub risk_off_updated: usize,
	pub positions: Vec<Position>,
}

impl<S: Store> SettlementEngine<S> {
	/// Rebuild one outcome's positions from its trade history
	///
	/// Positions are zeroed and every trade is re-applied in ascending id
	/// order. Stored risk-off fields are refreshed when the store has
	/// them, and a settled outcome gets its settled profit recomputed.
	pub async fn replay_outcome(&self, outcome_id: OutcomeId) -> Result<ReplayReport, SettlementError> {
		let outcome = self.load_outcome(outcome_id).await?;
		let positions = self.store.outcome_positions(outcome_id).await?;
		let trades = self.store.outcome_trades(outcome_id).await?;

		let mut rebuilt = rebuild(outcome_id, &positions, &trades, self.config.system_user_id);

		if let Some(settle_value) = outcome.settle_value {
			let users: Vec<_> = rebuilt.ledger.positions().map(|p| p.user_id).collect();
			for user in users {
				if let Some(position) = rebuilt.ledger.position_mut(outcome_id, user) {
					settle_position(position, settle_value);
				}
			}
		}

		let mut mutations = if self.capabilities.trade_risk_off {
			risk_off_updates(&trades, &rebuilt.risk_off)
		} else {
			Vec::new()
		};
		let risk_off_updated = mutations.len();

		let positions: Vec<Position> = rebuilt.ledger.positions().cloned().collect();
		mutations.extend(rebuilt.ledger.into_mutations());
		if !mutations.is_empty() {
			self.store.batch(mutations).await?;
		}

		info!(
			target: "settlement",
			"Replayed outcome {}: {} trades, {} positions, {} risk-off rows refreshed",
			outcome_id,
			trades.len(),
			positions.len(),
			risk_off_updated
		);
		Ok(ReplayReport {
			outcome_id,
			trades_replayed: trades.len(),
			risk_off_updated,
			positions,
		})
	}

	/// Replay every outcome, each in its own batch
	pub async fn replay_positions(&self) -> Result<Vec<ReplayReport>, SettlementError> {
		let outcomes = self.store.outcomes().await?;
		let mut reports = Vec::with_capacity(outcomes.len());
		for outcome in outcomes {
			reports.push(self.replay_outcome(outcome.id).await?);
		}
		Ok(reports)
	}
}
