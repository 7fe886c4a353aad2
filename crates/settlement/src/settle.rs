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

use parlay_matching::store::{Mutation, Store};
use parlay_sdk::types::{MarketId, Outcome, OutcomeId, Position, validate_settle_value};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::{SettlementEngine, SettlementError};

/// Profit of a position when its outcome settles at `settle_value`
///
/// Flat positions and positions without a basis realize nothing.
pub fn settlement_profit(net_position: i64, price_basis: u64, settle_value: u64) -> i64 {
	if net_position == 0 || price_basis == 0 {
		return 0;
	}
	let basis = price_basis as i64;
	let value = settle_value as i64;
	if net_position > 0 {
		net_position * (value - basis)
	} else {
		net_position.abs() * (basis - value)
	}
}

/// Mark a position settled with its final profit
pub fn settle_position(position: &mut Position, settle_value: u64) {
	position.settled_profit =
		settlement_profit(position.net_position, position.price_basis, settle_value);
	position.is_settled = true;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
	/// Set when a whole market was settled
	pub market_id: Option<MarketId>,
	pub settle_value: u64,
	pub outcomes: Vec<OutcomeId>,
	pub positions: Vec<Position>,
}

impl SettlementReport {
	pub fn total_settled_profit(&self) -> i64 {
		self.positions.iter().map(|p| p.settled_profit).sum()
	}
}

impl<S: Store> SettlementEngine<S> {
	/// Settle every outcome of a market to one value, in a single batch
	pub async fn settle_market(
		&self,
		market_id: MarketId,
		settle_value: u64,
	) -> Result<SettlementReport, SettlementError> {
		validate_settle_value(settle_value)
			.map_err(|_| SettlementError::InvalidSettleValue(settle_value))?;
		self.store
			.market(market_id)
			.await?
			.ok_or(SettlementError::UnknownMarket(market_id))?;

		let outcomes = self.store.market_outcomes(market_id).await?;
		let (mut mutations, report) = self.stage_settlement(&outcomes, settle_value).await?;
		mutations.push(Mutation::SettleMarket {
			market_id,
			settle_value,
		});
		self.store.batch(mutations).await?;

		info!(
			target: "settlement",
			"Market {} settled at {}: {} outcomes, {} positions, net settled profit {}",
			market_id,
			settle_value,
			report.outcomes.len(),
			report.positions.len(),
			report.total_settled_profit()
		);
		Ok(SettlementReport {
			market_id: Some(market_id),
			..report
		})
	}

	/// Settle one outcome, leaving the rest of its market open
	pub async fn settle_outcome(
		&self,
		outcome_id: OutcomeId,
		settle_value: u64,
	) -> Result<SettlementReport, SettlementError> {
		validate_settle_value(settle_value)
			.map_err(|_| SettlementError::InvalidSettleValue(settle_value))?;
		let outcome = self.load_outcome(outcome_id).await?;

		let (mutations, report) = self.stage_settlement(&[outcome], settle_value).await?;
		self.store.batch(mutations).await?;

		info!(
			target: "settlement",
			"Outcome {} settled at {}: {} positions, net settled profit {}",
			outcome_id,
			settle_value,
			report.positions.len(),
			report.total_settled_profit()
		);
		Ok(report)
	}

	async fn stage_settlement(
		&self,
		outcomes: &[Outcome],
		settle_value: u64,
	) -> Result<(Vec<Mutation>, SettlementReport), SettlementError> {
		let mut mutations = Vec::new();
		let mut report = SettlementReport {
			market_id: None,
			settle_value,
			outcomes: Vec::with_capacity(outcomes.len()),
			positions: Vec::new(),
		};

		for outcome in outcomes {
			if outcome.is_settled() {
				if !self.config.allow_resettle {
					return Err(SettlementError::AlreadySettled(outcome.id));
				}
				warn!(
					target: "settlement",
					"Re-settling outcome {} ({:?} -> {})",
					outcome.id, outcome.settle_value, settle_value
				);
			}

			for mut position in self.store.outcome_positions(outcome.id).await? {
				settle_position(&mut position, settle_value);
				mutations.push(Mutation::UpsertPosition(position.clone()));
				report.positions.push(position);
			}
			mutations.push(Mutation::SettleOutcome {
				outcome_id: outcome.id,
				settle_value,
			});
			report.outcomes.push(outcome.id);
		}

		Ok((mutations, report))
	}
}
