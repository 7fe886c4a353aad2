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
use parlay_sdk::types::{Order, Position, Trade, TradeId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{rebuild, risk_off_updates};
use crate::{
	engine::{SettlementEngine, SettlementError},
	validator::validate_trade,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoutReport {
	/// The deleted trade
	pub trade: Trade,
	/// Both legs' positions after the reversal
	pub positions: Vec<Position>,
	/// Maker order with its size reinstated, if the trade had one
	pub maker_order: Option<Order>,
	/// Later trades whose stored risk-off fields were rewritten
	pub risk_off_updated: usize,
}

impl<S: Store> SettlementEngine<S> {
	/// Reverse one trade and delete it
	///
	/// The outcome's history is replayed without the trade, so a reversed
	/// close-out restores the basis and closed profit the user had before
	/// it, and later trades of either leg get their realized deltas
	/// rewritten. Only the two legs' positions are written. The maker
	/// order gets the trade's contracts back.
	pub async fn backout_trade(&self, trade_id: TradeId) -> Result<BackoutReport, SettlementError> {
		let trade = self
			.store
			.trade(trade_id)
			.await?
			.ok_or(SettlementError::UnknownTrade(trade_id))?;
		validate_trade(&trade)?;

		let outcome_id = trade.outcome_id;
		let outcome = self.load_outcome(outcome_id).await?;
		if outcome.is_settled() {
			return Err(SettlementError::AlreadySettled(outcome_id));
		}

		let positions = self.store.outcome_positions(outcome_id).await?;
		let history: Vec<Trade> = self
			.store
			.outcome_trades(outcome_id)
			.await?
			.into_iter()
			.filter(|t| t.id != trade_id)
			.collect();
		let rebuilt = rebuild(outcome_id, &positions, &history, self.config.system_user_id);

		let maker_user = trade.maker_user_id.unwrap_or(self.config.system_user_id);
		let mut legs = vec![trade.taker_user_id, maker_user];
		legs.dedup();
		let leg_positions: Vec<Position> = legs
			.iter()
			.map(|&user| {
				rebuilt
					.ledger
					.position(outcome_id, user)
					.cloned()
					.unwrap_or_else(|| Position::flat(outcome_id, user))
			})
			.collect();

		let maker_order = match trade.maker_order_id {
			Some(order_id) => match self.store.order(order_id).await? {
				Some(mut order) => {
					order.reinstate(trade.contracts);
					Some(order)
				}
				None => {
					warn!(
						target: "settlement",
						"Maker order {} of trade {} no longer exists",
						order_id, trade_id
					);
					None
				}
			},
			None => None,
		};

		let mut mutations = if self.capabilities.trade_risk_off {
			risk_off_updates(&history, &rebuilt.risk_off)
		} else {
			Vec::new()
		};
		let risk_off_updated = mutations.len();
		mutations.extend(leg_positions.iter().cloned().map(Mutation::UpsertPosition));
		if let Some(order) = &maker_order {
			mutations.push(Mutation::ReinstateOrder {
				order_id: order.id,
				quantity: trade.contracts,
			});
		}
		mutations.push(Mutation::DeleteTrade(trade_id));
		self.store.batch(mutations).await?;

		info!(
			target: "settlement",
			"Backed out trade {} ({} contracts @ {} on outcome {}, {} risk-off rows rewritten)",
			trade_id, trade.contracts, trade.price, outcome_id, risk_off_updated
		);
		Ok(BackoutReport {
			trade,
			positions: leg_positions,
			maker_order,
			risk_off_updated,
		})
	}
}
