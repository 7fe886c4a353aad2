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

//! Reconciliation tools
//!
//! All of them start from zeroed positions and push trade history back
//! through [`parlay_matching::ledger`], so re-running any of them after a
//! partial failure converges on the same state.

mod backout;
mod closed_profit;
mod replay;

use std::collections::HashMap;

use parlay_matching::{ledger::LedgerBatch, store::Mutation};
use parlay_sdk::types::{OutcomeId, Position, RiskOff, Trade, TradeId, UserId};

pub use backout::BackoutReport;
pub use closed_profit::{ClosedProfitReport, ClosedProfitRepair};
pub use replay::ReplayReport;

/// Position with its trading state cleared; settlement fields are kept
fn zeroed(position: &Position) -> Position {
	Position {
		net_position: 0,
		price_basis: 0,
		closed_profit: 0,
		..position.clone()
	}
}

/// Ledger state rebuilt from history
struct Rebuilt {
	ledger: LedgerBatch,
	/// Realized deltas per replayed trade
	risk_off: Vec<(TradeId, RiskOff)>,
}

/// Re-apply `trades` (ascending id) to zeroed copies of `positions`
///
/// A maker-less trade books its maker leg on `system_user`.
fn rebuild(
	outcome_id: OutcomeId,
	positions: &[Position],
	trades: &[Trade],
	system_user: UserId,
) -> Rebuilt {
	let mut ledger = LedgerBatch::new();
	for position in positions {
		ledger.seed(zeroed(position));
	}

	let mut risk_off = Vec::with_capacity(trades.len());
	for trade in trades {
		let maker_user = trade.maker_user_id.unwrap_or(system_user);
		let side = trade.taker_side;
		let taker_leg =
			ledger.apply(outcome_id, trade.taker_user_id, side, trade.price, trade.contracts);
		let maker_leg =
			ledger.apply(outcome_id, maker_user, side.opposite(), trade.price, trade.contracts);
		risk_off.push((
			trade.id,
			RiskOff {
				taker_realized: taker_leg.realized,
				maker_realized: maker_leg.realized,
			},
		));
	}

	Rebuilt { ledger, risk_off }
}

/// Risk-off rewrites for trades whose stored deltas differ from `rebuilt`
fn risk_off_updates(trades: &[Trade], rebuilt: &[(TradeId, RiskOff)]) -> Vec<Mutation> {
	let stored: HashMap<TradeId, Option<RiskOff>> =
		trades.iter().map(|t| (t.id, t.risk_off)).collect();
	rebuilt
		.iter()
		.filter(|(trade_id, risk_off)| stored.get(trade_id).copied().flatten() != Some(*risk_off))
		.map(|&(trade_id, risk_off)| Mutation::SetTradeRiskOff {
			trade_id,
			risk_off: Some(risk_off),
		})
		.collect()
}
