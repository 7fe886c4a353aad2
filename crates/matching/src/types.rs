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

use parlay_sdk::types::{
	NewOrder, Order, OrderId, OrderStatus, OutcomeId, Side, Trade, UserId, ValidationError,
	validate_price, validate_size,
};
use serde::{Deserialize, Serialize};

/// Order request received from a caller
///
/// Validated by [`OrderCommand::validate`] before anything touches the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCommand {
	pub outcome_id: OutcomeId,
	pub user_id: UserId,
	pub side: Side,
	/// Limit price in cents
	pub price: u64,
	pub size: u64,
}

impl OrderCommand {
	pub fn new(outcome_id: OutcomeId, user_id: UserId, side: Side, price: u64, size: u64) -> Self {
		Self {
			outcome_id,
			user_id,
			side,
			price,
			size,
		}
	}

	pub fn validate(&self) -> Result<(), ValidationError> {
		validate_price(self.price)?;
		validate_size(self.size)
	}

	pub fn into_new_order(self) -> NewOrder {
		NewOrder::resting(self.outcome_id, self.user_id, self.side, self.price, self.size)
	}
}

/// One match between a taker and a resting maker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
	pub maker_order_id: OrderId,
	pub maker_user_id: UserId,
	pub taker_order_id: OrderId,
	pub taker_user_id: UserId,
	pub taker_side: Side,
	/// Execution price (always the maker's price)
	pub price: u64,
	pub quantity: u64,
}

/// Outcome of placing one order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
	/// Order row as of the last committed batch
	pub order: Order,
	pub fills: Vec<Fill>,
	pub trades: Vec<Trade>,
}

impl Execution {
	pub fn unchanged(order: Order) -> Self {
		Self {
			order,
			fills: Vec::new(),
			trades: Vec::new(),
		}
	}

	/// Fold a later matching cycle of the same order into this result
	pub fn absorb(&mut self, later: Execution) {
		self.order = later.order;
		self.fills.extend(later.fills);
		self.trades.extend(later.trades);
	}

	pub fn fully_filled(&self) -> bool {
		self.order.status == OrderStatus::Filled
	}

	pub fn filled_quantity(&self) -> u64 {
		self.fills.iter().map(|f| f.quantity).sum()
	}
}
