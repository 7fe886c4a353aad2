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

mod file;
mod memory;

use async_trait::async_trait;
use parlay_sdk::types::{
	Market, MarketId, NewOrder, NewTrade, Order, OrderId, Outcome, OutcomeId,
	Position, RiskOff, Side, Trade, TradeId, UserId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileStore;
pub use memory::{MemoryState, MemoryStore};

/// Error types for store operations
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Row not found: {0}")]
	NotFound(String),
	#[error("Condition failed: {0}")]
	ConditionFailed(String),
	#[error("Constraint violated: {0}")]
	Constraint(String),
	#[error("Storage I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Optional schema features of a store
///
/// Resolved once when an engine is constructed; engines never re-check
/// the schema per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCapabilities {
	/// Trades carry per-leg realized profit (risk-off) columns
	pub trade_risk_off: bool,
}

impl Default for StoreCapabilities {
	fn default() -> Self {
		Self {
			trade_risk_off: true,
		}
	}
}

/// One write statement inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
	/// Insert an order row (synthetic auction/manual legs)
	InsertOrder(NewOrder),
	/// Take `quantity` off a resting order
	///
	/// Fails with [`StoreError::ConditionFailed`] unless the order still
	/// rests with exactly `expected_remaining`, so a fill computed from a
	/// stale read never revives a canceled order or over-fills a maker.
	FillOrder {
		order_id: OrderId,
		expected_remaining: u64,
		quantity: u64,
	},
	/// Give `quantity` back to an order, capped at its original size
	ReinstateOrder { order_id: OrderId, quantity: u64 },
	/// Cancel an order if it is owned by `user_id` and still resting
	CancelOrder { order_id: OrderId, user_id: UserId },
	InsertTrade(NewTrade),
	SetTradeRiskOff {
		trade_id: TradeId,
		risk_off: Option<RiskOff>,
	},
	DeleteTrade(TradeId),
	UpsertPosition(Position),
	SettleOutcome {
		outcome_id: OutcomeId,
		settle_value: u64,
	},
	SettleMarket {
		market_id: MarketId,
		settle_value: u64,
	},
}

/// Rows created by a committed batch, in mutation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReceipt {
	pub orders: Vec<Order>,
	pub trades: Vec<Trade>,
}

/// Transactional store consumed by the engines
///
/// Reads return typed rows. Writes outside of [`Store::batch`] are
/// limited to single inserts; everything that must stay consistent
/// (order sizes, trades, positions, settlement stamps) goes through
/// `batch`, which commits every mutation or none of them.
///
/// Implementations:
/// - [`MemoryStore`]: in-process state (tests, embedding)
/// - [`FileStore`]: the same state, written to a JSON file before each
///   write is applied
#[async_trait]
pub trait Store: Send + Sync {
	fn capabilities(&self) -> StoreCapabilities;

	async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError>;

	async fn market(&self, market_id: MarketId) -> Result<Option<Market>, StoreError>;

	async fn outcome(&self, outcome_id: OutcomeId) -> Result<Option<Outcome>, StoreError>;

	/// All outcomes, ascending id
	async fn outcomes(&self) -> Result<Vec<Outcome>, StoreError>;

	async fn market_outcomes(&self, market_id: MarketId) -> Result<Vec<Outcome>, StoreError>;

	async fn order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

	/// Open and partial orders on one side of an outcome, ascending id
	async fn resting_orders(
		&self,
		outcome_id: OutcomeId,
		side: Side,
	) -> Result<Vec<Order>, StoreError>;

	/// Open and partial orders, optionally restricted to one user
	async fn user_resting_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError>;

	async fn position(
		&self,
		outcome_id: OutcomeId,
		user_id: UserId,
	) -> Result<Option<Position>, StoreError>;

	async fn user_positions(&self, user_id: UserId) -> Result<Vec<Position>, StoreError>;

	async fn outcome_positions(&self, outcome_id: OutcomeId) -> Result<Vec<Position>, StoreError>;

	async fn trade(&self, trade_id: TradeId) -> Result<Option<Trade>, StoreError>;

	/// Trades of one outcome, ascending id
	async fn outcome_trades(&self, outcome_id: OutcomeId) -> Result<Vec<Trade>, StoreError>;

	async fn insert_user(&self, name: &str) -> Result<UserId, StoreError>;

	async fn insert_market(&self, name: &str) -> Result<Market, StoreError>;

	async fn insert_outcome(&self, market_id: MarketId, name: &str) -> Result<Outcome, StoreError>;

	async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

	/// Apply all mutations atomically
	async fn batch(&self, mutations: Vec<Mutation>) -> Result<BatchReceipt, StoreError>;
}
