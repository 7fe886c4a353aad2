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

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parlay_sdk::types::{
	Market, MarketId, NewOrder, NewTrade, Order, OrderId, OrderStatus, Outcome, OutcomeId,
	Position, Side, Trade, TradeId, User, UserId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{BatchReceipt, Mutation, Store, StoreCapabilities, StoreError};

/// Complete contents of an in-process store
///
/// Serializable so [`super::FileStore`] can persist it as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryState {
	users: BTreeMap<UserId, User>,
	markets: BTreeMap<MarketId, Market>,
	outcomes: BTreeMap<OutcomeId, Outcome>,
	orders: BTreeMap<OrderId, Order>,
	trades: BTreeMap<TradeId, Trade>,
	/// outcome -> user -> position
	positions: BTreeMap<OutcomeId, BTreeMap<UserId, Position>>,
	last_user_id: UserId,
	last_market_id: MarketId,
	last_outcome_id: OutcomeId,
	last_order_id: OrderId,
	last_trade_id: TradeId,
}

impl MemoryState {
	pub(super) fn insert_order(
		&mut self,
		order: NewOrder,
		now: DateTime<Utc>,
	) -> Result<Order, StoreError> {
		if !self.outcomes.contains_key(&order.outcome_id) {
			return Err(StoreError::Constraint(format!(
				"order references unknown outcome {}",
				order.outcome_id
			)));
		}
		if !self.users.contains_key(&order.user_id) {
			return Err(StoreError::Constraint(format!(
				"order references unknown user {}",
				order.user_id
			)));
		}
		if order.remaining_size > order.original_size {
			return Err(StoreError::Constraint(
				"remaining size exceeds original size".to_string(),
			));
		}

		self.last_order_id += 1;
		let order = order.into_order(self.last_order_id, now);
		self.orders.insert(order.id, order.clone());
		Ok(order)
	}

	fn insert_trade(
		&mut self,
		mut trade: NewTrade,
		capabilities: StoreCapabilities,
		now: DateTime<Utc>,
	) -> Result<Trade, StoreError> {
		if !self.outcomes.contains_key(&trade.outcome_id) {
			return Err(StoreError::Constraint(format!(
				"trade references unknown outcome {}",
				trade.outcome_id
			)));
		}
		if !capabilities.trade_risk_off {
			trade.risk_off = None;
		}

		self.last_trade_id += 1;
		let trade = trade.into_trade(self.last_trade_id, now);
		self.trades.insert(trade.id, trade.clone());
		Ok(trade)
	}

	pub(super) fn add_user(&mut self, name: &str) -> UserId {
		self.last_user_id += 1;
		let id = self.last_user_id;
		self.users.insert(
			id,
			User {
				id,
				name: name.to_string(),
			},
		);
		id
	}

	pub(super) fn add_market(&mut self, name: &str) -> Market {
		self.last_market_id += 1;
		let market = Market {
			id: self.last_market_id,
			name: name.to_string(),
			settle_value: None,
		};
		self.markets.insert(market.id, market.clone());
		market
	}

	pub(super) fn add_outcome(&mut self, market_id: MarketId, name: &str) -> Result<Outcome, StoreError> {
		if !self.markets.contains_key(&market_id) {
			return Err(StoreError::Constraint(format!(
				"outcome references unknown market {}",
				market_id
			)));
		}
		self.last_outcome_id += 1;
		let outcome = Outcome {
			id: self.last_outcome_id,
			market_id,
			name: name.to_string(),
			settle_value: None,
		};
		self.outcomes.insert(outcome.id, outcome.clone());
		Ok(outcome)
	}

	/// Apply every mutation in order, stopping at the first failure
	///
	/// Callers run this on a copy and keep the copy only on success.
	pub(super) fn apply_batch(
		&mut self,
		mutations: Vec<Mutation>,
		capabilities: StoreCapabilities,
	) -> Result<BatchReceipt, StoreError> {
		let mut receipt = BatchReceipt::default();
		let now = Utc::now();
		for mutation in mutations {
			self.apply(mutation, capabilities, now, &mut receipt)?;
		}
		Ok(receipt)
	}

	fn apply(
		&mut self,
		mutation: Mutation,
		capabilities: StoreCapabilities,
		now: DateTime<Utc>,
		receipt: &mut BatchReceipt,
	) -> Result<(), StoreError> {
		match mutation {
			Mutation::InsertOrder(order) => {
				let order = self.insert_order(order, now)?;
				receipt.orders.push(order);
			}
			Mutation::FillOrder {
				order_id,
				expected_remaining,
				quantity,
			} => {
				let order = self
					.orders
					.get_mut(&order_id)
					.ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
				if !order.is_resting()
					|| order.remaining_size != expected_remaining
					|| quantity > order.remaining_size
				{
					return Err(StoreError::ConditionFailed(format!(
						"order {} is {:?} with {} remaining, expected {} to fill {}",
						order_id, order.status, order.remaining_size, expected_remaining, quantity
					)));
				}
				order.fill(quantity);
			}
			Mutation::ReinstateOrder { order_id, quantity } => {
				self.orders
					.get_mut(&order_id)
					.ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?
					.reinstate(quantity);
			}
			Mutation::CancelOrder { order_id, user_id } => {
				let order = self
					.orders
					.get_mut(&order_id)
					.ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
				if order.user_id != user_id || !order.status.is_resting() {
					return Err(StoreError::ConditionFailed(format!(
						"order {} is not a resting order of user {}",
						order_id, user_id
					)));
				}
				order.status = OrderStatus::Canceled;
			}
			Mutation::InsertTrade(trade) => {
				let trade = self.insert_trade(trade, capabilities, now)?;
				receipt.trades.push(trade);
			}
			Mutation::SetTradeRiskOff { trade_id, risk_off } => {
				if !capabilities.trade_risk_off {
					return Err(StoreError::Constraint(
						"store has no risk-off columns".to_string(),
					));
				}
				let trade = self
					.trades
					.get_mut(&trade_id)
					.ok_or_else(|| StoreError::NotFound(format!("trade {}", trade_id)))?;
				trade.risk_off = risk_off;
			}
			Mutation::DeleteTrade(trade_id) => {
				self.trades
					.remove(&trade_id)
					.ok_or_else(|| StoreError::NotFound(format!("trade {}", trade_id)))?;
			}
			Mutation::UpsertPosition(position) => {
				if !position.basis_in_bounds() {
					return Err(StoreError::Constraint(format!(
						"position ({}, {}) has basis {} for net {}",
						position.outcome_id,
						position.user_id,
						position.price_basis,
						position.net_position
					)));
				}
				self.positions
					.entry(position.outcome_id)
					.or_default()
					.insert(position.user_id, position);
			}
			Mutation::SettleOutcome {
				outcome_id,
				settle_value,
			} => {
				let outcome = self
					.outcomes
					.get_mut(&outcome_id)
					.ok_or_else(|| StoreError::NotFound(format!("outcome {}", outcome_id)))?;
				outcome.settle_value = Some(settle_value);
			}
			Mutation::SettleMarket {
				market_id,
				settle_value,
			} => {
				let market = self
					.markets
					.get_mut(&market_id)
					.ok_or_else(|| StoreError::NotFound(format!("market {}", market_id)))?;
				market.settle_value = Some(settle_value);
			}
		}
		Ok(())
	}
}

/// In-memory store
///
/// All rows live behind one async mutex. A batch is applied to a copy
/// of the state and swapped in only if every mutation succeeded, which
/// gives the all-or-nothing semantics the engines rely on.
///
/// Characteristics:
/// - No durability (see [`super::FileStore`] for a persisted variant)
/// - Batches copy the whole state; sized for tests and small markets
/// - Enforces the row constraints a relational schema would
pub struct MemoryStore {
	pub(super) state: Mutex<MemoryState>,
	capabilities: StoreCapabilities,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::with_capabilities(StoreCapabilities::default())
	}

	/// Store emulating a schema with a different feature set
	pub fn with_capabilities(capabilities: StoreCapabilities) -> Self {
		Self::from_state(MemoryState::default(), capabilities)
	}

	pub fn from_state(state: MemoryState, capabilities: StoreCapabilities) -> Self {
		Self {
			state: Mutex::new(state),
			capabilities,
		}
	}

	/// Copy of the current state
	pub async fn snapshot(&self) -> MemoryState {
		self.state.lock().await.clone()
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Store for MemoryStore {
	fn capabilities(&self) -> StoreCapabilities {
		self.capabilities
	}

	async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
		Ok(self.state.lock().await.users.contains_key(&user_id))
	}

	async fn market(&self, market_id: MarketId) -> Result<Option<Market>, StoreError> {
		Ok(self.state.lock().await.markets.get(&market_id).cloned())
	}

	async fn outcome(&self, outcome_id: OutcomeId) -> Result<Option<Outcome>, StoreError> {
		Ok(self.state.lock().await.outcomes.get(&outcome_id).cloned())
	}

	async fn outcomes(&self) -> Result<Vec<Outcome>, StoreError> {
		Ok(self.state.lock().await.outcomes.values().cloned().collect())
	}

	async fn market_outcomes(&self, market_id: MarketId) -> Result<Vec<Outcome>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.outcomes
			.values()
			.filter(|o| o.market_id == market_id)
			.cloned()
			.collect())
	}

	async fn order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
		Ok(self.state.lock().await.orders.get(&order_id).cloned())
	}

	async fn resting_orders(
		&self,
		outcome_id: OutcomeId,
		side: Side,
	) -> Result<Vec<Order>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.orders
			.values()
			.filter(|o| o.outcome_id == outcome_id && o.side == side && o.is_resting())
			.cloned()
			.collect())
	}

	async fn user_resting_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.orders
			.values()
			.filter(|o| o.is_resting() && user_id.is_none_or(|u| o.user_id == u))
			.cloned()
			.collect())
	}

	async fn position(
		&self,
		outcome_id: OutcomeId,
		user_id: UserId,
	) -> Result<Option<Position>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.positions
			.get(&outcome_id)
			.and_then(|by_user| by_user.get(&user_id))
			.cloned())
	}

	async fn user_positions(&self, user_id: UserId) -> Result<Vec<Position>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.positions
			.values()
			.filter_map(|by_user| by_user.get(&user_id))
			.cloned()
			.collect())
	}

	async fn outcome_positions(&self, outcome_id: OutcomeId) -> Result<Vec<Position>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.positions
			.get(&outcome_id)
			.map(|by_user| by_user.values().cloned().collect())
			.unwrap_or_default())
	}

	async fn trade(&self, trade_id: TradeId) -> Result<Option<Trade>, StoreError> {
		Ok(self.state.lock().await.trades.get(&trade_id).cloned())
	}

	async fn outcome_trades(&self, outcome_id: OutcomeId) -> Result<Vec<Trade>, StoreError> {
		let state = self.state.lock().await;
		Ok(state
			.trades
			.values()
			.filter(|t| t.outcome_id == outcome_id)
			.cloned()
			.collect())
	}

	async fn insert_user(&self, name: &str) -> Result<UserId, StoreError> {
		Ok(self.state.lock().await.add_user(name))
	}

	async fn insert_market(&self, name: &str) -> Result<Market, StoreError> {
		Ok(self.state.lock().await.add_market(name))
	}

	async fn insert_outcome(&self, market_id: MarketId, name: &str) -> Result<Outcome, StoreError> {
		self.state.lock().await.add_outcome(market_id, name)
	}

	async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
		self.state.lock().await.insert_order(order, Utc::now())
	}

	async fn batch(&self, mutations: Vec<Mutation>) -> Result<BatchReceipt, StoreError> {
		let mut state = self.state.lock().await;
		let mut staged = state.clone();
		let receipt = staged.apply_batch(mutations, self.capabilities)?;
		*state = staged;
		Ok(receipt)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn seeded_store() -> (MemoryStore, OutcomeId, UserId) {
		let store = MemoryStore::new();
		let market = store.insert_market("election").await.unwrap();
		let outcome = store.insert_outcome(market.id, "yes").await.unwrap();
		let user = store.insert_user("alice").await.unwrap();
		(store, outcome.id, user)
	}

	#[tokio::test]
	async fn test_insert_and_query_resting_orders() {
		let (store, outcome, user) = seeded_store().await;

		let bid = store
			.insert_order(NewOrder::resting(outcome, user, Side::Buy, 4000, 5))
			.await
			.unwrap();
		store
			.insert_order(NewOrder::filled(outcome, user, Side::Buy, 4000, 5))
			.await
			.unwrap();

		let resting = store.resting_orders(outcome, Side::Buy).await.unwrap();
		assert_eq!(resting, vec![bid]);
		assert!(store.resting_orders(outcome, Side::Sell).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_failed_batch_leaves_state_untouched() {
		let (store, outcome, user) = seeded_store().await;
		let order = store
			.insert_order(NewOrder::resting(outcome, user, Side::Sell, 6000, 3))
			.await
			.unwrap();

		let result = store
			.batch(vec![
				Mutation::FillOrder {
					order_id: order.id,
					expected_remaining: 3,
					quantity: 2,
				},
				Mutation::DeleteTrade(42),
			])
			.await;

		assert!(matches!(result, Err(StoreError::NotFound(_))));
		let unchanged = store.order(order.id).await.unwrap().unwrap();
		assert_eq!(unchanged.remaining_size, 3);
		assert_eq!(unchanged.status, OrderStatus::Open);
	}

	#[tokio::test]
	async fn test_cancel_is_conditional() {
		let (store, outcome, user) = seeded_store().await;
		let order = store
			.insert_order(NewOrder::resting(outcome, user, Side::Buy, 4000, 2))
			.await
			.unwrap();

		let wrong_owner = store
			.batch(vec![Mutation::CancelOrder {
				order_id: order.id,
				user_id: user + 1,
			}])
			.await;
		assert!(matches!(wrong_owner, Err(StoreError::ConditionFailed(_))));

		store
			.batch(vec![Mutation::CancelOrder {
				order_id: order.id,
				user_id: user,
			}])
			.await
			.unwrap();
		let again = store
			.batch(vec![Mutation::CancelOrder {
				order_id: order.id,
				user_id: user,
			}])
			.await;
		assert!(matches!(again, Err(StoreError::ConditionFailed(_))));
	}

	#[tokio::test]
	async fn test_fill_requires_expected_resting_row() {
		let (store, outcome, user) = seeded_store().await;
		let order = store
			.insert_order(NewOrder::resting(outcome, user, Side::Sell, 6000, 5))
			.await
			.unwrap();
		let fill = |expected_remaining, quantity| Mutation::FillOrder {
			order_id: order.id,
			expected_remaining,
			quantity,
		};

		store.batch(vec![fill(5, 3)]).await.unwrap();
		let partial = store.order(order.id).await.unwrap().unwrap();
		assert_eq!((partial.remaining_size, partial.status), (2, OrderStatus::Partial));

		// A second taker that read the order before the first fill
		let stale = store.batch(vec![fill(5, 3)]).await;
		assert!(matches!(stale, Err(StoreError::ConditionFailed(_))));
		let over = store.batch(vec![fill(2, 3)]).await;
		assert!(matches!(over, Err(StoreError::ConditionFailed(_))));

		store
			.batch(vec![Mutation::CancelOrder {
				order_id: order.id,
				user_id: user,
			}])
			.await
			.unwrap();
		let canceled = store.batch(vec![fill(2, 1)]).await;
		assert!(matches!(canceled, Err(StoreError::ConditionFailed(_))));
		let row = store.order(order.id).await.unwrap().unwrap();
		assert_eq!((row.remaining_size, row.status), (2, OrderStatus::Canceled));
	}

	#[tokio::test]
	async fn test_reinstate_is_capped() {
		let (store, outcome, user) = seeded_store().await;
		let order = store
			.insert_order(NewOrder::resting(outcome, user, Side::Buy, 4000, 4))
			.await
			.unwrap();
		store
			.batch(vec![
				Mutation::FillOrder {
					order_id: order.id,
					expected_remaining: 4,
					quantity: 4,
				},
				Mutation::ReinstateOrder {
					order_id: order.id,
					quantity: 9,
				},
			])
			.await
			.unwrap();
		let row = store.order(order.id).await.unwrap().unwrap();
		assert_eq!((row.remaining_size, row.status), (4, OrderStatus::Open));
	}

	#[tokio::test]
	async fn test_position_basis_constraint() {
		let (store, outcome, user) = seeded_store().await;
		let mut position = Position::flat(outcome, user);
		position.net_position = 4;

		let result = store.batch(vec![Mutation::UpsertPosition(position)]).await;
		assert!(matches!(result, Err(StoreError::Constraint(_))));
	}

	#[tokio::test]
	async fn test_store_without_risk_off_columns_drops_fields() {
		let store = MemoryStore::with_capabilities(StoreCapabilities {
			trade_risk_off: false,
		});
		let market = store.insert_market("m").await.unwrap();
		let outcome = store.insert_outcome(market.id, "o").await.unwrap();

		let receipt = store
			.batch(vec![Mutation::InsertTrade(NewTrade {
				outcome_id: outcome.id,
				price: 5000,
				contracts: 1,
				taker_user_id: 1,
				maker_user_id: None,
				taker_side: Side::Buy,
				taker_order_id: None,
				maker_order_id: None,
				risk_off: Some(parlay_sdk::types::RiskOff {
					taker_realized: 10,
					maker_realized: -10,
				}),
			})])
			.await
			.unwrap();

		assert_eq!(receipt.trades.len(), 1);
		assert_eq!(receipt.trades[0].risk_off, None);
	}
}
