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

mod execution;

use std::sync::Arc;

use parlay_sdk::types::{
	NewOrder, NewTrade, Order, OrderId, OrderStatus, Outcome, OutcomeId, RiskOff, Side, Trade, UserId,
	ValidationError, validate_price, validate_size,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
	config::EngineConfig,
	exposure::order_worst_case,
	ledger::LedgerBatch,
	orderbook::OrderBook,
	store::{Mutation, Store, StoreCapabilities, StoreError},
	types::{Execution, OrderCommand},
};

/// Error types for matching engine operations
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Invalid order: {0}")]
	Validation(#[from] ValidationError),
	#[error("Unknown outcome: {0}")]
	UnknownOutcome(OutcomeId),
	#[error("Unknown user: {0}")]
	UnknownUser(UserId),
	#[error("Unknown order: {0}")]
	UnknownOrder(OrderId),
	#[error("Outcome {0} is already settled")]
	OutcomeSettled(OutcomeId),
	#[error("Order {order_id} does not belong to user {user_id}")]
	NotOrderOwner { order_id: OrderId, user_id: UserId },
	#[error("Order {0} is not open or partially filled")]
	OrderNotCancelable(OrderId),
	#[error("Exposure limit exceeded: current {current} + order {order} > limit {limit}")]
	ExposureLimitExceeded { current: u64, order: u64, limit: u64 },
	#[error("Invalid auction: {0}")]
	InvalidAuction(String),
	#[error("Store error: {0}")]
	Store(#[from] StoreError),
}

/// A trade booked against the system counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTrade {
	pub order: Order,
	pub trade: Trade,
}

/// Matching engine over a transactional store
///
/// The engine keeps no book or position state of its own: every call
/// reads what it needs from the store, computes the result, and writes
/// it back as one atomic batch. Any number of engines may share a store.
///
/// Store capabilities are resolved once here and never queried again.
pub struct MatchingEngine<S: Store> {
	store: Arc<S>,
	config: EngineConfig,
	capabilities: StoreCapabilities,
}

impl<S: Store> MatchingEngine<S> {
	pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
		let capabilities = store.capabilities();
		info!(
			target: "engine",
			"Matching engine ready (exposure limit {} cents, risk-off columns: {})",
			config.exposure_limit_cents,
			capabilities.trade_risk_off
		);
		Self {
			store,
			config,
			capabilities,
		}
	}

	pub fn store(&self) -> &Arc<S> {
		&self.store
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn capabilities(&self) -> StoreCapabilities {
		self.capabilities
	}

	/// Place a limit order and match it against the book
	///
	/// Flow:
	/// 1. Validate price and size, the outcome (known, unsettled) and the user
	/// 2. Reject if the order would push the user past the exposure limit
	/// 3. Insert the order and run one matching cycle
	/// 4. If it still rests while the opposite side crosses its price
	///    (liquidity arrived concurrently), run one more cycle
	pub async fn place_order(&self, cmd: OrderCommand) -> Result<Execution, EngineError> {
		cmd.validate()?;
		self.tradable_outcome(cmd.outcome_id).await?;
		self.ensure_user(cmd.user_id).await?;
		self.check_exposure(cmd.user_id, order_worst_case(cmd.side, cmd.price, cmd.size))
			.await?;

		let order = self.store.insert_order(cmd.into_new_order()).await?;
		info!(
			target: "engine",
			"Order {} accepted: user {} {:?} {} @ {} on outcome {}",
			order.id, order.user_id, order.side, order.original_size, order.price, order.outcome_id
		);

		let mut execution = self.execute_matching(&order).await?;

		if self.config.retry_crossed_book && execution.order.is_resting() {
			let taker = &execution.order;
			let book = OrderBook::load(
				&*self.store,
				taker.outcome_id,
				taker.side.opposite(),
				Some(taker.user_id),
			)
			.await?;
			if book.crosses(taker.side, taker.price) {
				debug!(
					target: "engine",
					"Order {} still crosses the book, retrying once",
					taker.id
				);
				let retry = self.execute_matching(&execution.order.clone()).await?;
				execution.absorb(retry);
			}
		}

		Ok(execution)
	}

	/// Cancel a resting order on behalf of its owner
	pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order, EngineError> {
		let mut order = self
			.store
			.order(order_id)
			.await?
			.ok_or(EngineError::UnknownOrder(order_id))?;
		if order.user_id != user_id {
			return Err(EngineError::NotOrderOwner { order_id, user_id });
		}
		if !order.status.is_resting() {
			return Err(EngineError::OrderNotCancelable(order_id));
		}

		self.store
			.batch(vec![Mutation::CancelOrder { order_id, user_id }])
			.await
			.map_err(|e| match e {
				// Filled or canceled between the read and the write
				StoreError::ConditionFailed(_) => EngineError::OrderNotCancelable(order_id),
				other => EngineError::Store(other),
			})?;

		order.status = OrderStatus::Canceled;
		info!(target: "engine", "Order {} canceled by user {}", order_id, user_id);
		Ok(order)
	}

	/// Cancel every resting order, or only one user's
	///
	/// Returns the ids of the canceled orders.
	pub async fn cancel_all_open_orders(
		&self,
		user_id: Option<UserId>,
	) -> Result<Vec<OrderId>, EngineError> {
		let orders = self.store.user_resting_orders(user_id).await?;
		if orders.is_empty() {
			return Ok(Vec::new());
		}

		let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
		let mutations = orders
			.into_iter()
			.map(|o| Mutation::CancelOrder {
				order_id: o.id,
				user_id: o.user_id,
			})
			.collect();
		self.store.batch(mutations).await?;

		info!(target: "engine", "Canceled {} resting orders", ids.len());
		Ok(ids)
	}

	/// Book a trade for one user against the system counterparty
	///
	/// Inserts a filled order for the user, a maker-less trade, and both
	/// ledger legs (the system user takes the opposite side) in one batch.
	pub async fn manual_trade(
		&self,
		user_id: UserId,
		outcome_id: OutcomeId,
		side: Side,
		price: u64,
		size: u64,
	) -> Result<ManualTrade, EngineError> {
		validate_price(price)?;
		validate_size(size)?;
		self.tradable_outcome(outcome_id).await?;
		self.ensure_user(user_id).await?;

		let system_user = self.config.system_user_id;
		let mut ledger = LedgerBatch::new();
		ledger.load(&*self.store, outcome_id, user_id).await?;
		ledger.load(&*self.store, outcome_id, system_user).await?;

		let user_leg = ledger.apply(outcome_id, user_id, side, price, size);
		let system_leg = ledger.apply(outcome_id, system_user, side.opposite(), price, size);

		let mut mutations = vec![
			Mutation::InsertOrder(NewOrder::filled(outcome_id, user_id, side, price, size)),
			Mutation::InsertTrade(NewTrade {
				outcome_id,
				price,
				contracts: size,
				taker_user_id: user_id,
				maker_user_id: None,
				taker_side: side,
				taker_order_id: None,
				maker_order_id: None,
				risk_off: self.risk_off(user_leg.realized, system_leg.realized),
			}),
		];
		mutations.extend(ledger.into_mutations());

		let receipt = self.store.batch(mutations).await?;
		let (Some(order), Some(trade)) = (
			receipt.orders.into_iter().next(),
			receipt.trades.into_iter().next(),
		) else {
			return Err(EngineError::Store(StoreError::Constraint(
				"manual trade batch returned no rows".to_string(),
			)));
		};

		info!(
			target: "engine",
			"Manual trade {}: user {} {:?} {} @ {} on outcome {}",
			trade.id, user_id, side, size, price, outcome_id
		);
		Ok(ManualTrade { order, trade })
	}

	/// Risk-off fields for a new trade, if the store can hold them
	pub(crate) fn risk_off(&self, taker_realized: i64, maker_realized: i64) -> Option<RiskOff> {
		self.capabilities.trade_risk_off.then_some(RiskOff {
			taker_realized,
			maker_realized,
		})
	}

	/// Outcome that exists and is still open for trading
	pub(crate) async fn tradable_outcome(&self, outcome_id: OutcomeId) -> Result<Outcome, EngineError> {
		let outcome = self
			.store
			.outcome(outcome_id)
			.await?
			.ok_or(EngineError::UnknownOutcome(outcome_id))?;
		if outcome.is_settled() {
			warn!(target: "engine", "Rejected trading on settled outcome {}", outcome_id);
			return Err(EngineError::OutcomeSettled(outcome_id));
		}
		Ok(outcome)
	}

	pub(crate) async fn ensure_user(&self, user_id: UserId) -> Result<(), EngineError> {
		if !self.store.user_exists(user_id).await? {
			return Err(EngineError::UnknownUser(user_id));
		}
		Ok(())
	}
}
