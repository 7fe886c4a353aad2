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

use std::cmp::Reverse;
use std::collections::BTreeMap;

use parlay_sdk::types::{Order, OutcomeId, Side, UserId};

use crate::store::{Store, StoreError};

/// Price level in the order book
///
/// A price level contains all resting orders at one price, kept in
/// arrival order (first-in-first-out).
#[derive(Debug, Clone)]
pub struct PriceLevel {
	price: u64,
	orders: Vec<Order>,
	/// Total remaining size of all orders at this level
	total_size: u64,
}

impl PriceLevel {
	fn new(price: u64) -> Self {
		Self {
			price,
			orders: Vec::new(),
			total_size: 0,
		}
	}

	fn add_order(&mut self, order: Order) {
		self.total_size += order.remaining_size;
		self.orders.push(order);
	}

	pub fn price(&self) -> u64 {
		self.price
	}

	pub fn orders(&self) -> &[Order] {
		&self.orders
	}

	pub fn total_size(&self) -> u64 {
		self.total_size
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}
}

/// Snapshot of the resting orders of one outcome
///
/// Built from store rows on every query; the store is the only source
/// of truth, so the book is never mutated after it is loaded.
///
/// - Buy side: highest price first (descending via `Reverse`)
/// - Sell side: lowest price first (natural `BTreeMap` order)
/// - Within a level: arrival order, ties broken by order id
#[derive(Debug, Clone)]
pub struct OrderBook {
	outcome_id: OutcomeId,
	bids: BTreeMap<Reverse<u64>, PriceLevel>,
	asks: BTreeMap<u64, PriceLevel>,
}

impl OrderBook {
	pub fn new(outcome_id: OutcomeId) -> Self {
		Self {
			outcome_id,
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
		}
	}

	/// Build a book from an arbitrary set of orders
	///
	/// Orders that are not resting or belong to another outcome are ignored.
	pub fn from_orders(outcome_id: OutcomeId, orders: impl IntoIterator<Item = Order>) -> Self {
		let mut orders: Vec<Order> = orders
			.into_iter()
			.filter(|o| o.outcome_id == outcome_id && o.is_resting())
			.collect();
		orders.sort_by_key(|o| (o.created_at, o.id));

		let mut book = Self::new(outcome_id);
		for order in orders {
			book.add_order(order);
		}
		book
	}

	/// Load one side of an outcome's book, leaving out one user's orders
	pub async fn load<S: Store + ?Sized>(
		store: &S,
		outcome_id: OutcomeId,
		side: Side,
		excluding_user: Option<UserId>,
	) -> Result<Self, StoreError> {
		let orders = store
			.resting_orders(outcome_id, side)
			.await?
			.into_iter()
			.filter(|o| excluding_user != Some(o.user_id));
		Ok(Self::from_orders(outcome_id, orders))
	}

	/// Load both sides of an outcome's book
	pub async fn load_full<S: Store + ?Sized>(
		store: &S,
		outcome_id: OutcomeId,
	) -> Result<Self, StoreError> {
		let mut orders = store.resting_orders(outcome_id, Side::Buy).await?;
		orders.extend(store.resting_orders(outcome_id, Side::Sell).await?);
		Ok(Self::from_orders(outcome_id, orders))
	}

	pub fn outcome_id(&self) -> OutcomeId {
		self.outcome_id
	}

	fn add_order(&mut self, order: Order) {
		match order.side {
			Side::Buy => self
				.bids
				.entry(Reverse(order.price))
				.or_insert_with(|| PriceLevel::new(order.price))
				.add_order(order),
			Side::Sell => self
				.asks
				.entry(order.price)
				.or_insert_with(|| PriceLevel::new(order.price))
				.add_order(order),
		}
	}

	/// Price levels of one side, best price first
	pub fn levels(&self, side: Side) -> Vec<&PriceLevel> {
		match side {
			Side::Buy => self.bids.values().collect(),
			Side::Sell => self.asks.values().collect(),
		}
	}

	/// Resting orders of one side in matching priority
	pub fn orders_in_priority(&self, side: Side) -> Vec<Order> {
		self.levels(side)
			.into_iter()
			.flat_map(|level| level.orders().iter().cloned())
			.collect()
	}

	pub fn best_bid(&self) -> Option<u64> {
		self.bids.first_key_value().map(|(key, _)| key.0)
	}

	pub fn best_ask(&self) -> Option<u64> {
		self.asks.first_key_value().map(|(key, _)| *key)
	}

	/// Total remaining size resting at one price
	pub fn level_depth(&self, side: Side, price: u64) -> Option<u64> {
		match side {
			Side::Buy => self.bids.get(&Reverse(price)).map(|l| l.total_size()),
			Side::Sell => self.asks.get(&price).map(|l| l.total_size()),
		}
	}

	pub fn order_count(&self) -> usize {
		let bid_count: usize = self.bids.values().map(|l| l.order_count()).sum();
		let ask_count: usize = self.asks.values().map(|l| l.order_count()).sum();
		bid_count + ask_count
	}

	pub fn is_empty(&self) -> bool {
		self.bids.is_empty() && self.asks.is_empty()
	}

	/// Whether a taker on `taker_side` at `price` would trade against this book
	pub fn crosses(&self, taker_side: Side, price: u64) -> bool {
		match taker_side {
			Side::Buy => self.best_ask().is_some_and(|ask| price >= ask),
			Side::Sell => self.best_bid().is_some_and(|bid| bid >= price),
		}
	}
}

/// Resting makers a taker on `taker_side` can trade with, in priority order
///
/// The taker's own orders are excluded (self-trade prevention).
pub async fn opposite_orders<S: Store + ?Sized>(
	store: &S,
	outcome_id: OutcomeId,
	taker_side: Side,
	excluding_user: UserId,
) -> Result<Vec<Order>, StoreError> {
	let maker_side = taker_side.opposite();
	let book = OrderBook::load(store, outcome_id, maker_side, Some(excluding_user)).await?;
	Ok(book.orders_in_priority(maker_side))
}

#[cfg(test)]
mod tests {
	use chrono::{TimeZone, Utc};
	use parlay_sdk::types::OrderStatus;

	use super::*;

	fn order(id: i64, user: i64, side: Side, price: u64, size: u64, at: i64) -> Order {
		Order {
			id,
			outcome_id: 1,
			user_id: user,
			side,
			price,
			original_size: size,
			remaining_size: size,
			status: OrderStatus::Open,
			created_at: Utc.timestamp_opt(at, 0).unwrap(),
		}
	}

	#[test]
	fn test_bids_price_descending_then_fifo() {
		let book = OrderBook::from_orders(
			1,
			vec![
				order(1, 1, Side::Buy, 4000, 1, 30),
				order(2, 2, Side::Buy, 4500, 1, 20),
				order(3, 3, Side::Buy, 4000, 1, 10),
			],
		);

		let ids: Vec<_> = book.orders_in_priority(Side::Buy).iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![2, 3, 1]);
		assert_eq!(book.best_bid(), Some(4500));
	}

	#[test]
	fn test_asks_price_ascending_then_fifo() {
		let book = OrderBook::from_orders(
			1,
			vec![
				order(1, 1, Side::Sell, 6000, 1, 10),
				order(2, 2, Side::Sell, 5500, 1, 30),
				order(3, 3, Side::Sell, 5500, 1, 20),
			],
		);

		let ids: Vec<_> = book.orders_in_priority(Side::Sell).iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![3, 2, 1]);
		assert_eq!(book.best_ask(), Some(5500));
	}

	#[test]
	fn test_same_timestamp_falls_back_to_id() {
		let book = OrderBook::from_orders(
			1,
			vec![
				order(9, 1, Side::Sell, 5000, 1, 10),
				order(4, 2, Side::Sell, 5000, 1, 10),
			],
		);
		let ids: Vec<_> = book.orders_in_priority(Side::Sell).iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![4, 9]);
	}

	#[test]
	fn test_non_resting_orders_are_ignored() {
		let mut filled = order(1, 1, Side::Buy, 4000, 2, 10);
		filled.remaining_size = 0;
		filled.status = OrderStatus::Filled;
		let mut canceled = order(2, 1, Side::Buy, 4100, 2, 10);
		canceled.status = OrderStatus::Canceled;

		let book = OrderBook::from_orders(1, vec![filled, canceled]);
		assert!(book.is_empty());
		assert_eq!(book.order_count(), 0);
	}

	#[test]
	fn test_level_depth_and_crossing() {
		let book = OrderBook::from_orders(
			1,
			vec![
				order(1, 1, Side::Buy, 4000, 2, 10),
				order(2, 2, Side::Buy, 4000, 3, 11),
				order(3, 3, Side::Sell, 4200, 1, 12),
			],
		);

		assert_eq!(book.level_depth(Side::Buy, 4000), Some(5));
		assert_eq!(book.level_depth(Side::Sell, 4000), None);
		assert!(book.crosses(Side::Buy, 4200));
		assert!(!book.crosses(Side::Buy, 4199));
		assert!(book.crosses(Side::Sell, 4000));
		assert!(!book.crosses(Side::Sell, 4001));
	}
}
