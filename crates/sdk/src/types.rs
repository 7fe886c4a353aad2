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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = i64;
pub type MarketId = i64;
pub type OutcomeId = i64;
pub type OrderId = i64;
pub type TradeId = i64;

/// Lowest price an order may carry ($1 of a $100 contract)
pub const MIN_PRICE: u64 = 100;

/// Highest price an order may carry ($99 of a $100 contract)
pub const MAX_PRICE: u64 = 9_900;

/// Full value of one contract in cents
///
/// A contract settles to either 0 or this value.
pub const CONTRACT_VALUE: u64 = 10_000;

/// Largest order size; keeps `size × CONTRACT_VALUE` within `i64`
pub const MAX_ORDER_SIZE: u64 = i64::MAX as u64 / CONTRACT_VALUE;

/// Validation failures on raw order and settlement input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("Price {0} outside [100, 9900]")]
	PriceOutOfRange(u64),
	#[error("Size must be greater than zero")]
	ZeroSize,
	#[error("Size {0} exceeds the maximum order size")]
	SizeTooLarge(u64),
	#[error("Settle value must be 0 or 10000, got {0}")]
	InvalidSettleValue(u64),
	#[error("Unknown side code: {0}")]
	UnknownSide(u8),
}

pub fn validate_price(price: u64) -> Result<(), ValidationError> {
	if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
		return Err(ValidationError::PriceOutOfRange(price));
	}
	Ok(())
}

pub fn validate_size(size: u64) -> Result<(), ValidationError> {
	if size == 0 {
		return Err(ValidationError::ZeroSize);
	}
	if size > MAX_ORDER_SIZE {
		return Err(ValidationError::SizeTooLarge(size));
	}
	Ok(())
}

/// Only the two binary outcomes are accepted as settle values
pub fn validate_settle_value(value: u64) -> Result<(), ValidationError> {
	if value != 0 && value != CONTRACT_VALUE {
		return Err(ValidationError::InvalidSettleValue(value));
	}
	Ok(())
}

/// Order side (bid = buy/long, ask = sell/short)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Self {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}

	/// Wire code: 0 = bid/buy, 1 = ask/sell
	pub fn code(self) -> u8 {
		match self {
			Side::Buy => 0,
			Side::Sell => 1,
		}
	}

	pub fn from_code(code: u8) -> Result<Self, ValidationError> {
		match code {
			0 => Ok(Side::Buy),
			1 => Ok(Side::Sell),
			other => Err(ValidationError::UnknownSide(other)),
		}
	}

	/// Signed direction of a fill on this side
	pub fn sign(self) -> i64 {
		match self {
			Side::Buy => 1,
			Side::Sell => -1,
		}
	}
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	Open,
	Partial,
	Filled,
	Canceled,
}

impl OrderStatus {
	/// Status is fully determined by remaining vs. original size and the cancel flag
	pub fn derive(remaining_size: u64, original_size: u64, canceled: bool) -> Self {
		if canceled {
			OrderStatus::Canceled
		} else if remaining_size == 0 {
			OrderStatus::Filled
		} else if remaining_size < original_size {
			OrderStatus::Partial
		} else {
			OrderStatus::Open
		}
	}

	/// Open and partial orders rest on the book
	pub fn is_resting(self) -> bool {
		matches!(self, OrderStatus::Open | OrderStatus::Partial)
	}
}

/// Order row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub id: OrderId,
	pub outcome_id: OutcomeId,
	pub user_id: UserId,
	pub side: Side,
	/// Limit price in cents
	pub price: u64,
	/// Size at creation; never changes after insert
	pub original_size: u64,
	pub remaining_size: u64,
	pub status: OrderStatus,
	pub created_at: DateTime<Utc>,
}

impl Order {
	pub fn is_resting(&self) -> bool {
		self.status.is_resting() && self.remaining_size > 0
	}

	pub fn filled_size(&self) -> u64 {
		self.original_size - self.remaining_size
	}

	/// Take `quantity` off the remaining size and re-derive the status
	pub fn fill(&mut self, quantity: u64) {
		self.remaining_size = self.remaining_size.saturating_sub(quantity);
		self.status = OrderStatus::derive(self.remaining_size, self.original_size, false);
	}

	/// Give `quantity` back, capped at the original size
	///
	/// A canceled order stays canceled; otherwise status follows the new size.
	pub fn reinstate(&mut self, quantity: u64) {
		let canceled = self.status == OrderStatus::Canceled;
		self.remaining_size = self
			.remaining_size
			.saturating_add(quantity)
			.min(self.original_size);
		self.status = OrderStatus::derive(self.remaining_size, self.original_size, canceled);
	}
}

/// Order to be inserted; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
	pub outcome_id: OutcomeId,
	pub user_id: UserId,
	pub side: Side,
	pub price: u64,
	pub original_size: u64,
	pub remaining_size: u64,
	pub status: OrderStatus,
}

impl NewOrder {
	/// A fresh limit order that may rest on the book
	pub fn resting(outcome_id: OutcomeId, user_id: UserId, side: Side, price: u64, size: u64) -> Self {
		Self {
			outcome_id,
			user_id,
			side,
			price,
			original_size: size,
			remaining_size: size,
			status: OrderStatus::Open,
		}
	}

	/// An already-filled order recorded for history (auction and manual legs)
	pub fn filled(outcome_id: OutcomeId, user_id: UserId, side: Side, price: u64, size: u64) -> Self {
		Self {
			outcome_id,
			user_id,
			side,
			price,
			original_size: size,
			remaining_size: 0,
			status: OrderStatus::Filled,
		}
	}

	pub fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
		Order {
			id,
			outcome_id: self.outcome_id,
			user_id: self.user_id,
			side: self.side,
			price: self.price,
			original_size: self.original_size,
			remaining_size: self.remaining_size,
			status: self.status,
			created_at,
		}
	}
}

/// Realized profit each leg booked when the trade was applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskOff {
	pub taker_realized: i64,
	pub maker_realized: i64,
}

/// Trade row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub id: TradeId,
	pub outcome_id: OutcomeId,
	/// Execution price in cents
	pub price: u64,
	pub contracts: u64,
	pub created_at: DateTime<Utc>,
	pub taker_user_id: UserId,
	/// None for a maker-less trade against the system counterparty
	pub maker_user_id: Option<UserId>,
	/// Side from the taker's perspective
	pub taker_side: Side,
	pub taker_order_id: Option<OrderId>,
	pub maker_order_id: Option<OrderId>,
	pub risk_off: Option<RiskOff>,
}

/// Trade to be inserted; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrade {
	pub outcome_id: OutcomeId,
	pub price: u64,
	pub contracts: u64,
	pub taker_user_id: UserId,
	pub maker_user_id: Option<UserId>,
	pub taker_side: Side,
	pub taker_order_id: Option<OrderId>,
	pub maker_order_id: Option<OrderId>,
	pub risk_off: Option<RiskOff>,
}

impl NewTrade {
	pub fn into_trade(self, id: TradeId, created_at: DateTime<Utc>) -> Trade {
		Trade {
			id,
			outcome_id: self.outcome_id,
			price: self.price,
			contracts: self.contracts,
			created_at,
			taker_user_id: self.taker_user_id,
			maker_user_id: self.maker_user_id,
			taker_side: self.taker_side,
			taker_order_id: self.taker_order_id,
			maker_order_id: self.maker_order_id,
			risk_off: self.risk_off,
		}
	}
}

/// Position row keyed by (outcome, user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub outcome_id: OutcomeId,
	pub user_id: UserId,
	/// Positive = long, negative = short
	pub net_position: i64,
	/// Cost basis of the open net position in cents; 0 when flat
	pub price_basis: u64,
	pub closed_profit: i64,
	pub settled_profit: i64,
	pub is_settled: bool,
}

impl Position {
	pub fn flat(outcome_id: OutcomeId, user_id: UserId) -> Self {
		Self {
			outcome_id,
			user_id,
			net_position: 0,
			price_basis: 0,
			closed_profit: 0,
			settled_profit: 0,
			is_settled: false,
		}
	}

	pub fn is_flat(&self) -> bool {
		self.net_position == 0
	}

	/// Basis must sit inside contract price bounds while open and be 0 when flat
	pub fn basis_in_bounds(&self) -> bool {
		if self.net_position == 0 {
			self.price_basis == 0
		} else {
			(MIN_PRICE..=MAX_PRICE).contains(&self.price_basis)
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
	pub id: MarketId,
	pub name: String,
	pub settle_value: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
	pub id: OutcomeId,
	pub market_id: MarketId,
	pub name: String,
	/// Stamped once the outcome is settled
	pub settle_value: Option<u64>,
}

impl Outcome {
	pub fn is_settled(&self) -> bool {
		self.settle_value.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_is_function_of_sizes() {
		assert_eq!(OrderStatus::derive(10, 10, false), OrderStatus::Open);
		assert_eq!(OrderStatus::derive(4, 10, false), OrderStatus::Partial);
		assert_eq!(OrderStatus::derive(0, 10, false), OrderStatus::Filled);
		assert_eq!(OrderStatus::derive(4, 10, true), OrderStatus::Canceled);
		assert_eq!(OrderStatus::derive(10, 10, true), OrderStatus::Canceled);
	}

	#[test]
	fn test_price_bounds() {
		assert!(validate_price(100).is_ok());
		assert!(validate_price(9900).is_ok());
		assert_eq!(validate_price(99), Err(ValidationError::PriceOutOfRange(99)));
		assert_eq!(
			validate_price(9901),
			Err(ValidationError::PriceOutOfRange(9901))
		);
		assert_eq!(validate_size(0), Err(ValidationError::ZeroSize));
		assert!(validate_size(MAX_ORDER_SIZE).is_ok());
		assert_eq!(
			validate_size(u64::MAX / 100),
			Err(ValidationError::SizeTooLarge(u64::MAX / 100))
		);
	}

	fn order(remaining: u64, original: u64, status: OrderStatus) -> Order {
		Order {
			id: 1,
			outcome_id: 1,
			user_id: 1,
			side: Side::Sell,
			price: 6000,
			original_size: original,
			remaining_size: remaining,
			status,
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_fill_derives_status() {
		let mut resting = order(10, 10, OrderStatus::Open);
		resting.fill(4);
		assert_eq!((resting.remaining_size, resting.status), (6, OrderStatus::Partial));
		assert_eq!(resting.filled_size(), 4);
		resting.fill(6);
		assert_eq!((resting.remaining_size, resting.status), (0, OrderStatus::Filled));
	}

	#[test]
	fn test_reinstate_caps_at_original() {
		let mut filled = order(0, 10, OrderStatus::Filled);
		filled.reinstate(5);
		assert_eq!((filled.remaining_size, filled.status), (5, OrderStatus::Partial));

		let mut partial = order(8, 10, OrderStatus::Partial);
		partial.reinstate(5);
		assert_eq!((partial.remaining_size, partial.status), (10, OrderStatus::Open));
	}

	#[test]
	fn test_reinstate_keeps_cancel() {
		let mut canceled = order(2, 10, OrderStatus::Canceled);
		canceled.reinstate(3);
		assert_eq!((canceled.remaining_size, canceled.status), (5, OrderStatus::Canceled));
	}

	#[test]
	fn test_settle_value() {
		assert!(validate_settle_value(0).is_ok());
		assert!(validate_settle_value(CONTRACT_VALUE).is_ok());
		assert!(validate_settle_value(5000).is_err());
	}

	#[test]
	fn test_side_codes() {
		assert_eq!(Side::Buy.code(), 0);
		assert_eq!(Side::from_code(1), Ok(Side::Sell));
		assert!(Side::from_code(2).is_err());
		assert_eq!(Side::Sell.opposite(), Side::Buy);
	}

	#[test]
	fn test_side_serializes_lowercase() {
		let json = serde_json::to_string(&Side::Buy).unwrap();
		assert_eq!(json, "\"buy\"");
	}

	#[test]
	fn test_position_basis_bounds() {
		let mut position = Position::flat(1, 1);
		assert!(position.basis_in_bounds());

		position.net_position = 3;
		position.price_basis = 0;
		assert!(!position.basis_in_bounds());

		position.price_basis = 4500;
		assert!(position.basis_in_bounds());
	}
}
