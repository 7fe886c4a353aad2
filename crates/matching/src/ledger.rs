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

//! Position ledger
//!
//! Every fill, whether it comes from the book, an auction, a manual
//! trade or a replay of trade history, moves a position through the
//! same law implemented by [`apply_fill`]:
//!
//! - A fill against the position's direction closes contracts at the
//!   existing basis and realizes `closed × (price − basis)` (long) or
//!   `closed × (basis − price)` (short). Any excess opens a new position
//!   at the fill price.
//! - A fill in the position's direction (or on a flat position) moves
//!   the basis to the size-weighted average, rounded half up.
//! - A flat position has basis 0; an open one is clamped to the
//!   contract price range.
//!
//! The law is pure, so applying the same ordered fills to a flat
//! position always reproduces the same state. Replay relies on that.

use std::collections::HashMap;

use parlay_sdk::types::{MAX_ORDER_SIZE, MAX_PRICE, MIN_PRICE, OutcomeId, Position, Side, UserId};

use crate::store::{Mutation, Store, StoreError};

/// The part of a position the fill law reads and writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionState {
	pub net: i64,
	pub basis: u64,
	pub closed_profit: i64,
}

impl From<&Position> for PositionState {
	fn from(position: &Position) -> Self {
		Self {
			net: position.net_position,
			basis: position.price_basis,
			closed_profit: position.closed_profit,
		}
	}
}

/// Result of applying one fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEffect {
	pub state: PositionState,
	/// Profit realized by this fill alone
	pub realized: i64,
	/// Contracts of the prior position this fill closed
	pub closed_qty: u64,
}

/// Apply one fill of `qty` contracts at `price` on `side` to a position
///
/// `qty` is at most [`MAX_ORDER_SIZE`], so it converts to `i64` and a full
/// close-out's profit fits in `i64`.
pub fn apply_fill(current: PositionState, side: Side, price: u64, qty: u64) -> FillEffect {
	if qty == 0 {
		return FillEffect {
			state: current,
			realized: 0,
			closed_qty: 0,
		};
	}

	let signed_qty = side.sign() * qty as i64;
	let new_net = current.net + signed_qty;
	let held = current.net.unsigned_abs();

	let reducing = current.net != 0 && current.net.signum() != signed_qty.signum();
	let (basis, realized, closed_qty) = if reducing {
		let closed_qty = qty.min(held);
		let per_contract = if current.net > 0 {
			price as i64 - current.basis as i64
		} else {
			current.basis as i64 - price as i64
		};
		let basis = if new_net == 0 {
			0
		} else if qty > closed_qty {
			// Flipped through flat; the excess opens at the fill price
			price
		} else {
			current.basis
		};
		(basis, closed_qty as i64 * per_contract, closed_qty)
	} else {
		let cost = held as u128 * current.basis as u128 + qty as u128 * price as u128;
		let size = new_net.unsigned_abs() as u128;
		let average = (cost + size / 2) / size;
		(average as u64, 0, 0)
	};

	FillEffect {
		state: PositionState {
			net: new_net,
			basis: clamp_basis(new_net, basis),
			closed_profit: current.closed_profit + realized,
		},
		realized,
		closed_qty,
	}
}

fn clamp_basis(net: i64, basis: u64) -> u64 {
	if net == 0 {
		0
	} else {
		basis.clamp(MIN_PRICE, MAX_PRICE)
	}
}

/// Apply a fill directly to a position row
pub fn apply_to_position(position: &mut Position, side: Side, price: u64, qty: u64) -> FillEffect {
	let effect = apply_fill(PositionState::from(&*position), side, price, qty);
	position.net_position = effect.state.net;
	position.price_basis = effect.state.basis;
	position.closed_profit = effect.state.closed_profit;
	effect
}

/// Working set of positions touched by one atomic batch
///
/// Each (outcome, user) position is loaded from the store at most once,
/// every fill touching it is applied in order, and the final state is
/// written back once as a single upsert. Positions are emitted in the
/// order they were first touched.
#[derive(Debug, Default)]
pub struct LedgerBatch {
	positions: HashMap<(OutcomeId, UserId), Position>,
	touched: Vec<(OutcomeId, UserId)>,
}

impl LedgerBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load a position from the store unless it is already in the batch
	pub async fn load<S: Store + ?Sized>(
		&mut self,
		store: &S,
		outcome_id: OutcomeId,
		user_id: UserId,
	) -> Result<(), StoreError> {
		if self.positions.contains_key(&(outcome_id, user_id)) {
			return Ok(());
		}
		let position = store
			.position(outcome_id, user_id)
			.await?
			.unwrap_or_else(|| Position::flat(outcome_id, user_id));
		self.seed(position);
		Ok(())
	}

	/// Put a position into the batch as its starting state
	///
	/// Replay seeds zeroed rows this way instead of loading them.
	pub fn seed(&mut self, position: Position) {
		let key = (position.outcome_id, position.user_id);
		if self.positions.insert(key, position).is_none() {
			self.touched.push(key);
		}
	}

	/// Apply one fill; a position never loaded or seeded starts flat
	pub fn apply(
		&mut self,
		outcome_id: OutcomeId,
		user_id: UserId,
		side: Side,
		price: u64,
		qty: u64,
	) -> FillEffect {
		let key = (outcome_id, user_id);
		let touched = &mut self.touched;
		let position = self.positions.entry(key).or_insert_with(|| {
			touched.push(key);
			Position::flat(outcome_id, user_id)
		});
		apply_to_position(position, side, price, qty)
	}

	pub fn position(&self, outcome_id: OutcomeId, user_id: UserId) -> Option<&Position> {
		self.positions.get(&(outcome_id, user_id))
	}

	pub fn position_mut(&mut self, outcome_id: OutcomeId, user_id: UserId) -> Option<&mut Position> {
		self.positions.get_mut(&(outcome_id, user_id))
	}

	/// Positions in first-touch order
	pub fn positions(&self) -> impl Iterator<Item = &Position> {
		self.touched.iter().filter_map(|key| self.positions.get(key))
	}

	pub fn len(&self) -> usize {
		self.touched.len()
	}

	pub fn is_empty(&self) -> bool {
		self.touched.is_empty()
	}

	/// One upsert per touched position
	pub fn into_mutations(mut self) -> Vec<Mutation> {
		self.touched
			.iter()
			.filter_map(|key| self.positions.remove(key))
			.map(Mutation::UpsertPosition)
			.collect()
	}
}
