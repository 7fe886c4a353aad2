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

//! Worst-case loss of a user
//!
//! Every position and resting order is charged as if the outcome settles
//! against it. Nothing is netted across outcomes. Sums saturate at
//! `u64::MAX`, which is always past any configured limit.

use parlay_sdk::types::{CONTRACT_VALUE, Position, Side, UserId};
use tracing::warn;

use crate::{
	engine::{EngineError, MatchingEngine},
	store::{Store, StoreError},
};

/// Loss if a position settles against it; settled positions carry none
pub fn position_worst_case(position: &Position) -> u64 {
	if position.is_settled {
		return 0;
	}
	let held = position.net_position.unsigned_abs();
	if position.net_position > 0 {
		held.saturating_mul(position.price_basis)
	} else {
		held.saturating_mul(CONTRACT_VALUE.saturating_sub(position.price_basis))
	}
}

/// Loss if a resting order fills and then settles against it
pub fn order_worst_case(side: Side, price: u64, remaining: u64) -> u64 {
	match side {
		Side::Buy => remaining.saturating_mul(price),
		Side::Sell => remaining.saturating_mul(CONTRACT_VALUE.saturating_sub(price)),
	}
}

pub async fn worst_case_loss<S: Store + ?Sized>(store: &S, user_id: UserId) -> Result<u64, StoreError> {
	let positions = store
		.user_positions(user_id)
		.await?
		.iter()
		.map(position_worst_case)
		.fold(0u64, u64::saturating_add);
	let orders = store
		.user_resting_orders(Some(user_id))
		.await?
		.iter()
		.map(|o| order_worst_case(o.side, o.price, o.remaining_size))
		.fold(0u64, u64::saturating_add);
	Ok(positions.saturating_add(orders))
}

impl<S: Store> MatchingEngine<S> {
	pub async fn worst_case_loss(&self, user_id: UserId) -> Result<u64, EngineError> {
		Ok(worst_case_loss(&**self.store(), user_id).await?)
	}

	/// Reject an order whose own worst case would push the user past the limit
	pub async fn check_exposure(&self, user_id: UserId, order: u64) -> Result<(), EngineError> {
		let current = self.worst_case_loss(user_id).await?;
		let limit = self.config().exposure_limit_cents;
		if current.saturating_add(order) > limit {
			warn!(
				target: "engine",
				"Exposure limit hit for user {}: {} + {} > {}",
				user_id, current, order, limit
			);
			return Err(EngineError::ExposureLimitExceeded {
				current,
				order,
				limit,
			});
		}
		Ok(())
	}
}
