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

use parlay_sdk::types::{NewTrade, Order};
use tracing::{debug, error, info, warn};

use super::{EngineError, MatchingEngine};
use crate::{
	ledger::LedgerBatch,
	matcher::match_order,
	orderbook::opposite_orders,
	store::{Mutation, Store, StoreError},
	types::{Execution, Fill},
};

/// Matching passes per call; a pass is repeated only when a concurrent
/// write invalidated the rows it read
const MATCH_ATTEMPTS: usize = 2;

impl<S: Store> MatchingEngine<S> {
	/// Run one matching cycle for a taker order
	///
	/// The taker is re-read from the store first, so a caller holding a
	/// stale copy of an order that was since canceled or filled gets it
	/// back unchanged. The cycle then reads the opposite side of the book
	/// (without the taker's own orders), matches, and commits in a single
	/// batch:
	/// 1. each touched maker's fill, conditional on the remaining size read
	/// 2. one trade per fill
	/// 3. one position upsert per touched user, with every fill of that
	///    user applied in order
	/// 4. the taker's fill, conditional the same way
	///
	/// If a condition fails the whole batch is discarded and the cycle runs
	/// again from fresh rows; a second failure drops the fills.
	pub async fn execute_matching(&self, taker: &Order) -> Result<Execution, EngineError> {
		let mut attempt = 1;
		loop {
			let current = self
				.store
				.order(taker.id)
				.await?
				.ok_or(EngineError::UnknownOrder(taker.id))?;
			if !current.is_resting() {
				return Ok(Execution::unchanged(current));
			}

			match self.match_once(&current).await {
				Err(EngineError::Store(StoreError::ConditionFailed(reason))) => {
					if attempt == MATCH_ATTEMPTS {
						warn!(
							target: "engine",
							"Order {} lost {} matching races, dropping its fills: {}",
							current.id, attempt, reason
						);
						return Ok(Execution::unchanged(current));
					}
					warn!(
						target: "engine",
						"Order {} raced a concurrent write, matching again: {}",
						current.id, reason
					);
					attempt += 1;
				}
				other => {
					return other.inspect_err(|e| {
						error!(target: "engine", "Matching cycle for order {} failed: {}", taker.id, e);
					});
				}
			}
		}
	}

	async fn match_once(&self, taker: &Order) -> Result<Execution, EngineError> {
		let makers =
			opposite_orders(&*self.store, taker.outcome_id, taker.side, taker.user_id).await?;
		let fills = match_order(taker, &makers);
		let fills = self.screen_fills(taker, fills).await?;
		if fills.is_empty() {
			return Ok(Execution::unchanged(taker.clone()));
		}

		let outcome_id = taker.outcome_id;
		let mut mutations = Vec::with_capacity(fills.len() * 2 + 3);

		for (fill, maker) in &fills {
			mutations.push(Mutation::FillOrder {
				order_id: maker.id,
				expected_remaining: maker.remaining_size,
				quantity: fill.quantity,
			});
		}

		let mut ledger = LedgerBatch::new();
		ledger.load(&*self.store, outcome_id, taker.user_id).await?;
		for (fill, _) in &fills {
			ledger.load(&*self.store, outcome_id, fill.maker_user_id).await?;
		}

		for (fill, _) in &fills {
			let taker_leg =
				ledger.apply(outcome_id, fill.taker_user_id, fill.taker_side, fill.price, fill.quantity);
			let maker_leg = ledger.apply(
				outcome_id,
				fill.maker_user_id,
				fill.taker_side.opposite(),
				fill.price,
				fill.quantity,
			);
			if self.config.verbose_logging {
				debug!(
					target: "engine",
					"Fill: taker {} x maker {} {} @ {} (realized {} / {})",
					fill.taker_order_id,
					fill.maker_order_id,
					fill.quantity,
					fill.price,
					taker_leg.realized,
					maker_leg.realized
				);
			}
			mutations.push(Mutation::InsertTrade(NewTrade {
				outcome_id,
				price: fill.price,
				contracts: fill.quantity,
				taker_user_id: fill.taker_user_id,
				maker_user_id: Some(fill.maker_user_id),
				taker_side: fill.taker_side,
				taker_order_id: Some(fill.taker_order_id),
				maker_order_id: Some(fill.maker_order_id),
				risk_off: self.risk_off(taker_leg.realized, maker_leg.realized),
			}));
		}
		mutations.extend(ledger.into_mutations());

		let filled: u64 = fills.iter().map(|(fill, _)| fill.quantity).sum();
		mutations.push(Mutation::FillOrder {
			order_id: taker.id,
			expected_remaining: taker.remaining_size,
			quantity: filled,
		});
		let mut updated = taker.clone();
		updated.fill(filled);

		let receipt = self.store.batch(mutations).await?;

		info!(
			target: "engine",
			"Order {} matched {} contracts in {} fills ({} of {} filled)",
			updated.id,
			filled,
			fills.len(),
			updated.filled_size(),
			updated.original_size
		);

		Ok(Execution {
			order: updated,
			fills: fills.into_iter().map(|(fill, _)| fill).collect(),
			trades: receipt.trades,
		})
	}

	/// Drop fills that must not be applied, pairing the rest with fresh maker rows
	///
	/// A fill is dropped (and logged) when it would trade the taker with
	/// itself or with its own user, or when its maker is gone or no longer
	/// resting. A maker that shrank since the book was read caps its fill.
	async fn screen_fills(
		&self,
		taker: &Order,
		fills: Vec<Fill>,
	) -> Result<Vec<(Fill, Order)>, EngineError> {
		let mut screened = Vec::with_capacity(fills.len());

		for mut fill in fills {
			if fill.maker_order_id == taker.id || fill.maker_user_id == taker.user_id {
				warn!(
					target: "engine",
					"Skipping self-trade fill: order {} against maker {}",
					taker.id, fill.maker_order_id
				);
				continue;
			}

			let Some(maker) = self.store.order(fill.maker_order_id).await? else {
				warn!(target: "engine", "Skipping fill: maker order {} no longer exists", fill.maker_order_id);
				continue;
			};
			if !maker.is_resting() {
				warn!(
					target: "engine",
					"Skipping fill: maker order {} is {:?}",
					maker.id, maker.status
				);
				continue;
			}

			fill.quantity = fill.quantity.min(maker.remaining_size);
			screened.push((fill, maker));
		}

		Ok(screened)
	}
}
