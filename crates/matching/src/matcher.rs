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

use std::collections::HashSet;

use parlay_sdk::types::{Order, Side};

use crate::types::Fill;

/// Whether a taker at `taker_price` on `taker_side` trades with a maker at `maker_price`
pub fn prices_cross(taker_side: Side, taker_price: u64, maker_price: u64) -> bool {
	match taker_side {
		Side::Buy => taker_price >= maker_price,
		Side::Sell => maker_price >= taker_price,
	}
}

/// Match a taker against makers already sorted in price-time priority
///
/// This function applies deterministic price-time priority:
/// - Makers are walked in the given order
/// - Each fill is `min(taker remaining, maker remaining)` at the maker's price
/// - The walk stops when the taker is filled or at the first maker whose
///   price no longer crosses
///
/// Pure: nothing is mutated, and a maker id is used at most once.
/// Self-trades are the caller's concern (the book query excludes them).
pub fn match_order(taker: &Order, makers: &[Order]) -> Vec<Fill> {
	let mut fills = Vec::new();
	let mut remaining = taker.remaining_size;
	let mut seen = HashSet::new();

	for maker in makers {
		if remaining == 0 {
			break;
		}
		if maker.id == taker.id || maker.remaining_size == 0 || !seen.insert(maker.id) {
			continue;
		}
		if !prices_cross(taker.side, taker.price, maker.price) {
			break;
		}

		let quantity = remaining.min(maker.remaining_size);
		remaining -= quantity;
		fills.push(Fill {
			maker_order_id: maker.id,
			maker_user_id: maker.user_id,
			taker_order_id: taker.id,
			taker_user_id: taker.user_id,
			taker_side: taker.side,
			price: maker.price,
			quantity,
		});
	}

	fills
}
