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

//! Batch auctions
//!
//! Participants submit a numeric guess instead of a price. Bids are
//! split at the median: the lower half goes short, the upper half long,
//! and every long is paired with a short at one auction-wide price.
//! Trades bypass the book but go through the same ledger law.

use std::str::FromStr;

use parlay_sdk::types::{
	MAX_ORDER_SIZE, MAX_PRICE, MIN_PRICE, NewOrder, NewTrade, Order, OutcomeId, Side, Trade,
	UserId, validate_price, validate_size,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
	config::AuctionConfig,
	engine::{EngineError, MatchingEngine},
	ledger::LedgerBatch,
	store::{Mutation, Store},
};

/// How the auction price is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuctionMode {
	/// Round over/under: the configured fixed price
	OverUnder,
	/// Mean of all guesses scaled to a price
	MeanGuess,
}

impl FromStr for AuctionMode {
	type Err = EngineError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"over-under" => Ok(AuctionMode::OverUnder),
			"mean-guess" => Ok(AuctionMode::MeanGuess),
			other => Err(EngineError::InvalidAuction(format!(
				"unknown auction mode: {}",
				other
			))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBid {
	pub user_id: UserId,
	pub guess: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionPair {
	pub long: AuctionBid,
	pub short: AuctionBid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionResult {
	pub outcome_id: OutcomeId,
	pub price: u64,
	pub pairs: Vec<AuctionPair>,
	/// Synthetic filled orders, two per pair (audit only)
	pub orders: Vec<Order>,
	pub trades: Vec<Trade>,
}

/// Sort by guess (ties by user) and split into (short, long) halves
///
/// The short half is the lower `n / 2` guesses; the long half gets the
/// extra participant when `n` is odd.
pub fn split_bids(bids: &[AuctionBid]) -> (Vec<AuctionBid>, Vec<AuctionBid>) {
	let mut sorted = bids.to_vec();
	sorted.sort_by_key(|b| (b.guess, b.user_id));
	let long = sorted.split_off(sorted.len() / 2);
	(sorted, long)
}

/// Short partner of the i-th long; wraps around when the halves differ in size
pub fn partner_index(long_index: usize, short_len: usize) -> usize {
	long_index % short_len
}

pub fn pair_bids(bids: &[AuctionBid], allow_uneven: bool) -> Result<Vec<AuctionPair>, EngineError> {
	if bids.len() < 2 {
		return Err(EngineError::InvalidAuction(format!(
			"need at least 2 bids, got {}",
			bids.len()
		)));
	}
	if bids.len() % 2 == 1 && !allow_uneven {
		return Err(EngineError::InvalidAuction(format!(
			"odd number of bids ({}) and uneven pairing is disabled",
			bids.len()
		)));
	}

	let (short, long) = split_bids(bids);
	Ok(long
		.iter()
		.enumerate()
		.map(|(i, &long)| AuctionPair {
			long,
			short: short[partner_index(i, short.len())],
		})
		.collect())
}

/// Auction-wide trade price
///
/// Mean mode rounds `mean(guess) × guess_scale` half up and clamps it to
/// the contract price range.
pub fn auction_price(
	bids: &[AuctionBid],
	mode: AuctionMode,
	config: &AuctionConfig,
) -> Result<u64, EngineError> {
	match mode {
		AuctionMode::OverUnder => {
			validate_price(config.fixed_price)?;
			Ok(config.fixed_price)
		}
		AuctionMode::MeanGuess => {
			if bids.is_empty() {
				return Err(EngineError::InvalidAuction("no bids to average".to_string()));
			}
			let count = bids.len() as i128;
			let scaled: i128 = bids.iter().map(|b| b.guess as i128).sum::<i128>()
				* config.guess_scale as i128;
			let rounded = (2 * scaled + count).div_euclid(2 * count);
			Ok(rounded.clamp(MIN_PRICE as i128, MAX_PRICE as i128) as u64)
		}
	}
}

impl<S: Store> MatchingEngine<S> {
	/// Pair bids and book one trade per pair, all in a single batch
	///
	/// The long side of each pair is recorded as the taker (buy), the
	/// short side as the maker.
	pub async fn run_auction(
		&self,
		outcome_id: OutcomeId,
		bids: &[AuctionBid],
		mode: AuctionMode,
	) -> Result<AuctionResult, EngineError> {
		let auction = &self.config().auction;
		self.tradable_outcome(outcome_id).await?;
		for bid in bids {
			self.ensure_user(bid.user_id).await?;
		}
		if validate_size(auction.contracts_per_pair).is_err() {
			return Err(EngineError::InvalidAuction(format!(
				"contracts per pair must be in 1..={}",
				MAX_ORDER_SIZE
			)));
		}

		let pairs = pair_bids(bids, auction.allow_uneven_pairing)?;
		let price = auction_price(bids, mode, auction)?;
		let contracts = auction.contracts_per_pair;

		let mut ledger = LedgerBatch::new();
		for bid in bids {
			ledger.load(&**self.store(), outcome_id, bid.user_id).await?;
		}

		let mut mutations = Vec::with_capacity(pairs.len() * 3 + bids.len());
		for pair in &pairs {
			let long_leg = ledger.apply(outcome_id, pair.long.user_id, Side::Buy, price, contracts);
			let short_leg = ledger.apply(outcome_id, pair.short.user_id, Side::Sell, price, contracts);

			mutations.push(Mutation::InsertOrder(NewOrder::filled(
				outcome_id,
				pair.long.user_id,
				Side::Buy,
				price,
				contracts,
			)));
			mutations.push(Mutation::InsertOrder(NewOrder::filled(
				outcome_id,
				pair.short.user_id,
				Side::Sell,
				price,
				contracts,
			)));
			mutations.push(Mutation::InsertTrade(NewTrade {
				outcome_id,
				price,
				contracts,
				taker_user_id: pair.long.user_id,
				maker_user_id: Some(pair.short.user_id),
				taker_side: Side::Buy,
				taker_order_id: None,
				maker_order_id: None,
				risk_off: self.risk_off(long_leg.realized, short_leg.realized),
			}));
		}
		mutations.extend(ledger.into_mutations());

		let receipt = self.store().batch(mutations).await?;
		info!(
			target: "engine",
			"Auction on outcome {}: {} bids, {} pairs at {}",
			outcome_id,
			bids.len(),
			pairs.len(),
			price
		);

		Ok(AuctionResult {
			outcome_id,
			price,
			pairs,
			orders: receipt.orders,
			trades: receipt.trades,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn bids(guesses: &[(UserId, i64)]) -> Vec<AuctionBid> {
		guesses
			.iter()
			.map(|&(user_id, guess)| AuctionBid { user_id, guess })
			.collect()
	}

	#[test]
	fn test_even_split_pairs_in_order() {
		let pairs = pair_bids(&bids(&[(4, 9), (1, 2), (3, 7), (2, 3)]), true).unwrap();

		let users: Vec<_> = pairs.iter().map(|p| (p.long.user_id, p.short.user_id)).collect();
		assert_eq!(users, vec![(3, 1), (4, 2)]);
	}

	#[test]
	fn test_odd_count_pairs_cyclically() {
		let pairs = pair_bids(&bids(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]), true).unwrap();

		// short = [1, 2], long = [3, 4, 5]
		let users: Vec<_> = pairs.iter().map(|p| (p.long.user_id, p.short.user_id)).collect();
		assert_eq!(users, vec![(3, 1), (4, 2), (5, 1)]);
	}

	#[test]
	fn test_odd_count_rejected_when_uneven_disabled() {
		let result = pair_bids(&bids(&[(1, 1), (2, 2), (3, 3)]), false);
		assert!(matches!(result, Err(EngineError::InvalidAuction(_))));
	}

	#[test]
	fn test_needs_two_bids() {
		assert!(pair_bids(&bids(&[(1, 5)]), true).is_err());
	}

	#[test]
	fn test_ties_break_by_user() {
		let (short, long) = split_bids(&bids(&[(9, 5), (2, 5)]));
		assert_eq!(short[0].user_id, 2);
		assert_eq!(long[0].user_id, 9);
	}

	#[test]
	fn test_mean_price_rounds_and_clamps() {
		let config = AuctionConfig::default();

		// mean(2, 3, 7, 9) = 5.25 -> 525
		let four = bids(&[(1, 2), (2, 3), (3, 7), (4, 9)]);
		let price = auction_price(&four, AuctionMode::MeanGuess, &config).unwrap();
		assert_eq!(price, 525);

		// mean(40, 41) = 40.5 -> 4050
		let price = auction_price(&bids(&[(1, 40), (2, 41)]), AuctionMode::MeanGuess, &config).unwrap();
		assert_eq!(price, 4050);

		let low = auction_price(&bids(&[(1, 0), (2, 1)]), AuctionMode::MeanGuess, &config).unwrap();
		assert_eq!(low, MIN_PRICE);

		let high =
			auction_price(&bids(&[(1, 500), (2, 900)]), AuctionMode::MeanGuess, &config).unwrap();
		assert_eq!(high, MAX_PRICE);
	}

	#[test]
	fn test_over_under_uses_fixed_price() {
		let config = AuctionConfig::default();
		let price = auction_price(&bids(&[(1, 1), (2, 2)]), AuctionMode::OverUnder, &config).unwrap();
		assert_eq!(price, 5_000);
	}

	#[test]
	fn test_mode_parsing() {
		assert_eq!("mean-guess".parse::<AuctionMode>().unwrap(), AuctionMode::MeanGuess);
		assert!("median".parse::<AuctionMode>().is_err());
	}
}
