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

//! Parlay command line tool
//!
//! Drives the matching and settlement engines against a JSON state file.
//! Every subcommand runs one engine operation and prints its result as
//! JSON on stdout; logs go to `{LOG_DIR}/parlay/`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use parlay_matching::{
	AuctionBid, AuctionMode, EngineConfig, FileStore, MatchingEngine, OrderBook, OrderCommand,
	Store, orderbook::PriceLevel,
};
use parlay_sdk::types::{MarketId, Order, OrderId, OutcomeId, Side, TradeId, UserId};
use parlay_settlement::{SettlementConfig, SettlementEngine};

#[derive(Parser, Debug)]
#[command(name = "parlay")]
#[command(about = "Prediction market matching and settlement", long_about = None)]
struct Args {
	/// State file (overrides MATCHING_STATE_PATH)
	#[arg(long, global = true)]
	state: Option<String>,

	/// Configuration file for both engines
	#[arg(short, long, global = true)]
	config: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
	Buy,
	Sell,
}

impl From<SideArg> for Side {
	fn from(side: SideArg) -> Self {
		match side {
			SideArg::Buy => Side::Buy,
			SideArg::Sell => Side::Sell,
		}
	}
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Register a user
	AddUser { name: String },
	/// Create a market
	AddMarket { name: String },
	/// Add an outcome to a market
	AddOutcome { market: MarketId, name: String },
	/// Place a limit order and match it
	PlaceOrder {
		outcome: OutcomeId,
		user: UserId,
		#[arg(value_enum)]
		side: SideArg,
		/// Price in cents (100..=9900)
		price: u64,
		size: u64,
	},
	/// Cancel one resting order
	CancelOrder { order: OrderId, user: UserId },
	/// Cancel every resting order, or only one user's
	CancelAll {
		#[arg(long)]
		user: Option<UserId>,
	},
	/// Book a trade against the system counterparty
	ManualTrade {
		user: UserId,
		outcome: OutcomeId,
		#[arg(value_enum)]
		side: SideArg,
		price: u64,
		size: u64,
	},
	/// Pair auction bids and book one trade per pair
	Auction {
		outcome: OutcomeId,
		/// over-under or mean-guess
		#[arg(long, default_value = "over-under")]
		mode: AuctionMode,
		/// Bids as USER:GUESS
		#[arg(required = true, value_parser = parse_bid)]
		bids: Vec<AuctionBid>,
	},
	/// Resting orders of one outcome, best price first
	Book { outcome: OutcomeId },
	/// Positions of one user
	Positions { user: UserId },
	/// Worst-case loss of a user in cents
	Exposure { user: UserId },
	/// Settle every outcome of a market (0 or 10000)
	SettleMarket { market: MarketId, value: u64 },
	/// Settle one outcome (0 or 10000)
	SettleOutcome { outcome: OutcomeId, value: u64 },
	/// Reverse one trade and delete it
	Backout { trade: TradeId },
	/// Rebuild positions from trade history
	Replay {
		#[arg(long)]
		outcome: Option<OutcomeId>,
	},
	/// Repair closed profit from per-trade realized deltas
	RecomputeClosedProfit,
}

fn parse_bid(raw: &str) -> Result<AuctionBid, String> {
	let (user, guess) = raw
		.split_once(':')
		.ok_or_else(|| format!("expected USER:GUESS, got {}", raw))?;
	Ok(AuctionBid {
		user_id: user.trim().parse().map_err(|e| format!("bad user in {}: {}", raw, e))?,
		guess: guess.trim().parse().map_err(|e| format!("bad guess in {}: {}", raw, e))?,
	})
}

#[derive(Serialize)]
struct LevelView {
	price: u64,
	total_size: u64,
	orders: Vec<Order>,
}

impl From<&PriceLevel> for LevelView {
	fn from(level: &PriceLevel) -> Self {
		Self {
			price: level.price(),
			total_size: level.total_size(),
			orders: level.orders().to_vec(),
		}
	}
}

#[derive(Serialize)]
struct BookView {
	outcome_id: OutcomeId,
	best_bid: Option<u64>,
	best_ask: Option<u64>,
	bids: Vec<LevelView>,
	asks: Vec<LevelView>,
}

impl BookView {
	fn new(book: &OrderBook) -> Self {
		let side = |side: Side| -> Vec<LevelView> {
			book.levels(side).into_iter().map(LevelView::from).collect()
		};
		Self {
			outcome_id: book.outcome_id(),
			best_bid: book.best_bid(),
			best_ask: book.best_ask(),
			bids: side(Side::Buy),
			asks: side(Side::Sell),
		}
	}
}

#[derive(Serialize)]
struct ExposureView {
	user_id: UserId,
	worst_case_loss: u64,
	limit: u64,
}

fn load_configs(path: Option<&str>) -> Result<(EngineConfig, SettlementConfig)> {
	match path {
		Some(path) => Ok((
			EngineConfig::from_file(path)
				.with_context(|| format!("Failed to load engine config from {}", path))?,
			SettlementConfig::from_file(path)
				.with_context(|| format!("Failed to load settlement config from {}", path))?,
		)),
		None => Ok((
			EngineConfig::from_env().unwrap_or_default(),
			SettlementConfig::from_env().unwrap_or_default(),
		)),
	}
}

fn print<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	parlay_matching::logging::init_logging("parlay")?;

	let (mut engine_config, settlement_config) = load_configs(args.config.as_deref())?;
	if let Some(state) = args.state {
		engine_config.state_path = state;
	}
	if engine_config.system_user_id != settlement_config.system_user_id {
		bail!(
			"system user differs between matching ({}) and settlement ({})",
			engine_config.system_user_id,
			settlement_config.system_user_id
		);
	}

	let store = Arc::new(
		FileStore::open(&engine_config.state_path)
			.await
			.with_context(|| format!("Failed to open state file {}", engine_config.state_path))?,
	);
	info!(target: "server", "Using state file {}", store.path().display());

	let matching = MatchingEngine::new(store.clone(), engine_config);
	let settlement = SettlementEngine::new(store.clone(), settlement_config);

	match args.command {
		Command::AddUser { name } => {
			let id = store.insert_user(&name).await?;
			print(&serde_json::json!({ "user_id": id, "name": name }))?;
		}
		Command::AddMarket { name } => print(&store.insert_market(&name).await?)?,
		Command::AddOutcome { market, name } => {
			if store.market(market).await?.is_none() {
				bail!("unknown market {}", market);
			}
			print(&store.insert_outcome(market, &name).await?)?;
		}
		Command::PlaceOrder {
			outcome,
			user,
			side,
			price,
			size,
		} => {
			let cmd = OrderCommand::new(outcome, user, side.into(), price, size);
			print(&matching.place_order(cmd).await?)?;
		}
		Command::CancelOrder { order, user } => print(&matching.cancel_order(order, user).await?)?,
		Command::CancelAll { user } => print(&matching.cancel_all_open_orders(user).await?)?,
		Command::ManualTrade {
			user,
			outcome,
			side,
			price,
			size,
		} => print(
			&matching
				.manual_trade(user, outcome, side.into(), price, size)
				.await?,
		)?,
		Command::Auction {
			outcome,
			mode,
			bids,
		} => print(&matching.run_auction(outcome, &bids, mode).await?)?,
		Command::Book { outcome } => {
			let book = OrderBook::load_full(&*store, outcome).await?;
			print(&BookView::new(&book))?;
		}
		Command::Positions { user } => print(&store.user_positions(user).await?)?,
		Command::Exposure { user } => print(&ExposureView {
			user_id: user,
			worst_case_loss: matching.worst_case_loss(user).await?,
			limit: matching.config().exposure_limit_cents,
		})?,
		Command::SettleMarket { market, value } => {
			print(&settlement.settle_market(market, value).await?)?
		}
		Command::SettleOutcome { outcome, value } => {
			print(&settlement.settle_outcome(outcome, value).await?)?
		}
		Command::Backout { trade } => print(&settlement.backout_trade(trade).await?)?,
		Command::Replay { outcome } => match outcome {
			Some(outcome) => print(&settlement.replay_outcome(outcome).await?)?,
			None => print(&settlement.replay_positions().await?)?,
		},
		Command::RecomputeClosedProfit => print(&settlement.recompute_closed_profit().await?)?,
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_bid() {
		let bid = parse_bid("7: 42").unwrap();
		assert_eq!(bid.user_id, 7);
		assert_eq!(bid.guess, 42);
		assert!(parse_bid("7").is_err());
		assert!(parse_bid("x:1").is_err());
	}

	#[test]
	fn test_book_view_groups_levels() {
		let now = chrono::Utc::now();
		let order = |id, side, price, size| Order {
			id,
			outcome_id: 1,
			user_id: id,
			side,
			price,
			original_size: size,
			remaining_size: size,
			status: parlay_sdk::types::OrderStatus::Open,
			created_at: now,
		};
		let book = OrderBook::from_orders(
			1,
			[
				order(1, Side::Buy, 4000, 3),
				order(2, Side::Buy, 4500, 2),
				order(3, Side::Buy, 4500, 5),
				order(4, Side::Sell, 6000, 1),
			],
		);

		let view = BookView::new(&book);
		assert_eq!((view.best_bid, view.best_ask), (Some(4500), Some(6000)));
		let bids: Vec<(u64, u64, usize)> = view
			.bids
			.iter()
			.map(|l| (l.price, l.total_size, l.orders.len()))
			.collect();
		assert_eq!(bids, vec![(4500, 7, 2), (4000, 3, 1)]);
		assert_eq!(view.bids[0].orders[0].id, 2);
		assert_eq!(view.asks.len(), 1);
	}

	#[test]
	fn test_cli_parses_auction() {
		let args = Args::try_parse_from([
			"parlay", "auction", "3", "--mode", "mean-guess", "1:2", "2:9",
		])
		.unwrap();
		match args.command {
			Command::Auction { outcome, mode, bids } => {
				assert_eq!(outcome, 3);
				assert_eq!(mode, AuctionMode::MeanGuess);
				assert_eq!(bids.len(), 2);
			}
			other => panic!("unexpected command: {:?}", other),
		}
	}
}
