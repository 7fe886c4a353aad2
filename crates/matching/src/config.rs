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

use parlay_sdk::types::UserId;
use serde::{Deserialize, Serialize};

/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log root (can be overridden by LOG_DIR environment variable)
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default console output (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Per-user worst-case loss ceiling: $50,000
pub const DEFAULT_EXPOSURE_LIMIT_CENTS: u64 = 5_000_000;

pub const DEFAULT_STATE_PATH: &str = "parlay-state.json";

/// Auction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
	/// Price used by over/under auctions
	pub fixed_price: u64,
	/// Cents per guess unit when a mean guess becomes a price
	pub guess_scale: u64,
	/// Contracts booked per long/short pairing
	pub contracts_per_pair: u64,
	/// Allow odd participant counts (a short may back several longs)
	pub allow_uneven_pairing: bool,
}

impl Default for AuctionConfig {
	fn default() -> Self {
		Self {
			fixed_price: 5_000,
			guess_scale: 100,
			contracts_per_pair: 1,
			allow_uneven_pairing: true,
		}
	}
}

/// Matching engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	pub exposure_limit_cents: u64,
	/// Re-run matching once if an order still rests on a crossed book
	pub retry_crossed_book: bool,
	/// Counterparty of maker-less trades
	pub system_user_id: UserId,
	pub auction: AuctionConfig,
	/// JSON state file used by the command line tool
	pub state_path: String,
	/// Log every fill at debug level
	pub verbose_logging: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			exposure_limit_cents: DEFAULT_EXPOSURE_LIMIT_CENTS,
			retry_crossed_book: true,
			system_user_id: 0,
			auction: AuctionConfig::default(),
			state_path: DEFAULT_STATE_PATH.to_string(),
			verbose_logging: false,
		}
	}
}

impl EngineConfig {
	/// Load configuration from environment variables
	///
	/// Nested keys use a double underscore, e.g.
	/// `MATCHING_AUCTION__FIXED_PRICE=6000`.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix("MATCHING")
			.prefix_separator("_")
			.separator("__")
			.try_parsing(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = EngineConfig::default();
		assert_eq!(config.exposure_limit_cents, 5_000_000);
		assert!(config.retry_crossed_book);
		assert_eq!(config.system_user_id, 0);
		assert_eq!(config.auction.fixed_price, 5_000);
		assert!(config.auction.allow_uneven_pairing);
	}

	#[test]
	fn test_empty_environment_yields_defaults() {
		let cfg = config::Config::builder().build().unwrap();
		let config: EngineConfig = cfg.try_deserialize().unwrap();
		assert_eq!(config, EngineConfig::default());
	}

	#[test]
	fn test_overrides_are_merged_with_defaults() {
		let cfg = config::Config::builder()
			.set_override("exposure_limit_cents", 1_000)
			.unwrap()
			.set_override("auction.fixed_price", 6_000)
			.unwrap()
			.build()
			.unwrap();
		let config: EngineConfig = cfg.try_deserialize().unwrap();

		assert_eq!(config.exposure_limit_cents, 1_000);
		assert_eq!(config.auction.fixed_price, 6_000);
		assert_eq!(config.auction.guess_scale, 100);
		assert_eq!(config.state_path, DEFAULT_STATE_PATH);
	}
}
