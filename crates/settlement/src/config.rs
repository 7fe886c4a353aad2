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

/// Settlement and reconciliation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
	/// Counterparty booked for maker-less trades during replay
	pub system_user_id: UserId,
	/// Permit settling an outcome that already carries a settle value
	pub allow_resettle: bool,
}

impl Default for SettlementConfig {
	fn default() -> Self {
		Self {
			system_user_id: 0,
			allow_resettle: false,
		}
	}
}

impl SettlementConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?;

		cfg.try_deserialize()
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix("SETTLEMENT")
			.prefix_separator("_")
			.try_parsing(true)
	}
}
