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

use std::sync::Arc;

use parlay_matching::store::{Store, StoreCapabilities, StoreError};
use parlay_sdk::types::{MarketId, Outcome, OutcomeId, TradeId};
use thiserror::Error;
use tracing::info;

use crate::{config::SettlementConfig, validator};

/// Error types for settlement and reconciliation
#[derive(Debug, Error)]
pub enum SettlementError {
	#[error("Settle value must be 0 or 10000, got {0}")]
	InvalidSettleValue(u64),
	#[error("Unknown market: {0}")]
	UnknownMarket(MarketId),
	#[error("Unknown outcome: {0}")]
	UnknownOutcome(OutcomeId),
	#[error("Unknown trade: {0}")]
	UnknownTrade(TradeId),
	#[error("Outcome {0} is already settled")]
	AlreadySettled(OutcomeId),
	#[error("Invalid trade: {0}")]
	InvalidTrade(#[from] validator::ValidationError),
	#[error("Unsupported by this store: {0}")]
	Unsupported(String),
	#[error("Store error: {0}")]
	Store(#[from] StoreError),
}

/// Settlement and reconciliation over a transactional store
///
/// Like the matching engine it holds no state besides configuration;
/// each operation commits its writes as one batch (replay commits one
/// batch per outcome).
pub struct SettlementEngine<S: Store> {
	pub(crate) store: Arc<S>,
	pub(crate) config: SettlementConfig,
	pub(crate) capabilities: StoreCapabilities,
}

impl<S: Store> SettlementEngine<S> {
	pub fn new(store: Arc<S>, config: SettlementConfig) -> Self {
		let capabilities = store.capabilities();
		info!(
			target: "settlement",
			"Settlement engine ready (system user {}, risk-off columns: {})",
			config.system_user_id,
			capabilities.trade_risk_off
		);
		Self {
			store,
			config,
			capabilities,
		}
	}

	pub fn config(&self) -> &SettlementConfig {
		&self.config
	}

	pub(crate) async fn load_outcome(&self, outcome_id: OutcomeId) -> Result<Outcome, SettlementError> {
		self.store
			.outcome(outcome_id)
			.await?
			.ok_or(SettlementError::UnknownOutcome(outcome_id))
	}
}
