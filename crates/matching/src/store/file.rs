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

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parlay_sdk::types::{
	Market, MarketId, NewOrder, Order, OrderId, Outcome, OutcomeId, Position, Side, Trade,
	TradeId, UserId,
};
use tracing::{debug, warn};

use super::{BatchReceipt, MemoryState, MemoryStore, Mutation, Store, StoreCapabilities, StoreError};

/// JSON-file-backed store
///
/// Keeps the full state in a [`MemoryStore`]. Every write is applied to
/// a staged copy, the copy is written to a temporary file and renamed
/// over the state file, and only then does it replace the live state.
/// A failed write therefore leaves both memory and disk untouched, and a
/// crash mid-write leaves the previous file intact.
pub struct FileStore {
	inner: MemoryStore,
	path: PathBuf,
}

impl FileStore {
	/// Open a store at `path`, loading existing state if the file exists
	pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
		let path = path.as_ref().to_path_buf();
		let state = match tokio::fs::read(&path).await {
			Ok(bytes) => serde_json::from_slice::<MemoryState>(&bytes)?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryState::default(),
			Err(e) => return Err(StoreError::Io(e)),
		};
		debug!(target: "store", "Opened file store at {}", path.display());

		Ok(Self {
			inner: MemoryStore::from_state(state, StoreCapabilities::default()),
			path,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|n| n.to_os_string())
			.unwrap_or_default();
		name.push(".tmp");
		self.path.with_file_name(name)
	}

	/// Stage `op` on a copy of the state, persist the copy, then publish it
	async fn commit<T, F>(&self, op: F) -> Result<T, StoreError>
	where
		T: Send,
		F: FnOnce(&mut MemoryState) -> Result<T, StoreError> + Send,
	{
		let mut state = self.inner.state.lock().await;
		let mut staged = state.clone();
		let value = op(&mut staged)?;
		self.persist(&staged).await?;
		*state = staged;
		Ok(value)
	}

	async fn persist(&self, state: &MemoryState) -> Result<(), StoreError> {
		let bytes = serde_json::to_vec_pretty(state)?;
		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			tokio::fs::create_dir_all(parent).await?;
		}

		let temp = self.temp_path();
		tokio::fs::write(&temp, bytes).await?;
		if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
			warn!(
				target: "store",
				"Failed to replace {}: {}",
				self.path.display(),
				e
			);
			tokio::fs::remove_file(&temp).await.ok();
			return Err(StoreError::Io(e));
		}
		Ok(())
	}
}

#[async_trait]
impl Store for FileStore {
	fn capabilities(&self) -> StoreCapabilities {
		self.inner.capabilities()
	}

	async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
		self.inner.user_exists(user_id).await
	}

	async fn market(&self, market_id: MarketId) -> Result<Option<Market>, StoreError> {
		self.inner.market(market_id).await
	}

	async fn outcome(&self, outcome_id: OutcomeId) -> Result<Option<Outcome>, StoreError> {
		self.inner.outcome(outcome_id).await
	}

	async fn outcomes(&self) -> Result<Vec<Outcome>, StoreError> {
		self.inner.outcomes().await
	}

	async fn market_outcomes(&self, market_id: MarketId) -> Result<Vec<Outcome>, StoreError> {
		self.inner.market_outcomes(market_id).await
	}

	async fn order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
		self.inner.order(order_id).await
	}

	async fn resting_orders(
		&self,
		outcome_id: OutcomeId,
		side: Side,
	) -> Result<Vec<Order>, StoreError> {
		self.inner.resting_orders(outcome_id, side).await
	}

	async fn user_resting_orders(&self, user_id: Option<UserId>) -> Result<Vec<Order>, StoreError> {
		self.inner.user_resting_orders(user_id).await
	}

	async fn position(
		&self,
		outcome_id: OutcomeId,
		user_id: UserId,
	) -> Result<Option<Position>, StoreError> {
		self.inner.position(outcome_id, user_id).await
	}

	async fn user_positions(&self, user_id: UserId) -> Result<Vec<Position>, StoreError> {
		self.inner.user_positions(user_id).await
	}

	async fn outcome_positions(&self, outcome_id: OutcomeId) -> Result<Vec<Position>, StoreError> {
		self.inner.outcome_positions(outcome_id).await
	}

	async fn trade(&self, trade_id: TradeId) -> Result<Option<Trade>, StoreError> {
		self.inner.trade(trade_id).await
	}

	async fn outcome_trades(&self, outcome_id: OutcomeId) -> Result<Vec<Trade>, StoreError> {
		self.inner.outcome_trades(outcome_id).await
	}

	async fn insert_user(&self, name: &str) -> Result<UserId, StoreError> {
		self.commit(|state| Ok(state.add_user(name))).await
	}

	async fn insert_market(&self, name: &str) -> Result<Market, StoreError> {
		self.commit(|state| Ok(state.add_market(name))).await
	}

	async fn insert_outcome(&self, market_id: MarketId, name: &str) -> Result<Outcome, StoreError> {
		self.commit(|state| state.add_outcome(market_id, name)).await
	}

	async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
		self.commit(|state| state.insert_order(order, Utc::now())).await
	}

	async fn batch(&self, mutations: Vec<Mutation>) -> Result<BatchReceipt, StoreError> {
		let capabilities = self.inner.capabilities();
		self.commit(|state| state.apply_batch(mutations, capabilities)).await
	}
}
