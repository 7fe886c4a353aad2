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

//! Parlay Matching Engine
//!
//! Order matching and position accounting for binary-outcome markets.
//! Orders are matched with price-time priority against the resting book
//! of one outcome, and every fill moves both traders' positions through
//! one ledger law (weighted-average basis, close-out profit).
//!
//! Architecture:
//! - Stateless engine: the book and all positions live in a [`store::Store`]
//! - One matching cycle commits as one atomic store batch
//! - Pure matcher and ledger, so history can be replayed exactly
//! - Auctions and manual trades reuse the ledger but bypass the book

pub mod auction;
pub mod config;
pub mod engine;
pub mod exposure;
pub mod ledger;
pub mod logging;
pub mod matcher;
pub mod orderbook;
pub mod store;
pub mod types;

pub use auction::{AuctionBid, AuctionMode, AuctionPair, AuctionResult};
pub use config::{AuctionConfig, EngineConfig};
pub use engine::{EngineError, ManualTrade, MatchingEngine};
pub use ledger::{FillEffect, LedgerBatch, PositionState, apply_fill};
pub use orderbook::OrderBook;
pub use store::{
	BatchReceipt, FileStore, MemoryStore, Mutation, Store, StoreCapabilities, StoreError,
};
pub use types::*;
