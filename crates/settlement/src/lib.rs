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

//! Parlay Settlement
//!
//! Final settlement of binary outcomes and the administrative tools that
//! re-derive position state from trade history:
//! - settlement of a market or a single outcome to 0 or 10000
//! - replay of every trade through the ledger law
//! - backout of one trade
//! - closed-profit repair from stored per-trade realized deltas

pub mod config;
pub mod engine;
pub mod reconcile;
pub mod settle;
pub mod validator;

pub use config::SettlementConfig;
pub use engine::{SettlementEngine, SettlementError};
pub use reconcile::{BackoutReport, ClosedProfitReport, ClosedProfitRepair, ReplayReport};
pub use settle::{SettlementReport, settlement_profit};
