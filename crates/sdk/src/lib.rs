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

//! Parlay SDK - shared records for the prediction market engine
//!
//! This crate holds the typed rows every other crate exchanges:
//! orders, trades, positions, markets and outcomes, plus the price
//! constants and validation rules of a $100 binary contract.
//!
//! The SDK is deliberately passive:
//! - No I/O
//! - No runtime initialization
//! - No environment or configuration loading

pub mod types;

pub use types::*;
