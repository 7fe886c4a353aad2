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

use parlay_matching::types::OrderCommand;
use parlay_sdk::types::{OutcomeId, Side, UserId};

#[derive(Clone, Copy)]
pub enum Scenario {
	/// Bids below 4000, asks above 6000: everything rests
	NoCross,
	/// Alternating sides at one price: almost everything trades
	CrossHeavy,
	/// Many resting levels swept by an occasional wide taker
	DeepBook,
}

pub struct OrderGenerator {
	outcome_id: OutcomeId,
	users: Vec<UserId>,
	counter: u64,
	scenario: Scenario,
}

impl OrderGenerator {
	pub fn new(outcome_id: OutcomeId, users: Vec<UserId>, scenario: Scenario) -> Self {
		Self {
			outcome_id,
			users,
			counter: 0,
			scenario,
		}
	}

	fn user(&self) -> UserId {
		self.users[(self.counter as usize) % self.users.len()]
	}

	fn alternating_side(&self) -> Side {
		if self.counter.is_multiple_of(2) {
			Side::Buy
		} else {
			Side::Sell
		}
	}

	pub fn next_order(&mut self) -> OrderCommand {
		self.counter += 1;
		let side = self.alternating_side();
		let user = self.user();

		match self.scenario {
			Scenario::NoCross => {
				let price = match side {
					Side::Buy => 3000 + self.counter % 1000,
					Side::Sell => 6000 + self.counter % 1000,
				};
				OrderCommand::new(self.outcome_id, user, side, price, 1)
			}
			Scenario::CrossHeavy => OrderCommand::new(self.outcome_id, user, side, 5000, 2),
			Scenario::DeepBook => {
				if self.counter.is_multiple_of(50) {
					// Wide limit sweeps several levels
					let price = match side {
						Side::Buy => 9900,
						Side::Sell => 100,
					};
					OrderCommand::new(self.outcome_id, user, side, price, 40)
				} else {
					let level = self.counter % 40;
					let price = match side {
						Side::Buy => 4900 - level * 10,
						Side::Sell => 5100 + level * 10,
					};
					OrderCommand::new(self.outcome_id, user, side, price, 1)
				}
			}
		}
	}
}
