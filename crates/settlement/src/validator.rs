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

use parlay_sdk::types::Trade;
use thiserror::Error;

/// Error types for trade validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("Trade {0} has no outcome")]
	MissingOutcome(i64),
	#[error("Trade {0} has no contracts")]
	ZeroContracts(i64),
	#[error("Trade {0} has no price")]
	ZeroPrice(i64),
}

/// Check that a stored trade can be reversed
///
/// A trade row written outside the engines may reference no outcome or
/// carry a zero size or price; reversing it would corrupt positions.
pub fn validate_trade(trade: &Trade) -> Result<(), ValidationError> {
	if trade.outcome_id <= 0 {
		return Err(ValidationError::MissingOutcome(trade.id));
	}
	if trade.contracts == 0 {
		return Err(ValidationError::ZeroContracts(trade.id));
	}
	if trade.price == 0 {
		return Err(ValidationError::ZeroPrice(trade.id));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use parlay_sdk::types::Side;

	use super::*;

	fn trade() -> Trade {
		Trade {
			id: 7,
			outcome_id: 1,
			price: 5000,
			contracts: 3,
			created_at: Utc::now(),
			taker_user_id: 1,
			maker_user_id: Some(2),
			taker_side: Side::Buy,
			taker_order_id: None,
			maker_order_id: None,
			risk_off: None,
		}
	}

	#[test]
	fn test_valid_trade() {
		assert!(validate_trade(&trade()).is_ok());
	}

	#[test]
	fn test_rejects_broken_rows() {
		let mut t = trade();
		t.outcome_id = 0;
		assert_eq!(validate_trade(&t), Err(ValidationError::MissingOutcome(7)));

		let mut t = trade();
		t.contracts = 0;
		assert_eq!(validate_trade(&t), Err(ValidationError::ZeroContracts(7)));

		let mut t = trade();
		t.price = 0;
		assert_eq!(validate_trade(&t), Err(ValidationError::ZeroPrice(7)));
	}
}
