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

use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parlay_matching::{
	EngineConfig, MatchingEngine, MemoryStore, Store, apply_fill, ledger::PositionState,
	matcher::match_order,
};
use parlay_sdk::types::{Order, OrderStatus, Side};

mod common;
use common::order_generator::{OrderGenerator, Scenario};

const USERS: usize = 8;
const BOOK_DEPTHS: &[usize] = &[10, 100, 1_000];

fn resting_asks(count: usize) -> Vec<Order> {
	(0..count)
		.map(|i| Order {
			id: i as i64 + 1,
			outcome_id: 1,
			user_id: (i % USERS) as i64 + 1,
			side: Side::Sell,
			price: 5000 + (i as u64 % 50) * 10,
			original_size: 3,
			remaining_size: 3,
			status: OrderStatus::Open,
			created_at: Utc::now(),
		})
		.collect()
}

fn bench_matcher(c: &mut Criterion) {
	let mut group = c.benchmark_group("matcher");

	for &depth in BOOK_DEPTHS {
		let makers = resting_asks(depth);
		let mut taker = makers[0].clone();
		taker.id = 0;
		taker.user_id = 0;
		taker.side = Side::Buy;
		taker.price = 9900;
		taker.original_size = depth as u64;
		taker.remaining_size = depth as u64;

		group.bench_with_input(BenchmarkId::from_parameter(depth), &makers, |b, makers| {
			b.iter(|| match_order(black_box(&taker), black_box(makers)))
		});
	}

	group.finish();
}

fn bench_ledger(c: &mut Criterion) {
	let fills: Vec<(Side, u64, u64)> = (0..1_000u64)
		.map(|i| {
			let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
			(side, 100 + (i * 37) % 9_800, 1 + i % 7)
		})
		.collect();

	c.bench_function("ledger/apply_1000_fills", |b| {
		b.iter(|| {
			fills.iter().fold(PositionState::default(), |state, &(side, price, qty)| {
				apply_fill(state, side, price, qty).state
			})
		})
	});
}

fn benchmark_scenario(c: &mut Criterion, name: &str, scenario: Scenario) {
	let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
	let mut group = c.benchmark_group(name);
	group.sample_size(10);

	group.bench_function("place_order", |b| {
		b.iter_custom(|iters| {
			rt.block_on(async {
				let store = Arc::new(MemoryStore::new());
				let market = store.insert_market("bench").await.unwrap();
				let outcome = store.insert_outcome(market.id, "yes").await.unwrap();
				let mut users = Vec::with_capacity(USERS);
				for i in 0..USERS {
					users.push(store.insert_user(&format!("bench_{}", i)).await.unwrap());
				}

				let config = EngineConfig {
					exposure_limit_cents: u64::MAX / 4,
					..EngineConfig::default()
				};
				let engine = MatchingEngine::new(store, config);
				let mut generator = OrderGenerator::new(outcome.id, users, scenario);

				let mut elapsed = Duration::ZERO;
				for _ in 0..iters {
					let cmd = generator.next_order();
					let start = Instant::now();
					let _ = black_box(engine.place_order(cmd).await);
					elapsed += start.elapsed();
				}
				elapsed
			})
		});
	});

	group.finish();
}

fn bench_no_cross(c: &mut Criterion) {
	benchmark_scenario(c, "no_cross", Scenario::NoCross);
}

fn bench_cross_heavy(c: &mut Criterion) {
	benchmark_scenario(c, "cross_heavy", Scenario::CrossHeavy);
}

fn bench_deep_book(c: &mut Criterion) {
	benchmark_scenario(c, "deep_book", Scenario::DeepBook);
}

criterion_group!(
	benches,
	bench_matcher,
	bench_ledger,
	bench_no_cross,
	bench_cross_heavy,
	bench_deep_book
);
criterion_main!(benches);
