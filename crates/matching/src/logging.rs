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

//! Logging initialization shared by the parlay binaries
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives (default: `info`),
//!   e.g. `RUST_LOG=parlay_matching=debug`
//! - `LOG_DIR`: root directory for log files (default: `./logs`)
//! - `LOG_TO_CONSOLE`: `true`, `1` or `yes` mirrors logs to stderr with
//!   ANSI colors (default: off)
//!
//! Files land in `{LOG_DIR}/{component}/{component}.{date}.log`, one per
//! UTC day, written through a non-blocking appender.

use std::{
	env,
	path::{Path, PathBuf},
	sync::OnceLock,
};

use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::{
	non_blocking,
	rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
	EnvFilter, fmt, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt,
};

use crate::config::{DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_LOG_TO_CONSOLE};

// Flushes buffered lines on exit
static LOG_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

fn log_root() -> PathBuf {
	env::var("LOG_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

fn console_enabled() -> bool {
	env::var("LOG_TO_CONSOLE")
		.map(|v| v == "true" || v == "1" || v == "yes")
		.unwrap_or(DEFAULT_LOG_TO_CONSOLE)
}

fn file_writer(log_dir: &Path, component: &str) -> Result<non_blocking::NonBlocking> {
	let appender = RollingFileAppender::builder()
		.rotation(Rotation::DAILY)
		.filename_prefix(component.to_string())
		.filename_suffix(".log")
		.build(log_dir)
		.with_context(|| {
			format!(
				"Failed to create rolling file appender in {}",
				log_dir.display()
			)
		})?;

	let (writer, guard) = non_blocking(appender);
	LOG_GUARD.set(guard).ok();
	Ok(writer)
}

/// Initialize file logging (and optionally stderr) for one component
///
/// Loads `.env` first so the variables above can live there.
pub fn init_logging(component: &str) -> Result<()> {
	dotenv::dotenv().ok();

	let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
	let log_dir = log_root().join(component);
	std::fs::create_dir_all(&log_dir)
		.with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

	let writer = file_writer(&log_dir, component)?;
	let log_to_console = console_enabled();
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

	let file_layer = fmt::layer()
		.with_writer(writer)
		.with_timer(fmt::time::UtcTime::rfc_3339())
		.with_thread_ids(true)
		.with_target(true)
		.with_ansi(false);
	let console_layer = log_to_console.then(|| {
		fmt::layer()
			.with_writer(std::io::stderr)
			.with_timer(fmt::time::UtcTime::rfc_3339())
			.with_target(true)
			.with_ansi(true)
	});

	Registry::default()
		.with(filter)
		.with(file_layer)
		.with(console_layer)
		.try_init()
		.context("Failed to install tracing subscriber")?;

	info!(target: "server", "Log level: {}", log_level);
	info!(
		target: "server",
		"Log file: {}/{}.YYYY-MM-DD.log (daily rolling)",
		log_dir.display(),
		component
	);
	if log_to_console {
		info!(target: "server", "Console output: enabled");
	}

	Ok(())
}
