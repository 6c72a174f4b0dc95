// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::process::ExitCode;
use std::sync::Arc;

use ember_core::Config;
use ember_server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = match load_config() {
		Ok(config) => config,
		Err(err) => {
			error!(%err, "invalid configuration");
			return ExitCode::FAILURE;
		}
	};

	// Recovery happens before the runtime exists; it is synchronous file
	// and keyspace work.
	let server = match Server::bootstrap(config) {
		Ok(server) => Arc::new(server),
		Err(err) => {
			error!(%err, "startup failed");
			return ExitCode::FAILURE;
		}
	};

	let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
		Ok(runtime) => runtime,
		Err(err) => {
			error!(%err, "failed to build runtime");
			return ExitCode::FAILURE;
		}
	};

	match runtime.block_on(server.serve()) {
		Ok(()) => {
			info!("shutdown complete");
			ExitCode::SUCCESS
		}
		Err(err) => {
			error!(%err, "server failed");
			ExitCode::FAILURE
		}
	}
}

/// Configuration comes from an optional JSON file given as the only
/// argument; defaults otherwise.
fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
	match std::env::args().nth(1) {
		None => Ok(Config::default()),
		Some(path) => {
			let raw = std::fs::read_to_string(&path)?;
			let config: Config = serde_json::from_str(&raw)?;
			info!(path, "configuration loaded");
			Ok(config)
		}
	}
}
