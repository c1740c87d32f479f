// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! monitor-server binary.

use std::path::PathBuf;

use clap::Parser;
use monitor_server::{create_router, AppState};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collector for error events and source map resolution.
#[derive(Parser, Debug)]
#[command(
	name = "monitor-server",
	about = "Event ingestion, issue aggregation and source map resolution",
	version
)]
struct Args {
	/// Config file (defaults to /etc/monitor/server.toml)
	#[arg(short, long, env = "MONITOR_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => monitor_server::load_config_with_file(path)?,
		None => monitor_server::load_config()?,
	};

	let json = config.logging.json;
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(json.then(|| tracing_subscriber::fmt::layer().json()))
		.with((!json).then(tracing_subscriber::fmt::layer))
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		sourcemap_dir = %config.storage.sourcemap_dir.display(),
		"starting monitor-server"
	);

	tokio::fs::create_dir_all(&config.storage.sourcemap_dir).await?;

	let state = AppState::new(&config);
	let app = create_router(state, config.http.max_body_bytes)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!("listening on {}", addr);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "failed to listen for shutdown signal");
			}
			tracing::info!("Received shutdown signal");
		})
		.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}
