// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered server configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. Config file (`/etc/monitor/server.toml` or `--config`)
//! 3. Environment variables (`MONITOR_SERVER_*`)

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Upper bound on source context lines per side.
const MAX_CONTEXT_LINES: usize = 50;

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub storage: StorageConfig,
	pub signing: SigningConfig,
	pub issues: IssuesConfig,
	pub sourcemap: SourceMapConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let storage = layer.storage.unwrap_or_default().finalize();
	let signing = layer.signing.unwrap_or_default().finalize();
	let issues = layer.issues.unwrap_or_default().finalize();
	let sourcemap = layer.sourcemap.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&http, &issues, &sourcemap)?;

	info!(
		host = %http.host,
		port = http.port,
		sourcemap_dir = %storage.sourcemap_dir.display(),
		signing_enabled = signing.secret.is_some(),
		reopen_on_new_event = issues.reopen_on_new_event,
		context_lines = sourcemap.context_lines,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		storage,
		signing,
		issues,
		sourcemap,
		logging,
	})
}

fn validate_config(
	http: &HttpConfig,
	issues: &IssuesConfig,
	sourcemap: &SourceMapConfig,
) -> Result<(), ConfigError> {
	if http.max_body_bytes == 0 {
		return Err(ConfigError::Validation(
			"http.max_body_bytes must be greater than zero".to_string(),
		));
	}
	if issues.fingerprint_max_len == 0 {
		return Err(ConfigError::Validation(
			"issues.fingerprint_max_len must be greater than zero".to_string(),
		));
	}
	if sourcemap.context_lines > MAX_CONTEXT_LINES {
		return Err(ConfigError::InvalidValue {
			key: "sourcemap.context_lines".to_string(),
			message: format!("must be at most {MAX_CONTEXT_LINES}"),
		});
	}
	Ok(())
}
