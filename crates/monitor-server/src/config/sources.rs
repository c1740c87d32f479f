// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use super::error::ConfigError;
use super::layer::ServerConfigLayer;
use super::sections::{
	HttpConfigLayer, IssuesConfigLayer, LoggingConfigLayer, SigningConfigLayer,
	SourceMapConfigLayer, StorageConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/monitor/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MONITOR_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			storage: Some(load_storage_from_env()),
			signing: Some(load_signing_from_env()),
			issues: Some(load_issues_from_env()?),
			sourcemap: Some(load_sourcemap_from_env()?),
			logging: Some(load_logging_from_env()),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("expected a port number, got {v:?}"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("expected a non-negative integer, got {v:?}"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("MONITOR_SERVER_HOST"),
		port: env_u16("MONITOR_SERVER_PORT")?,
		max_body_bytes: env_usize("MONITOR_SERVER_MAX_BODY_BYTES")?,
	})
}

fn load_storage_from_env() -> StorageConfigLayer {
	StorageConfigLayer {
		sourcemap_dir: env_var("MONITOR_SERVER_SOURCEMAP_DIR").map(PathBuf::from),
	}
}

fn load_signing_from_env() -> SigningConfigLayer {
	SigningConfigLayer {
		secret: env_var("MONITOR_SERVER_SIGNING_SECRET"),
	}
}

fn load_issues_from_env() -> Result<IssuesConfigLayer, ConfigError> {
	Ok(IssuesConfigLayer {
		reopen_on_new_event: env_bool("MONITOR_SERVER_ISSUES_REOPEN_ON_NEW_EVENT"),
		fingerprint_max_len: env_usize("MONITOR_SERVER_ISSUES_FINGERPRINT_MAX_LEN")?,
	})
}

fn load_sourcemap_from_env() -> Result<SourceMapConfigLayer, ConfigError> {
	Ok(SourceMapConfigLayer {
		context_lines: env_usize("MONITOR_SERVER_SOURCEMAP_CONTEXT_LINES")?,
	})
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("MONITOR_SERVER_LOG_LEVEL"),
		json: env_bool("MONITOR_SERVER_LOG_JSON"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_is_skipped() {
		let layer = TomlSource::new("/nonexistent/monitor/server.toml")
			.load()
			.unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_sections_parse() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[http]
port = 9100

[issues]
reopen_on_new_event = true

[signing]
secret = "abc"

[sourcemap]
context_lines = 5
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.http.as_ref().unwrap().port, Some(9100));
		assert_eq!(layer.issues.as_ref().unwrap().reopen_on_new_event, Some(true));
		assert_eq!(layer.signing.as_ref().unwrap().secret.as_deref(), Some("abc"));
		assert_eq!(layer.sourcemap.as_ref().unwrap().context_lines, Some(5));
	}

	#[test]
	fn test_invalid_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[http\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
