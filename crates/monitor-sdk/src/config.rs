// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SDK configuration with validated defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SdkError};
use crate::sampler::SampleRates;

/// Maximum number of breadcrumbs to keep.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;
/// Maximum number of events waiting in memory.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
/// Maximum number of events kept in the offline queue.
pub const DEFAULT_MAX_OFFLINE_EVENTS: usize = 50;
/// Payloads above this many bytes are considered for compression.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;

/// Duplicate suppression settings.
#[derive(Debug, Clone)]
pub struct DedupConfig {
	pub enabled: bool,
	/// Only error events are deduplicated when set.
	pub errors_only: bool,
	pub ttl: Duration,
	pub max_entries: usize,
	/// Characters of the message that take part in the fingerprint.
	pub message_limit: usize,
}

impl Default for DedupConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			errors_only: true,
			ttl: Duration::from_secs(60),
			max_entries: 100,
			message_limit: 100,
		}
	}
}

/// Sensitive data scrubbing settings.
#[derive(Debug, Clone)]
pub struct SanitizeConfig {
	pub enabled: bool,
	/// Keys redacted in addition to the built-in list.
	pub extra_sensitive_keys: Vec<String>,
	/// Extra `(regex, replacement)` pairs applied to every string value.
	pub custom_patterns: Vec<(String, String)>,
}

impl Default for SanitizeConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			extra_sensitive_keys: Vec::new(),
			custom_patterns: Vec::new(),
		}
	}
}

/// Payload compression settings.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
	pub enabled: bool,
	pub threshold_bytes: usize,
}

impl Default for CompressionConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD,
		}
	}
}

/// Where undeliverable batches are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OfflineStorage {
	/// File under the platform data directory, see [`default_offline_path`].
	/// Falls back to memory on hosts without one.
	#[default]
	PlatformDefault,
	/// Kept for the lifetime of the client only.
	Memory,
	/// JSON file that survives process restarts.
	File(PathBuf),
}

/// Complete SDK configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
	/// Collector ingestion URL.
	pub dsn: String,
	pub app_id: String,
	pub release: Option<String>,
	pub environment: String,
	pub sample_rates: SampleRates,
	pub max_breadcrumbs: usize,
	pub max_queue_size: usize,
	/// Zero disables the periodic flush.
	pub flush_interval: Duration,
	pub max_retries: u32,
	/// Base delay, multiplied by the attempt number.
	pub retry_delay: Duration,
	pub timeout: Duration,
	pub dedup: DedupConfig,
	pub sanitize: SanitizeConfig,
	pub compression: CompressionConfig,
	/// Shared secret for `X-Signature`.
	pub signing_secret: Option<String>,
	pub offline_storage: OfflineStorage,
	pub max_offline_events: usize,
}

impl SdkConfig {
	pub fn new(dsn: impl Into<String>, app_id: impl Into<String>) -> Self {
		Self {
			dsn: dsn.into(),
			app_id: app_id.into(),
			release: None,
			environment: "production".to_string(),
			sample_rates: SampleRates::default(),
			max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			flush_interval: Duration::from_secs(5),
			max_retries: 3,
			retry_delay: Duration::from_secs(1),
			timeout: Duration::from_secs(10),
			dedup: DedupConfig::default(),
			sanitize: SanitizeConfig::default(),
			compression: CompressionConfig::default(),
			signing_secret: None,
			offline_storage: OfflineStorage::default(),
			max_offline_events: DEFAULT_MAX_OFFLINE_EVENTS,
		}
	}

	/// Checks required fields and ranges.
	pub fn validate(&self) -> Result<()> {
		if self.dsn.trim().is_empty() {
			return Err(SdkError::MissingDsn);
		}
		if self.app_id.trim().is_empty() {
			return Err(SdkError::MissingAppId);
		}
		self.sample_rates.validate()?;
		if self.max_breadcrumbs == 0 {
			return Err(SdkError::InvalidConfig("max_breadcrumbs must be positive".into()));
		}
		if self.max_queue_size == 0 {
			return Err(SdkError::InvalidConfig("max_queue_size must be positive".into()));
		}
		if self.max_offline_events == 0 {
			return Err(SdkError::InvalidConfig("max_offline_events must be positive".into()));
		}
		if self.timeout.is_zero() {
			return Err(SdkError::InvalidConfig("timeout must be positive".into()));
		}
		if self.dedup.enabled && (self.dedup.ttl.is_zero() || self.dedup.max_entries == 0) {
			return Err(SdkError::InvalidConfig(
				"dedup ttl and max_entries must be positive".into(),
			));
		}
		Ok(())
	}

	/// File backing the offline queue, or `None` to keep it in memory.
	pub fn offline_file(&self) -> Option<PathBuf> {
		match &self.offline_storage {
			OfflineStorage::PlatformDefault => default_offline_path(&self.app_id),
			OfflineStorage::Memory => None,
			OfflineStorage::File(path) => Some(path.clone()),
		}
	}
}

/// Default location of the offline queue file for an application.
pub fn default_offline_path(app_id: &str) -> Option<PathBuf> {
	dirs::data_local_dir().map(|dir| dir.join("monitor").join(format!("offline-{app_id}.json")))
}
