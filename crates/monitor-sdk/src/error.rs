// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring SDK.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors that can occur in the SDK.
///
/// Delivery failures (`RequestFailed`, `ServerError`, `Timeout`) are handled by
/// the transport's retry and offline machinery and never reach capture callers.
#[derive(Debug, Error)]
pub enum SdkError {
	/// The client has been shut down.
	#[error("monitor client has been shut down")]
	ClientShutdown,

	/// Missing collector endpoint.
	#[error("DSN is required")]
	MissingDsn,

	/// Missing application identifier.
	#[error("app ID is required")]
	MissingAppId,

	/// A configuration value is out of range.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A custom sanitizer pattern did not compile.
	#[error("invalid sanitizer pattern: {0}")]
	InvalidPattern(#[from] regex::Error),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned a non-success status.
	#[error("server error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Error message from server.
		message: String,
	},

	/// Delivery did not complete in time.
	#[error("request timed out after {0:?}")]
	Timeout(Duration),

	/// Failed to serialize or deserialize an event or batch.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Offline storage could not be read or written.
	#[error("offline storage error: {0}")]
	Storage(#[from] std::io::Error),

	/// Core type error.
	#[error(transparent)]
	Core(#[from] monitor_core::MonitorError),
}
