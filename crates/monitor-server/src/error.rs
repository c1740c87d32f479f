// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for collector operations.

use axum::http::StatusCode;
use thiserror::Error;

use monitor_core::MonitorError;
use monitor_symbolicate::SymbolicateError;

/// Errors that can occur while ingesting events, managing issues or resolving
/// positions through uploaded source maps.
#[derive(Debug, Error)]
pub enum ServerError {
	#[error("{0}")]
	InvalidRequest(String),

	#[error("invalid {field}: {value:?}")]
	InvalidPathComponent { field: &'static str, value: String },

	#[error("missing signature")]
	MissingSignature,

	#[error("invalid signature")]
	InvalidSignature,

	#[error("issue not found: {0}")]
	IssueNotFound(String),

	#[error("source map not found")]
	SourceMapNotFound,

	#[error("position not found in source map")]
	PositionNotFound,

	#[error("invalid source map: {0}")]
	InvalidSourceMap(#[from] SymbolicateError),

	#[error("storage error: {0}")]
	Storage(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error(transparent)]
	Core(#[from] MonitorError),
}

impl ServerError {
	/// HTTP status used when this error reaches a handler boundary.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::InvalidRequest(_)
			| Self::InvalidPathComponent { .. }
			| Self::InvalidSourceMap(_) => StatusCode::BAD_REQUEST,
			Self::MissingSignature | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
			Self::IssueNotFound(_) | Self::SourceMapNotFound | Self::PositionNotFound => {
				StatusCode::NOT_FOUND
			}
			Self::Storage(_) | Self::Serialization(_) | Self::Core(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, ServerError>;
