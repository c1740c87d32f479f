// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core monitoring types.

use thiserror::Error;

/// Errors raised while parsing or validating core types.
#[derive(Debug, Error)]
pub enum MonitorError {
	#[error("invalid event type: {0}")]
	InvalidEventType(String),

	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid breadcrumb type: {0}")]
	InvalidBreadcrumbType(String),

	#[error("invalid issue status: {0}")]
	InvalidIssueStatus(String),

	#[error("invalid signing key")]
	InvalidSigningKey,

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
