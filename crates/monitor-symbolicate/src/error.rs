// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for symbolication operations.

use thiserror::Error;

/// Errors that can occur while decoding or querying a source map.
#[derive(Debug, Error)]
pub enum SymbolicateError {
	#[error("Invalid source map JSON: {0}")]
	InvalidSourceMapJson(#[from] serde_json::Error),

	#[error("Invalid source map version: expected 3, got {0}")]
	InvalidSourceMapVersion(u32),

	#[error("Invalid VLQ character: {0}")]
	InvalidVlqChar(char),

	#[error("VLQ value ends with a continuation digit: {0}")]
	TruncatedVlq(String),

	#[error("VLQ value does not fit in 64 bits: {0}")]
	VlqOverflow(String),

	#[error("Invalid mapping segment {segment:?}: {fields} fields (expected 1, 4 or 5)")]
	InvalidSegment { segment: String, fields: usize },

	#[error("Mapping on generated line {line} has a negative {field}")]
	NegativeMapping { line: u32, field: &'static str },

	#[error("Mapping on generated line {line} overflows its {field}")]
	MappingOverflow { line: u32, field: &'static str },

	#[error("Invalid source index: {0}")]
	InvalidSourceIndex(u32),
}

pub type Result<T> = std::result::Result<T, SymbolicateError>;
