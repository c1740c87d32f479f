// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fingerprints used to suppress and group equivalent events.
//!
//! Two independent functions live here. [`DedupFingerprint`] is used on the
//! client to suppress bursts of the same error and hashes a wide field set,
//! including the top stack frame. [`IssueFingerprint`] is used on the server
//! to group events into issues and keeps a readable, length-capped key built
//! from fewer fields.

use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::event::{Event, Stack};

const SEPARATOR: &str = "|";

/// Client-side suppression fingerprint.
#[derive(Debug, Clone)]
pub struct DedupFingerprint {
	/// Characters of the message that take part in the fingerprint.
	pub message_limit: usize,
}

impl Default for DedupFingerprint {
	fn default() -> Self {
		Self { message_limit: 100 }
	}
}

impl DedupFingerprint {
	/// The unhashed key: type, error kind, truncated message, filename, line and top frame.
	pub fn key(&self, event: &Event) -> String {
		let message = event.data_str("message").unwrap_or_default();
		let first_frame = event
			.data
			.get("stack")
			.and_then(|s| serde_json::from_value::<Stack>(s.clone()).ok())
			.and_then(|s| s.first_frame())
			.unwrap_or_default();

		[
			event.event_type.to_string(),
			event.data_str("errorType").unwrap_or_default().to_string(),
			truncate_chars(message, self.message_limit).to_string(),
			event.data_str("filename").unwrap_or_default().to_string(),
			event
				.data_u64("lineno")
				.map(|l| l.to_string())
				.unwrap_or_default(),
			first_frame,
		]
		.join(SEPARATOR)
	}

	/// Hex-encoded 64-bit FxHash of [`Self::key`].
	pub fn compute(&self, event: &Event) -> String {
		let mut hasher = FxHasher::default();
		hasher.write(self.key(event).as_bytes());
		format!("{:016x}", hasher.finish())
	}
}

/// Server-side grouping fingerprint.
#[derive(Debug, Clone)]
pub struct IssueFingerprint {
	/// Maximum length of the key in characters.
	pub max_len: usize,
}

impl Default for IssueFingerprint {
	fn default() -> Self {
		Self { max_len: 200 }
	}
}

impl IssueFingerprint {
	/// `error_type|message|filename|line`, capped at `max_len` characters.
	pub fn compute(&self, event: &Event) -> String {
		let key = [
			event.data_str("errorType").unwrap_or_default().to_string(),
			event.data_str("message").unwrap_or_default().to_string(),
			event.data_str("filename").unwrap_or_default().to_string(),
			event
				.data_u64("lineno")
				.map(|l| l.to_string())
				.unwrap_or_default(),
		]
		.join(SEPARATOR);

		truncate_chars(&key, self.max_len).to_string()
	}
}

/// Prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
	match s.char_indices().nth(max_chars) {
		Some((idx, _)) => &s[..idx],
		None => s,
	}
}
