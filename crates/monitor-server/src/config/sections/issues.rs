// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Issue aggregation configuration.

use serde::Deserialize;

pub const DEFAULT_FINGERPRINT_MAX_LEN: usize = 200;

/// Issue aggregation configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct IssuesConfig {
	/// Move resolved or ignored issues back to open when a new event arrives.
	pub reopen_on_new_event: bool,
	pub fingerprint_max_len: usize,
}

impl Default for IssuesConfig {
	fn default() -> Self {
		Self {
			reopen_on_new_event: false,
			fingerprint_max_len: DEFAULT_FINGERPRINT_MAX_LEN,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuesConfigLayer {
	#[serde(default)]
	pub reopen_on_new_event: Option<bool>,
	#[serde(default)]
	pub fingerprint_max_len: Option<usize>,
}

impl IssuesConfigLayer {
	pub fn merge(&mut self, other: IssuesConfigLayer) {
		if other.reopen_on_new_event.is_some() {
			self.reopen_on_new_event = other.reopen_on_new_event;
		}
		if other.fingerprint_max_len.is_some() {
			self.fingerprint_max_len = other.fingerprint_max_len;
		}
	}

	pub fn finalize(self) -> IssuesConfig {
		IssuesConfig {
			reopen_on_new_event: self.reopen_on_new_event.unwrap_or(false),
			fingerprint_max_len: self
				.fingerprint_max_len
				.unwrap_or(DEFAULT_FINGERPRINT_MAX_LEN),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = IssuesConfigLayer::default().finalize();
		assert!(!config.reopen_on_new_event);
		assert_eq!(config.fingerprint_max_len, 200);
	}
}
