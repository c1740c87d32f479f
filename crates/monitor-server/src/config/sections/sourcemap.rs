// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source-map resolution configuration.

use serde::Deserialize;

use monitor_symbolicate::DEFAULT_CONTEXT_LINES;

#[derive(Debug, Clone)]
pub struct SourceMapConfig {
	/// Lines of original source returned on each side of a resolved position.
	pub context_lines: usize,
}

impl Default for SourceMapConfig {
	fn default() -> Self {
		Self {
			context_lines: DEFAULT_CONTEXT_LINES,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceMapConfigLayer {
	#[serde(default)]
	pub context_lines: Option<usize>,
}

impl SourceMapConfigLayer {
	pub fn merge(&mut self, other: SourceMapConfigLayer) {
		if other.context_lines.is_some() {
			self.context_lines = other.context_lines;
		}
	}

	pub fn finalize(self) -> SourceMapConfig {
		SourceMapConfig {
			context_lines: self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
		}
	}
}
