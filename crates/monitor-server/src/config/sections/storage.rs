// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Artifact storage configuration.

use std::path::PathBuf;

use serde::Deserialize;

fn default_sourcemap_dir() -> PathBuf {
	PathBuf::from("data/sourcemaps")
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
	/// Root directory for uploaded source maps, laid out as `<app>/<release>/`.
	pub sourcemap_dir: PathBuf,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			sourcemap_dir: default_sourcemap_dir(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfigLayer {
	#[serde(default)]
	pub sourcemap_dir: Option<PathBuf>,
}

impl StorageConfigLayer {
	pub fn merge(&mut self, other: StorageConfigLayer) {
		if other.sourcemap_dir.is_some() {
			self.sourcemap_dir = other.sourcemap_dir;
		}
	}

	pub fn finalize(self) -> StorageConfig {
		StorageConfig {
			sourcemap_dir: self.sourcemap_dir.unwrap_or_else(default_sourcemap_dir),
		}
	}
}
