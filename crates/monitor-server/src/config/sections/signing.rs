// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload signature verification.

use serde::Deserialize;

/// When `secret` is set, ingest requests must carry a valid signature header.
#[derive(Clone, Default)]
pub struct SigningConfig {
	pub secret: Option<String>,
}

impl std::fmt::Debug for SigningConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SigningConfig")
			.field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

#[derive(Clone, Default, Deserialize)]
pub struct SigningConfigLayer {
	#[serde(default)]
	pub secret: Option<String>,
}

impl std::fmt::Debug for SigningConfigLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SigningConfigLayer")
			.field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

impl SigningConfigLayer {
	pub fn merge(&mut self, other: SigningConfigLayer) {
		if other.secret.is_some() {
			self.secret = other.secret;
		}
	}

	pub fn finalize(self) -> SigningConfig {
		SigningConfig {
			secret: self.secret.filter(|s| !s.is_empty()),
		}
	}
}
