// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Gzip compression of outgoing payloads.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use crate::config::CompressionConfig;

/// `Content-Encoding` value for compressed bodies.
pub const GZIP_ENCODING: &str = "gzip";

#[derive(Debug, Clone)]
pub struct Compressor {
	enabled: bool,
	threshold_bytes: usize,
}

impl Compressor {
	pub fn new(config: &CompressionConfig) -> Self {
		Self {
			enabled: config.enabled,
			threshold_bytes: config.threshold_bytes,
		}
	}

	/// Returns the body to send and its content encoding, if any.
	///
	/// Compression is applied only above the threshold and only when it saves
	/// at least 10% of the payload. Any failure falls back to the raw body.
	pub fn compress(&self, payload: Vec<u8>) -> (Vec<u8>, Option<&'static str>) {
		if !self.enabled || payload.len() <= self.threshold_bytes {
			return (payload, None);
		}

		match gzip(&payload) {
			Ok(compressed) if compressed.len() * 10 < payload.len() * 9 => {
				debug!(
					original = payload.len(),
					compressed = compressed.len(),
					"compressed payload"
				);
				(compressed, Some(GZIP_ENCODING))
			}
			Ok(_) => (payload, None),
			Err(e) => {
				warn!(error = %e, "payload compression failed, sending uncompressed");
				(payload, None)
			}
		}
	}
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
	let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
	encoder.write_all(data)?;
	encoder.finish()
}

/// Inflates a gzip body.
pub fn decompress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
	let mut decoder = GzDecoder::new(data);
	let mut out = Vec::new();
	decoder.read_to_end(&mut out)?;
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn compressor(threshold_bytes: usize) -> Compressor {
		Compressor::new(&CompressionConfig {
			enabled: true,
			threshold_bytes,
		})
	}

	#[test]
	fn small_payload_is_untouched() {
		let payload = b"{\"events\":[]}".to_vec();
		let (body, encoding) = compressor(1024).compress(payload.clone());
		assert_eq!(body, payload);
		assert_eq!(encoding, None);
	}

	#[test]
	fn large_repetitive_payload_is_gzipped() {
		let payload = "{\"message\":\"TypeError: x is undefined\"},".repeat(200).into_bytes();
		let (body, encoding) = compressor(1024).compress(payload.clone());
		assert_eq!(encoding, Some(GZIP_ENCODING));
		assert!(body.len() < payload.len());
		assert_eq!(decompress_gzip(&body).unwrap(), payload);
	}

	#[test]
	fn incompressible_payload_is_sent_raw() {
		let mut rng = fastrand::Rng::with_seed(7);
		let payload: Vec<u8> = (0..4096).map(|_| rng.u8(..)).collect();
		let (body, encoding) = compressor(1024).compress(payload.clone());
		assert_eq!(encoding, None);
		assert_eq!(body, payload);
	}

	#[test]
	fn disabled_never_compresses() {
		let compressor = Compressor::new(&CompressionConfig {
			enabled: false,
			threshold_bytes: 0,
		});
		let payload = "a".repeat(10_000).into_bytes();
		assert_eq!(compressor.compress(payload).1, None);
	}
}
