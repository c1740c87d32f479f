// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC-SHA256 payload signatures carried in the `X-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{MonitorError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Compute the hex-encoded HMAC-SHA256 signature of `payload`.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Result<String> {
	let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| MonitorError::InvalidSigningKey)?;
	mac.update(payload);
	Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a hex-encoded signature in constant time.
pub fn verify_payload(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let expected = match hex::decode(signature.trim()) {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};
	let mut mac = match HmacSha256::new_from_slice(secret) {
		Ok(m) => m,
		Err(_) => return false,
	};
	mac.update(payload);
	mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn signature_is_hex_sha256() {
		let sig = sign_payload(b"secret", b"{\"events\":[]}").unwrap();
		assert_eq!(sig.len(), 64);
		assert!(verify_payload(b"secret", b"{\"events\":[]}", &sig));
	}

	#[test]
	fn rejects_tampered_payload() {
		let sig = sign_payload(b"secret", b"payload").unwrap();
		assert!(!verify_payload(b"secret", b"payload!", &sig));
		assert!(!verify_payload(b"other", b"payload", &sig));
		assert!(!verify_payload(b"secret", b"payload", "zz-not-hex"));
	}

	proptest! {
		#[test]
		fn sign_then_verify(
			secret in proptest::collection::vec(any::<u8>(), 1..64),
			payload in proptest::collection::vec(any::<u8>(), 0..512)
		) {
			let sig = sign_payload(&secret, &payload).unwrap();
			prop_assert!(verify_payload(&secret, &payload, &sig));
		}
	}
}
