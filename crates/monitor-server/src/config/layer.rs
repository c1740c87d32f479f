// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use super::sections::{
	HttpConfigLayer, IssuesConfigLayer, LoggingConfigLayer, SigningConfigLayer,
	SourceMapConfigLayer, StorageConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub storage: Option<StorageConfigLayer>,
	#[serde(default)]
	pub signing: Option<SigningConfigLayer>,
	#[serde(default)]
	pub issues: Option<IssuesConfigLayer>,
	#[serde(default)]
	pub sourcemap: Option<SourceMapConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.storage, other.storage, StorageConfigLayer::merge);
		merge_option(&mut self.signing, other.signing, SigningConfigLayer::merge);
		merge_option(&mut self.issues, other.issues, IssuesConfigLayer::merge);
		merge_option(
			&mut self.sourcemap,
			other.sourcemap,
			SourceMapConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer::default());
		assert!(base.http.is_none());
	}

	#[test]
	fn test_merge_other_overwrites() {
		let mut base = ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9000),
				host: Some("127.0.0.1".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		let other = ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(8080),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);
		assert_eq!(base.http.as_ref().unwrap().port, Some(8080));
		assert_eq!(
			base.http.as_ref().unwrap().host,
			Some("127.0.0.1".to_string())
		);
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = ServerConfigLayer::default();
		let other = ServerConfigLayer {
			issues: Some(IssuesConfigLayer {
				reopen_on_new_event: Some(true),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);
		assert_eq!(
			base.issues.as_ref().unwrap().reopen_on_new_event,
			Some(true)
		);
	}
}
