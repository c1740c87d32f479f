// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolves minified positions through uploaded source maps.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use monitor_core::StackFrame;
use monitor_symbolicate::{ParsedSourceMap, ResolvedLocation};

use crate::artifacts::{validate_component, ArtifactKey, ArtifactStore, FileMeta, ReleaseInfo};
use crate::error::{Result, ServerError};

/// The last path segment of a script URL or path, without query or fragment.
///
/// `https://cdn.example.com/static/main.js?v=3` becomes `main.js`.
pub fn base_filename(filename: &str) -> &str {
	let end = filename.find(['?', '#']).unwrap_or(filename.len());
	let path = &filename[..end];
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Confirmation returned by [`SourceMapResolver::upload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
	pub app_id: String,
	pub release: String,
	pub filename: String,
	pub sources: usize,
	pub mappings: usize,
}

/// A generated position as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPosition {
	pub filename: String,
	pub line: u32,
	pub column: u32,
}

/// Outcome of resolving one position. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionResult {
	pub success: bool,
	pub original: GeneratedPosition,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<ResolvedLocation>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// A stack frame after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFrame {
	#[serde(flatten)]
	pub frame: StackFrame,
	pub parsed: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub original: Option<ResolvedLocation>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parse_error: Option<String>,
}

/// Source map resolver with an in-memory cache of parsed maps.
///
/// Cache hits take a shared lock. Misses, uploads and release deletions take
/// the exclusive lock, so a re-upload is never shadowed by a stale parse.
pub struct SourceMapResolver {
	store: Arc<dyn ArtifactStore>,
	cache: RwLock<HashMap<ArtifactKey, Arc<ParsedSourceMap>>>,
	context_lines: usize,
}

impl SourceMapResolver {
	pub fn new(store: Arc<dyn ArtifactStore>, context_lines: usize) -> Self {
		Self {
			store,
			cache: RwLock::new(HashMap::new()),
			context_lines,
		}
	}

	/// Validates and stores a source map, invalidating any cached copy.
	#[instrument(skip(self, data), fields(bytes = data.len()))]
	pub async fn upload(
		&self,
		app_id: &str,
		release: &str,
		filename: &str,
		data: &[u8],
	) -> Result<UploadReceipt> {
		let key = ArtifactKey::new(app_id, release, filename)?;
		let map = ParsedSourceMap::from_bytes(data)?;
		let meta = FileMeta {
			uploaded_at: Utc::now().timestamp_millis(),
			file: map.file.clone(),
			sources: map.sources.clone(),
		};

		let mut cache = self.cache.write().await;
		self.store.put(&key, data, meta).await?;
		cache.remove(&key);
		drop(cache);

		info!(
			sources = map.sources.len(),
			mappings = map.mapping_count(),
			"source map uploaded"
		);
		Ok(UploadReceipt {
			app_id: key.app_id,
			release: key.release,
			filename: key.filename,
			sources: map.sources.len(),
			mappings: map.mapping_count(),
		})
	}

	async fn load(&self, key: &ArtifactKey) -> Result<Arc<ParsedSourceMap>> {
		if let Some(map) = self.cache.read().await.get(key) {
			return Ok(Arc::clone(map));
		}

		let mut cache = self.cache.write().await;
		if let Some(map) = cache.get(key) {
			return Ok(Arc::clone(map));
		}
		let data = self
			.store
			.get(key)
			.await?
			.ok_or(ServerError::SourceMapNotFound)?;
		let map = Arc::new(ParsedSourceMap::from_bytes(&data)?);
		cache.insert(key.clone(), Arc::clone(&map));
		debug!(filename = %key.filename, "cached source map");
		Ok(map)
	}

	/// Original location of a generated position.
	///
	/// `filename` may be a full script URL; only its base name is used.
	pub async fn resolve(
		&self,
		app_id: &str,
		release: &str,
		filename: &str,
		line: u32,
		column: u32,
	) -> Result<ResolvedLocation> {
		let key = ArtifactKey::new(app_id, release, base_filename(filename))?;
		let map = self.load(&key).await?;
		map.resolve(line, column, self.context_lines)?
			.ok_or(ServerError::PositionNotFound)
	}

	/// Like [`Self::resolve`] but reports per-unit failures in the result.
	/// Only invalid `app_id` or `release` values are returned as errors.
	pub async fn resolve_position(
		&self,
		app_id: &str,
		release: &str,
		filename: &str,
		line: u32,
		column: u32,
	) -> Result<PositionResult> {
		validate_component("appId", app_id)?;
		validate_component("release", release)?;

		let original = GeneratedPosition {
			filename: filename.to_string(),
			line,
			column,
		};
		match self.resolve(app_id, release, filename, line, column).await {
			Ok(location) => Ok(PositionResult {
				success: true,
				original,
				source: Some(location),
				error: None,
			}),
			Err(e) => {
				debug!(error = %e, filename = %filename, "position not resolved");
				Ok(PositionResult {
					success: false,
					original,
					source: None,
					error: Some(e.to_string()),
				})
			}
		}
	}

	/// Resolves every frame independently; one bad frame never fails the rest.
	#[instrument(skip(self, frames), fields(frame_count = frames.len()))]
	pub async fn resolve_stack(
		&self,
		app_id: &str,
		release: &str,
		frames: &[StackFrame],
	) -> Result<Vec<ResolvedFrame>> {
		validate_component("appId", app_id)?;
		validate_component("release", release)?;

		let mut resolved = Vec::with_capacity(frames.len());
		for frame in frames {
			let outcome = match (&frame.filename, frame.lineno) {
				(Some(filename), Some(line)) => {
					self
						.resolve(app_id, release, filename, line, frame.colno.unwrap_or(0))
						.await
				}
				_ => Err(ServerError::InvalidRequest(
					"frame has no filename or line".to_string(),
				)),
			};

			resolved.push(match outcome {
				Ok(location) => ResolvedFrame {
					frame: frame.clone(),
					parsed: true,
					original: Some(location),
					parse_error: None,
				},
				Err(e) => {
					if matches!(e, ServerError::Storage(_) | ServerError::Serialization(_)) {
						warn!(error = %e, "frame resolution failed");
					}
					ResolvedFrame {
						frame: frame.clone(),
						parsed: false,
						original: None,
						parse_error: Some(e.to_string()),
					}
				}
			});
		}
		Ok(resolved)
	}

	pub async fn list_releases(&self, app_id: &str) -> Result<Vec<ReleaseInfo>> {
		validate_component("appId", app_id)?;
		self.store.list_releases(app_id).await
	}

	/// Deletes a release and evicts its cached maps.
	#[instrument(skip(self))]
	pub async fn delete_release(&self, app_id: &str, release: &str) -> Result<bool> {
		validate_component("appId", app_id)?;
		validate_component("release", release)?;

		let mut cache = self.cache.write().await;
		let deleted = self.store.delete_release(app_id, release).await?;
		cache.retain(|key, _| !key.in_release(app_id, release));
		drop(cache);

		info!(deleted, "release deleted");
		Ok(deleted)
	}

	#[cfg(test)]
	async fn cached(&self) -> usize {
		self.cache.read().await.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::artifacts::InMemoryArtifactStore;
	use proptest::prelude::*;

	// Single mapping: generated (1, 0) -> src/index.ts line 5 column 2.
	const SINGLE: &str = r#"{
		"version": 3,
		"file": "main.js",
		"sources": ["src/index.ts"],
		"names": [],
		"mappings": "AAIE"
	}"#;

	// Same position, but mapped to a different source.
	const RENAMED: &str = r#"{
		"version": 3,
		"sources": ["src/renamed.ts"],
		"names": [],
		"mappings": "AAIE"
	}"#;

	fn resolver() -> SourceMapResolver {
		SourceMapResolver::new(Arc::new(InMemoryArtifactStore::new()), 3)
	}

	#[test]
	fn base_filename_strips_url_and_query() {
		assert_eq!(base_filename("https://cdn.example.com/static/main.js?v=3"), "main.js");
		assert_eq!(base_filename("main.js#frag"), "main.js");
		assert_eq!(base_filename("C:\\build\\main.js"), "main.js");
		assert_eq!(base_filename("main"), "main");
	}

	#[tokio::test]
	async fn upload_then_resolve() {
		let resolver = resolver();
		let receipt = resolver
			.upload("app1", "1.0.0", "main", SINGLE.as_bytes())
			.await
			.unwrap();
		assert_eq!(receipt.sources, 1);
		assert_eq!(receipt.mappings, 1);

		let location = resolver
			.resolve("app1", "1.0.0", "main", 1, 10)
			.await
			.unwrap();
		assert_eq!(location.position.source, "src/index.ts");
		assert_eq!(location.position.line, 5);
		assert_eq!(location.position.column, 2);
	}

	#[tokio::test]
	async fn upload_rejects_invalid_maps() {
		let resolver = resolver();
		let err = resolver
			.upload("app1", "1.0.0", "main", b"not json")
			.await
			.unwrap_err();
		assert!(matches!(err, ServerError::InvalidSourceMap(_)));

		let err = resolver
			.upload("app1", "../etc", "main", SINGLE.as_bytes())
			.await
			.unwrap_err();
		assert!(matches!(err, ServerError::InvalidPathComponent { .. }));
	}

	#[tokio::test]
	async fn reupload_invalidates_cache() {
		let resolver = resolver();
		resolver
			.upload("app1", "1.0.0", "main", SINGLE.as_bytes())
			.await
			.unwrap();
		resolver.resolve("app1", "1.0.0", "main", 1, 0).await.unwrap();
		assert_eq!(resolver.cached().await, 1);

		resolver
			.upload("app1", "1.0.0", "main", RENAMED.as_bytes())
			.await
			.unwrap();
		let location = resolver.resolve("app1", "1.0.0", "main", 1, 0).await.unwrap();
		assert_eq!(location.position.source, "src/renamed.ts");
	}

	#[tokio::test]
	async fn missing_map_and_position_are_distinct() {
		let resolver = resolver();
		assert!(matches!(
			resolver.resolve("app1", "1.0.0", "main", 1, 0).await,
			Err(ServerError::SourceMapNotFound)
		));

		resolver
			.upload("app1", "1.0.0", "main", SINGLE.as_bytes())
			.await
			.unwrap();
		assert!(matches!(
			resolver.resolve("app1", "1.0.0", "main", 7, 0).await,
			Err(ServerError::PositionNotFound)
		));

		let result = resolver
			.resolve_position("app1", "1.0.0", "main", 7, 0)
			.await
			.unwrap();
		assert!(!result.success);
		assert!(result.error.is_some());
	}

	#[tokio::test]
	async fn stack_resolution_is_per_frame() {
		let resolver = resolver();
		resolver
			.upload("app1", "1.0.0", "main.js", SINGLE.as_bytes())
			.await
			.unwrap();

		let frames = vec![
			StackFrame {
				function: Some("handler".to_string()),
				filename: Some("https://shop.example.com/main.js?v=1".to_string()),
				lineno: Some(1),
				colno: Some(10),
				..Default::default()
			},
			StackFrame {
				filename: Some("https://shop.example.com/vendor.js".to_string()),
				lineno: Some(1),
				colno: Some(0),
				..Default::default()
			},
			StackFrame {
				raw: Some("at <anonymous>".to_string()),
				..Default::default()
			},
		];

		let resolved = resolver.resolve_stack("app1", "1.0.0", &frames).await.unwrap();
		assert_eq!(resolved.len(), 3);
		assert!(resolved[0].parsed);
		assert_eq!(
			resolved[0].original.as_ref().unwrap().position.source,
			"src/index.ts"
		);
		assert!(!resolved[1].parsed);
		assert_eq!(resolved[1].parse_error.as_deref(), Some("source map not found"));
		assert!(!resolved[2].parsed);
	}

	#[tokio::test]
	async fn delete_release_evicts_cache() {
		let resolver = resolver();
		resolver
			.upload("app1", "1.0.0", "main", SINGLE.as_bytes())
			.await
			.unwrap();
		resolver
			.upload("app1", "2.0.0", "main", SINGLE.as_bytes())
			.await
			.unwrap();
		resolver.resolve("app1", "1.0.0", "main", 1, 0).await.unwrap();
		resolver.resolve("app1", "2.0.0", "main", 1, 0).await.unwrap();
		assert_eq!(resolver.cached().await, 2);

		assert!(resolver.delete_release("app1", "1.0.0").await.unwrap());
		assert_eq!(resolver.cached().await, 1);
		assert!(matches!(
			resolver.resolve("app1", "1.0.0", "main", 1, 0).await,
			Err(ServerError::SourceMapNotFound)
		));
		assert_eq!(resolver.list_releases("app1").await.unwrap().len(), 1);
	}

	proptest! {
		#[test]
		fn base_filename_has_no_separators_or_query(s in ".*") {
			let base = base_filename(&s);
			prop_assert!(!base.contains(['/', '\\', '?', '#']));
			prop_assert!(s.contains(base));
		}
	}
}
