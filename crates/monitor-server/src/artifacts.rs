// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage for uploaded source maps.
//!
//! Artifacts are addressed by `(app_id, release, filename)`. The filesystem
//! store lays them out as:
//!
//! ```text
//! <root>/<app_id>/<release>/<filename>.map
//! <root>/<app_id>/<release>/meta.json
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::error::{Result, ServerError};

const META_FILE: &str = "meta.json";
const MAP_EXTENSION: &str = "map";

/// Rejects empty components and anything that could escape its directory.
pub fn validate_component(field: &'static str, value: &str) -> Result<()> {
	let invalid = value.is_empty()
		|| value == "."
		|| value == ".."
		|| value.contains(['/', '\\', '\0']);
	if invalid {
		return Err(ServerError::InvalidPathComponent {
			field,
			value: value.to_string(),
		});
	}
	Ok(())
}

/// Address of one source map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
	pub app_id: String,
	pub release: String,
	pub filename: String,
}

impl ArtifactKey {
	pub fn new(
		app_id: impl Into<String>,
		release: impl Into<String>,
		filename: impl Into<String>,
	) -> Result<Self> {
		let key = Self {
			app_id: app_id.into(),
			release: release.into(),
			filename: filename.into(),
		};
		validate_component("appId", &key.app_id)?;
		validate_component("release", &key.release)?;
		validate_component("filename", &key.filename)?;
		Ok(key)
	}

	pub fn in_release(&self, app_id: &str, release: &str) -> bool {
		self.app_id == app_id && self.release == release
	}
}

/// Per-file entry in a release's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
	/// Milliseconds since the Unix epoch.
	pub uploaded_at: i64,
	#[serde(default)]
	pub file: Option<String>,
	#[serde(default)]
	pub sources: Vec<String>,
}

/// Summary of one release for an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
	pub version: String,
	pub files: Vec<String>,
	/// Latest upload time across the release's files, 0 if unknown.
	pub uploaded_at: i64,
}

impl ReleaseInfo {
	fn from_meta(version: String, meta: &BTreeMap<String, FileMeta>) -> Self {
		Self {
			version,
			files: meta.keys().cloned().collect(),
			uploaded_at: meta.values().map(|m| m.uploaded_at).max().unwrap_or(0),
		}
	}
}

fn sort_newest_first(releases: &mut [ReleaseInfo]) {
	releases.sort_by(|a, b| {
		b.uploaded_at
			.cmp(&a.uploaded_at)
			.then_with(|| a.version.cmp(&b.version))
	});
}

/// Repository trait for source map artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
	/// Stores `data` under `key`, replacing any previous upload.
	async fn put(&self, key: &ArtifactKey, data: &[u8], meta: FileMeta) -> Result<()>;
	async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>>;
	/// Releases of `app_id`, newest upload first.
	async fn list_releases(&self, app_id: &str) -> Result<Vec<ReleaseInfo>>;
	/// Removes every artifact of a release. Returns false if it did not exist.
	async fn delete_release(&self, app_id: &str, release: &str) -> Result<bool>;
}

/// Filesystem-backed artifact store.
pub struct FsArtifactStore {
	root: PathBuf,
	// Serializes meta.json read-modify-write across uploads.
	meta_lock: Mutex<()>,
}

impl FsArtifactStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			meta_lock: Mutex::new(()),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn release_dir(&self, app_id: &str, release: &str) -> PathBuf {
		self.root.join(app_id).join(release)
	}

	fn map_path(&self, key: &ArtifactKey) -> PathBuf {
		self
			.release_dir(&key.app_id, &key.release)
			.join(format!("{}.{MAP_EXTENSION}", key.filename))
	}

	async fn read_meta(dir: &Path) -> Result<BTreeMap<String, FileMeta>> {
		match tokio::fs::read(dir.join(META_FILE)).await {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
			Err(e) => Err(e.into()),
		}
	}

	async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
		let mut tmp = path.as_os_str().to_owned();
		tmp.push(".tmp");
		let tmp = PathBuf::from(tmp);
		tokio::fs::write(&tmp, data).await?;
		tokio::fs::rename(&tmp, path).await?;
		Ok(())
	}
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
	#[instrument(skip(self, data, meta), fields(app_id = %key.app_id, release = %key.release, filename = %key.filename))]
	async fn put(&self, key: &ArtifactKey, data: &[u8], meta: FileMeta) -> Result<()> {
		let dir = self.release_dir(&key.app_id, &key.release);
		tokio::fs::create_dir_all(&dir).await?;
		Self::write_atomic(&self.map_path(key), data).await?;

		let _guard = self.meta_lock.lock().await;
		let mut release_meta = Self::read_meta(&dir).await?;
		release_meta.insert(key.filename.clone(), meta);
		let encoded = serde_json::to_vec_pretty(&release_meta)?;
		Self::write_atomic(&dir.join(META_FILE), &encoded).await?;

		debug!(bytes = data.len(), "stored source map");
		Ok(())
	}

	async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
		match tokio::fs::read(self.map_path(key)).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn list_releases(&self, app_id: &str) -> Result<Vec<ReleaseInfo>> {
		validate_component("appId", app_id)?;
		let mut entries = match tokio::fs::read_dir(self.root.join(app_id)).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};

		let mut releases = Vec::new();
		while let Some(entry) = entries.next_entry().await? {
			if !entry.file_type().await?.is_dir() {
				continue;
			}
			let version = entry.file_name().to_string_lossy().into_owned();
			let meta = match Self::read_meta(&entry.path()).await {
				Ok(meta) => meta,
				Err(e) => {
					warn!(error = %e, release = %version, "unreadable release metadata");
					BTreeMap::new()
				}
			};
			releases.push(ReleaseInfo::from_meta(version, &meta));
		}

		sort_newest_first(&mut releases);
		Ok(releases)
	}

	#[instrument(skip(self))]
	async fn delete_release(&self, app_id: &str, release: &str) -> Result<bool> {
		validate_component("appId", app_id)?;
		validate_component("release", release)?;
		match tokio::fs::remove_dir_all(self.release_dir(app_id, release)).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
			Err(e) => Err(e.into()),
		}
	}
}

/// Process-local artifact store.
#[derive(Default)]
pub struct InMemoryArtifactStore {
	artifacts: RwLock<HashMap<ArtifactKey, (Vec<u8>, FileMeta)>>,
}

impl InMemoryArtifactStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
	async fn put(&self, key: &ArtifactKey, data: &[u8], meta: FileMeta) -> Result<()> {
		self
			.artifacts
			.write()
			.await
			.insert(key.clone(), (data.to_vec(), meta));
		Ok(())
	}

	async fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>> {
		Ok(self
			.artifacts
			.read()
			.await
			.get(key)
			.map(|(data, _)| data.clone()))
	}

	async fn list_releases(&self, app_id: &str) -> Result<Vec<ReleaseInfo>> {
		let artifacts = self.artifacts.read().await;
		let mut by_release: BTreeMap<String, BTreeMap<String, FileMeta>> = BTreeMap::new();
		for (key, (_, meta)) in artifacts.iter().filter(|(k, _)| k.app_id == app_id) {
			by_release
				.entry(key.release.clone())
				.or_default()
				.insert(key.filename.clone(), meta.clone());
		}

		let mut releases: Vec<_> = by_release
			.into_iter()
			.map(|(version, meta)| ReleaseInfo::from_meta(version, &meta))
			.collect();
		sort_newest_first(&mut releases);
		Ok(releases)
	}

	async fn delete_release(&self, app_id: &str, release: &str) -> Result<bool> {
		let mut artifacts = self.artifacts.write().await;
		let before = artifacts.len();
		artifacts.retain(|key, _| !key.in_release(app_id, release));
		Ok(artifacts.len() != before)
	}
}
