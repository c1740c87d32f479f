// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded FIFO of batches that could not be delivered.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use monitor_core::Event;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Events sent together in one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
	pub events: Vec<Event>,
	pub attempt_count: u32,
	pub first_enqueued_at: DateTime<Utc>,
}

impl Batch {
	pub fn new(events: Vec<Event>) -> Self {
		Self {
			events,
			attempt_count: 0,
			first_enqueued_at: Utc::now(),
		}
	}
}

/// Backing store for the offline queue.
pub trait OfflineStore: Send + Sync {
	fn load(&self) -> Result<Vec<Batch>>;
	fn persist(&self, batches: &[Batch]) -> Result<()>;
	fn clear(&self) -> Result<()>;
}

/// Keeps nothing across restarts.
#[derive(Debug, Default)]
pub struct MemoryOfflineStore {
	batches: Mutex<Vec<Batch>>,
}

impl OfflineStore for MemoryOfflineStore {
	fn load(&self) -> Result<Vec<Batch>> {
		Ok(self.batches.lock().clone())
	}

	fn persist(&self, batches: &[Batch]) -> Result<()> {
		*self.batches.lock() = batches.to_vec();
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		self.batches.lock().clear();
		Ok(())
	}
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileOfflineStore {
	path: PathBuf,
}

impl FileOfflineStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl OfflineStore for FileOfflineStore {
	fn load(&self) -> Result<Vec<Batch>> {
		match fs::read(&self.path) {
			Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
			Err(e) => Err(e.into()),
		}
	}

	fn persist(&self, batches: &[Batch]) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, serde_json::to_vec(batches)?)?;
		fs::rename(&tmp, &self.path)?;
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		match fs::remove_file(&self.path) {
			Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
			_ => Ok(()),
		}
	}
}

/// Offline queue capped by total event count.
///
/// The in-memory copy is authoritative. Storage failures are logged and the
/// queue keeps working from memory.
pub struct OfflineQueue {
	store: Box<dyn OfflineStore>,
	batches: VecDeque<Batch>,
	max_events: usize,
}

impl OfflineQueue {
	/// Opens the queue, restoring whatever the store holds.
	pub fn open(store: Box<dyn OfflineStore>, max_events: usize) -> Self {
		let batches = match store.load() {
			Ok(batches) => batches,
			Err(e) => {
				warn!(error = %e, "failed to load offline queue, starting empty");
				Vec::new()
			}
		};
		let mut queue = Self {
			store,
			batches: batches.into(),
			max_events,
		};
		if queue.trim() {
			queue.save();
		}
		debug!(batches = queue.batches.len(), events = queue.len_events(), "opened offline queue");
		queue
	}

	pub fn front(&self) -> Option<&Batch> {
		self.batches.front()
	}

	pub fn pop_front(&mut self) -> Option<Batch> {
		let batch = self.batches.pop_front();
		if batch.is_some() {
			self.save();
		}
		batch
	}

	/// Appends a batch, evicting the oldest events beyond capacity.
	pub fn push(&mut self, batch: Batch) {
		if batch.events.is_empty() {
			return;
		}
		self.batches.push_back(batch);
		self.trim();
		self.save();
	}

	pub fn len_events(&self) -> usize {
		self.batches.iter().map(|b| b.events.len()).sum()
	}

	pub fn len_batches(&self) -> usize {
		self.batches.len()
	}

	pub fn is_empty(&self) -> bool {
		self.batches.is_empty()
	}

	pub fn batches(&self) -> impl Iterator<Item = &Batch> {
		self.batches.iter()
	}

	fn trim(&mut self) -> bool {
		let mut excess = self.len_events().saturating_sub(self.max_events);
		if excess == 0 {
			return false;
		}
		warn!(dropped = excess, "offline queue full, dropping oldest events");
		while excess > 0 {
			let Some(front) = self.batches.front_mut() else {
				break;
			};
			let take = excess.min(front.events.len());
			front.events.drain(..take);
			excess -= take;
			if front.events.is_empty() {
				self.batches.pop_front();
			}
		}
		true
	}

	fn save(&self) {
		let result = if self.batches.is_empty() {
			self.store.clear()
		} else {
			let batches: Vec<Batch> = self.batches.iter().cloned().collect();
			self.store.persist(&batches)
		};
		if let Err(e) = result {
			warn!(error = %e, "failed to persist offline queue");
		}
	}
}

impl std::fmt::Debug for OfflineQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OfflineQueue")
			.field("batches", &self.batches.len())
			.field("events", &self.len_events())
			.field("max_events", &self.max_events)
			.finish()
	}
}
