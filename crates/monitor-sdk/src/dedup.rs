// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Suppression of repeated events within a time window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use monitor_core::{DedupFingerprint, Event};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::DedupConfig;

#[derive(Debug, Clone, Copy)]
struct Entry {
	first_seen: Instant,
	count: u64,
}

/// Point-in-time view of the deduplicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
	pub size: usize,
	pub capacity: usize,
	pub ttl: Duration,
}

/// Remembers recently reported fingerprints.
#[derive(Debug)]
pub struct Deduplicator {
	fingerprint: DedupFingerprint,
	ttl: Duration,
	max_entries: usize,
	entries: Mutex<HashMap<String, Entry>>,
}

impl Deduplicator {
	pub fn new(config: &DedupConfig) -> Self {
		Self {
			fingerprint: DedupFingerprint {
				message_limit: config.message_limit,
			},
			ttl: config.ttl,
			max_entries: config.max_entries.max(1),
			entries: Mutex::new(HashMap::new()),
		}
	}

	/// Returns `true` when the event should be reported, recording it.
	pub fn should_report(&self, event: &Event) -> bool {
		self.should_report_at(event, self.ttl, Instant::now())
	}

	/// Same as [`should_report`](Self::should_report) with a per-call window.
	pub fn should_report_with_ttl(&self, event: &Event, ttl: Duration) -> bool {
		self.should_report_at(event, ttl, Instant::now())
	}

	/// Window check against an explicit clock reading.
	pub fn should_report_at(&self, event: &Event, ttl: Duration, now: Instant) -> bool {
		let key = self.fingerprint.compute(event);
		let mut entries = self.entries.lock();

		if let Some(entry) = entries.get_mut(&key) {
			if now.saturating_duration_since(entry.first_seen) < ttl {
				entry.count += 1;
				debug!(fingerprint = %key, count = entry.count, "suppressed duplicate event");
				return false;
			}
		}

		// Entries well past the window no longer suppress anything.
		let stale_after = ttl.saturating_mul(2);
		entries.retain(|_, entry| now.saturating_duration_since(entry.first_seen) <= stale_after);

		while entries.len() >= self.max_entries && !entries.contains_key(&key) {
			let oldest = entries
				.iter()
				.min_by_key(|(_, entry)| entry.first_seen)
				.map(|(k, _)| k.clone());
			match oldest {
				Some(oldest) => {
					entries.remove(&oldest);
				}
				None => break,
			}
		}

		entries.insert(
			key,
			Entry {
				first_seen: now,
				count: 1,
			},
		);
		true
	}

	/// How many times the event's fingerprint was seen in the current window.
	pub fn occurrence_count(&self, event: &Event) -> u64 {
		let key = self.fingerprint.compute(event);
		self.entries.lock().get(&key).map_or(0, |entry| entry.count)
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn stats(&self) -> DedupStats {
		DedupStats {
			size: self.entries.lock().len(),
			capacity: self.max_entries,
			ttl: self.ttl,
		}
	}
}
