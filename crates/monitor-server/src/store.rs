// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Issue storage.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;

use monitor_core::{Issue, IssueId, IssueStatus, Level};

use crate::error::Result;
use crate::pagination::PageParams;

/// Filters for issue listings. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
	pub status: Option<IssueStatus>,
	pub level: Option<Level>,
	pub error_type: Option<String>,
	/// Case-insensitive substring of the title or message.
	pub search: Option<String>,
}

impl IssueFilter {
	pub fn matches(&self, issue: &Issue) -> bool {
		if self.status.is_some_and(|s| s != issue.status) {
			return false;
		}
		if self.level.is_some_and(|l| l != issue.level) {
			return false;
		}
		if let Some(error_type) = &self.error_type {
			if &issue.error_type != error_type {
				return false;
			}
		}
		if let Some(search) = &self.search {
			let needle = search.to_lowercase();
			let in_title = issue.title.to_lowercase().contains(&needle);
			let in_message = issue
				.message
				.as_deref()
				.is_some_and(|m| m.to_lowercase().contains(&needle));
			if !in_title && !in_message {
				return false;
			}
		}
		true
	}
}

/// One page of issues plus the number of issues matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePage {
	pub list: Vec<Issue>,
	pub total: usize,
}

/// Repository trait for issues.
///
/// Callers that read, modify and write back a single issue must serialize
/// those steps themselves; the repository only guarantees that each call is
/// atomic.
#[async_trait]
pub trait IssueRepository: Send + Sync {
	async fn get(&self, id: IssueId) -> Result<Option<Issue>>;
	async fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Issue>>;
	async fn insert(&self, issue: &Issue) -> Result<()>;
	async fn update(&self, issue: &Issue) -> Result<()>;
	/// Issues matching `filter`, most recently seen first.
	async fn list(&self, filter: &IssueFilter, page: PageParams) -> Result<IssuePage>;
}

#[derive(Default)]
struct Issues {
	by_id: HashMap<IssueId, Issue>,
	by_fingerprint: HashMap<String, IssueId>,
}

/// Process-local issue store.
#[derive(Default)]
pub struct InMemoryIssueRepository {
	inner: RwLock<Issues>,
}

impl InMemoryIssueRepository {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl IssueRepository for InMemoryIssueRepository {
	async fn get(&self, id: IssueId) -> Result<Option<Issue>> {
		Ok(self.inner.read().await.by_id.get(&id).cloned())
	}

	async fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Issue>> {
		let inner = self.inner.read().await;
		Ok(inner
			.by_fingerprint
			.get(fingerprint)
			.and_then(|id| inner.by_id.get(id))
			.cloned())
	}

	#[instrument(skip(self, issue), fields(issue_id = %issue.id))]
	async fn insert(&self, issue: &Issue) -> Result<()> {
		let mut inner = self.inner.write().await;
		inner
			.by_fingerprint
			.insert(issue.fingerprint.clone(), issue.id);
		inner.by_id.insert(issue.id, issue.clone());
		Ok(())
	}

	async fn update(&self, issue: &Issue) -> Result<()> {
		let mut inner = self.inner.write().await;
		if let Some(existing) = inner.by_id.get_mut(&issue.id) {
			*existing = issue.clone();
		}
		Ok(())
	}

	async fn list(&self, filter: &IssueFilter, page: PageParams) -> Result<IssuePage> {
		let inner = self.inner.read().await;
		let mut matching: Vec<&Issue> = inner.by_id.values().filter(|i| filter.matches(i)).collect();
		matching.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));

		let total = matching.len();
		let list = matching
			.into_iter()
			.skip(page.offset())
			.take(page.page_size_clamped() as usize)
			.cloned()
			.collect();
		Ok(IssuePage { list, total })
	}
}
