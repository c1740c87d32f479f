// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Groups error events into issues.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use monitor_core::{Event, Issue, IssueFingerprint, IssueId, IssueStatus};

use crate::config::IssuesConfig;
use crate::error::{Result, ServerError};
use crate::pagination::PageParams;
use crate::store::{IssueFilter, IssuePage, IssueRepository};

/// Folds error events into issues keyed by [`IssueFingerprint`].
///
/// Every read-modify-write of one issue runs under a lock keyed by its
/// fingerprint, so concurrent events for the same issue never lose counts.
/// Events for different issues proceed in parallel.
pub struct IssueAggregator {
	repo: Arc<dyn IssueRepository>,
	fingerprint: IssueFingerprint,
	reopen_on_new_event: bool,
	locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IssueAggregator {
	pub fn new(repo: Arc<dyn IssueRepository>, config: &IssuesConfig) -> Self {
		Self {
			repo,
			fingerprint: IssueFingerprint {
				max_len: config.fingerprint_max_len,
			},
			reopen_on_new_event: config.reopen_on_new_event,
			locks: Mutex::new(HashMap::new()),
		}
	}

	async fn lock_for(&self, fingerprint: &str) -> Arc<Mutex<()>> {
		let mut locks = self.locks.lock().await;
		Arc::clone(locks.entry(fingerprint.to_string()).or_default())
	}

	/// Records an error event, opening a new issue on first occurrence.
	#[instrument(skip(self, event), fields(event_id = %event.event_id))]
	pub async fn ingest(&self, event: &Event) -> Result<Issue> {
		if !event.is_error() {
			return Err(ServerError::InvalidRequest(format!(
				"{} events do not form issues",
				event.event_type
			)));
		}

		let fingerprint = self.fingerprint.compute(event);
		let lock = self.lock_for(&fingerprint).await;
		let _guard = lock.lock().await;

		let now = Utc::now();
		match self.repo.get_by_fingerprint(&fingerprint).await? {
			Some(mut issue) => {
				issue.record_occurrence(event, now);
				if self.reopen_on_new_event && issue.status != IssueStatus::Unresolved {
					info!(issue_id = %issue.id, previous = %issue.status, "reopening issue");
					issue.status = IssueStatus::Unresolved;
				}
				self.repo.update(&issue).await?;
				debug!(issue_id = %issue.id, event_count = issue.event_count, "issue updated");
				Ok(issue)
			}
			None => {
				let issue = Issue::from_event(fingerprint, event, now);
				self.repo.insert(&issue).await?;
				info!(issue_id = %issue.id, title = %issue.title, "new issue");
				Ok(issue)
			}
		}
	}

	pub async fn get_issue(&self, id: IssueId) -> Result<Issue> {
		self
			.repo
			.get(id)
			.await?
			.ok_or_else(|| ServerError::IssueNotFound(id.to_string()))
	}

	pub async fn list_issues(&self, filter: &IssueFilter, page: PageParams) -> Result<IssuePage> {
		self.repo.list(filter, page).await
	}

	/// Moves one issue to `status`.
	#[instrument(skip(self))]
	pub async fn update_status(&self, id: IssueId, status: IssueStatus) -> Result<Issue> {
		let fingerprint = self.get_issue(id).await?.fingerprint;
		let lock = self.lock_for(&fingerprint).await;
		let _guard = lock.lock().await;

		let mut issue = self.get_issue(id).await?;
		issue.status = status;
		self.repo.update(&issue).await?;
		info!(issue_id = %id, status = %status, "issue status changed");
		Ok(issue)
	}

	/// Moves every known issue in `ids` to `status`. Unknown ids are skipped.
	/// Returns the number of issues updated.
	#[instrument(skip(self, ids), fields(count = ids.len()))]
	pub async fn batch_update_status(&self, ids: &[IssueId], status: IssueStatus) -> Result<usize> {
		let mut updated = 0;
		for id in ids {
			match self.update_status(*id, status).await {
				Ok(_) => updated += 1,
				Err(ServerError::IssueNotFound(_)) => {
					debug!(issue_id = %id, "skipping unknown issue");
				}
				Err(e) => return Err(e),
			}
		}
		Ok(updated)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::InMemoryIssueRepository;
	use monitor_core::{EventType, UserContext};

	fn aggregator(reopen: bool) -> IssueAggregator {
		IssueAggregator::new(
			Arc::new(InMemoryIssueRepository::new()),
			&IssuesConfig {
				reopen_on_new_event: reopen,
				..Default::default()
			},
		)
	}

	fn error_event(message: &str, user: Option<&str>) -> Event {
		let mut event = Event::new(
			EventType::Error,
			serde_json::json!({
				"errorType": "js_error",
				"message": message,
				"filename": "https://shop.example.com/static/main.js",
				"lineno": 1
			}),
		);
		event.context.user = user.map(|id| UserContext {
			id: Some(id.to_string()),
			..Default::default()
		});
		event
	}

	#[tokio::test]
	async fn same_fingerprint_folds_into_one_issue() {
		let agg = aggregator(false);
		let first = agg.ingest(&error_event("boom", Some("u1"))).await.unwrap();
		let second = agg.ingest(&error_event("boom", Some("u2"))).await.unwrap();
		let other = agg.ingest(&error_event("bang", Some("u1"))).await.unwrap();

		assert_eq!(first.id, second.id);
		assert_ne!(first.id, other.id);
		assert_eq!(second.event_count, 2);
		assert_eq!(second.user_count, 2);
		assert_eq!(second.first_seen, first.first_seen);
		assert!(second.last_seen >= first.last_seen);
	}

	#[tokio::test]
	async fn rejects_non_error_events() {
		let agg = aggregator(false);
		let event = Event::new(EventType::Performance, serde_json::json!({}));
		assert!(matches!(
			agg.ingest(&event).await,
			Err(ServerError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn concurrent_ingest_loses_no_updates() {
		let agg = Arc::new(aggregator(false));
		let tasks: Vec<_> = (0..100)
			.map(|i| {
				let agg = Arc::clone(&agg);
				tokio::spawn(async move {
					let user = format!("user-{}", i % 7);
					agg.ingest(&error_event("boom", Some(&user))).await
				})
			})
			.collect();

		let results = futures::future::join_all(tasks).await;
		let mut issue_id = None;
		for result in results {
			let issue = result.unwrap().unwrap();
			issue_id.get_or_insert(issue.id);
		}

		let issue = agg.get_issue(issue_id.unwrap()).await.unwrap();
		assert_eq!(issue.event_count, 100);
		assert_eq!(issue.user_count, 7);
	}

	#[tokio::test]
	async fn resolved_issue_stays_resolved_by_default() {
		let agg = aggregator(false);
		let issue = agg.ingest(&error_event("boom", None)).await.unwrap();
		agg.update_status(issue.id, IssueStatus::Resolved).await.unwrap();

		let issue = agg.ingest(&error_event("boom", None)).await.unwrap();
		assert_eq!(issue.status, IssueStatus::Resolved);
		assert_eq!(issue.event_count, 2);
	}

	#[tokio::test]
	async fn reopen_policy_reopens_on_new_event() {
		let agg = aggregator(true);
		let issue = agg.ingest(&error_event("boom", None)).await.unwrap();
		agg.update_status(issue.id, IssueStatus::Ignored).await.unwrap();

		let issue = agg.ingest(&error_event("boom", None)).await.unwrap();
		assert_eq!(issue.status, IssueStatus::Unresolved);
	}

	#[tokio::test]
	async fn batch_update_skips_unknown_ids() {
		let agg = aggregator(false);
		let a = agg.ingest(&error_event("a", None)).await.unwrap();
		let b = agg.ingest(&error_event("b", None)).await.unwrap();

		let updated = agg
			.batch_update_status(&[a.id, IssueId::new(), b.id], IssueStatus::Ignored)
			.await
			.unwrap();
		assert_eq!(updated, 2);
		assert_eq!(agg.get_issue(b.id).await.unwrap().status, IssueStatus::Ignored);
	}

	#[tokio::test]
	async fn missing_issue_is_not_found() {
		let agg = aggregator(false);
		assert!(matches!(
			agg.update_status(IssueId::new(), IssueStatus::Resolved).await,
			Err(ServerError::IssueNotFound(_))
		));
	}
}
