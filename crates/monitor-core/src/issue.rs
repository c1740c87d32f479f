// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Issues: server-side aggregates of error events sharing a fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::context::{BrowserContext, DeviceContext, OsContext};
use crate::error::MonitorError;
use crate::event::{Event, Stack};
use crate::level::Level;

/// Unique identifier for an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueId(pub Uuid);

impl IssueId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for IssueId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for IssueId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for IssueId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Lifecycle state of an issue. Only operators move an issue between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
	Unresolved,
	Resolved,
	Ignored,
}

impl fmt::Display for IssueStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unresolved => write!(f, "unresolved"),
			Self::Resolved => write!(f, "resolved"),
			Self::Ignored => write!(f, "ignored"),
		}
	}
}

impl FromStr for IssueStatus {
	type Err = MonitorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"unresolved" => Ok(Self::Unresolved),
			"resolved" => Ok(Self::Resolved),
			"ignored" => Ok(Self::Ignored),
			_ => Err(MonitorError::InvalidIssueStatus(s.to_string())),
		}
	}
}

/// Context sampled from the event that opened the issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueSample {
	pub url: Option<String>,
	pub user_agent: Option<String>,
	pub browser: Option<BrowserContext>,
	pub os: Option<OsContext>,
	pub device: Option<DeviceContext>,
	pub tags: BTreeMap<String, String>,
	pub breadcrumbs: Vec<Breadcrumb>,
}

/// A distinct, recurring error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
	pub id: IssueId,
	pub fingerprint: String,
	pub title: String,
	pub message: Option<String>,
	#[serde(rename = "type")]
	pub error_type: String,
	pub level: Level,
	pub status: IssueStatus,
	pub filename: Option<String>,
	pub stack: Option<Stack>,
	pub event_count: u64,
	pub user_count: u64,
	pub user_ids: BTreeSet<String>,
	pub first_seen: DateTime<Utc>,
	pub last_seen: DateTime<Utc>,
	pub sample: IssueSample,
}

impl Issue {
	/// Opens a new issue from the first event seen for `fingerprint`.
	pub fn from_event(fingerprint: String, event: &Event, seen_at: DateTime<Utc>) -> Self {
		let message = event.data_str("message").map(str::to_string);
		let stack = event
			.data
			.get("stack")
			.and_then(|s| serde_json::from_value(s.clone()).ok());
		let mut user_ids = BTreeSet::new();
		if let Some(user_id) = event.context.user_id() {
			user_ids.insert(user_id.to_string());
		}

		Self {
			id: IssueId::new(),
			fingerprint,
			title: message.clone().unwrap_or_else(|| "Unknown Error".to_string()),
			message,
			error_type: event
				.data_str("errorType")
				.unwrap_or("unknown_error")
				.to_string(),
			level: event.level(),
			status: IssueStatus::Unresolved,
			filename: event.data_str("filename").map(str::to_string),
			stack,
			event_count: 1,
			user_count: user_ids.len() as u64,
			user_ids,
			first_seen: seen_at,
			last_seen: seen_at,
			sample: IssueSample {
				url: event.context.page_url().map(str::to_string),
				user_agent: event.context.user_agent().map(str::to_string),
				browser: event.context.browser.clone(),
				os: event.context.os.clone(),
				device: event.context.device.clone(),
				tags: event.context.tags.clone(),
				breadcrumbs: event.breadcrumbs.clone(),
			},
		}
	}

	/// Folds another occurrence into the counters.
	pub fn record_occurrence(&mut self, event: &Event, seen_at: DateTime<Utc>) {
		self.event_count += 1;
		if seen_at > self.last_seen {
			self.last_seen = seen_at;
		}
		if let Some(user_id) = event.context.user_id() {
			if self.user_ids.insert(user_id.to_string()) {
				self.user_count = self.user_ids.len() as u64;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::UserContext;
	use crate::event::EventType;
	use proptest::prelude::*;

	fn event_for(user: Option<&str>) -> Event {
		let mut event = Event::new(
			EventType::Error,
			serde_json::json!({ "errorType": "js_error", "message": "boom", "filename": "a.js" }),
		);
		event.context.user = user.map(|id| UserContext {
			id: Some(id.to_string()),
			..Default::default()
		});
		event
	}

	#[test]
	fn new_issue_captures_event_fields() {
		let now = Utc::now();
		let issue = Issue::from_event("fp".to_string(), &event_for(Some("u1")), now);
		assert_eq!(issue.title, "boom");
		assert_eq!(issue.error_type, "js_error");
		assert_eq!(issue.status, IssueStatus::Unresolved);
		assert_eq!(issue.event_count, 1);
		assert_eq!(issue.user_count, 1);
		assert_eq!(issue.first_seen, now);
	}

	#[test]
	fn untitled_issue() {
		let event = Event::new(EventType::Error, serde_json::json!({}));
		let issue = Issue::from_event("fp".to_string(), &event, Utc::now());
		assert_eq!(issue.title, "Unknown Error");
		assert_eq!(issue.user_count, 0);
	}

	#[test]
	fn occurrences_count_distinct_users() {
		let start = Utc::now();
		let mut issue = Issue::from_event("fp".to_string(), &event_for(Some("u1")), start);
		issue.record_occurrence(&event_for(Some("u1")), start);
		issue.record_occurrence(&event_for(Some("u2")), start + chrono::Duration::seconds(5));
		issue.record_occurrence(&event_for(None), start);
		assert_eq!(issue.event_count, 4);
		assert_eq!(issue.user_count, 2);
		assert_eq!(issue.last_seen, start + chrono::Duration::seconds(5));
	}

	proptest! {
		#[test]
		fn issue_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = IssueId(Uuid::from_bytes(uuid_bytes));
			let parsed: IssueId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn issue_status_roundtrip(status in prop_oneof![
			Just(IssueStatus::Unresolved),
			Just(IssueStatus::Resolved),
			Just(IssueStatus::Ignored),
		]) {
			let parsed: IssueStatus = status.to_string().parse().unwrap();
			prop_assert_eq!(status, parsed);
		}
	}
}
