// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Processing of tracker payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use monitor_core::{Event, IssueId, PayloadMeta};

use crate::aggregator::IssueAggregator;
use crate::error::{Result, ServerError};

/// Per-request ingestion counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
	/// Events that decoded and were processed.
	pub accepted: usize,
	/// Events that failed to decode or to aggregate.
	pub rejected: usize,
	/// Issues touched by this payload, in first-seen order.
	pub issues: Vec<IssueId>,
}

/// Decodes a `{ events, meta }` payload and feeds error events to the aggregator.
///
/// Only a body that is not a JSON object with an `events` array fails the
/// request. Each event is decoded on its own; a bad event is counted as
/// rejected and the rest are still processed.
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn ingest_payload(aggregator: &IssueAggregator, body: &[u8]) -> Result<IngestSummary> {
	let root: Value = serde_json::from_slice(body)
		.map_err(|e| ServerError::InvalidRequest(format!("invalid JSON body: {e}")))?;
	let Value::Object(mut root) = root else {
		return Err(ServerError::InvalidRequest(
			"payload must be a JSON object".to_string(),
		));
	};
	let Some(Value::Array(events)) = root.remove("events") else {
		return Err(ServerError::InvalidRequest(
			"events must be an array".to_string(),
		));
	};
	let meta: PayloadMeta = root
		.remove("meta")
		.and_then(|m| serde_json::from_value(m).ok())
		.unwrap_or_default();
	debug!(
		app_id = %meta.app_id,
		sdk_version = %meta.version,
		events = events.len(),
		"tracker payload received"
	);

	let mut summary = IngestSummary::default();
	for (index, raw) in events.into_iter().enumerate() {
		let event: Event = match serde_json::from_value(raw) {
			Ok(event) => event,
			Err(e) => {
				debug!(index, error = %e, "rejecting malformed event");
				summary.rejected += 1;
				continue;
			}
		};

		if event.is_error() {
			match aggregator.ingest(&event).await {
				Ok(issue) => {
					if !summary.issues.contains(&issue.id) {
						summary.issues.push(issue.id);
					}
				}
				Err(e) => {
					warn!(index, error = %e, "failed to aggregate error event");
					summary.rejected += 1;
					continue;
				}
			}
		}
		summary.accepted += 1;
	}

	Ok(summary)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use crate::config::IssuesConfig;
	use crate::store::InMemoryIssueRepository;
	use serde_json::json;

	fn aggregator() -> IssueAggregator {
		IssueAggregator::new(
			Arc::new(InMemoryIssueRepository::new()),
			&IssuesConfig::default(),
		)
	}

	fn error_event(message: &str) -> Value {
		json!({
			"type": "error",
			"timestamp": 1_700_000_000_000i64,
			"data": { "errorType": "js_error", "message": message }
		})
	}

	#[tokio::test]
	async fn bad_events_do_not_abort_the_batch() {
		let agg = aggregator();
		let body = json!({
			"events": [
				error_event("boom"),
				{ "type": "not-a-type", "timestamp": 0 },
				{ "type": "performance", "timestamp": 1_700_000_000_000i64, "data": { "lcp": 1200 } },
				error_event("boom"),
				error_event("bang"),
			],
			"meta": { "appId": "shop", "sdk": "monitor-sdk", "version": "0.1.0", "timestamp": 0 }
		});

		let summary = ingest_payload(&agg, body.to_string().as_bytes()).await.unwrap();
		assert_eq!(summary.accepted, 4);
		assert_eq!(summary.rejected, 1);
		assert_eq!(summary.issues.len(), 2);

		let issue = agg.get_issue(summary.issues[0]).await.unwrap();
		assert_eq!(issue.event_count, 2);
	}

	#[tokio::test]
	async fn events_must_be_an_array() {
		let agg = aggregator();
		for body in [r#"{"events": {}}"#, r#"{"meta": {}}"#, "[]", "garbage"] {
			let err = ingest_payload(&agg, body.as_bytes()).await.unwrap_err();
			assert!(matches!(err, ServerError::InvalidRequest(_)), "{body}");
		}
	}

	#[tokio::test]
	async fn meta_is_optional() {
		let agg = aggregator();
		let body = json!({ "events": [] }).to_string();
		let summary = ingest_payload(&agg, body.as_bytes()).await.unwrap();
		assert_eq!(summary, IngestSummary::default());
	}
}
