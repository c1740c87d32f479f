// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Issue query and status endpoints.

use axum::{
	extract::{Path, Query, State},
	response::IntoResponse,
	Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use monitor_core::{IssueId, IssueStatus, Level};

use crate::api::AppState;
use crate::error::ServerError;
use crate::pagination::PageParams;
use crate::response::{ok, ApiError};
use crate::store::IssueFilter;

/// Query string for `GET /api/issues`. `all` disables a filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueQuery {
	pub status: Option<String>,
	pub level: Option<String>,
	#[serde(rename = "type")]
	pub error_type: Option<String>,
	pub search: Option<String>,
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}

fn unless_all(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty() && v != "all")
}

impl IssueQuery {
	fn filter(self) -> Result<(IssueFilter, PageParams), ServerError> {
		let status = unless_all(self.status)
			.map(|s| s.parse::<IssueStatus>())
			.transpose()
			.map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
		let level = unless_all(self.level)
			.map(|l| l.parse::<Level>())
			.transpose()
			.map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
		let filter = IssueFilter {
			status,
			level,
			error_type: unless_all(self.error_type),
			search: self.search.filter(|s| !s.is_empty()),
		};
		let page = PageParams {
			page: self.page,
			page_size: self.page_size,
		};
		Ok((filter, page))
	}
}

fn parse_issue_id(id: &str) -> Result<IssueId, ServerError> {
	id.parse()
		.map_err(|_| ServerError::InvalidRequest(format!("invalid issue id: {id}")))
}

fn parse_status(status: Option<&str>) -> Result<IssueStatus, ServerError> {
	let status = status.ok_or_else(|| ServerError::InvalidRequest("status is required".into()))?;
	status
		.parse::<IssueStatus>()
		.map_err(|e| ServerError::InvalidRequest(e.to_string()))
}

/// GET /api/issues
pub async fn list_issues(
	State(state): State<AppState>,
	Query(query): Query<IssueQuery>,
) -> Result<impl IntoResponse, ApiError> {
	let (filter, page) = query.filter()?;
	let issues = state.aggregator.list_issues(&filter, page).await?;
	Ok(ok(issues))
}

/// GET /api/issues/{id}
pub async fn get_issue(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
	let id = parse_issue_id(&id)?;
	Ok(ok(state.aggregator.get_issue(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
	pub status: Option<String>,
}

/// PUT /api/issues/{id}/status
pub async fn update_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(body): Json<StatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
	let id = parse_issue_id(&id)?;
	let status = parse_status(body.status.as_deref())?;
	Ok(ok(state.aggregator.update_status(id, status).await?))
}

#[derive(Debug, Deserialize)]
pub struct BatchStatusUpdate {
	#[serde(default)]
	pub ids: Vec<String>,
	pub status: Option<String>,
}

/// PUT /api/issues/batch-status
pub async fn batch_update_status(
	State(state): State<AppState>,
	Json(body): Json<BatchStatusUpdate>,
) -> Result<impl IntoResponse, ApiError> {
	let status = parse_status(body.status.as_deref())?;
	let ids: Vec<IssueId> = body
		.ids
		.iter()
		.filter_map(|id| match id.parse() {
			Ok(id) => Some(id),
			Err(_) => {
				debug!(id = %id, "skipping malformed issue id");
				None
			}
		})
		.collect();

	let updated = state.aggregator.batch_update_status(&ids, status).await?;
	Ok(ok(json!({ "updated": updated })))
}
