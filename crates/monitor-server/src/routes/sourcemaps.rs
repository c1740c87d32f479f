// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map upload, release management and resolution endpoints.

use axum::{
	extract::{Path, Query, State},
	response::IntoResponse,
	Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use monitor_core::StackFrame;

use crate::api::AppState;
use crate::error::ServerError;
use crate::response::{ok, ApiError};

fn required<'a>(value: &'a Option<String>, missing: &str) -> Result<&'a str, ServerError> {
	value
		.as_deref()
		.filter(|v| !v.is_empty())
		.ok_or_else(|| ServerError::InvalidRequest(missing.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
	pub app_id: Option<String>,
	pub release: Option<String>,
	pub filename: Option<String>,
	/// The source map, as a JSON object or as its serialized text.
	pub sourcemap: Option<Value>,
}

const UPLOAD_FIELDS: &str = "Missing required fields: release, appId, filename, sourcemap";

/// POST /api/sourcemaps
pub async fn upload(
	State(state): State<AppState>,
	Json(body): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let app_id = required(&body.app_id, UPLOAD_FIELDS)?;
	let release = required(&body.release, UPLOAD_FIELDS)?;
	let filename = required(&body.filename, UPLOAD_FIELDS)?;
	let data = match body.sourcemap {
		Some(Value::String(text)) => text.into_bytes(),
		Some(Value::Null) | None => {
			return Err(ServerError::InvalidRequest(UPLOAD_FIELDS.to_string()).into())
		}
		Some(map) => serde_json::to_vec(&map)?,
	};

	let receipt = state
		.resolver
		.upload(app_id, release, filename, &data)
		.await?;
	Ok(ok(receipt))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppQuery {
	pub app_id: Option<String>,
}

/// GET /api/sourcemaps/releases?appId=
pub async fn list_releases(
	State(state): State<AppState>,
	Query(query): Query<AppQuery>,
) -> Result<impl IntoResponse, ApiError> {
	let app_id = required(&query.app_id, "appId is required")?;
	Ok(ok(state.resolver.list_releases(app_id).await?))
}

/// DELETE /api/sourcemaps/releases/{release}?appId=
pub async fn delete_release(
	State(state): State<AppState>,
	Path(release): Path<String>,
	Query(query): Query<AppQuery>,
) -> Result<impl IntoResponse, ApiError> {
	let app_id = required(&query.app_id, "appId is required")?;
	let deleted = state.resolver.delete_release(app_id, &release).await?;
	Ok(ok(json!({ "deleted": deleted })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRequest {
	pub app_id: Option<String>,
	pub release: Option<String>,
	pub filename: Option<String>,
	pub line: Option<u32>,
	#[serde(default)]
	pub column: u32,
}

const POSITION_FIELDS: &str = "Missing required fields: appId, release, filename, line";

/// POST /api/sourcemaps/parse-position
pub async fn parse_position(
	State(state): State<AppState>,
	Json(body): Json<PositionRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let app_id = required(&body.app_id, POSITION_FIELDS)?;
	let release = required(&body.release, POSITION_FIELDS)?;
	let filename = required(&body.filename, POSITION_FIELDS)?;
	let line = body
		.line
		.ok_or_else(|| ServerError::InvalidRequest(POSITION_FIELDS.to_string()))?;

	let result = state
		.resolver
		.resolve_position(app_id, release, filename, line, body.column)
		.await?;
	Ok(ok(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackRequest {
	pub app_id: Option<String>,
	pub release: Option<String>,
	pub frames: Option<Vec<StackFrame>>,
}

const STACK_FIELDS: &str = "Missing required fields: appId, release, frames";

/// POST /api/sourcemaps/parse
pub async fn parse_stack(
	State(state): State<AppState>,
	Json(body): Json<StackRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let app_id = required(&body.app_id, STACK_FIELDS)?;
	let release = required(&body.release, STACK_FIELDS)?;
	let frames = body
		.frames
		.ok_or_else(|| ServerError::InvalidRequest(STACK_FIELDS.to_string()))?;

	let frames = state
		.resolver
		.resolve_stack(app_id, release, &frames)
		.await?;
	Ok(ok(json!({ "success": true, "frames": frames })))
}
