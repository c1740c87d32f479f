// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event ingestion endpoint.

use axum::{
	body::Bytes,
	extract::State,
	http::HeaderMap,
	response::IntoResponse,
};
use tracing::{instrument, warn};

use monitor_core::{verify_payload, SIGNATURE_HEADER};

use crate::api::AppState;
use crate::error::ServerError;
use crate::ingest::ingest_payload;
use crate::response::{ok, ApiError};

/// POST /api/tracker
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn track(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
	if let Some(secret) = &state.signing_secret {
		let signature = headers
			.get(SIGNATURE_HEADER)
			.and_then(|v| v.to_str().ok())
			.ok_or(ServerError::MissingSignature)?;
		if !verify_payload(secret.as_bytes(), &body, signature) {
			warn!("rejecting payload with invalid signature");
			return Err(ServerError::InvalidSignature.into());
		}
	}

	let summary = ingest_payload(&state.aggregator, &body).await?;
	Ok(ok(summary))
}
