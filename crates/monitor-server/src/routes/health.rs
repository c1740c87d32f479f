// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::response::IntoResponse;
use serde_json::json;

use crate::response::ok;

/// GET /health
pub async fn health() -> impl IntoResponse {
	ok(json!({
		"status": "ok",
		"version": env!("CARGO_PKG_VERSION"),
	}))
}
