// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Response envelope shared by every endpoint.
//!
//! Success: `{ "code": 0, "message": "OK", "data": ... }`
//! Failure: `{ "code": 1, "message": "..." }` with a 4xx/5xx status.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ServerError;

pub const CODE_OK: u8 = 0;
pub const CODE_ERROR: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
	pub code: u8,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
	pub fn ok(data: T) -> Self {
		Self {
			code: CODE_OK,
			message: "OK".to_string(),
			data: Some(data),
		}
	}
}

impl Envelope<()> {
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			code: CODE_ERROR,
			message: message.into(),
			data: None,
		}
	}
}

/// 200 with `data` wrapped in the success envelope.
pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
	(StatusCode::OK, Json(Envelope::ok(data)))
}

/// Handler error; renders as the failure envelope.
#[derive(Debug)]
pub struct ApiError(pub ServerError);

impl<E: Into<ServerError>> From<E> for ApiError {
	fn from(err: E) -> Self {
		Self(err.into())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.0.status_code();
		let message = if status.is_server_error() {
			error!(error = %self.0, "request failed");
			"Internal server error".to_string()
		} else {
			self.0.to_string()
		};
		(status, Json(Envelope::error(message))).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn success_envelope_shape() {
		let body = serde_json::to_value(Envelope::ok(serde_json::json!({ "n": 1 }))).unwrap();
		assert_eq!(body["code"], 0);
		assert_eq!(body["data"]["n"], 1);

		let body = serde_json::to_value(Envelope::error("nope")).unwrap();
		assert_eq!(body["code"], 1);
		assert!(body.get("data").is_none());
	}

	#[test]
	fn server_errors_hide_details() {
		let response = ApiError(ServerError::Storage(std::io::Error::other("disk on fire")))
			.into_response();
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let response = ApiError(ServerError::IssueNotFound("abc".into())).into_response();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}
}
