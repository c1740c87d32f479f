// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Router construction and shared handler state.

use std::sync::Arc;

use axum::{
	extract::DefaultBodyLimit,
	routing::{get, post, put},
	Router,
};
use tower_http::decompression::RequestDecompressionLayer;

use crate::aggregator::IssueAggregator;
use crate::artifacts::{ArtifactStore, FsArtifactStore};
use crate::config::ServerConfig;
use crate::resolver::SourceMapResolver;
use crate::routes;
use crate::store::{InMemoryIssueRepository, IssueRepository};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
	pub aggregator: Arc<IssueAggregator>,
	pub resolver: Arc<SourceMapResolver>,
	/// When set, tracker payloads must carry a valid signature.
	pub signing_secret: Option<Arc<str>>,
}

impl AppState {
	/// State backed by the configured source map directory and an in-process
	/// issue store.
	pub fn new(config: &ServerConfig) -> Self {
		Self::with_stores(
			config,
			Arc::new(InMemoryIssueRepository::new()),
			Arc::new(FsArtifactStore::new(&config.storage.sourcemap_dir)),
		)
	}

	pub fn with_stores(
		config: &ServerConfig,
		issues: Arc<dyn IssueRepository>,
		artifacts: Arc<dyn ArtifactStore>,
	) -> Self {
		Self {
			aggregator: Arc::new(IssueAggregator::new(issues, &config.issues)),
			resolver: Arc::new(SourceMapResolver::new(
				artifacts,
				config.sourcemap.context_lines,
			)),
			signing_secret: config.signing.secret.as_deref().map(Arc::from),
		}
	}
}

/// Builds the API router.
///
/// Gzip request bodies are inflated before they reach handlers, so signatures
/// are checked against the uncompressed payload. `max_body_bytes` bounds the
/// inflated body.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
	Router::new()
		.route("/health", get(routes::health::health))
		.route("/api/tracker", post(routes::tracker::track))
		.route("/api/issues", get(routes::issues::list_issues))
		.route(
			"/api/issues/batch-status",
			put(routes::issues::batch_update_status),
		)
		.route("/api/issues/{id}", get(routes::issues::get_issue))
		.route("/api/issues/{id}/status", put(routes::issues::update_status))
		.route("/api/sourcemaps", post(routes::sourcemaps::upload))
		.route(
			"/api/sourcemaps/releases",
			get(routes::sourcemaps::list_releases),
		)
		.route(
			"/api/sourcemaps/releases/{release}",
			axum::routing::delete(routes::sourcemaps::delete_release),
		)
		.route(
			"/api/sourcemaps/parse-position",
			post(routes::sourcemaps::parse_position),
		)
		.route("/api/sourcemaps/parse", post(routes::sourcemaps::parse_stack))
		.layer(RequestDecompressionLayer::new())
		.layer(DefaultBodyLimit::max(max_body_bytes))
		.with_state(state)
}
