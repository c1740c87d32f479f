// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collector for the monitoring pipeline.
//!
//! - [`ingest`] decodes tracker payloads and feeds error events to the
//!   [`IssueAggregator`]
//! - [`resolver`] stores uploaded source maps and resolves minified
//!   positions and stacks through them
//! - [`api`] exposes both over HTTP

pub mod aggregator;
pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pagination;
pub mod resolver;
pub mod response;
pub mod routes;
pub mod store;

pub use aggregator::IssueAggregator;
pub use api::{create_router, AppState};
pub use artifacts::{
	ArtifactKey, ArtifactStore, FileMeta, FsArtifactStore, InMemoryArtifactStore, ReleaseInfo,
};
pub use config::{load_config, load_config_with_file, ConfigError, ServerConfig};
pub use error::{Result, ServerError};
pub use ingest::{ingest_payload, IngestSummary};
pub use pagination::PageParams;
pub use resolver::{
	base_filename, PositionResult, ResolvedFrame, SourceMapResolver, UploadReceipt,
};
pub use response::{ApiError, Envelope};
pub use store::{InMemoryIssueRepository, IssueFilter, IssuePage, IssueRepository};
