// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the event reliability and diagnostics pipeline.
//!
//! Shared by the client SDK (`monitor-sdk`) and the collector
//! (`monitor-server`):
//! - Events, their context snapshot and the structured error payload
//! - Breadcrumbs and the bounded breadcrumb trail
//! - Issues and their lifecycle states
//! - The client-side suppression and server-side grouping fingerprints
//! - HMAC payload signatures

pub mod breadcrumb;
pub mod context;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod issue;
pub mod level;
pub mod signature;

pub use breadcrumb::{Breadcrumb, BreadcrumbBuffer, BreadcrumbType};
pub use context::{
	AppInfo, BrowserContext, DeviceContext, EventContext, OsContext, PageContext, SdkInfo,
	SessionContext, UserContext,
};
pub use error::{MonitorError, Result};
pub use event::{ErrorData, Event, EventId, EventType, Stack, StackFrame};
pub use fingerprint::{truncate_chars, DedupFingerprint, IssueFingerprint};
pub use issue::{Issue, IssueId, IssueSample, IssueStatus};
pub use level::Level;
pub use signature::{sign_payload, verify_payload, SIGNATURE_HEADER};

use serde::{Deserialize, Serialize};

/// Metadata sent alongside every batch of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayloadMeta {
	pub sdk: String,
	pub version: String,
	pub app_id: String,
	pub release: Option<String>,
	pub environment: Option<String>,
	/// Milliseconds since the Unix epoch at send time.
	pub timestamp: i64,
}

/// Body of an ingestion request.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload<'a> {
	pub events: &'a [Event],
	pub meta: PayloadMeta,
}
