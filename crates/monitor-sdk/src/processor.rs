// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hooks for instrumentation code.

use async_trait::async_trait;
use monitor_core::{Breadcrumb, ErrorData, Event};

use crate::client::CaptureOutcome;
use crate::error::Result;

/// Rewrites or drops an event after sanitization. Returning `None` drops it.
pub trait EventProcessor: Send + Sync {
	fn process(&self, event: Event) -> Option<Event>;
}

impl<F> EventProcessor for F
where
	F: Fn(Event) -> Option<Event> + Send + Sync,
{
	fn process(&self, event: Event) -> Option<Event> {
		self(event)
	}
}

/// Rewrites or drops a breadcrumb before it is recorded.
pub trait BreadcrumbProcessor: Send + Sync {
	fn process(&self, breadcrumb: Breadcrumb) -> Option<Breadcrumb>;
}

impl<F> BreadcrumbProcessor for F
where
	F: Fn(Breadcrumb) -> Option<Breadcrumb> + Send + Sync,
{
	fn process(&self, breadcrumb: Breadcrumb) -> Option<Breadcrumb> {
		self(breadcrumb)
	}
}

/// The surface instrumentation plugins report through.
///
/// Plugins hold a `dyn ErrorReporter` rather than the concrete client so they
/// can be exercised against a recorder in tests.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
	async fn report_error(&self, error: ErrorData) -> Result<CaptureOutcome>;
	async fn report_event(&self, event: Event) -> Result<CaptureOutcome>;
	async fn record_breadcrumb(&self, breadcrumb: Breadcrumb);
}
