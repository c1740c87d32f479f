// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumbs (actions leading up to an event) and the bounded trail that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;
use crate::level::Level;

/// A single entry in the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	#[serde(rename = "type")]
	pub breadcrumb_type: BreadcrumbType,
	/// "ui", "navigation", "http", "console"
	#[serde(default)]
	pub category: String,
	pub level: Level,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub data: serde_json::Value,
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub timestamp: DateTime<Utc>,
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Custom,
			category: String::new(),
			level: Level::Info,
			message: None,
			data: serde_json::Value::Object(serde_json::Map::new()),
			timestamp: Utc::now(),
		}
	}
}

impl Breadcrumb {
	/// A UI click on the described target.
	pub fn click(target: impl Into<String>, data: serde_json::Value) -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Click,
			category: "ui".to_string(),
			message: Some(format!("Click on {}", target.into())),
			data,
			..Default::default()
		}
	}

	/// A navigation between two locations.
	pub fn navigation(from: &str, to: &str) -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Navigation,
			category: "navigation".to_string(),
			message: Some(format!("{from} -> {to}")),
			data: serde_json::json!({ "from": from, "to": to }),
			..Default::default()
		}
	}

	/// An outgoing request. Statuses of 400 and above are recorded at error level.
	pub fn request(method: &str, url: &str, status: u16, duration_ms: u64) -> Self {
		let level = if status >= 400 { Level::Error } else { Level::Info };
		Self {
			breadcrumb_type: BreadcrumbType::Xhr,
			category: "http".to_string(),
			level,
			message: Some(format!("{method} {url} [{status}]")),
			data: serde_json::json!({
				"method": method,
				"url": url,
				"status": status,
				"duration": duration_ms,
			}),
			..Default::default()
		}
	}

	/// A console line at the given level.
	pub fn console(level: Level, message: impl Into<String>) -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Console,
			category: "console".to_string(),
			level,
			message: Some(message.into()),
			..Default::default()
		}
	}

	/// An error that was observed but not necessarily reported.
	pub fn error(message: impl Into<String>) -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Error,
			category: "error".to_string(),
			level: Level::Error,
			message: Some(message.into()),
			..Default::default()
		}
	}

	/// An application-defined breadcrumb.
	pub fn custom(
		category: impl Into<String>,
		message: impl Into<String>,
		data: serde_json::Value,
	) -> Self {
		Self {
			breadcrumb_type: BreadcrumbType::Custom,
			category: category.into(),
			message: Some(message.into()),
			data,
			..Default::default()
		}
	}
}

/// Kind of action a breadcrumb records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbType {
	Click,
	Input,
	Scroll,
	Touch,
	Keyboard,
	Navigation,
	RouteChange,
	Xhr,
	Fetch,
	Console,
	Error,
	UnhandledRejection,
	Resource,
	Custom,
	Lifecycle,
}

impl BreadcrumbType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Click => "click",
			Self::Input => "input",
			Self::Scroll => "scroll",
			Self::Touch => "touch",
			Self::Keyboard => "keyboard",
			Self::Navigation => "navigation",
			Self::RouteChange => "route_change",
			Self::Xhr => "xhr",
			Self::Fetch => "fetch",
			Self::Console => "console",
			Self::Error => "error",
			Self::UnhandledRejection => "unhandled_rejection",
			Self::Resource => "resource",
			Self::Custom => "custom",
			Self::Lifecycle => "lifecycle",
		}
	}
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for BreadcrumbType {
	type Err = MonitorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"click" => Ok(Self::Click),
			"input" => Ok(Self::Input),
			"scroll" => Ok(Self::Scroll),
			"touch" => Ok(Self::Touch),
			"keyboard" => Ok(Self::Keyboard),
			"navigation" => Ok(Self::Navigation),
			"route_change" => Ok(Self::RouteChange),
			"xhr" => Ok(Self::Xhr),
			"fetch" => Ok(Self::Fetch),
			"console" => Ok(Self::Console),
			"error" => Ok(Self::Error),
			"unhandled_rejection" => Ok(Self::UnhandledRejection),
			"resource" => Ok(Self::Resource),
			"custom" => Ok(Self::Custom),
			"lifecycle" => Ok(Self::Lifecycle),
			_ => Err(MonitorError::InvalidBreadcrumbType(s.to_string())),
		}
	}
}

/// Fixed-capacity breadcrumb trail. Once full, each push evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct BreadcrumbBuffer {
	entries: VecDeque<Breadcrumb>,
	capacity: usize,
}

impl BreadcrumbBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			entries: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	pub fn push(&mut self, breadcrumb: Breadcrumb) {
		if self.capacity == 0 {
			return;
		}
		while self.entries.len() >= self.capacity {
			self.entries.pop_front();
		}
		self.entries.push_back(breadcrumb);
	}

	/// Copy of the whole trail, oldest first.
	pub fn all(&self) -> Vec<Breadcrumb> {
		self.entries.iter().cloned().collect()
	}

	/// Copy of the `n` most recent entries, oldest first.
	pub fn last(&self, n: usize) -> Vec<Breadcrumb> {
		let skip = self.entries.len().saturating_sub(n);
		self.entries.iter().skip(skip).cloned().collect()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}
