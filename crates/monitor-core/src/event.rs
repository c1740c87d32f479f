// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry events and the structured error payload carried by error events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::context::EventContext;
use crate::error::{MonitorError, Result};
use crate::level::Level;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Category of telemetry an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	Error,
	Performance,
	Behavior,
	Network,
	Resource,
	Custom,
	Lifecycle,
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => write!(f, "error"),
			Self::Performance => write!(f, "performance"),
			Self::Behavior => write!(f, "behavior"),
			Self::Network => write!(f, "network"),
			Self::Resource => write!(f, "resource"),
			Self::Custom => write!(f, "custom"),
			Self::Lifecycle => write!(f, "lifecycle"),
		}
	}
}

impl FromStr for EventType {
	type Err = MonitorError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"error" => Ok(Self::Error),
			"performance" => Ok(Self::Performance),
			"behavior" => Ok(Self::Behavior),
			"network" => Ok(Self::Network),
			"resource" => Ok(Self::Resource),
			"custom" => Ok(Self::Custom),
			"lifecycle" => Ok(Self::Lifecycle),
			_ => Err(MonitorError::InvalidEventType(s.to_string())),
		}
	}
}

/// A captured telemetry record.
///
/// Events are treated as immutable once built. Pipeline stages that need a
/// modified version (sanitization, processors) work on a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	#[serde(default)]
	pub event_id: EventId,
	#[serde(rename = "type")]
	pub event_type: EventType,
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub timestamp: DateTime<Utc>,
	#[serde(default)]
	pub context: EventContext,
	#[serde(default)]
	pub data: serde_json::Value,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
}

impl Event {
	pub fn new(event_type: EventType, data: serde_json::Value) -> Self {
		Self {
			event_id: EventId::new(),
			event_type,
			timestamp: Utc::now(),
			context: EventContext::default(),
			data,
			breadcrumbs: Vec::new(),
		}
	}

	/// Builds an error event from a structured error payload.
	pub fn from_error(error: &ErrorData) -> Result<Self> {
		Ok(Self::new(EventType::Error, serde_json::to_value(error)?))
	}

	pub fn is_error(&self) -> bool {
		self.event_type == EventType::Error
	}

	/// Severity taken from `data.level`, falling back to `error` for error
	/// events and `info` for everything else.
	pub fn level(&self) -> Level {
		self
			.data_str("level")
			.and_then(|l| l.parse().ok())
			.unwrap_or(if self.is_error() {
				Level::Error
			} else {
				Level::Info
			})
	}

	/// Decodes `data` as an error payload. Returns `None` for non-error events.
	pub fn error_data(&self) -> Option<ErrorData> {
		if !self.is_error() {
			return None;
		}
		serde_json::from_value(self.data.clone()).ok()
	}

	/// String field of `data`, if present.
	pub fn data_str(&self, key: &str) -> Option<&str> {
		self.data.get(key).and_then(|v| v.as_str())
	}

	/// Unsigned integer field of `data`, if present.
	pub fn data_u64(&self, key: &str) -> Option<u64> {
		self.data.get(key).and_then(|v| v.as_u64())
	}
}

fn default_error_type() -> String {
	"js_error".to_string()
}

fn default_error_level() -> Level {
	Level::Error
}

fn default_true() -> bool {
	true
}

/// Payload of an error event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
	/// "js_error", "promise_error", "resource_error", "network_error", ...
	#[serde(default = "default_error_type")]
	pub error_type: String,
	#[serde(default = "default_error_level")]
	pub level: Level,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub stack: Option<Stack>,
	#[serde(default)]
	pub filename: Option<String>,
	#[serde(default)]
	pub lineno: Option<u32>,
	#[serde(default)]
	pub colno: Option<u32>,
	#[serde(default)]
	pub mechanism: Option<String>,
	#[serde(default = "default_true")]
	pub handled: bool,
	#[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
	pub extra: serde_json::Value,
}

impl ErrorData {
	pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error_type: error_type.into(),
			level: Level::Error,
			message: Some(message.into()),
			name: None,
			stack: None,
			filename: None,
			lineno: None,
			colno: None,
			mechanism: None,
			handled: true,
			extra: serde_json::Value::Null,
		}
	}
}

/// A stack trace, either as the raw text the runtime produced or as parsed frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stack {
	Raw(String),
	Frames(Vec<StackFrame>),
}

impl Stack {
	/// The top frame as a single line of text.
	///
	/// For raw traces this is the first line containing `"at "`; for parsed
	/// traces it is the first frame's raw text, or its location if no raw text
	/// was kept.
	pub fn first_frame(&self) -> Option<String> {
		match self {
			Stack::Raw(text) => text
				.lines()
				.find(|line| line.contains("at "))
				.map(|line| line.trim().to_string()),
			Stack::Frames(frames) => frames.first().map(|frame| match &frame.raw {
				Some(raw) => raw.clone(),
				None => frame.location(),
			}),
		}
	}
}

/// One parsed stack frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackFrame {
	pub raw: Option<String>,
	pub function: Option<String>,
	pub filename: Option<String>,
	pub lineno: Option<u32>,
	pub colno: Option<u32>,
}

impl StackFrame {
	/// `function (file:line:col)` with missing parts left out.
	pub fn location(&self) -> String {
		let file = self.filename.as_deref().unwrap_or("<anonymous>");
		let position = match (self.lineno, self.colno) {
			(Some(l), Some(c)) => format!("{file}:{l}:{c}"),
			(Some(l), None) => format!("{file}:{l}"),
			_ => file.to_string(),
		};
		match &self.function {
			Some(func) => format!("{func} ({position})"),
			None => position,
		}
	}
}
