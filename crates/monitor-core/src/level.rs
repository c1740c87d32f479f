// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Severity levels shared by events, breadcrumbs and issues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;

/// Severity of an event, breadcrumb or issue.
///
/// Levels are ordered, so `level >= Level::Error` selects the urgent ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Debug,
	Info,
	Warning,
	Error,
	Critical,
}

impl Level {
	/// True for `Error` and `Critical`.
	pub fn is_error(self) -> bool {
		self >= Level::Error
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Critical => write!(f, "critical"),
		}
	}
}

impl FromStr for Level {
	type Err = MonitorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" | "warn" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"critical" | "fatal" => Ok(Self::Critical),
			_ => Err(MonitorError::InvalidLevel(s.to_string())),
		}
	}
}
