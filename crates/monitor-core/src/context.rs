// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context snapshot attached to every event (device, browser, OS, session, user, page).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SDK identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkInfo {
	pub name: String,
	pub version: String,
}

/// Application identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
	pub app_id: String,
	#[serde(default)]
	pub release: Option<String>,
	#[serde(default)]
	pub environment: Option<String>,
}

/// Device the event was captured on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceContext {
	/// "desktop", "mobile", "tablet"
	#[serde(rename = "type")]
	pub device_type: Option<String>,
	pub vendor: Option<String>,
	pub model: Option<String>,
	pub user_agent: Option<String>,
	pub screen_width: Option<u32>,
	pub screen_height: Option<u32>,
}

/// Browser or runtime host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserContext {
	/// "Chrome", "Firefox", "Safari"
	pub name: Option<String>,
	pub version: Option<String>,
}

/// Operating system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsContext {
	pub name: Option<String>,
	pub version: Option<String>,
}

/// Session the event belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
	pub id: Option<String>,
	pub visitor_id: Option<String>,
}

/// Identified user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
	pub id: Option<String>,
	pub username: Option<String>,
	pub email: Option<String>,
}

/// Page or screen the event was captured on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
	pub url: Option<String>,
	pub title: Option<String>,
	pub referrer: Option<String>,
}

/// Everything known about the environment at capture time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventContext {
	pub sdk: Option<SdkInfo>,
	pub app: Option<AppInfo>,
	pub device: Option<DeviceContext>,
	pub browser: Option<BrowserContext>,
	pub os: Option<OsContext>,
	pub session: Option<SessionContext>,
	pub user: Option<UserContext>,
	pub page: Option<PageContext>,
	pub tags: BTreeMap<String, String>,
	pub extra: serde_json::Value,
}

impl EventContext {
	pub fn user_id(&self) -> Option<&str> {
		self.user.as_ref().and_then(|u| u.id.as_deref())
	}

	pub fn page_url(&self) -> Option<&str> {
		self.page.as_ref().and_then(|p| p.url.as_deref())
	}

	pub fn user_agent(&self) -> Option<&str> {
		self.device.as_ref().and_then(|d| d.user_agent.as_deref())
	}
}
