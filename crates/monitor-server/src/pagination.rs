// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page-number pagination for list endpoints.

use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}

impl PageParams {
	pub fn new(page: u32, page_size: u32) -> Self {
		Self {
			page: Some(page),
			page_size: Some(page_size),
		}
	}

	/// 1-based page number.
	pub fn page_or_default(&self) -> u32 {
		self.page.unwrap_or(1).max(1)
	}

	pub fn page_size_clamped(&self) -> u32 {
		self.page_size
			.unwrap_or(DEFAULT_PAGE_SIZE)
			.clamp(1, MAX_PAGE_SIZE)
	}

	pub fn offset(&self) -> usize {
		(self.page_or_default() as usize - 1) * self.page_size_clamped() as usize
	}
}
