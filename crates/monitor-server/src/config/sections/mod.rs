// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for monitor-server.

pub mod http;
pub mod issues;
pub mod logging;
pub mod signing;
pub mod sourcemap;
pub mod storage;

pub use http::{HttpConfig, HttpConfigLayer};
pub use issues::{IssuesConfig, IssuesConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use signing::{SigningConfig, SigningConfigLayer};
pub use sourcemap::{SourceMapConfig, SourceMapConfigLayer};
pub use storage::{StorageConfig, StorageConfigLayer};
