// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client SDK for the monitoring pipeline.
//!
//! Every captured event passes through:
//! - Sampling per event type
//! - Deduplication of repeated errors within a time window
//! - Sanitization of sensitive keys and PII-shaped strings
//! - Event processors registered by the host application
//!
//! and is then handed to the [`Transport`], which batches, compresses,
//! signs and delivers it with retry and an offline queue.

pub mod client;
pub mod compress;
pub mod config;
pub mod dedup;
pub mod error;
pub mod offline;
pub mod processor;
pub mod sampler;
pub mod sanitize;
pub mod transport;

pub use client::{CaptureOutcome, MonitorClient, MonitorClientBuilder};
pub use compress::{decompress_gzip, Compressor, GZIP_ENCODING};
pub use config::{
	default_offline_path, CompressionConfig, DedupConfig, OfflineStorage, SanitizeConfig, SdkConfig,
};
pub use dedup::{DedupStats, Deduplicator};
pub use error::{Result, SdkError};
pub use offline::{Batch, FileOfflineStore, MemoryOfflineStore, OfflineQueue, OfflineStore};
pub use processor::{BreadcrumbProcessor, ErrorReporter, EventProcessor};
pub use sampler::{SampleRates, Sampler};
pub use sanitize::{Sanitizer, DEFAULT_SENSITIVE_KEYS, REDACTED};
pub use transport::{
	open_offline_queue, BatchSender, FlushOutcome, HttpBatchSender, OutgoingRequest, Transport,
	TransportStatus, SDK_NAME, SDK_VERSION,
};

pub use monitor_core::{
	Breadcrumb, BreadcrumbType, ErrorData, Event, EventContext, EventId, EventType, Level, Stack,
	StackFrame, UserContext,
};
