// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map symbolication engine.
//!
//! This crate provides functionality for:
//! - Decoding and encoding Base64 VLQ mapping segments
//! - Parsing JavaScript/TypeScript source maps (v3)
//! - Resolving a generated (line, column) to the nearest original position
//! - Extracting source context around a resolved line
//!
//! # Example
//!
//! ```
//! use monitor_symbolicate::{ParsedSourceMap, DEFAULT_CONTEXT_LINES};
//!
//! let source_map_json = r#"{
//!     "version": 3,
//!     "sources": ["src/app.ts"],
//!     "names": [],
//!     "mappings": "AAIE"
//! }"#;
//! let map = ParsedSourceMap::parse(source_map_json).unwrap();
//!
//! let resolved = map.resolve(1, 10, DEFAULT_CONTEXT_LINES).unwrap().unwrap();
//! assert_eq!(resolved.position.source, "src/app.ts");
//! assert_eq!(resolved.position.line, 5);
//! assert_eq!(resolved.position.column, 2);
//! ```

pub mod error;
pub mod sourcemap;
pub mod vlq;

pub use error::{Result, SymbolicateError};
pub use sourcemap::{
	extract_context, ContextLine, OriginalPosition, ParsedSourceMap, ResolvedLocation,
	DEFAULT_CONTEXT_LINES,
};
pub use vlq::{
	decode_vlq_mappings, decode_vlq_segment, encode_vlq, encode_vlq_segment, DecodedMappings,
	Mapping,
};
