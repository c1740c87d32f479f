// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map parsing and position lookup.
//!
//! Implements the Source Map v3 format for JavaScript/TypeScript bundles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SymbolicateError};
use crate::vlq::{decode_vlq_mappings, DecodedMappings};

/// Default number of lines shown on each side of a resolved line.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Raw source map JSON structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
	version: u32,
	#[serde(default)]
	file: Option<String>,
	#[serde(default)]
	source_root: Option<String>,
	#[serde(default)]
	sources: Vec<String>,
	#[serde(default)]
	sources_content: Option<Vec<Option<String>>>,
	#[serde(default)]
	names: Vec<String>,
	mappings: String,
}

/// Parsed source map ready for lookups.
#[derive(Debug, Clone)]
pub struct ParsedSourceMap {
	/// Source map version (always 3).
	pub version: u32,
	/// Generated file name.
	pub file: Option<String>,
	/// Root path prepended to source filenames.
	pub source_root: Option<String>,
	/// List of original source file paths.
	pub sources: Vec<String>,
	/// Optional embedded source content for each source file.
	pub sources_content: Vec<Option<String>>,
	/// List of original identifiers (function/variable names).
	pub names: Vec<String>,
	mappings: DecodedMappings,
}

/// Original position information from a source map lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalPosition {
	/// Original source file path.
	pub source: String,
	/// Line in the original source (1-indexed).
	pub line: u32,
	/// Column in the original source (0-indexed).
	pub column: u32,
	/// Original identifier name if available.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// One line of original source around a resolved position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextLine {
	/// 1-indexed line number in the original source.
	pub line_number: usize,
	pub text: String,
	pub is_target: bool,
}

/// A resolved position together with its source window, when the map embeds sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
	#[serde(flatten)]
	pub position: OriginalPosition,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context: Option<Vec<ContextLine>>,
}

impl ParsedSourceMap {
	/// Parse a source map from JSON bytes.
	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		let raw: RawSourceMap = serde_json::from_slice(data)?;

		if raw.version != 3 {
			return Err(SymbolicateError::InvalidSourceMapVersion(raw.version));
		}

		let mappings = decode_vlq_mappings(&raw.mappings)?;
		let sources_content = raw.sources_content.unwrap_or_default();

		debug!(
			sources = raw.sources.len(),
			mappings = mappings.len(),
			"Parsed source map"
		);

		Ok(Self {
			version: raw.version,
			file: raw.file,
			source_root: raw.source_root,
			sources: raw.sources,
			sources_content,
			names: raw.names,
			mappings,
		})
	}

	/// Parse a source map from a JSON string.
	pub fn parse(data: &str) -> Result<Self> {
		Self::from_bytes(data.as_bytes())
	}

	/// Lookup the original position for a generated line and column.
	///
	/// Lines are 1-indexed (as displayed in stack traces). The nearest mapping on
	/// the same line wins. Returns `None` if the line has no mappings.
	pub fn lookup(&self, line: u32, column: u32) -> Result<Option<OriginalPosition>> {
		let mapping = match self.mappings.find(line, column) {
			Some(m) => m,
			None => return Ok(None),
		};

		let source = self
			.sources
			.get(mapping.source_index as usize)
			.ok_or(SymbolicateError::InvalidSourceIndex(mapping.source_index))?;

		let name = mapping
			.name_index
			.and_then(|idx| self.names.get(idx as usize).cloned());

		Ok(Some(OriginalPosition {
			source: self.resolve_source_path(source),
			line: mapping.original_line,
			column: mapping.original_column,
			name,
		}))
	}

	/// Lookup plus a window of `context_lines` lines either side of the result.
	pub fn resolve(
		&self,
		line: u32,
		column: u32,
		context_lines: usize,
	) -> Result<Option<ResolvedLocation>> {
		let mapping = match self.mappings.find(line, column) {
			Some(m) => m.clone(),
			None => return Ok(None),
		};
		let Some(position) = self.lookup(line, column)? else {
			return Ok(None);
		};

		let context = self
			.source_content(mapping.source_index as usize)
			.map(|content| extract_context(content, position.line as usize, context_lines))
			.filter(|lines| !lines.is_empty());

		Ok(Some(ResolvedLocation { position, context }))
	}

	/// Embedded source text for the source at `index`.
	pub fn source_content(&self, index: usize) -> Option<&str> {
		self.sources_content.get(index).and_then(|c| c.as_deref())
	}

	/// Resolve a source path with the source root if present.
	fn resolve_source_path(&self, source: &str) -> String {
		match &self.source_root {
			Some(root) if !root.is_empty() => {
				let root = root.trim_end_matches('/');
				format!("{}/{}", root, source)
			}
			_ => source.to_string(),
		}
	}

	/// Check if this source map has embedded source content.
	pub fn has_sources_content(&self) -> bool {
		self.sources_content.iter().any(|c| c.is_some())
	}

	pub fn mapping_count(&self) -> usize {
		self.mappings.len()
	}
}

/// Lines `line - context_lines ..= line + context_lines` of `source_content`,
/// clipped to the file. `line` is 1-indexed; an out-of-range line yields nothing.
pub fn extract_context(source_content: &str, line: usize, context_lines: usize) -> Vec<ContextLine> {
	let lines: Vec<&str> = source_content.lines().collect();

	if line == 0 || line > lines.len() {
		return Vec::new();
	}

	let target_idx = line - 1;
	let start = target_idx.saturating_sub(context_lines);
	let end = (target_idx + context_lines + 1).min(lines.len());

	(start..end)
		.map(|idx| ContextLine {
			line_number: idx + 1,
			text: lines[idx].to_string(),
			is_target: idx == target_idx,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vlq::encode_vlq_segment;

	fn sample_source_map() -> &'static str {
		r#"{
			"version": 3,
			"file": "out.js",
			"sourceRoot": "",
			"sources": ["src/index.ts"],
			"sourcesContent": ["function hello() {\n  console.log('Hello, World!');\n}\n\nhello();\n"],
			"names": ["hello", "console", "log"],
			"mappings": "AAAA,SAASA,KAAKT,CAAC;AACXC,OAAQ,CAACC,GAAG,CAAC,eAAe,CAAC,CAAC;AAClC,CAAC;AAEDF,KAAK,EAAE,CAAC"
		}"#
	}

	fn single_mapping(segment: &[i64], content: Option<&str>) -> String {
		serde_json::json!({
			"version": 3,
			"sources": ["src/index.ts"],
			"sourcesContent": [content],
			"names": ["render"],
			"mappings": encode_vlq_segment(segment),
		})
		.to_string()
	}

	#[test]
	fn test_parse_source_map() {
		let sm = ParsedSourceMap::parse(sample_source_map()).unwrap();

		assert_eq!(sm.version, 3);
		assert_eq!(sm.file, Some("out.js".to_string()));
		assert_eq!(sm.sources, vec!["src/index.ts"]);
		assert_eq!(sm.names, vec!["hello", "console", "log"]);
		assert!(sm.has_sources_content());
		assert!(sm.mapping_count() > 0);
	}

	#[test]
	fn test_lookup_position() {
		let sm = ParsedSourceMap::parse(sample_source_map()).unwrap();

		let pos = sm.lookup(1, 0).unwrap().unwrap();
		assert_eq!(pos.source, "src/index.ts");
		assert_eq!(pos.line, 1);
	}

	#[test]
	fn test_single_entry_resolves_exactly() {
		// generated column 0 -> src/index.ts line 5 (0-based 4), column 2
		let sm = ParsedSourceMap::parse(&single_mapping(&[0, 0, 4, 2], None)).unwrap();

		let resolved = sm.resolve(1, 10, DEFAULT_CONTEXT_LINES).unwrap().unwrap();
		assert_eq!(
			resolved.position,
			OriginalPosition {
				source: "src/index.ts".to_string(),
				line: 5,
				column: 2,
				name: None,
			}
		);
		assert!(resolved.context.is_none());
	}

	#[test]
	fn test_resolve_with_name_and_context() {
		let content = (1..=10).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
		let sm = ParsedSourceMap::parse(&single_mapping(&[0, 0, 4, 2, 0], Some(&content))).unwrap();

		let resolved = sm.resolve(1, 0, 3).unwrap().unwrap();
		assert_eq!(resolved.position.name.as_deref(), Some("render"));

		let context = resolved.context.unwrap();
		let numbers: Vec<_> = context.iter().map(|l| l.line_number).collect();
		assert_eq!(numbers, vec![2, 3, 4, 5, 6, 7, 8]);
		assert!(context.iter().filter(|l| l.is_target).all(|l| l.text == "line 5"));
		assert_eq!(context.iter().filter(|l| l.is_target).count(), 1);
	}

	#[test]
	fn test_missing_line_is_not_found() {
		let sm = ParsedSourceMap::parse(&single_mapping(&[0, 0, 0, 0], None)).unwrap();
		assert!(sm.lookup(2, 0).unwrap().is_none());
		assert!(sm.resolve(2, 0, 3).unwrap().is_none());
	}

	#[test]
	fn test_bad_source_index() {
		let sm = ParsedSourceMap::parse(&single_mapping(&[0, 3, 0, 0], None)).unwrap();
		assert!(matches!(
			sm.lookup(1, 0),
			Err(SymbolicateError::InvalidSourceIndex(3))
		));
	}

	#[test]
	fn test_extract_context_middle() {
		let source = "line 1\nline 2\nline 3\nline 4\nline 5\nline 6\nline 7";

		let context = extract_context(source, 4, 2);
		let texts: Vec<_> = context.iter().map(|l| l.text.as_str()).collect();
		assert_eq!(texts, vec!["line 2", "line 3", "line 4", "line 5", "line 6"]);
		assert!(context[2].is_target);
	}

	#[test]
	fn test_extract_context_at_edges() {
		let source = "line 1\nline 2\nline 3";

		let start = extract_context(source, 1, 3);
		assert_eq!(start.len(), 3);
		assert!(start[0].is_target);

		let end = extract_context(source, 3, 1);
		assert_eq!(end.iter().map(|l| l.line_number).collect::<Vec<_>>(), vec![2, 3]);

		assert!(extract_context(source, 4, 3).is_empty());
		assert!(extract_context(source, 0, 3).is_empty());
	}

	#[test]
	fn test_invalid_version() {
		let json = r#"{"version": 2, "sources": [], "names": [], "mappings": ""}"#;
		let result = ParsedSourceMap::parse(json);
		assert!(matches!(
			result,
			Err(SymbolicateError::InvalidSourceMapVersion(2))
		));
	}

	#[test]
	fn test_invalid_json() {
		assert!(matches!(
			ParsedSourceMap::parse("{not json"),
			Err(SymbolicateError::InvalidSourceMapJson(_))
		));
	}

	#[test]
	fn test_source_root_resolution() {
		let json = r#"{
			"version": 3,
			"sourceRoot": "src/",
			"sources": ["index.ts"],
			"names": [],
			"mappings": "AAAA"
		}"#;
		let sm = ParsedSourceMap::parse(json).unwrap();

		let pos = sm.lookup(1, 0).unwrap().unwrap();
		assert_eq!(pos.source, "src/index.ts");
	}

	#[test]
	fn test_resolved_location_wire_format() {
		let sm = ParsedSourceMap::parse(&single_mapping(&[0, 0, 4, 2], Some("a\nb\nc\nd\ne"))).unwrap();
		let value = serde_json::to_value(sm.resolve(1, 0, 1).unwrap().unwrap()).unwrap();
		assert_eq!(value["source"], "src/index.ts");
		assert_eq!(value["line"], 5);
		assert_eq!(value["context"][1]["isTarget"], true);
		assert_eq!(value["context"][1]["lineNumber"], 5);
	}
}
