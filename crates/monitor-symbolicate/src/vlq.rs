// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Base64 VLQ (Variable-Length Quantity) codec for source map mappings.
//!
//! Each Base64 digit carries five value bits and a continuation bit (bit 5).
//! Digits are accumulated little-endian until one without the continuation bit
//! ends the value. The lowest bit of the result is the sign.

use crate::error::{Result, SymbolicateError};

/// Base64 character set used in VLQ encoding.
const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const CONTINUATION_BIT: u8 = 0b10_0000;
const VALUE_MASK: u8 = 0b01_1111;

/// Decode a Base64 character to its 6-bit value.
fn decode_char(ch: u8) -> Result<u8> {
	BASE64_CHARS
		.iter()
		.position(|&c| c == ch)
		.map(|pos| pos as u8)
		.ok_or(SymbolicateError::InvalidVlqChar(ch as char))
}

/// Decode a VLQ-encoded segment into its signed values.
pub fn decode_vlq_segment(segment: &str) -> Result<Vec<i64>> {
	let mut values = Vec::new();
	let mut accumulated = 0u64;
	let mut shift = 0u32;
	let mut pending = false;

	for ch in segment.bytes() {
		let digit = decode_char(ch)?;
		let digit_value = digit & VALUE_MASK;

		if shift > 60 || (shift == 60 && digit_value > 0b1111) {
			return Err(SymbolicateError::VlqOverflow(segment.to_string()));
		}

		accumulated |= u64::from(digit_value) << shift;
		shift += 5;
		pending = digit & CONTINUATION_BIT != 0;

		if !pending {
			let magnitude = (accumulated >> 1) as i64;
			values.push(if accumulated & 1 != 0 {
				-magnitude
			} else {
				magnitude
			});
			accumulated = 0;
			shift = 0;
		}
	}

	if pending {
		return Err(SymbolicateError::TruncatedVlq(segment.to_string()));
	}

	Ok(values)
}

/// Append the VLQ encoding of `value` to `out`.
///
/// `i64::MIN` has no positive counterpart and is encoded as `-i64::MAX`.
pub fn encode_vlq(value: i64, out: &mut String) {
	let magnitude = value.unsigned_abs().min(i64::MAX as u64);
	let mut remaining = (magnitude << 1) | u64::from(value < 0);

	loop {
		let mut digit = (remaining & u64::from(VALUE_MASK)) as u8;
		remaining >>= 5;
		if remaining > 0 {
			digit |= CONTINUATION_BIT;
		}
		out.push(BASE64_CHARS[digit as usize] as char);
		if remaining == 0 {
			break;
		}
	}
}

/// Encode a list of signed values as one segment.
pub fn encode_vlq_segment(values: &[i64]) -> String {
	let mut out = String::new();
	for &value in values {
		encode_vlq(value, &mut out);
	}
	out
}

/// A single decoded mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
	/// Line in the generated file (1-indexed, as reported in stack traces).
	pub generated_line: u32,
	/// Column in the generated file (0-indexed).
	pub generated_column: u32,
	/// Index into the sources array.
	pub source_index: u32,
	/// Line in the original file (1-indexed).
	pub original_line: u32,
	/// Column in the original file (0-indexed).
	pub original_column: u32,
	/// Optional index into the names array.
	pub name_index: Option<u32>,
}

/// Decoded mappings in table order.
#[derive(Debug, Clone, Default)]
pub struct DecodedMappings {
	/// Mappings ordered by generated line, then by position within the line.
	mappings: Vec<Mapping>,
}

impl DecodedMappings {
	pub fn new() -> Self {
		Self {
			mappings: Vec::new(),
		}
	}

	pub fn add(&mut self, mapping: Mapping) {
		self.mappings.push(mapping);
	}

	/// Find the mapping on `line` whose generated column is nearest to `column`.
	///
	/// Distance is absolute, so a mapping after the column can win over one
	/// before it. Equal distances resolve to the mapping that appears first.
	pub fn find(&self, line: u32, column: u32) -> Option<&Mapping> {
		let line_start = self
			.mappings
			.partition_point(|m| m.generated_line < line);
		let line_end = self
			.mappings
			.partition_point(|m| m.generated_line <= line);

		self.mappings[line_start..line_end]
			.iter()
			.min_by_key(|m| m.generated_column.abs_diff(column))
	}

	pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
		self.mappings.iter()
	}

	pub fn len(&self) -> usize {
		self.mappings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mappings.is_empty()
	}
}

fn to_u32(value: i64, line: u32, field: &'static str) -> Result<u32> {
	u32::try_from(value).map_err(|_| SymbolicateError::NegativeMapping { line, field })
}

fn accumulate(total: &mut i64, delta: i64, line: u32, field: &'static str) -> Result<()> {
	*total = total
		.checked_add(delta)
		.ok_or(SymbolicateError::MappingOverflow { line, field })?;
	Ok(())
}

/// Decode a `mappings` string into structured form.
///
/// Lines are separated by `;` and segments by `,`. The generated column
/// restarts at zero on every line; source index, original line, original
/// column and name index accumulate across the whole string. One-field
/// segments only advance the generated column and yield no mapping.
pub fn decode_vlq_mappings(mappings: &str) -> Result<DecodedMappings> {
	let mut result = DecodedMappings::new();

	let mut source = 0i64;
	let mut original_line = 0i64;
	let mut original_column = 0i64;
	let mut name = 0i64;

	for (line_idx, line) in mappings.split(';').enumerate() {
		let generated_line = line_idx as u32 + 1;
		let mut generated_column = 0i64;

		for segment in line.split(',') {
			if segment.is_empty() {
				continue;
			}

			let values = decode_vlq_segment(segment)?;

			match values.len() {
				1 => {
					accumulate(&mut generated_column, values[0], generated_line, "generated column")?;
				}
				4 | 5 => {
					accumulate(&mut generated_column, values[0], generated_line, "generated column")?;
					accumulate(&mut source, values[1], generated_line, "source index")?;
					accumulate(&mut original_line, values[2], generated_line, "original line")?;
					accumulate(&mut original_column, values[3], generated_line, "original column")?;

					// A name index outside the names table only loses the symbol.
					let name_index = match values.get(4) {
						Some(&delta) => {
							accumulate(&mut name, delta, generated_line, "name index")?;
							u32::try_from(name).ok()
						}
						None => None,
					};

					let original_line = to_u32(original_line, generated_line, "original line")?
						.checked_add(1)
						.ok_or(SymbolicateError::MappingOverflow {
							line: generated_line,
							field: "original line",
						})?;

					result.add(Mapping {
						generated_line,
						generated_column: to_u32(generated_column, generated_line, "generated column")?,
						source_index: to_u32(source, generated_line, "source index")?,
						original_line,
						original_column: to_u32(original_column, generated_line, "original column")?,
						name_index,
					});
				}
				fields => {
					return Err(SymbolicateError::InvalidSegment {
						segment: segment.to_string(),
						fields,
					});
				}
			}
		}
	}

	Ok(result)
}
