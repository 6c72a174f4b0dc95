// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::{CommandError, parse};
use ember_keyspace::{Keyspace, Value};

/// Field geometry: signedness, width in bits, absolute bit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
	pub signed: bool,
	pub width: u32,
	pub offset: u64,
}

impl FieldSpec {
	/// Parses `i<n>`/`u<n>` plus an offset token, where a `#` prefix
	/// multiplies the offset by the field width.
	pub fn parse(kind: &[u8], offset: &[u8]) -> Result<Self, CommandError> {
		let (signed, digits) = match kind.split_first() {
			Some((b'i', rest)) => (true, rest),
			Some((b'u', rest)) => (false, rest),
			_ => return Err(CommandError::Other("invalid bitfield type".to_string())),
		};
		let width = parse::parse_u64(digits)
			.map_err(|_| CommandError::Other("invalid bitfield type".to_string()))?
			as u32;
		let max = if signed { 64 } else { 63 };
		if width == 0 || width > max {
			return Err(CommandError::Other(
				"invalid bitfield type; use something like i16 u8; note that u64 is not supported"
					.to_string(),
			));
		}
		let (scaled, digits) = match offset.split_first() {
			Some((b'#', rest)) => (true, rest),
			_ => (false, offset),
		};
		let base = parse::parse_u64(digits)
			.map_err(|_| CommandError::Other("bit offset is not an integer or out of range".to_string()))?;
		let offset = if scaled { base * width as u64 } else { base };
		Ok(Self { signed, width, offset })
	}

	fn min(&self) -> i64 {
		if self.signed {
			if self.width == 64 { i64::MIN } else { -(1i64 << (self.width - 1)) }
		} else {
			0
		}
	}

	fn max(&self) -> i64 {
		if self.signed {
			if self.width == 64 { i64::MAX } else { (1i64 << (self.width - 1)) - 1 }
		} else {
			((1u64 << self.width) - 1) as i64
		}
	}
}

/// Overflow policy for `SET`/`INCRBY` sub-operations. The policy applies to
/// the sub-operations that follow it; saturation is the starting default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
	Wrap,
	#[default]
	Sat,
	Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubOp {
	Overflow(Overflow),
	Get(FieldSpec),
	Set(FieldSpec, i64),
	IncrBy(FieldSpec, i64),
}

impl SubOp {
	fn is_write(&self) -> bool {
		matches!(self, SubOp::Set(..) | SubOp::IncrBy(..))
	}
}

/// Parses the sub-operation list of `BITFIELD`. With `read_only` set, any
/// mutating sub-op is rejected (`BITFIELD_RO`).
pub fn parse_ops(args: &[Vec<u8>], read_only: bool) -> Result<Vec<SubOp>, CommandError> {
	let mut ops = Vec::new();
	let mut index = 0;
	while index < args.len() {
		let word = args[index].to_ascii_uppercase();
		match word.as_slice() {
			b"GET" => {
				let [kind, offset] = take::<2>(args, index)?;
				ops.push(SubOp::Get(FieldSpec::parse(kind, offset)?));
				index += 3;
			}
			b"SET" => {
				let [kind, offset, value] = take::<3>(args, index)?;
				let spec = FieldSpec::parse(kind, offset)?;
				ops.push(SubOp::Set(spec, parse::parse_i64(value)?));
				index += 4;
			}
			b"INCRBY" => {
				let [kind, offset, delta] = take::<3>(args, index)?;
				let spec = FieldSpec::parse(kind, offset)?;
				ops.push(SubOp::IncrBy(spec, parse::parse_i64(delta)?));
				index += 4;
			}
			b"OVERFLOW" => {
				let [mode] = take::<1>(args, index)?;
				let mode = match mode.to_ascii_uppercase().as_slice() {
					b"WRAP" => Overflow::Wrap,
					b"SAT" => Overflow::Sat,
					b"FAIL" => Overflow::Fail,
					_ => {
						return Err(CommandError::Other(
							"invalid OVERFLOW type".to_string(),
						));
					}
				};
				ops.push(SubOp::Overflow(mode));
				index += 2;
			}
			_ => return Err(CommandError::Syntax),
		}
	}
	if read_only && ops.iter().any(SubOp::is_write) {
		return Err(CommandError::Other(
			"BITFIELD_RO only supports the GET subcommand".to_string(),
		));
	}
	Ok(ops)
}

/// The `N` operand tokens following the keyword at `at`.
fn take<const N: usize>(args: &[Vec<u8>], at: usize) -> Result<[&[u8]; N], CommandError> {
	let mut out: [&[u8]; N] = [&[]; N];
	for (i, slot) in out.iter_mut().enumerate() {
		*slot = args.get(at + 1 + i).ok_or(CommandError::Syntax)?;
	}
	Ok(out)
}

/// Executes a `BITFIELD` program. One result slot per `GET`/`SET`/`INCRBY`;
/// `None` marks a `FAIL`-mode overflow.
pub fn bitfield(
	ks: &Keyspace,
	key: &[u8],
	ops: &[SubOp],
) -> crate::Result<Vec<Option<i64>>> {
	if !ops.iter().any(SubOp::is_write) {
		// Pure reads leave a missing key absent.
		let results = ks.read(key, |value| {
			let bytes = value.as_bitmap()?;
			Ok(run(&mut bytes.clone(), ops))
		})?;
		return Ok(results.unwrap_or_else(|| run(&mut Vec::new(), ops)));
	}
	ks.mutate_or_insert(
		key,
		|| Value::Bitmap(Vec::new()),
		|value| Ok(run(value.as_bitmap_mut()?, ops)),
	)
}

fn run(bytes: &mut Vec<u8>, ops: &[SubOp]) -> Vec<Option<i64>> {
	let mut overflow = Overflow::default();
	let mut results = Vec::new();
	for op in ops {
		match op {
			SubOp::Overflow(mode) => overflow = *mode,
			SubOp::Get(spec) => results.push(Some(read_field(bytes, spec))),
			SubOp::Set(spec, value) => {
				let previous = read_field(bytes, spec);
				match clamp(*value, spec, overflow) {
					None => results.push(None),
					Some(value) => {
						write_field(bytes, spec, value);
						results.push(Some(previous));
					}
				}
			}
			SubOp::IncrBy(spec, delta) => {
				let current = read_field(bytes, spec);
				match apply_delta(current, *delta, spec, overflow) {
					None => results.push(None),
					Some(next) => {
						write_field(bytes, spec, next);
						results.push(Some(next));
					}
				}
			}
		}
	}
	results
}

fn clamp(value: i64, spec: &FieldSpec, overflow: Overflow) -> Option<i64> {
	if value >= spec.min() && value <= spec.max() {
		return Some(value);
	}
	match overflow {
		Overflow::Fail => None,
		Overflow::Sat => Some(if value < spec.min() { spec.min() } else { spec.max() }),
		Overflow::Wrap => Some(wrap(value as i128, spec)),
	}
}

fn apply_delta(current: i64, delta: i64, spec: &FieldSpec, overflow: Overflow) -> Option<i64> {
	let wide = current as i128 + delta as i128;
	if wide >= spec.min() as i128 && wide <= spec.max() as i128 {
		return Some(wide as i64);
	}
	match overflow {
		Overflow::Fail => None,
		Overflow::Sat => Some(if wide < spec.min() as i128 { spec.min() } else { spec.max() }),
		Overflow::Wrap => Some(wrap(wide, spec)),
	}
}

fn wrap(value: i128, spec: &FieldSpec) -> i64 {
	let modulus = 1i128 << spec.width;
	let wrapped = value.rem_euclid(modulus);
	if spec.signed && wrapped > spec.max() as i128 {
		(wrapped - modulus) as i64
	} else {
		wrapped as i64
	}
}

/// Reads the field as an i64 (sign-extended when signed). Bits past the
/// buffer read as zero.
fn read_field(bytes: &[u8], spec: &FieldSpec) -> i64 {
	let mut raw: u64 = 0;
	for i in 0..spec.width as u64 {
		let offset = spec.offset + i;
		let (index, mask) = ((offset / 8) as usize, 1u8 << (7 - (offset % 8) as u8));
		let bit = bytes.get(index).map(|byte| byte & mask != 0).unwrap_or(false);
		raw = (raw << 1) | bit as u64;
	}
	if spec.signed && spec.width < 64 && raw & (1u64 << (spec.width - 1)) != 0 {
		(raw | (u64::MAX << spec.width)) as i64
	} else {
		raw as i64
	}
}

fn write_field(bytes: &mut Vec<u8>, spec: &FieldSpec, value: i64) {
	let last_byte = ((spec.offset + spec.width as u64 - 1) / 8) as usize;
	if bytes.len() <= last_byte {
		bytes.resize(last_byte + 1, 0);
	}
	let raw = value as u64;
	for i in 0..spec.width as u64 {
		let offset = spec.offset + i;
		let (index, mask) = ((offset / 8) as usize, 1u8 << (7 - (offset % 8) as u8));
		let bit = raw & (1u64 << (spec.width as u64 - 1 - i)) != 0;
		if bit {
			bytes[index] |= mask;
		} else {
			bytes[index] &= !mask;
		}
	}
}
