// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::{CommandError, parse};
use ember_keyspace::{InsertPolicy, Keyspace, Value};

/// Options accepted by `SET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
	pub if_absent: bool,
	pub if_present: bool,
	/// Absolute expiry deadline in epoch milliseconds. Callers resolve
	/// relative forms (`EX`/`PX`) before the write so propagation can use
	/// the same deadline.
	pub expire_at_ms: Option<u64>,
}

/// `SET`. Returns false when an NX/XX condition suppressed the write.
pub fn set(ks: &Keyspace, key: &[u8], value: Vec<u8>, options: SetOptions) -> crate::Result<bool> {
	if options.if_absent && options.if_present {
		return Err(CommandError::Syntax);
	}
	let policy = if options.if_absent {
		InsertPolicy::IfAbsent
	} else if options.if_present {
		InsertPolicy::IfPresent
	} else {
		InsertPolicy::Always
	};
	let applied = ks.insert_with(key, Value::Str(value), policy);
	if applied && let Some(deadline) = options.expire_at_ms {
		ks.expire_at(key, deadline);
	}
	Ok(applied)
}

pub fn get(ks: &Keyspace, key: &[u8]) -> crate::Result<Option<Vec<u8>>> {
	ks.read(key, |value| Ok(value.as_str()?.clone()))
}

pub fn mget(ks: &Keyspace, keys: &[Vec<u8>]) -> Vec<Option<Vec<u8>>> {
	// Per spec a wrong-typed key yields a null slot, not an error.
	keys.iter()
		.map(|key| ks.read(key, |value| Ok(value.as_str()?.clone())).unwrap_or(None))
		.collect()
}

pub fn mset(ks: &Keyspace, pairs: &[(Vec<u8>, Vec<u8>)]) {
	for (key, value) in pairs {
		ks.insert(key, Value::Str(value.clone()));
	}
}

/// `APPEND`. Returns the resulting length.
pub fn append(ks: &Keyspace, key: &[u8], suffix: &[u8]) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Str(Vec::new()),
		|value| {
			let bytes = value.as_str_mut()?;
			bytes.extend_from_slice(suffix);
			Ok(bytes.len() as i64)
		},
	)
}

pub fn strlen(ks: &Keyspace, key: &[u8]) -> crate::Result<i64> {
	Ok(ks.read(key, |value| Ok(value.as_str()?.len() as i64))?.unwrap_or(0))
}

/// Shared by `INCR`, `DECR`, `INCRBY`, `DECRBY`. Atomic per key: the parse,
/// add and write-back all happen under one shard writer lock.
pub fn incr_by(ks: &Keyspace, key: &[u8], delta: i64) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Str(b"0".to_vec()),
		|value| {
			let bytes = value.as_str_mut()?;
			let current = parse::parse_i64(bytes)?;
			let next = current.checked_add(delta).ok_or(CommandError::IntegerOverflow)?;
			*bytes = next.to_string().into_bytes();
			Ok(next)
		},
	)
}

pub fn incr_by_float(ks: &Keyspace, key: &[u8], delta: f64) -> crate::Result<f64> {
	ks.mutate_or_insert(
		key,
		|| Value::Str(b"0".to_vec()),
		|value| {
			let bytes = value.as_str_mut()?;
			let current = parse::parse_f64(bytes)?;
			let next = current + delta;
			if next.is_nan() || next.is_infinite() {
				return Err(CommandError::Other(
					"increment would produce NaN or Infinity".to_string(),
				));
			}
			*bytes = ember_core::format_f64(next).into_bytes();
			Ok(next)
		},
	)
}

/// `GETRANGE`. Inclusive on both ends, negatives from the tail, clamped.
pub fn getrange(ks: &Keyspace, key: &[u8], start: i64, stop: i64) -> crate::Result<Vec<u8>> {
	Ok(ks
		.read(key, |value| {
			let bytes = value.as_str()?;
			let (from, to) = clamp_range(start, stop, bytes.len());
			Ok(bytes[from..to].to_vec())
		})?
		.unwrap_or_default())
}

/// `SETRANGE`. Zero-pads the gap when the offset lies past the end.
pub fn setrange(ks: &Keyspace, key: &[u8], offset: u64, patch: &[u8]) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Str(Vec::new()),
		|value| {
			let bytes = value.as_str_mut()?;
			let offset = offset as usize;
			let end = offset + patch.len();
			if bytes.len() < end {
				bytes.resize(end, 0);
			}
			bytes[offset..end].copy_from_slice(patch);
			Ok(bytes.len() as i64)
		},
	)
}

/// Resolves an inclusive `(start, stop)` pair with negative indices into a
/// half-open byte range clamped to `len`.
pub(crate) fn clamp_range(start: i64, stop: i64, len: usize) -> (usize, usize) {
	let len = len as i64;
	let mut from = if start < 0 { len + start } else { start };
	let mut to = if stop < 0 { len + stop } else { stop };
	from = from.max(0);
	to = to.min(len - 1);
	if from > to || len == 0 {
		return (0, 0);
	}
	(from as usize, to as usize + 1)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_keyspace::now_ms;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	#[test]
	fn test_set_get_round_trip() {
		let ks = keyspace();
		assert!(set(&ks, b"k", b"v".to_vec(), SetOptions::default()).unwrap());
		assert_eq!(get(&ks, b"k").unwrap(), Some(b"v".to_vec()));
		assert_eq!(get(&ks, b"missing").unwrap(), None);
	}

	#[test]
	fn test_set_nx_xx() {
		let ks = keyspace();
		let nx = SetOptions {
			if_absent: true,
			..Default::default()
		};
		let xx = SetOptions {
			if_present: true,
			..Default::default()
		};
		assert!(!set(&ks, b"k", b"a".to_vec(), xx).unwrap());
		assert!(set(&ks, b"k", b"a".to_vec(), nx).unwrap());
		assert!(!set(&ks, b"k", b"b".to_vec(), nx).unwrap());
		assert!(set(&ks, b"k", b"b".to_vec(), xx).unwrap());
		assert_eq!(get(&ks, b"k").unwrap(), Some(b"b".to_vec()));
	}

	#[test]
	fn test_set_overwrites_other_variant() {
		let ks = keyspace();
		ks.insert(b"k", Value::List([b"x".to_vec()].into()));
		assert!(set(&ks, b"k", b"v".to_vec(), SetOptions::default()).unwrap());
		assert_eq!(ks.type_name(b"k"), Some("string"));
	}

	#[test]
	fn test_get_wrong_type() {
		let ks = keyspace();
		ks.insert(b"k", Value::List([b"x".to_vec()].into()));
		assert_eq!(get(&ks, b"k").unwrap_err(), CommandError::WrongType);
	}

	#[test]
	fn test_incr_family() {
		let ks = keyspace();
		assert_eq!(incr_by(&ks, b"n", 1).unwrap(), 1);
		assert_eq!(incr_by(&ks, b"n", 10).unwrap(), 11);
		assert_eq!(incr_by(&ks, b"n", -12).unwrap(), -1);
		ks.insert(b"s", Value::Str(b"abc".to_vec()));
		assert_eq!(incr_by(&ks, b"s", 1).unwrap_err(), CommandError::NotInteger);
		ks.insert(b"max", Value::Str(i64::MAX.to_string().into_bytes()));
		assert_eq!(incr_by(&ks, b"max", 1).unwrap_err(), CommandError::IntegerOverflow);
	}

	#[test]
	fn test_incr_by_float() {
		let ks = keyspace();
		assert_eq!(incr_by_float(&ks, b"f", 0.5).unwrap(), 0.5);
		assert_eq!(incr_by_float(&ks, b"f", 2.0).unwrap(), 2.5);
		assert_eq!(get(&ks, b"f").unwrap(), Some(b"2.5".to_vec()));
	}

	#[test]
	fn test_append_creates_and_extends() {
		let ks = keyspace();
		assert_eq!(append(&ks, b"k", b"Hello").unwrap(), 5);
		assert_eq!(append(&ks, b"k", b" World").unwrap(), 11);
		assert_eq!(get(&ks, b"k").unwrap(), Some(b"Hello World".to_vec()));
		assert_eq!(strlen(&ks, b"k").unwrap(), 11);
		assert_eq!(strlen(&ks, b"missing").unwrap(), 0);
	}

	#[test]
	fn test_getrange_bounds() {
		let ks = keyspace();
		ks.insert(b"k", Value::Str(b"This is a string".to_vec()));
		assert_eq!(getrange(&ks, b"k", 0, 3).unwrap(), b"This".to_vec());
		assert_eq!(getrange(&ks, b"k", -3, -1).unwrap(), b"ing".to_vec());
		assert_eq!(getrange(&ks, b"k", 0, -1).unwrap(), b"This is a string".to_vec());
		assert_eq!(getrange(&ks, b"k", 10, 100).unwrap(), b"string".to_vec());
		assert_eq!(getrange(&ks, b"k", 5, 2).unwrap(), Vec::<u8>::new());
		assert_eq!(getrange(&ks, b"missing", 0, -1).unwrap(), Vec::<u8>::new());
	}

	#[test]
	fn test_setrange_zero_pads() {
		let ks = keyspace();
		assert_eq!(setrange(&ks, b"k", 5, b"hi").unwrap(), 7);
		assert_eq!(get(&ks, b"k").unwrap(), Some(b"\x00\x00\x00\x00\x00hi".to_vec()));
		assert_eq!(setrange(&ks, b"k", 0, b"ab").unwrap(), 7);
	}

	#[test]
	fn test_mset_mget() {
		let ks = keyspace();
		mset(&ks, &[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);
		ks.insert(b"l", Value::List([b"x".to_vec()].into()));
		assert_eq!(
			mget(&ks, &[b"a".to_vec(), b"missing".to_vec(), b"l".to_vec(), b"b".to_vec()]),
			vec![Some(b"1".to_vec()), None, None, Some(b"2".to_vec())]
		);
	}

	#[test]
	fn test_set_with_expiry() {
		let ks = keyspace();
		let options = SetOptions {
			expire_at_ms: Some(now_ms() + 60_000),
			..Default::default()
		};
		set(&ks, b"k", b"v".to_vec(), options).unwrap();
		assert!(ks.ttl_ms(b"k").unwrap().is_some());
	}
}
