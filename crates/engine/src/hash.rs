// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use ember_core::{CommandError, GlobPattern, parse};
use ember_keyspace::{Keyspace, Value};
use rand::prelude::*;

use crate::set::scan_page;

/// `HSET` with any number of field/value pairs. Returns how many fields
/// were newly created (updates do not count).
pub fn hset(ks: &Keyspace, key: &[u8], pairs: &[(Vec<u8>, Vec<u8>)]) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Hash(HashMap::new()),
		|value| {
			let hash = value.as_hash_mut()?;
			let mut created = 0;
			for (field, item) in pairs {
				if hash.insert(field.clone(), item.clone()).is_none() {
					created += 1;
				}
			}
			Ok(created)
		},
	)
}

/// `HSETNX`. Returns true when the field was created.
pub fn hsetnx(ks: &Keyspace, key: &[u8], field: &[u8], item: Vec<u8>) -> crate::Result<bool> {
	ks.mutate_or_insert(
		key,
		|| Value::Hash(HashMap::new()),
		|value| {
			let hash = value.as_hash_mut()?;
			if hash.contains_key(field) {
				Ok(false)
			} else {
				hash.insert(field.to_vec(), item);
				Ok(true)
			}
		},
	)
}

pub fn hget(ks: &Keyspace, key: &[u8], field: &[u8]) -> crate::Result<Option<Vec<u8>>> {
	Ok(ks.read(key, |value| Ok(value.as_hash()?.get(field).cloned()))?.flatten())
}

pub fn hmget(ks: &Keyspace, key: &[u8], fields: &[Vec<u8>]) -> crate::Result<Vec<Option<Vec<u8>>>> {
	Ok(ks
		.read(key, |value| {
			let hash = value.as_hash()?;
			Ok(fields.iter().map(|field| hash.get(field.as_slice()).cloned()).collect())
		})?
		.unwrap_or_else(|| vec![None; fields.len()]))
}

/// `HGETALL`. Pairs sorted by field; field order is not observable state,
/// so the stable rendering costs nothing semantically.
pub fn hgetall(ks: &Keyspace, key: &[u8]) -> crate::Result<Vec<(Vec<u8>, Vec<u8>)>> {
	let mut pairs = ks
		.read(key, |value| {
			Ok(value
				.as_hash()?
				.iter()
				.map(|(field, item)| (field.clone(), item.clone()))
				.collect::<Vec<_>>())
		})?
		.unwrap_or_default();
	pairs.sort();
	Ok(pairs)
}

pub fn hdel(ks: &Keyspace, key: &[u8], fields: &[Vec<u8>]) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let hash = value.as_hash_mut()?;
			Ok(fields.iter().filter(|field| hash.remove(field.as_slice()).is_some()).count()
				as i64)
		})?
		.unwrap_or(0))
}

pub fn hexists(ks: &Keyspace, key: &[u8], field: &[u8]) -> crate::Result<bool> {
	Ok(ks.read(key, |value| Ok(value.as_hash()?.contains_key(field)))?.unwrap_or(false))
}

pub fn hlen(ks: &Keyspace, key: &[u8]) -> crate::Result<i64> {
	Ok(ks.read(key, |value| Ok(value.as_hash()?.len() as i64))?.unwrap_or(0))
}

pub fn hstrlen(ks: &Keyspace, key: &[u8], field: &[u8]) -> crate::Result<i64> {
	Ok(ks
		.read(key, |value| {
			Ok(value.as_hash()?.get(field).map(|item| item.len() as i64).unwrap_or(0))
		})?
		.unwrap_or(0))
}

pub fn hkeys(ks: &Keyspace, key: &[u8]) -> crate::Result<Vec<Vec<u8>>> {
	Ok(hgetall(ks, key)?.into_iter().map(|(field, _)| field).collect())
}

pub fn hvals(ks: &Keyspace, key: &[u8]) -> crate::Result<Vec<Vec<u8>>> {
	Ok(hgetall(ks, key)?.into_iter().map(|(_, item)| item).collect())
}

/// `HRANDFIELD`. Same count contract as `SRANDMEMBER`.
pub fn hrandfield(ks: &Keyspace, key: &[u8], count: Option<i64>) -> crate::Result<Vec<Vec<u8>>> {
	Ok(ks
		.read(key, |value| {
			let hash = value.as_hash()?;
			let fields: Vec<&Vec<u8>> = hash.keys().collect();
			let mut rng = rand::rng();
			Ok(match count {
				None => fields
					.choose(&mut rng)
					.map(|f| vec![(*f).clone()])
					.unwrap_or_default(),
				Some(n) if n >= 0 => fields
					.choose_multiple(&mut rng, n as usize)
					.map(|f| (*f).clone())
					.collect(),
				Some(n) => (0..n.unsigned_abs())
					.filter_map(|_| fields.choose(&mut rng).map(|f| (*f).clone()))
					.collect(),
			})
		})?
		.unwrap_or_default())
}

/// `HINCRBY`. Atomic per key; fails on non-integer current values.
pub fn hincrby(ks: &Keyspace, key: &[u8], field: &[u8], delta: i64) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Hash(HashMap::new()),
		|value| {
			let hash = value.as_hash_mut()?;
			let current = match hash.get(field) {
				None => 0,
				Some(item) => parse::parse_i64(item)?,
			};
			let next = current.checked_add(delta).ok_or(CommandError::IntegerOverflow)?;
			hash.insert(field.to_vec(), next.to_string().into_bytes());
			Ok(next)
		},
	)
}

pub fn hincrbyfloat(ks: &Keyspace, key: &[u8], field: &[u8], delta: f64) -> crate::Result<f64> {
	ks.mutate_or_insert(
		key,
		|| Value::Hash(HashMap::new()),
		|value| {
			let hash = value.as_hash_mut()?;
			let current = match hash.get(field) {
				None => 0.0,
				Some(item) => parse::parse_f64(item)?,
			};
			let next = current + delta;
			if next.is_nan() || next.is_infinite() {
				return Err(CommandError::Other(
					"increment would produce NaN or Infinity".to_string(),
				));
			}
			hash.insert(field.to_vec(), ember_core::format_f64(next).into_bytes());
			Ok(next)
		},
	)
}

/// `HDELIF`. Deletes the field only when its current value equals
/// `expected`, as one compare-and-swap under the key's writer lock.
pub fn hdelif(ks: &Keyspace, key: &[u8], field: &[u8], expected: &[u8]) -> crate::Result<bool> {
	Ok(ks
		.mutate(key, |value| {
			let hash = value.as_hash_mut()?;
			match hash.get(field) {
				Some(current) if current == expected => {
					hash.remove(field);
					Ok(true)
				}
				_ => Ok(false),
			}
		})?
		.unwrap_or(false))
}

/// `HINCRBYFLOATIF`. Applies the increment only when the current
/// stringified value equals `expected`. Returns the new value when applied.
pub fn hincrbyfloatif(
	ks: &Keyspace,
	key: &[u8],
	field: &[u8],
	delta: f64,
	expected: &[u8],
) -> crate::Result<Option<f64>> {
	Ok(ks
		.mutate(key, |value| {
			let hash = value.as_hash_mut()?;
			match hash.get(field) {
				Some(current) if current == expected => {
					let base = parse::parse_f64(current)?;
					let next = base + delta;
					if next.is_nan() || next.is_infinite() {
						return Err(CommandError::Other(
							"increment would produce NaN or Infinity"
								.to_string(),
						));
					}
					hash.insert(
						field.to_vec(),
						ember_core::format_f64(next).into_bytes(),
					);
					Ok(Some(next))
				}
				_ => Ok(None),
			}
		})?
		.flatten())
}

/// `HSCAN`. Cursor over the sorted field snapshot; returns field/value
/// pairs.
pub fn hscan(
	ks: &Keyspace,
	key: &[u8],
	cursor: u64,
	pattern: Option<&GlobPattern>,
	count: usize,
) -> crate::Result<(u64, Vec<(Vec<u8>, Vec<u8>)>)> {
	let all = hgetall(ks, key)?;
	let fields: Vec<Vec<u8>> = all.iter().map(|(field, _)| field.clone()).collect();
	let (next, page) = scan_page(&fields, cursor, count, |field| {
		pattern.is_none_or(|p| p.matches(field))
	});
	let by_field: HashMap<&Vec<u8>, &Vec<u8>> =
		all.iter().map(|(field, item)| (field, item)).collect();
	let pairs = page
		.into_iter()
		.filter_map(|field| {
			by_field.get(&field).map(|item| (field.clone(), (*item).clone()))
		})
		.collect();
	Ok((next, pairs))
}
