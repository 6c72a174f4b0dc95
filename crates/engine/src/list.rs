// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::VecDeque;

use ember_core::CommandError;
use ember_keyspace::{Keyspace, Value};

use crate::string::clamp_range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
	Left,
	Right,
}

/// `LPUSH`/`RPUSH`. Values are inserted one at a time, so `LPUSH k a b`
/// leaves `b` at the head. Returns the resulting length.
pub fn push(ks: &Keyspace, key: &[u8], end: End, values: &[Vec<u8>]) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::List(VecDeque::new()),
		|value| {
			let list = value.as_list_mut()?;
			for item in values {
				match end {
					End::Left => list.push_front(item.clone()),
					End::Right => list.push_back(item.clone()),
				}
			}
			Ok(list.len() as i64)
		},
	)
}

/// `LPOP`/`RPOP`. `count` of `None` means the scalar single-pop form.
pub fn pop(
	ks: &Keyspace,
	key: &[u8],
	end: End,
	count: Option<usize>,
) -> crate::Result<Vec<Vec<u8>>> {
	let wanted = count.unwrap_or(1);
	Ok(ks
		.mutate(key, |value| {
			let list = value.as_list_mut()?;
			let mut popped = Vec::with_capacity(wanted.min(list.len()));
			for _ in 0..wanted {
				let item = match end {
					End::Left => list.pop_front(),
					End::Right => list.pop_back(),
				};
				match item {
					Some(item) => popped.push(item),
					None => break,
				}
			}
			Ok(popped)
		})?
		.unwrap_or_default())
}

pub fn llen(ks: &Keyspace, key: &[u8]) -> crate::Result<i64> {
	Ok(ks.read(key, |value| Ok(value.as_list()?.len() as i64))?.unwrap_or(0))
}

/// `LRANGE`. Inclusive on both ends; out-of-range indices clamp, and a
/// start past the stop yields the empty sequence.
pub fn lrange(ks: &Keyspace, key: &[u8], start: i64, stop: i64) -> crate::Result<Vec<Vec<u8>>> {
	Ok(ks
		.read(key, |value| {
			let list = value.as_list()?;
			let (from, to) = clamp_range(start, stop, list.len());
			Ok(list.iter().skip(from).take(to - from).cloned().collect())
		})?
		.unwrap_or_default())
}

pub fn lindex(ks: &Keyspace, key: &[u8], index: i64) -> crate::Result<Option<Vec<u8>>> {
	Ok(ks
		.read(key, |value| {
			let list = value.as_list()?;
			Ok(resolve_index(index, list.len()).and_then(|i| list.get(i).cloned()))
		})?
		.flatten())
}

/// `LSET`. Missing keys and out-of-range indices are command errors.
pub fn lset(ks: &Keyspace, key: &[u8], index: i64, item: Vec<u8>) -> crate::Result<()> {
	ks.mutate(key, |value| {
		let list = value.as_list_mut()?;
		let slot = resolve_index(index, list.len())
			.and_then(|i| list.get_mut(i))
			.ok_or(CommandError::IndexOutOfRange)?;
		*slot = item;
		Ok(())
	})?
	.ok_or(CommandError::Other("no such key".to_string()))
}

/// `LREM`. Positive count removes head-to-tail, negative tail-to-head,
/// zero removes every occurrence. Returns the removed count.
pub fn lrem(ks: &Keyspace, key: &[u8], count: i64, needle: &[u8]) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let list = value.as_list_mut()?;
			let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
			let mut removed = 0usize;
			if count >= 0 {
				let mut index = 0;
				while index < list.len() && removed < limit {
					if list[index] == needle {
						let _ = list.remove(index);
						removed += 1;
					} else {
						index += 1;
					}
				}
			} else {
				let mut index = list.len();
				while index > 0 && removed < limit {
					index -= 1;
					if list[index] == needle {
						let _ = list.remove(index);
						removed += 1;
					}
				}
			}
			Ok(removed as i64)
		})?
		.unwrap_or(0))
}

/// `LTRIM`. Trims to the inclusive range; an empty range deletes the key.
pub fn ltrim(ks: &Keyspace, key: &[u8], start: i64, stop: i64) -> crate::Result<()> {
	ks.mutate(key, |value| {
		let list = value.as_list_mut()?;
		let (from, to) = clamp_range(start, stop, list.len());
		list.drain(to..);
		list.drain(..from);
		Ok(())
	})?;
	Ok(())
}

/// `LINSERT`. Returns the new length, -1 when the pivot is absent, 0 when
/// the key does not exist.
pub fn linsert(
	ks: &Keyspace,
	key: &[u8],
	before: bool,
	pivot: &[u8],
	item: Vec<u8>,
) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let list = value.as_list_mut()?;
			match list.iter().position(|existing| existing == pivot) {
				None => Ok(-1),
				Some(position) => {
					let at = if before { position } else { position + 1 };
					list.insert(at, item.clone());
					Ok(list.len() as i64)
				}
			}
		})?
		.unwrap_or(0))
}

/// `LMOVE`. Pops from one end of `source` and pushes to one end of
/// `destination`; the rotation case (same key) runs under a single lock.
pub fn lmove(
	ks: &Keyspace,
	source: &[u8],
	destination: &[u8],
	from: End,
	to: End,
) -> crate::Result<Option<Vec<u8>>> {
	if source == destination {
		return Ok(ks
			.mutate(source, |value| {
				let list = value.as_list_mut()?;
				let item = match from {
					End::Left => list.pop_front(),
					End::Right => list.pop_back(),
				};
				if let Some(item) = item.clone() {
					match to {
						End::Left => list.push_front(item),
						End::Right => list.push_back(item),
					}
				}
				Ok(item)
			})?
			.flatten());
	}

	// Destination type is validated before the pop so a WRONGTYPE failure
	// cannot lose the element.
	if let Some(name) = ks.type_name(destination)
		&& name != "list"
	{
		return Err(CommandError::WrongType);
	}
	let popped = pop(ks, source, from, None)?;
	match popped.into_iter().next() {
		None => Ok(None),
		Some(item) => {
			push(ks, destination, to, std::slice::from_ref(&item))?;
			Ok(Some(item))
		}
	}
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
	let len = len as i64;
	let resolved = if index < 0 { len + index } else { index };
	(0..len).contains(&resolved).then_some(resolved as usize)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	fn items(values: &[&str]) -> Vec<Vec<u8>> {
		values.iter().map(|v| v.as_bytes().to_vec()).collect()
	}

	#[test]
	fn test_push_pop_both_ends() {
		let ks = keyspace();
		assert_eq!(push(&ks, b"l", End::Right, &items(&["a", "b"])).unwrap(), 2);
		assert_eq!(push(&ks, b"l", End::Left, &items(&["x", "y"])).unwrap(), 4);
		// y x a b
		assert_eq!(pop(&ks, b"l", End::Left, None).unwrap(), items(&["y"]));
		assert_eq!(pop(&ks, b"l", End::Right, Some(2)).unwrap(), items(&["b", "a"]));
		assert_eq!(pop(&ks, b"l", End::Right, Some(5)).unwrap(), items(&["x"]));
		assert!(!ks.contains(b"l"));
	}

	#[test]
	fn test_lrange_negative_and_clamped() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["a", "b", "c"])).unwrap();
		assert_eq!(lrange(&ks, b"l", 0, -1).unwrap(), items(&["a", "b", "c"]));
		assert_eq!(lrange(&ks, b"l", -2, -1).unwrap(), items(&["b", "c"]));
		assert_eq!(lrange(&ks, b"l", 1, 100).unwrap(), items(&["b", "c"]));
		assert_eq!(lrange(&ks, b"l", 2, 1).unwrap(), Vec::<Vec<u8>>::new());
		assert_eq!(lrange(&ks, b"missing", 0, -1).unwrap(), Vec::<Vec<u8>>::new());
	}

	#[test]
	fn test_lrange_single_element_tail() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["only"])).unwrap();
		assert_eq!(lrange(&ks, b"l", -1, -1).unwrap(), items(&["only"]));
	}

	#[test]
	fn test_lindex_and_lset() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["a", "b", "c"])).unwrap();
		assert_eq!(lindex(&ks, b"l", 0).unwrap(), Some(b"a".to_vec()));
		assert_eq!(lindex(&ks, b"l", -1).unwrap(), Some(b"c".to_vec()));
		assert_eq!(lindex(&ks, b"l", 9).unwrap(), None);

		lset(&ks, b"l", -1, b"C".to_vec()).unwrap();
		assert_eq!(lindex(&ks, b"l", 2).unwrap(), Some(b"C".to_vec()));
		assert_eq!(
			lset(&ks, b"l", 9, b"x".to_vec()).unwrap_err(),
			CommandError::IndexOutOfRange
		);
		assert!(lset(&ks, b"missing", 0, b"x".to_vec()).is_err());
	}

	#[test]
	fn test_lrem_directions() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["x", "a", "x", "b", "x"])).unwrap();
		assert_eq!(lrem(&ks, b"l", 2, b"x").unwrap(), 2);
		assert_eq!(lrange(&ks, b"l", 0, -1).unwrap(), items(&["a", "b", "x"]));

		push(&ks, b"l", End::Left, &items(&["x"])).unwrap();
		assert_eq!(lrem(&ks, b"l", -1, b"x").unwrap(), 1);
		assert_eq!(lrange(&ks, b"l", 0, -1).unwrap(), items(&["x", "a", "b"]));

		assert_eq!(lrem(&ks, b"l", 0, b"x").unwrap(), 1);
		assert_eq!(lrem(&ks, b"missing", 0, b"x").unwrap(), 0);
	}

	#[test]
	fn test_ltrim_and_empty_deletes() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["a", "b", "c", "d"])).unwrap();
		ltrim(&ks, b"l", 1, 2).unwrap();
		assert_eq!(lrange(&ks, b"l", 0, -1).unwrap(), items(&["b", "c"]));
		ltrim(&ks, b"l", 5, 10).unwrap();
		assert!(!ks.contains(b"l"));
	}

	#[test]
	fn test_linsert() {
		let ks = keyspace();
		push(&ks, b"l", End::Right, &items(&["a", "c"])).unwrap();
		assert_eq!(linsert(&ks, b"l", true, b"c", b"b".to_vec()).unwrap(), 3);
		assert_eq!(lrange(&ks, b"l", 0, -1).unwrap(), items(&["a", "b", "c"]));
		assert_eq!(linsert(&ks, b"l", false, b"zz", b"x".to_vec()).unwrap(), -1);
		assert_eq!(linsert(&ks, b"missing", true, b"a", b"x".to_vec()).unwrap(), 0);
	}

	#[test]
	fn test_lmove_between_keys_and_rotation() {
		let ks = keyspace();
		push(&ks, b"src", End::Right, &items(&["a", "b", "c"])).unwrap();
		assert_eq!(
			lmove(&ks, b"src", b"dst", End::Left, End::Right).unwrap(),
			Some(b"a".to_vec())
		);
		assert_eq!(lrange(&ks, b"dst", 0, -1).unwrap(), items(&["a"]));

		// Rotate in place.
		assert_eq!(
			lmove(&ks, b"src", b"src", End::Right, End::Left).unwrap(),
			Some(b"c".to_vec())
		);
		assert_eq!(lrange(&ks, b"src", 0, -1).unwrap(), items(&["c", "b"]));

		assert_eq!(lmove(&ks, b"missing", b"dst", End::Left, End::Left).unwrap(), None);
	}

	#[test]
	fn test_lmove_wrong_typed_destination_keeps_source() {
		let ks = keyspace();
		push(&ks, b"src", End::Right, &items(&["a"])).unwrap();
		ks.insert(b"dst", Value::Str(b"s".to_vec()));
		assert!(lmove(&ks, b"src", b"dst", End::Left, End::Right).is_err());
		assert_eq!(llen(&ks, b"src").unwrap(), 1);
	}

	#[test]
	fn test_wrong_type() {
		let ks = keyspace();
		ks.insert(b"s", Value::Str(b"v".to_vec()));
		assert_eq!(
			push(&ks, b"s", End::Left, &items(&["x"])).unwrap_err(),
			CommandError::WrongType
		);
		assert_eq!(llen(&ks, b"s").unwrap_err(), CommandError::WrongType);
	}
}
