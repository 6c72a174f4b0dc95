// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashSet;

use ember_core::GlobPattern;
use ember_keyspace::{Keyspace, Value};
use rand::prelude::*;

/// `SADD`. Returns how many members were actually new.
pub fn sadd(ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> crate::Result<i64> {
	ks.mutate_or_insert(
		key,
		|| Value::Set(HashSet::new()),
		|value| {
			let set = value.as_set_mut()?;
			let mut added = 0;
			for member in members {
				if set.insert(member.clone()) {
					added += 1;
				}
			}
			Ok(added)
		},
	)
}

/// `SREM`. Returns how many members were removed.
pub fn srem(ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let set = value.as_set_mut()?;
			Ok(members.iter().filter(|member| set.remove(member.as_slice())).count() as i64)
		})?
		.unwrap_or(0))
}

/// `SMEMBERS`. Sorted lexicographically for a stable reply; set algebra
/// itself is order-independent.
pub fn smembers(ks: &Keyspace, key: &[u8]) -> crate::Result<Vec<Vec<u8>>> {
	let mut members = ks
		.read(key, |value| Ok(value.as_set()?.iter().cloned().collect::<Vec<_>>()))?
		.unwrap_or_default();
	members.sort();
	Ok(members)
}

pub fn scard(ks: &Keyspace, key: &[u8]) -> crate::Result<i64> {
	Ok(ks.read(key, |value| Ok(value.as_set()?.len() as i64))?.unwrap_or(0))
}

pub fn sismember(ks: &Keyspace, key: &[u8], member: &[u8]) -> crate::Result<bool> {
	Ok(ks.read(key, |value| Ok(value.as_set()?.contains(member)))?.unwrap_or(false))
}

pub fn smismember(ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> crate::Result<Vec<bool>> {
	Ok(ks
		.read(key, |value| {
			let set = value.as_set()?;
			Ok(members.iter().map(|member| set.contains(member.as_slice())).collect())
		})?
		.unwrap_or_else(|| vec![false; members.len()]))
}

/// `SPOP`. Uniformly random removal; `count` of `None` pops one.
pub fn spop(
	ks: &Keyspace,
	key: &[u8],
	count: Option<usize>,
) -> crate::Result<Vec<Vec<u8>>> {
	let wanted = count.unwrap_or(1);
	Ok(ks
		.mutate(key, |value| {
			let set = value.as_set_mut()?;
			let mut rng = rand::rng();
			let mut popped = Vec::with_capacity(wanted.min(set.len()));
			for _ in 0..wanted {
				if set.is_empty() {
					break;
				}
				let victim = set
					.iter()
					.nth(rng.random_range(0..set.len()))
					.cloned()
					.expect("index in range");
				set.remove(&victim);
				popped.push(victim);
			}
			Ok(popped)
		})?
		.unwrap_or_default())
}

/// `SRANDMEMBER`. Positive count: distinct members up to the cardinality.
/// Negative count: exactly `|count|` draws with replacement.
pub fn srandmember(ks: &Keyspace, key: &[u8], count: Option<i64>) -> crate::Result<Vec<Vec<u8>>> {
	Ok(ks
		.read(key, |value| {
			let set = value.as_set()?;
			let members: Vec<&Vec<u8>> = set.iter().collect();
			let mut rng = rand::rng();
			Ok(match count {
				None => members
					.choose(&mut rng)
					.map(|m| vec![(*m).clone()])
					.unwrap_or_default(),
				Some(n) if n >= 0 => {
					let mut sample: Vec<Vec<u8>> = members
						.choose_multiple(&mut rng, n as usize)
						.map(|m| (*m).clone())
						.collect();
					sample.shuffle(&mut rng);
					sample
				}
				Some(n) => (0..n.unsigned_abs())
					.filter_map(|_| members.choose(&mut rng).map(|m| (*m).clone()))
					.collect(),
			})
		})?
		.unwrap_or_default())
}

/// `SMOVE`. Returns false when the member was not in the source set.
pub fn smove(
	ks: &Keyspace,
	source: &[u8],
	destination: &[u8],
	member: &[u8],
) -> crate::Result<bool> {
	if source == destination {
		return sismember(ks, source, member);
	}
	// Validate the destination variant before mutating the source.
	if let Some(name) = ks.type_name(destination)
		&& name != "set"
	{
		return Err(ember_core::CommandError::WrongType);
	}
	let moved = ks
		.mutate(source, |value| Ok(value.as_set_mut()?.remove(member)))?
		.unwrap_or(false);
	if moved {
		sadd(ks, destination, &[member.to_vec()])?;
	}
	Ok(moved)
}

/// `SSCAN`. Cursor over the lexicographically sorted member snapshot.
pub fn sscan(
	ks: &Keyspace,
	key: &[u8],
	cursor: u64,
	pattern: Option<&GlobPattern>,
	count: usize,
) -> crate::Result<(u64, Vec<Vec<u8>>)> {
	let members = smembers(ks, key)?;
	Ok(scan_page(&members, cursor, count, |member| {
		pattern.is_none_or(|p| p.matches(member))
	}))
}

/// Shared cursor-paging over a sorted snapshot. The cursor is the rank
/// offset of the next element to examine; zero out means done.
pub(crate) fn scan_page(
	items: &[Vec<u8>],
	cursor: u64,
	count: usize,
	mut keep: impl FnMut(&[u8]) -> bool,
) -> (u64, Vec<Vec<u8>>) {
	let start = (cursor as usize).min(items.len());
	let count = count.max(1);
	let mut out = Vec::new();
	let mut index = start;
	while index < items.len() && index - start < count {
		if keep(&items[index]) {
			out.push(items[index].clone());
		}
		index += 1;
	}
	let next = if index >= items.len() { 0 } else { index as u64 };
	(next, out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algebra {
	Intersection,
	Union,
	Difference,
}

/// `SINTER`/`SUNION`/`SDIFF`. Missing keys act as empty sets; for the
/// difference, every key after the first is subtracted. The result is
/// sorted for reply stability.
pub fn algebra(ks: &Keyspace, op: Algebra, keys: &[Vec<u8>]) -> crate::Result<Vec<Vec<u8>>> {
	let mut sets = Vec::with_capacity(keys.len());
	for key in keys {
		let set = ks
			.read(key, |value| Ok(value.as_set()?.clone()))?
			.unwrap_or_default();
		sets.push(set);
	}
	let mut iter = sets.into_iter();
	let first = iter.next().unwrap_or_default();
	let result = match op {
		Algebra::Intersection => {
			iter.fold(first, |acc, set| acc.intersection(&set).cloned().collect())
		}
		Algebra::Union => iter.fold(first, |acc, set| acc.union(&set).cloned().collect()),
		Algebra::Difference => {
			iter.fold(first, |acc, set| acc.difference(&set).cloned().collect())
		}
	};
	let mut sorted: Vec<Vec<u8>> = result.into_iter().collect();
	sorted.sort();
	Ok(sorted)
}

/// `SINTERSTORE`/`SUNIONSTORE`/`SDIFFSTORE`. An empty result deletes the
/// destination. Returns the stored cardinality.
pub fn algebra_store(
	ks: &Keyspace,
	op: Algebra,
	destination: &[u8],
	keys: &[Vec<u8>],
) -> crate::Result<i64> {
	let members = algebra(ks, op, keys)?;
	let cardinality = members.len() as i64;
	if members.is_empty() {
		ks.remove(destination);
	} else {
		ks.insert(destination, Value::Set(members.into_iter().collect()));
	}
	Ok(cardinality)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_core::CommandError;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	fn members(values: &[&str]) -> Vec<Vec<u8>> {
		values.iter().map(|v| v.as_bytes().to_vec()).collect()
	}

	#[test]
	fn test_sadd_srem_counts() {
		let ks = keyspace();
		assert_eq!(sadd(&ks, b"s", &members(&["a", "b", "a"])).unwrap(), 2);
		assert_eq!(sadd(&ks, b"s", &members(&["b", "c"])).unwrap(), 1);
		assert_eq!(scard(&ks, b"s").unwrap(), 3);
		assert_eq!(srem(&ks, b"s", &members(&["a", "zz"])).unwrap(), 1);
		assert_eq!(srem(&ks, b"missing", &members(&["a"])).unwrap(), 0);
	}

	#[test]
	fn test_last_removal_deletes_key() {
		let ks = keyspace();
		sadd(&ks, b"s", &members(&["only"])).unwrap();
		srem(&ks, b"s", &members(&["only"])).unwrap();
		assert!(!ks.contains(b"s"));
		assert_eq!(ks.type_name(b"s"), None);
	}

	#[test]
	fn test_membership() {
		let ks = keyspace();
		sadd(&ks, b"s", &members(&["a", "b"])).unwrap();
		assert!(sismember(&ks, b"s", b"a").unwrap());
		assert!(!sismember(&ks, b"s", b"z").unwrap());
		assert_eq!(
			smismember(&ks, b"s", &members(&["a", "z", "b"])).unwrap(),
			vec![true, false, true]
		);
		assert_eq!(
			smismember(&ks, b"missing", &members(&["a"])).unwrap(),
			vec![false]
		);
	}

	#[test]
	fn test_spop_drains_uniformly() {
		let ks = keyspace();
		sadd(&ks, b"s", &members(&["a", "b", "c"])).unwrap();
		let single = spop(&ks, b"s", None).unwrap();
		assert_eq!(single.len(), 1);
		let rest = spop(&ks, b"s", Some(10)).unwrap();
		assert_eq!(rest.len(), 2);
		assert!(!ks.contains(b"s"));
		assert!(spop(&ks, b"s", None).unwrap().is_empty());
	}

	#[test]
	fn test_srandmember_counts() {
		let ks = keyspace();
		sadd(&ks, b"s", &members(&["a", "b", "c"])).unwrap();
		assert_eq!(srandmember(&ks, b"s", Some(2)).unwrap().len(), 2);
		assert_eq!(srandmember(&ks, b"s", Some(10)).unwrap().len(), 3);
		assert_eq!(srandmember(&ks, b"s", Some(-7)).unwrap().len(), 7);
		assert_eq!(scard(&ks, b"s").unwrap(), 3);
	}

	#[test]
	fn test_algebra() {
		let ks = keyspace();
		sadd(&ks, b"a", &members(&["1", "2", "3"])).unwrap();
		sadd(&ks, b"b", &members(&["2", "3", "4"])).unwrap();

		assert_eq!(
			algebra(&ks, Algebra::Intersection, &members(&["a", "b"])).unwrap(),
			members(&["2", "3"])
		);
		assert_eq!(
			algebra(&ks, Algebra::Union, &members(&["a", "b"])).unwrap(),
			members(&["1", "2", "3", "4"])
		);
		assert_eq!(
			algebra(&ks, Algebra::Difference, &members(&["a", "b"])).unwrap(),
			members(&["1"])
		);
		// Missing keys are empty sets.
		assert_eq!(
			algebra(&ks, Algebra::Intersection, &members(&["a", "nope"])).unwrap(),
			Vec::<Vec<u8>>::new()
		);
	}

	#[test]
	fn test_algebra_store_empty_result_deletes_destination() {
		let ks = keyspace();
		sadd(&ks, b"a", &members(&["1"])).unwrap();
		sadd(&ks, b"dst", &members(&["stale"])).unwrap();
		let stored =
			algebra_store(&ks, Algebra::Intersection, b"dst", &members(&["a", "nope"]))
				.unwrap();
		assert_eq!(stored, 0);
		assert!(!ks.contains(b"dst"));

		let stored = algebra_store(&ks, Algebra::Union, b"dst", &members(&["a"])).unwrap();
		assert_eq!(stored, 1);
		assert_eq!(smembers(&ks, b"dst").unwrap(), members(&["1"]));
	}

	#[test]
	fn test_smove() {
		let ks = keyspace();
		sadd(&ks, b"src", &members(&["m", "n"])).unwrap();
		assert!(smove(&ks, b"src", b"dst", b"m").unwrap());
		assert!(!smove(&ks, b"src", b"dst", b"zz").unwrap());
		assert!(sismember(&ks, b"dst", b"m").unwrap());
		assert!(!sismember(&ks, b"src", b"m").unwrap());
	}

	#[test]
	fn test_sscan_pages_cover_all() {
		let ks = keyspace();
		let all: Vec<Vec<u8>> =
			(0..25).map(|i| format!("m{i:02}").into_bytes()).collect();
		sadd(&ks, b"s", &all).unwrap();
		let mut cursor = 0;
		let mut seen = Vec::new();
		loop {
			let (next, page) = sscan(&ks, b"s", cursor, None, 7).unwrap();
			seen.extend(page);
			cursor = next;
			if cursor == 0 {
				break;
			}
		}
		assert_eq!(seen, all);
	}

	#[test]
	fn test_wrong_type() {
		let ks = keyspace();
		ks.insert(b"s", Value::Str(b"v".to_vec()));
		assert_eq!(
			sadd(&ks, b"s", &members(&["x"])).unwrap_err(),
			CommandError::WrongType
		);
		assert_eq!(
			algebra(&ks, Algebra::Union, &members(&["s"])).unwrap_err(),
			CommandError::WrongType
		);
	}
}
