// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

pub use bounds::{LexBound, ScoreBound};

pub mod algebra;
mod bounds;
pub mod range;

use ember_core::GlobPattern;
use ember_keyspace::{Keyspace, SortedSet, Value};
use rand::prelude::*;

use crate::set::scan_page;

/// Condition flags accepted by `ZADD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZaddOptions {
	pub if_absent: bool,
	pub if_present: bool,
	/// Only apply updates that raise the score.
	pub greater_only: bool,
	/// Only apply updates that lower the score.
	pub less_only: bool,
	/// Count changed members instead of added ones.
	pub count_changed: bool,
}

/// `ZADD`. Returns the number of added members (or added + changed under
/// `CH`).
pub fn zadd(
	ks: &Keyspace,
	key: &[u8],
	options: ZaddOptions,
	pairs: &[(f64, Vec<u8>)],
) -> crate::Result<i64> {
	if (options.if_absent && options.if_present)
		|| (options.greater_only && options.less_only)
		|| (options.if_absent && (options.greater_only || options.less_only))
	{
		return Err(ember_core::CommandError::Syntax);
	}
	ks.mutate_or_insert(
		key,
		|| Value::Zset(SortedSet::new()),
		|value| {
			let zset = value.as_zset_mut()?;
			let mut touched = 0i64;
			for (score, member) in pairs {
				let current = zset.score(member);
				let apply = match current {
					None => !options.if_present,
					Some(existing) => {
						!options.if_absent
							&& !(options.greater_only && *score <= existing)
							&& !(options.less_only && *score >= existing)
					}
				};
				if !apply {
					continue;
				}
				let added = zset.insert(member.clone(), *score)?;
				if added {
					touched += 1;
				} else if options.count_changed && current != Some(*score) {
					touched += 1;
				}
			}
			Ok(touched)
		},
	)
}

/// `ZINCRBY`.
pub fn zincrby(ks: &Keyspace, key: &[u8], delta: f64, member: &[u8]) -> crate::Result<f64> {
	ks.mutate_or_insert(
		key,
		|| Value::Zset(SortedSet::new()),
		|value| value.as_zset_mut()?.increment(member, delta),
	)
}

/// `ZREM`. Returns how many members were removed.
pub fn zrem(ks: &Keyspace, key: &[u8], members: &[Vec<u8>]) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let zset = value.as_zset_mut()?;
			Ok(members.iter().filter(|member| zset.remove(member).is_some()).count() as i64)
		})?
		.unwrap_or(0))
}

pub fn zscore(ks: &Keyspace, key: &[u8], member: &[u8]) -> crate::Result<Option<f64>> {
	Ok(ks.read(key, |value| Ok(value.as_zset()?.score(member)))?.flatten())
}

/// `ZMSCORE`. Missing members yield explicit per-element nulls.
pub fn zmscore(
	ks: &Keyspace,
	key: &[u8],
	members: &[Vec<u8>],
) -> crate::Result<Vec<Option<f64>>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			Ok(members.iter().map(|member| zset.score(member)).collect())
		})?
		.unwrap_or_else(|| vec![None; members.len()]))
}

pub fn zcard(ks: &Keyspace, key: &[u8]) -> crate::Result<i64> {
	Ok(ks.read(key, |value| Ok(value.as_zset()?.len() as i64))?.unwrap_or(0))
}

/// `ZPOPMIN`/`ZPOPMAX`. Pops up to `count` elements preserving the sorted
/// view's tie-breaker. If an individual removal fails midway, the pairs
/// already popped are returned.
pub fn zpop(
	ks: &Keyspace,
	key: &[u8],
	lowest: bool,
	count: usize,
) -> crate::Result<Vec<(Vec<u8>, f64)>> {
	Ok(ks
		.mutate(key, |value| {
			let zset = value.as_zset_mut()?;
			let mut popped = Vec::with_capacity(count.min(zset.len()));
			for _ in 0..count {
				let target = if lowest { zset.first() } else { zset.last() };
				let (member, score) = match target {
					None => break,
					Some((member, score)) => (member.clone(), score),
				};
				if zset.remove(&member).is_none() {
					// Index out of step with the score map; return
					// what was already produced.
					break;
				}
				popped.push((member, score));
			}
			Ok(popped)
		})?
		.unwrap_or_default())
}

/// `ZRANDMEMBER`. Positive count: distinct members up to the cardinality.
/// Negative: exactly `|count|` draws with replacement.
pub fn zrandmember(
	ks: &Keyspace,
	key: &[u8],
	count: Option<i64>,
) -> crate::Result<Vec<(Vec<u8>, f64)>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			let all: Vec<(Vec<u8>, f64)> =
				zset.iter().map(|(member, score)| (member.clone(), score)).collect();
			let mut rng = rand::rng();
			Ok(match count {
				None => all.choose(&mut rng).map(|pair| vec![pair.clone()]).unwrap_or_default(),
				Some(n) if n >= 0 => {
					all.choose_multiple(&mut rng, n as usize).cloned().collect()
				}
				Some(n) => (0..n.unsigned_abs())
					.filter_map(|_| all.choose(&mut rng).cloned())
					.collect(),
			})
		})?
		.unwrap_or_default())
}

/// `ZSCAN`. Cursor over the sorted view; returns `(member, score)` pairs.
pub fn zscan(
	ks: &Keyspace,
	key: &[u8],
	cursor: u64,
	pattern: Option<&GlobPattern>,
	count: usize,
) -> crate::Result<(u64, Vec<(Vec<u8>, f64)>)> {
	let view: Vec<(Vec<u8>, f64)> = ks
		.read(key, |value| {
			Ok(value
				.as_zset()?
				.iter()
				.map(|(member, score)| (member.clone(), score))
				.collect())
		})?
		.unwrap_or_default();
	let members: Vec<Vec<u8>> = view.iter().map(|(member, _)| member.clone()).collect();
	let (next, page) = scan_page(&members, cursor, count, |member| {
		pattern.is_none_or(|p| p.matches(member))
	});
	let pairs = page
		.into_iter()
		.map(|member| {
			let score = view
				.iter()
				.find(|(m, _)| *m == member)
				.map(|(_, s)| *s)
				.unwrap_or(0.0);
			(member, score)
		})
		.collect();
	Ok((next, pairs))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_core::CommandError;

	pub(crate) fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	pub(crate) fn seed(ks: &Keyspace, key: &[u8], pairs: &[(f64, &str)]) {
		let pairs: Vec<(f64, Vec<u8>)> =
			pairs.iter().map(|(s, m)| (*s, m.as_bytes().to_vec())).collect();
		zadd(ks, key, ZaddOptions::default(), &pairs).unwrap();
	}

	#[test]
	fn test_zadd_zscore_round_trip() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a")]);
		assert_eq!(zscore(&ks, b"z", b"a").unwrap(), Some(1.0));
		assert_eq!(zscore(&ks, b"z", b"zz").unwrap(), None);
		// Same member re-added keeps cardinality at one.
		seed(&ks, b"z", &[(1.0, "a")]);
		assert_eq!(zcard(&ks, b"z").unwrap(), 1);
	}

	#[test]
	fn test_zadd_flags() {
		let ks = keyspace();
		seed(&ks, b"z", &[(5.0, "m")]);

		let nx = ZaddOptions { if_absent: true, ..Default::default() };
		assert_eq!(zadd(&ks, b"z", nx, &[(9.0, b"m".to_vec())]).unwrap(), 0);
		assert_eq!(zscore(&ks, b"z", b"m").unwrap(), Some(5.0));

		let gt = ZaddOptions { greater_only: true, count_changed: true, ..Default::default() };
		assert_eq!(zadd(&ks, b"z", gt, &[(3.0, b"m".to_vec())]).unwrap(), 0);
		assert_eq!(zadd(&ks, b"z", gt, &[(8.0, b"m".to_vec())]).unwrap(), 1);
		assert_eq!(zscore(&ks, b"z", b"m").unwrap(), Some(8.0));

		let xx = ZaddOptions { if_present: true, ..Default::default() };
		assert_eq!(zadd(&ks, b"z", xx, &[(1.0, b"new".to_vec())]).unwrap(), 0);
		assert_eq!(zscore(&ks, b"z", b"new").unwrap(), None);

		let conflicting = ZaddOptions { if_absent: true, if_present: true, ..Default::default() };
		assert!(zadd(&ks, b"z", conflicting, &[(1.0, b"x".to_vec())]).is_err());
	}

	#[test]
	fn test_zrem_deletes_empty_key() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b")]);
		assert_eq!(zrem(&ks, b"z", &[b"a".to_vec(), b"zz".to_vec()]).unwrap(), 1);
		assert_eq!(zrem(&ks, b"z", &[b"b".to_vec()]).unwrap(), 1);
		assert!(!ks.contains(b"z"));
		assert_eq!(zrem(&ks, b"z", &[b"a".to_vec()]).unwrap(), 0);
	}

	#[test]
	fn test_zincrby_creates_at_zero() {
		let ks = keyspace();
		assert_eq!(zincrby(&ks, b"z", 2.5, b"m").unwrap(), 2.5);
		assert_eq!(zincrby(&ks, b"z", -1.5, b"m").unwrap(), 1.0);
	}

	#[test]
	fn test_zmscore_null_per_missing_member() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a")]);
		assert_eq!(
			zmscore(&ks, b"z", &[b"a".to_vec(), b"b".to_vec()]).unwrap(),
			vec![Some(1.0), None]
		);
		assert_eq!(
			zmscore(&ks, b"missing", &[b"a".to_vec()]).unwrap(),
			vec![None]
		);
	}

	#[test]
	fn test_zpop_preserves_tie_breaker() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "c"), (1.0, "a"), (2.0, "b")]);
		assert_eq!(
			zpop(&ks, b"z", true, 2).unwrap(),
			vec![(b"a".to_vec(), 1.0), (b"c".to_vec(), 1.0)]
		);
		assert_eq!(zpop(&ks, b"z", false, 5).unwrap(), vec![(b"b".to_vec(), 2.0)]);
		assert!(!ks.contains(b"z"));
	}

	#[test]
	fn test_zrandmember_counts() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
		assert_eq!(zrandmember(&ks, b"z", Some(2)).unwrap().len(), 2);
		assert_eq!(zrandmember(&ks, b"z", Some(9)).unwrap().len(), 3);
		assert_eq!(zrandmember(&ks, b"z", Some(-9)).unwrap().len(), 9);
		assert_eq!(zrandmember(&ks, b"missing", Some(3)).unwrap().len(), 0);
	}

	#[test]
	fn test_zscan_walks_sorted_view() {
		let ks = keyspace();
		let pairs: Vec<(f64, Vec<u8>)> =
			(0..15).map(|i| (i as f64, format!("m{i:02}").into_bytes())).collect();
		zadd(&ks, b"z", ZaddOptions::default(), &pairs).unwrap();
		let mut cursor = 0;
		let mut seen = Vec::new();
		loop {
			let (next, page) = zscan(&ks, b"z", cursor, None, 4).unwrap();
			seen.extend(page);
			cursor = next;
			if cursor == 0 {
				break;
			}
		}
		assert_eq!(seen.len(), 15);
		assert_eq!(seen[0].0, b"m00".to_vec());
		assert_eq!(seen[14], (b"m14".to_vec(), 14.0));
	}

	#[test]
	fn test_wrong_type() {
		let ks = keyspace();
		ks.insert(b"s", Value::Str(b"v".to_vec()));
		assert_eq!(
			zadd(&ks, b"s", ZaddOptions::default(), &[(1.0, b"m".to_vec())]).unwrap_err(),
			CommandError::WrongType
		);
		assert_eq!(zcard(&ks, b"s").unwrap_err(), CommandError::WrongType);
	}
}
