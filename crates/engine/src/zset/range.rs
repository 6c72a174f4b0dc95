// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_keyspace::{Keyspace, SortedSet, Value};

use crate::string::clamp_range;
use crate::zset::{LexBound, ScoreBound};

fn view(zset: &SortedSet) -> Vec<(Vec<u8>, f64)> {
	zset.iter().map(|(member, score)| (member.clone(), score)).collect()
}

/// `ZRANGE`/`ZREVRANGE`: rank-based, negative indices from the end,
/// clamped. The reverse form reverses the whole total order, so ties still
/// break lex-ascending within the underlying view.
pub fn zrange(
	ks: &Keyspace,
	key: &[u8],
	start: i64,
	stop: i64,
	reverse: bool,
) -> crate::Result<Vec<(Vec<u8>, f64)>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			let mut ordered = view(zset);
			if reverse {
				ordered.reverse();
			}
			let (from, to) = clamp_range(start, stop, ordered.len());
			Ok(ordered[from..to].to_vec())
		})?
		.unwrap_or_default())
}

/// `ZRANGEBYSCORE`/`ZREVRANGEBYSCORE`.
pub fn zrangebyscore(
	ks: &Keyspace,
	key: &[u8],
	min: ScoreBound,
	max: ScoreBound,
	reverse: bool,
) -> crate::Result<Vec<(Vec<u8>, f64)>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			let mut matched: Vec<(Vec<u8>, f64)> = zset
				.range_by_score(min.value, min.exclusive, max.value, max.exclusive)
				.map(|(member, score)| (member.clone(), score))
				.collect();
			if reverse {
				matched.reverse();
			}
			Ok(matched)
		})?
		.unwrap_or_default())
}

pub fn zcount(ks: &Keyspace, key: &[u8], min: ScoreBound, max: ScoreBound) -> crate::Result<i64> {
	Ok(ks
		.read(key, |value| {
			Ok(value.as_zset()?.count_by_score(
				min.value,
				min.exclusive,
				max.value,
				max.exclusive,
			) as i64)
		})?
		.unwrap_or(0))
}

/// `ZRANGEBYLEX`/`ZREVRANGEBYLEX`. Bounds compare member bytes only; the
/// walk still follows the sorted view.
pub fn zrangebylex(
	ks: &Keyspace,
	key: &[u8],
	min: &LexBound,
	max: &LexBound,
	reverse: bool,
) -> crate::Result<Vec<Vec<u8>>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			let mut matched: Vec<Vec<u8>> = zset
				.iter()
				.filter(|(member, _)| {
					min.admits_from_below(member) && max.admits_from_above(member)
				})
				.map(|(member, _)| member.clone())
				.collect();
			if reverse {
				matched.reverse();
			}
			Ok(matched)
		})?
		.unwrap_or_default())
}

pub fn zlexcount(
	ks: &Keyspace,
	key: &[u8],
	min: &LexBound,
	max: &LexBound,
) -> crate::Result<i64> {
	Ok(zrangebylex(ks, key, min, max, false)?.len() as i64)
}

/// `ZRANK`/`ZREVRANK`. "Not found" is distinct from rank zero.
pub fn zrank(ks: &Keyspace, key: &[u8], member: &[u8], reverse: bool) -> crate::Result<Option<i64>> {
	Ok(ks
		.read(key, |value| {
			let zset = value.as_zset()?;
			Ok(zset.rank(member).map(|rank| {
				if reverse { (zset.len() - 1 - rank) as i64 } else { rank as i64 }
			}))
		})?
		.flatten())
}

/// `ZREMRANGEBYRANK`. Returns the removed count.
pub fn zremrangebyrank(ks: &Keyspace, key: &[u8], start: i64, stop: i64) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let zset = value.as_zset_mut()?;
			let ordered = view(zset);
			let (from, to) = clamp_range(start, stop, ordered.len());
			let mut removed = 0;
			for (member, _) in &ordered[from..to] {
				if zset.remove(member).is_some() {
					removed += 1;
				}
			}
			Ok(removed)
		})?
		.unwrap_or(0))
}

pub fn zremrangebyscore(
	ks: &Keyspace,
	key: &[u8],
	min: ScoreBound,
	max: ScoreBound,
) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let zset = value.as_zset_mut()?;
			let doomed: Vec<Vec<u8>> = zset
				.range_by_score(min.value, min.exclusive, max.value, max.exclusive)
				.map(|(member, _)| member.clone())
				.collect();
			let mut removed = 0;
			for member in doomed {
				if zset.remove(&member).is_some() {
					removed += 1;
				}
			}
			Ok(removed)
		})?
		.unwrap_or(0))
}

pub fn zremrangebylex(
	ks: &Keyspace,
	key: &[u8],
	min: &LexBound,
	max: &LexBound,
) -> crate::Result<i64> {
	Ok(ks
		.mutate(key, |value| {
			let zset = value.as_zset_mut()?;
			let doomed: Vec<Vec<u8>> = zset
				.iter()
				.filter(|(member, _)| {
					min.admits_from_below(member) && max.admits_from_above(member)
				})
				.map(|(member, _)| member.clone())
				.collect();
			let mut removed = 0;
			for member in doomed {
				if zset.remove(&member).is_some() {
					removed += 1;
				}
			}
			Ok(removed)
		})?
		.unwrap_or(0))
}

/// `ZRANGESTORE`. Materializes a rank range of `source` into
/// `destination`; an empty result deletes the destination.
pub fn zrangestore(
	ks: &Keyspace,
	destination: &[u8],
	source: &[u8],
	start: i64,
	stop: i64,
	reverse: bool,
) -> crate::Result<i64> {
	let pairs = zrange(ks, source, start, stop, reverse)?;
	let stored = pairs.len() as i64;
	if pairs.is_empty() {
		ks.remove(destination);
	} else {
		let mut zset = SortedSet::new();
		for (member, score) in pairs {
			zset.insert(member, score)?;
		}
		ks.insert(destination, Value::Zset(zset));
	}
	Ok(stored)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::zset::tests::{keyspace, seed};

	fn names(pairs: &[(Vec<u8>, f64)]) -> Vec<&str> {
		pairs.iter().map(|(m, _)| std::str::from_utf8(m).unwrap()).collect()
	}

	#[test]
	fn test_zrange_rank_semantics() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "c"), (1.0, "a"), (2.0, "b")]);
		let all = zrange(&ks, b"z", 0, -1, false).unwrap();
		assert_eq!(names(&all), vec!["a", "c", "b"]);
		assert_eq!(all[0].1, 1.0);

		assert_eq!(names(&zrange(&ks, b"z", 1, 1, false).unwrap()), vec!["c"]);
		assert_eq!(names(&zrange(&ks, b"z", -2, -1, false).unwrap()), vec!["c", "b"]);
		assert!(zrange(&ks, b"z", 5, 9, false).unwrap().is_empty());
		assert!(zrange(&ks, b"missing", 0, -1, false).unwrap().is_empty());
	}

	#[test]
	fn test_zrevrange_reverses_whole_order() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "c"), (1.0, "a"), (2.0, "b")]);
		assert_eq!(
			names(&zrange(&ks, b"z", 0, -1, true).unwrap()),
			vec!["b", "c", "a"]
		);
		assert_eq!(names(&zrange(&ks, b"z", 0, 0, true).unwrap()), vec!["b"]);
	}

	#[test]
	fn test_zrangebyscore_infinities_and_exclusive() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
		let all = zrangebyscore(
			&ks,
			b"z",
			ScoreBound { value: f64::NEG_INFINITY, exclusive: false },
			ScoreBound { value: f64::INFINITY, exclusive: false },
			false,
		)
		.unwrap();
		assert_eq!(names(&all), vec!["a", "b", "c"]);

		let open = zrangebyscore(
			&ks,
			b"z",
			ScoreBound { value: 1.0, exclusive: true },
			ScoreBound { value: 3.0, exclusive: true },
			false,
		)
		.unwrap();
		assert_eq!(names(&open), vec!["b"]);

		let reversed = zrangebyscore(
			&ks,
			b"z",
			ScoreBound { value: 1.0, exclusive: false },
			ScoreBound { value: 3.0, exclusive: false },
			true,
		)
		.unwrap();
		assert_eq!(names(&reversed), vec!["c", "b", "a"]);
	}

	#[test]
	fn test_zcount() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
		assert_eq!(
			zcount(
				&ks,
				b"z",
				ScoreBound { value: 1.0, exclusive: true },
				ScoreBound { value: f64::INFINITY, exclusive: false },
			)
			.unwrap(),
			2
		);
	}

	#[test]
	fn test_zrangebylex_inclusive_exclusive() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (1.0, "b"), (1.0, "c")]);
		let matched = zrangebylex(
			&ks,
			b"z",
			&LexBound::Inclusive(b"a".to_vec()),
			&LexBound::Exclusive(b"c".to_vec()),
			false,
		)
		.unwrap();
		assert_eq!(matched, vec![b"a".to_vec(), b"b".to_vec()]);

		let all = zrangebylex(&ks, b"z", &LexBound::NegInfinite, &LexBound::PosInfinite, false)
			.unwrap();
		assert_eq!(all.len(), 3);
		assert_eq!(
			zlexcount(&ks, b"z", &LexBound::Exclusive(b"a".to_vec()), &LexBound::PosInfinite)
				.unwrap(),
			2
		);
	}

	#[test]
	fn test_zrank_and_reverse() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
		assert_eq!(zrank(&ks, b"z", b"a", false).unwrap(), Some(0));
		assert_eq!(zrank(&ks, b"z", b"c", false).unwrap(), Some(2));
		assert_eq!(zrank(&ks, b"z", b"a", true).unwrap(), Some(2));
		assert_eq!(zrank(&ks, b"z", b"zz", false).unwrap(), None);
	}

	#[test]
	fn test_zremrange_families() {
		let ks = keyspace();
		seed(&ks, b"z", &[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d")]);
		assert_eq!(zremrangebyrank(&ks, b"z", 0, 1).unwrap(), 2);
		assert_eq!(
			names(&zrange(&ks, b"z", 0, -1, false).unwrap()),
			vec!["c", "d"]
		);

		assert_eq!(
			zremrangebyscore(
				&ks,
				b"z",
				ScoreBound { value: 4.0, exclusive: false },
				ScoreBound { value: f64::INFINITY, exclusive: false },
			)
			.unwrap(),
			1
		);
		assert_eq!(
			zremrangebylex(&ks, b"z", &LexBound::NegInfinite, &LexBound::PosInfinite)
				.unwrap(),
			1
		);
		assert!(!ks.contains(b"z"));
	}

	#[test]
	fn test_zrangestore() {
		let ks = keyspace();
		seed(&ks, b"src", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
		assert_eq!(zrangestore(&ks, b"dst", b"src", 0, 1, false).unwrap(), 2);
		assert_eq!(
			names(&zrange(&ks, b"dst", 0, -1, false).unwrap()),
			vec!["a", "b"]
		);

		seed(&ks, b"dst2", &[(9.0, "stale")]);
		assert_eq!(zrangestore(&ks, b"dst2", b"missing", 0, -1, false).unwrap(), 0);
		assert!(!ks.contains(b"dst2"));
	}
}
