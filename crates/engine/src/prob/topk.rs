// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::CommandError;
use ember_keyspace::{Keyspace, TopK, Value};

use super::{already_exists, missing};

/// `TOPK.RESERVE key k [width depth decay]`.
pub fn reserve(
	ks: &Keyspace,
	key: &[u8],
	k: u64,
	dims: Option<(u64, u64, f64)>,
) -> crate::Result<()> {
	if k == 0 {
		return Err(CommandError::OutOfRange("TopK: invalid k".to_string()));
	}
	if ks.contains(key) {
		return Err(already_exists("TopK"));
	}
	let topk = match dims {
		None => TopK::with_defaults(k as usize),
		Some((width, depth, decay)) => {
			if width == 0 || depth == 0 || !(0.0 < decay && decay <= 1.0) {
				return Err(CommandError::OutOfRange(
					"TopK: invalid parameters".to_string(),
				));
			}
			TopK::new(k as usize, width as usize, depth as usize, decay)
		}
	};
	ks.insert(key, Value::TopK(topk));
	Ok(())
}

/// `TOPK.ADD key item [item ...]`. One slot per item: the leader it
/// expelled, if any.
pub fn add(ks: &Keyspace, key: &[u8], items: &[Vec<u8>]) -> crate::Result<Vec<Option<Vec<u8>>>> {
	ks.mutate(key, |value| {
		let topk = value.as_topk_mut()?;
		Ok(items.iter().map(|item| topk.add(item, 1)).collect())
	})?
	.ok_or_else(|| missing("TopK"))
}

/// `TOPK.INCRBY key item increment [item increment ...]`.
pub fn incrby(
	ks: &Keyspace,
	key: &[u8],
	pairs: &[(Vec<u8>, u64)],
) -> crate::Result<Vec<Option<Vec<u8>>>> {
	ks.mutate(key, |value| {
		let topk = value.as_topk_mut()?;
		Ok(pairs.iter().map(|(item, increment)| topk.add(item, *increment)).collect())
	})?
	.ok_or_else(|| missing("TopK"))
}

/// `TOPK.QUERY key item [item ...]`. Leader-list membership per item.
pub fn query(ks: &Keyspace, key: &[u8], items: &[Vec<u8>]) -> crate::Result<Vec<bool>> {
	ks.read(key, |value| {
		let topk = value.as_topk()?;
		Ok(items.iter().map(|item| topk.query(item)).collect())
	})?
	.ok_or_else(|| missing("TopK"))
}

/// `TOPK.COUNT key item [item ...]`. Estimated counts.
pub fn count(ks: &Keyspace, key: &[u8], items: &[Vec<u8>]) -> crate::Result<Vec<u64>> {
	ks.read(key, |value| {
		let topk = value.as_topk()?;
		Ok(items.iter().map(|item| topk.count(item)).collect())
	})?
	.ok_or_else(|| missing("TopK"))
}

/// `TOPK.LIST key [WITHCOUNT]`. Heaviest first.
pub fn list(ks: &Keyspace, key: &[u8]) -> crate::Result<Vec<(Vec<u8>, u64)>> {
	ks.read(key, |value| Ok(value.as_topk()?.list()))?.ok_or_else(|| missing("TopK"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	#[test]
	fn test_reserve_add_query() {
		let ks = keyspace();
		reserve(&ks, b"t", 2, None).unwrap();
		for _ in 0..100 {
			add(&ks, b"t", &[b"hot".to_vec()]).unwrap();
		}
		add(&ks, b"t", &[b"cold".to_vec()]).unwrap();
		assert_eq!(
			query(&ks, b"t", &[b"hot".to_vec(), b"never".to_vec()]).unwrap(),
			vec![true, false]
		);
		let counts = count(&ks, b"t", &[b"hot".to_vec()]).unwrap();
		assert!(counts[0] >= 90);
		assert_eq!(list(&ks, b"t").unwrap()[0].0, b"hot".to_vec());
	}

	#[test]
	fn test_operations_require_reserve() {
		let ks = keyspace();
		assert!(add(&ks, b"ghost", &[b"x".to_vec()]).is_err());
		assert!(query(&ks, b"ghost", &[b"x".to_vec()]).is_err());
		assert!(list(&ks, b"ghost").is_err());
	}

	#[test]
	fn test_incrby() {
		let ks = keyspace();
		reserve(&ks, b"t", 3, Some((64, 4, 0.9))).unwrap();
		incrby(&ks, b"t", &[(b"a".to_vec(), 50)]).unwrap();
		let counts = count(&ks, b"t", &[b"a".to_vec()]).unwrap();
		assert!(counts[0] >= 45);
	}

	#[test]
	fn test_validation() {
		let ks = keyspace();
		assert!(reserve(&ks, b"t", 0, None).is_err());
		assert!(reserve(&ks, b"t", 2, Some((0, 4, 0.9))).is_err());
		assert!(reserve(&ks, b"t", 2, Some((8, 4, 1.5))).is_err());
		reserve(&ks, b"t", 2, None).unwrap();
		assert!(reserve(&ks, b"t", 2, None).is_err());
	}
}
