// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_keyspace::{HyperLogLog, Keyspace, Value};

/// `PFADD`. Returns true when any register moved, i.e. the estimate may
/// have changed.
pub fn pfadd(ks: &Keyspace, key: &[u8], elements: &[Vec<u8>]) -> crate::Result<bool> {
	ks.mutate_or_insert(
		key,
		|| Value::Hll(HyperLogLog::new()),
		|value| {
			let hll = value.as_hll_mut()?;
			let mut changed = false;
			for element in elements {
				changed |= hll.add(element);
			}
			Ok(changed)
		},
	)
}

/// `PFCOUNT`. One key reports its estimate; several keys report the
/// estimate of their union, computed in a scratch merge. Missing keys are
/// empty.
pub fn pfcount(ks: &Keyspace, keys: &[Vec<u8>]) -> crate::Result<u64> {
	let mut union = HyperLogLog::new();
	for key in keys {
		ks.read(key, |value| {
			union.merge(value.as_hll()?);
			Ok(())
		})?;
	}
	Ok(union.estimate())
}

/// `PFMERGE`. Folds every source into the destination, creating it when
/// missing.
pub fn pfmerge(ks: &Keyspace, destination: &[u8], sources: &[Vec<u8>]) -> crate::Result<()> {
	let mut merged = HyperLogLog::new();
	for source in sources {
		ks.read(source, |value| {
			merged.merge(value.as_hll()?);
			Ok(())
		})?;
	}
	ks.mutate_or_insert(
		destination,
		|| Value::Hll(HyperLogLog::new()),
		|value| {
			value.as_hll_mut()?.merge(&merged);
			Ok(())
		},
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_core::CommandError;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	fn elements(n: u32, prefix: &str) -> Vec<Vec<u8>> {
		(0..n).map(|i| format!("{prefix}-{i}").into_bytes()).collect()
	}

	#[test]
	fn test_pfadd_pfcount() {
		let ks = keyspace();
		assert!(pfadd(&ks, b"h", &elements(1_000, "e")).unwrap());
		assert!(!pfadd(&ks, b"h", &elements(1_000, "e")).unwrap());
		let count = pfcount(&ks, &[b"h".to_vec()]).unwrap();
		assert!((950..=1_050).contains(&count), "estimate {count}");
	}

	#[test]
	fn test_pfcount_union_and_missing_keys() {
		let ks = keyspace();
		pfadd(&ks, b"a", &elements(500, "left")).unwrap();
		pfadd(&ks, b"b", &elements(500, "right")).unwrap();
		let union = pfcount(&ks, &[b"a".to_vec(), b"b".to_vec(), b"ghost".to_vec()]).unwrap();
		assert!((950..=1_050).contains(&union), "estimate {union}");
		assert_eq!(pfcount(&ks, &[b"ghost".to_vec()]).unwrap(), 0);
	}

	#[test]
	fn test_pfmerge_creates_destination() {
		let ks = keyspace();
		pfadd(&ks, b"a", &elements(300, "x")).unwrap();
		pfmerge(&ks, b"dst", &[b"a".to_vec(), b"ghost".to_vec()]).unwrap();
		let count = pfcount(&ks, &[b"dst".to_vec()]).unwrap();
		assert!((285..=315).contains(&count), "estimate {count}");
	}

	#[test]
	fn test_wrong_type() {
		let ks = keyspace();
		ks.insert(b"s", Value::Str(b"v".to_vec()));
		assert_eq!(
			pfadd(&ks, b"s", &elements(1, "e")).unwrap_err(),
			CommandError::WrongType
		);
		assert_eq!(
			pfcount(&ks, &[b"s".to_vec()]).unwrap_err(),
			CommandError::WrongType
		);
	}
}
