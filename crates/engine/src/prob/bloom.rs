// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::CommandError;
use ember_keyspace::{BloomFilter, Keyspace, Value};

use super::already_exists;

/// `BF.RESERVE key error_rate capacity`.
pub fn reserve(ks: &Keyspace, key: &[u8], error_rate: f64, capacity: u64) -> crate::Result<()> {
	if !(0.0..1.0).contains(&error_rate) || error_rate <= 0.0 {
		return Err(CommandError::OutOfRange(
			"(0 < error rate range < 1)".to_string(),
		));
	}
	if capacity == 0 {
		return Err(CommandError::OutOfRange("(capacity should be larger than 0)".to_string()));
	}
	if ks.contains(key) {
		return Err(already_exists("BF"));
	}
	ks.insert(key, Value::Bloom(BloomFilter::new(capacity, error_rate)));
	Ok(())
}

/// `BF.ADD`/`BF.MADD`. Auto-creates with default sizing. One bool per
/// element: true when the element was (probably) new.
pub fn add(ks: &Keyspace, key: &[u8], elements: &[Vec<u8>]) -> crate::Result<Vec<bool>> {
	ks.mutate_or_insert(
		key,
		|| Value::Bloom(BloomFilter::with_defaults()),
		|value| {
			let bloom = value.as_bloom_mut()?;
			Ok(elements.iter().map(|element| bloom.add(element)).collect())
		},
	)
}

/// `BF.EXISTS`/`BF.MEXISTS`. Missing keys answer all-false.
pub fn exists(ks: &Keyspace, key: &[u8], elements: &[Vec<u8>]) -> crate::Result<Vec<bool>> {
	Ok(ks
		.read(key, |value| {
			let bloom = value.as_bloom()?;
			Ok(elements.iter().map(|element| bloom.contains(element)).collect())
		})?
		.unwrap_or_else(|| vec![false; elements.len()]))
}

/// `BF.CARD`. Zero for a missing key.
pub fn card(ks: &Keyspace, key: &[u8]) -> crate::Result<u64> {
	Ok(ks.read(key, |value| Ok(value.as_bloom()?.cardinality()))?.unwrap_or(0))
}

/// `BF.INFO` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomInfo {
	pub capacity: u64,
	pub size_bytes: usize,
	pub inserted: u64,
	pub error_rate: f64,
}

pub fn info(ks: &Keyspace, key: &[u8]) -> crate::Result<BloomInfo> {
	ks.read(key, |value| {
		let bloom = value.as_bloom()?;
		Ok(BloomInfo {
			capacity: bloom.capacity(),
			size_bytes: bloom.size_bytes(),
			inserted: bloom.cardinality(),
			error_rate: bloom.error_rate(),
		})
	})?
	.ok_or_else(|| super::missing("BF"))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn keyspace() -> Keyspace {
		Keyspace::with_shards(4)
	}

	#[test]
	fn test_reserve_add_exists() {
		let ks = keyspace();
		reserve(&ks, b"f", 0.01, 1_000).unwrap();
		assert_eq!(
			add(&ks, b"f", &[b"a".to_vec(), b"b".to_vec(), b"a".to_vec()]).unwrap(),
			vec![true, true, false]
		);
		assert_eq!(
			exists(&ks, b"f", &[b"a".to_vec(), b"zz".to_vec()]).unwrap(),
			vec![true, false]
		);
		assert_eq!(card(&ks, b"f").unwrap(), 2);
	}

	#[test]
	fn test_reserve_validation() {
		let ks = keyspace();
		assert!(reserve(&ks, b"f", 0.0, 100).is_err());
		assert!(reserve(&ks, b"f", 1.5, 100).is_err());
		assert!(reserve(&ks, b"f", 0.01, 0).is_err());
		reserve(&ks, b"f", 0.01, 100).unwrap();
		assert!(reserve(&ks, b"f", 0.01, 100).is_err());
	}

	#[test]
	fn test_add_auto_creates() {
		let ks = keyspace();
		assert_eq!(add(&ks, b"f", &[b"x".to_vec()]).unwrap(), vec![true]);
		assert_eq!(ks.type_name(b"f"), Some("bloomfilter"));
	}

	#[test]
	fn test_missing_key_behaviors() {
		let ks = keyspace();
		assert_eq!(exists(&ks, b"ghost", &[b"x".to_vec()]).unwrap(), vec![false]);
		assert_eq!(card(&ks, b"ghost").unwrap(), 0);
		assert!(info(&ks, b"ghost").is_err());
	}

	#[test]
	fn test_info() {
		let ks = keyspace();
		reserve(&ks, b"f", 0.01, 500).unwrap();
		add(&ks, b"f", &[b"x".to_vec()]).unwrap();
		let info = info(&ks, b"f").unwrap();
		assert_eq!(info.capacity, 500);
		assert_eq!(info.inserted, 1);
		assert!(info.size_bytes > 0);
	}
}
