// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::CommandError;
use ember_keyspace::{CuckooFilter, Keyspace, Value};

use super::already_exists;

/// `CF.RESERVE key capacity`.
pub fn reserve(ks: &Keyspace, key: &[u8], capacity: u64) -> crate::Result<()> {
	if capacity == 0 {
		return Err(CommandError::OutOfRange("CF: invalid capacity".to_string()));
	}
	if ks.contains(key) {
		return Err(already_exists("CF"));
	}
	ks.insert(key, Value::Cuckoo(CuckooFilter::new(capacity)));
	Ok(())
}

/// `CF.ADD`. Auto-creates. A full filter answers false, not an error.
pub fn add(ks: &Keyspace, key: &[u8], element: &[u8]) -> crate::Result<bool> {
	ks.mutate_or_insert(
		key,
		|| Value::Cuckoo(CuckooFilter::with_defaults()),
		|value| Ok(value.as_cuckoo_mut()?.add(element)),
	)
}

/// `CF.ADDNX`. Adds only when not already present.
pub fn add_unless_exists(ks: &Keyspace, key: &[u8], element: &[u8]) -> crate::Result<bool> {
	ks.mutate_or_insert(
		key,
		|| Value::Cuckoo(CuckooFilter::with_defaults()),
		|value| Ok(value.as_cuckoo_mut()?.add_unless_exists(element)),
	)
}

/// `CF.EXISTS`. Missing keys answer false.
pub fn exists(ks: &Keyspace, key: &[u8], element: &[u8]) -> crate::Result<bool> {
	Ok(ks.read(key, |value| Ok(value.as_cuckoo()?.contains(element)))?.unwrap_or(false))
}

/// `CF.DEL`. Removes one copy; false when the element was not present.
pub fn del(ks: &Keyspace, key: &[u8], element: &[u8]) -> crate::Result<bool> {
	Ok(ks
		.mutate(key, |value| Ok(value.as_cuckoo_mut()?.remove(element)))?
		.unwrap_or(false))
}

/// `CF.COUNT`. Copies of the element's fingerprint.
pub fn count(ks: &Keyspace, key: &[u8], element: &[u8]) -> crate::Result<u64> {
	Ok(ks.read(key, |value| Ok(value.as_cuckoo()?.count(element)))?.unwrap_or(0))
}
