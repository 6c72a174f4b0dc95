// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::{CommandError, GlobPattern};
use ember_keyspace::{Keyspace, ScanPage, now_ms};

/// `DEL`/`UNLINK`. Returns how many keys existed.
pub fn del(ks: &Keyspace, keys: &[Vec<u8>]) -> i64 {
	keys.iter().filter(|key| ks.remove(key)).count() as i64
}

/// `EXISTS`. Counts repetitions, per the multi-key contract.
pub fn exists(ks: &Keyspace, keys: &[Vec<u8>]) -> i64 {
	keys.iter().filter(|key| ks.contains(key)).count() as i64
}

/// `TYPE`. "none" for missing keys.
pub fn type_name(ks: &Keyspace, key: &[u8]) -> &'static str {
	ks.type_name(key).unwrap_or("none")
}

pub fn keys(ks: &Keyspace, pattern: &GlobPattern) -> Vec<Vec<u8>> {
	let mut matched = ks.keys(pattern);
	matched.sort();
	matched
}

pub fn scan(ks: &Keyspace, cursor: u64, pattern: &GlobPattern, count: usize) -> ScanPage {
	ks.scan(cursor, pattern, count)
}

pub fn dbsize(ks: &Keyspace) -> i64 {
	ks.len() as i64
}

pub fn flushall(ks: &Keyspace) {
	ks.clear();
	tracing::info!("keyspace flushed");
}

/// `EXPIRE`/`PEXPIRE`: relative deadline. A non-positive duration deletes
/// the key immediately. Returns false when the key does not exist.
pub fn expire_in(ks: &Keyspace, key: &[u8], millis: i64) -> bool {
	if millis <= 0 {
		return ks.remove(key);
	}
	ks.expire_at(key, now_ms() + millis as u64)
}

/// `EXPIREAT`/`PEXPIREAT`: absolute epoch deadline.
pub fn expire_at(ks: &Keyspace, key: &[u8], deadline_ms: i64) -> bool {
	if deadline_ms <= now_ms() as i64 {
		return ks.remove(key);
	}
	ks.expire_at(key, deadline_ms as u64)
}

/// `TTL`/`PTTL` convention: -2 missing key, -1 no expiry, else remaining
/// time in the given unit.
pub fn ttl(ks: &Keyspace, key: &[u8], in_millis: bool) -> i64 {
	match ks.ttl_ms(key) {
		None => -2,
		Some(None) => -1,
		Some(Some(ms)) => {
			if in_millis {
				ms as i64
			} else {
				((ms as i64) + 999) / 1000
			}
		}
	}
}

pub fn persist(ks: &Keyspace, key: &[u8]) -> bool {
	ks.persist(key)
}

/// `RENAME`. Moves the entry, TTL included; the destination is
/// overwritten. Renaming a missing key is an error.
pub fn rename(ks: &Keyspace, source: &[u8], destination: &[u8]) -> crate::Result<()> {
	if source == destination {
		return if ks.contains(source) {
			Ok(())
		} else {
			Err(CommandError::Other("no such key".to_string()))
		};
	}
	match ks.take_entry(source) {
		None => Err(CommandError::Other("no such key".to_string())),
		Some(entry) => {
			ks.put_entry(destination, entry);
			Ok(())
		}
	}
}
