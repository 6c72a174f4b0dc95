// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use ember_core::GlobPattern;
use parking_lot::RwLock;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::clock::now_ms;
use crate::value::{Entry, Value};

/// One page of a cursor scan over the keyspace.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
	/// Zero means the iteration completed.
	pub cursor: u64,
	pub keys: Vec<Vec<u8>>,
}

/// Presence condition for [`Keyspace::insert_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
	Always,
	IfAbsent,
	IfPresent,
}

/// Outcome of one defragmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DefragReport {
	pub shards_scanned: usize,
	pub shards_rebuilt: usize,
}

/// The global map from key to typed entry.
///
/// Keys are spread over power-of-two shards by xxh3; each shard is a
/// `RwLock<HashMap>`, so lookups take a shared lock and writers serialize
/// per shard only. The per-key version is folded into the entry and drawn
/// from one process-wide monotonic counter. Expiry is lazy on access, with
/// an auxiliary deadline index feeding the background sweeper.
pub struct Keyspace {
	shards: Box<[RwLock<HashMap<Vec<u8>, Entry>>]>,
	mask: u64,
	versions: AtomicU64,
	/// key -> absolute deadline in epoch ms; superset of live deadlines.
	deadlines: DashMap<Vec<u8>, u64>,
}

impl Default for Keyspace {
	fn default() -> Self {
		Self::new()
	}
}

impl Keyspace {
	pub fn new() -> Self {
		Self::with_shards((num_cpus::get() * 4).max(4))
	}

	pub fn with_shards(count: usize) -> Self {
		let count = count.next_power_of_two();
		let shards = (0..count)
			.map(|_| RwLock::new(HashMap::new()))
			.collect::<Vec<_>>()
			.into_boxed_slice();
		Self {
			shards,
			mask: count as u64 - 1,
			versions: AtomicU64::new(1),
			deadlines: DashMap::new(),
		}
	}

	fn shard(&self, key: &[u8]) -> &RwLock<HashMap<Vec<u8>, Entry>> {
		&self.shards[(xxh3_64(key) & self.mask) as usize]
	}

	fn next_version(&self) -> u64 {
		self.versions.fetch_add(1, Ordering::Relaxed)
	}

	/// Evicts the key if it is present and expired. Takes the shard writer
	/// lock only when there is something to evict.
	fn evict_if_expired(&self, key: &[u8], now: u64) {
		let expired = {
			let shard = self.shard(key).read();
			matches!(shard.get(key), Some(entry) if entry.is_expired(now))
		};
		if expired {
			let mut shard = self.shard(key).write();
			if matches!(shard.get(key), Some(entry) if entry.is_expired(now)) {
				shard.remove(key);
				self.deadlines.remove(key);
			}
		}
	}

	/// Read access to a live entry. Returns `Ok(None)` when the key is
	/// absent (or expired, in which case it is evicted first).
	pub fn read<T>(
		&self,
		key: &[u8],
		f: impl FnOnce(&Value) -> crate::Result<T>,
	) -> crate::Result<Option<T>> {
		let now = now_ms();
		self.evict_if_expired(key, now);
		let shard = self.shard(key).read();
		match shard.get(key) {
			None => Ok(None),
			Some(entry) if entry.is_expired(now) => Ok(None),
			Some(entry) => f(&entry.value).map(Some),
		}
	}

	/// Write access to an existing live entry. Bumps the version on
	/// success and removes the entry when the closure left an empty
	/// container behind.
	pub fn mutate<T>(
		&self,
		key: &[u8],
		f: impl FnOnce(&mut Value) -> crate::Result<T>,
	) -> crate::Result<Option<T>> {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		if matches!(shard.get(key), Some(entry) if entry.is_expired(now)) {
			shard.remove(key);
			self.deadlines.remove(key);
			return Ok(None);
		}
		let Some(entry) = shard.get_mut(key) else {
			return Ok(None);
		};
		let result = f(&mut entry.value)?;
		entry.version = self.next_version();
		let emptied = entry.value.is_empty_container();
		if emptied {
			shard.remove(key);
			self.deadlines.remove(key);
		}
		Ok(Some(result))
	}

	/// Write access, creating the entry from `default` when absent.
	pub fn mutate_or_insert<T>(
		&self,
		key: &[u8],
		default: impl FnOnce() -> Value,
		f: impl FnOnce(&mut Value) -> crate::Result<T>,
	) -> crate::Result<T> {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		if matches!(shard.get(key), Some(entry) if entry.is_expired(now)) {
			shard.remove(key);
			self.deadlines.remove(key);
		}
		let version = self.next_version();
		let entry = shard
			.entry(key.to_vec())
			.or_insert_with(|| Entry::new(default(), version));
		let result = f(&mut entry.value);
		match result {
			Ok(value) => {
				entry.version = self.next_version();
				let emptied = entry.value.is_empty_container();
				if emptied {
					shard.remove(key);
					self.deadlines.remove(key);
				}
				Ok(value)
			}
			Err(err) => {
				// A freshly inserted container the closure never
				// populated must not linger.
				let emptied = entry.value.is_empty_container();
				if emptied {
					shard.remove(key);
				}
				Err(err)
			}
		}
	}

	/// Unconditional overwrite. Any previous value, variant and TTL are
	/// discarded.
	pub fn insert(&self, key: &[u8], value: Value) {
		self.insert_with(key, value, InsertPolicy::Always);
	}

	/// Overwrite gated on current presence, decided under the shard writer
	/// lock so `SET NX`/`SET XX` stay atomic against concurrent writers.
	pub fn insert_with(&self, key: &[u8], value: Value, policy: InsertPolicy) -> bool {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		let live = matches!(shard.get(key), Some(entry) if !entry.is_expired(now));
		let apply = match policy {
			InsertPolicy::Always => true,
			InsertPolicy::IfAbsent => !live,
			InsertPolicy::IfPresent => live,
		};
		if apply {
			let version = self.next_version();
			shard.insert(key.to_vec(), Entry::new(value, version));
			drop(shard);
			self.deadlines.remove(key);
		}
		apply
	}

	pub fn remove(&self, key: &[u8]) -> bool {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		let removed = match shard.remove(key) {
			None => false,
			Some(entry) => !entry.is_expired(now),
		};
		self.deadlines.remove(key);
		removed
	}

	/// Detaches a live entry, TTL included, for RENAME-style moves.
	pub fn take_entry(&self, key: &[u8]) -> Option<Entry> {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		let entry = shard.remove(key)?;
		self.deadlines.remove(key);
		if entry.is_expired(now) { None } else { Some(entry) }
	}

	/// Re-attaches a detached entry under a new key with a fresh version.
	pub fn put_entry(&self, key: &[u8], mut entry: Entry) {
		entry.version = self.next_version();
		let deadline = entry.expires_at;
		let mut shard = self.shard(key).write();
		shard.insert(key.to_vec(), entry);
		match deadline {
			Some(deadline) => {
				self.deadlines.insert(key.to_vec(), deadline);
			}
			None => {
				self.deadlines.remove(key);
			}
		}
	}

	pub fn contains(&self, key: &[u8]) -> bool {
		let now = now_ms();
		self.evict_if_expired(key, now);
		let shard = self.shard(key).read();
		matches!(shard.get(key), Some(entry) if !entry.is_expired(now))
	}

	/// `TYPE` support: variant name of a live key.
	pub fn type_name(&self, key: &[u8]) -> Option<&'static str> {
		self.read(key, |value| Ok(value.type_name())).unwrap_or(None)
	}

	/// Version of a live key, for WATCH snapshots. Absent and expired
	/// both read as `None`.
	pub fn version(&self, key: &[u8]) -> Option<u64> {
		let now = now_ms();
		let shard = self.shard(key).read();
		match shard.get(key) {
			Some(entry) if !entry.is_expired(now) => Some(entry.version),
			_ => None,
		}
	}

	/// Sets an absolute expiry on a live key. Returns false when the key
	/// does not exist.
	pub fn expire_at(&self, key: &[u8], deadline_ms: u64) -> bool {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		let Some(entry) = shard.get_mut(key) else {
			return false;
		};
		if entry.is_expired(now) {
			return false;
		}
		entry.expires_at = Some(deadline_ms);
		entry.version = self.next_version();
		drop(shard);
		self.deadlines.insert(key.to_vec(), deadline_ms);
		true
	}

	/// Clears the expiry. Returns true when a deadline was removed.
	pub fn persist(&self, key: &[u8]) -> bool {
		let now = now_ms();
		let mut shard = self.shard(key).write();
		let Some(entry) = shard.get_mut(key) else {
			return false;
		};
		if entry.is_expired(now) || entry.expires_at.is_none() {
			return false;
		}
		entry.expires_at = None;
		entry.version = self.next_version();
		drop(shard);
		self.deadlines.remove(key);
		true
	}

	/// Remaining TTL: `None` = absent key, `Some(None)` = no expiry,
	/// `Some(Some(ms))` = time left.
	pub fn ttl_ms(&self, key: &[u8]) -> Option<Option<u64>> {
		let now = now_ms();
		self.evict_if_expired(key, now);
		let shard = self.shard(key).read();
		match shard.get(key) {
			None => None,
			Some(entry) if entry.is_expired(now) => None,
			Some(entry) => Some(entry.expires_at.map(|deadline| deadline - now)),
		}
	}

	/// Opportunistic expiry sweep driven by the deadline index. Processes
	/// at most `budget` expired keys per call.
	pub fn sweep_expired(&self, budget: usize) -> usize {
		let now = now_ms();
		let due: Vec<Vec<u8>> = self
			.deadlines
			.iter()
			.filter(|item| *item.value() <= now)
			.take(budget)
			.map(|item| item.key().clone())
			.collect();
		let mut swept = 0;
		for key in due {
			let mut shard = self.shard(&key).write();
			if matches!(shard.get(&key), Some(entry) if entry.is_expired(now)) {
				shard.remove(&key);
				swept += 1;
			}
			drop(shard);
			self.deadlines.remove(&key);
		}
		if swept > 0 {
			debug!(swept, "expired keys swept");
		}
		swept
	}

	/// Number of live keys. Expired-but-unswept entries are excluded.
	pub fn len(&self) -> usize {
		let now = now_ms();
		self.shards
			.iter()
			.map(|shard| {
				shard.read().values().filter(|entry| !entry.is_expired(now)).count()
			})
			.sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// `FLUSHALL`.
	pub fn clear(&self) {
		for shard in self.shards.iter() {
			shard.write().clear();
		}
		self.deadlines.clear();
	}

	/// All live keys matching the pattern. The literal prefix of the
	/// pattern skips non-candidates before the regex runs.
	pub fn keys(&self, pattern: &GlobPattern) -> Vec<Vec<u8>> {
		let now = now_ms();
		let prefix = ember_core::literal_prefix(pattern.source());
		let mut out = Vec::new();
		for shard in self.shards.iter() {
			let shard = shard.read();
			for (key, entry) in shard.iter() {
				if entry.is_expired(now) || !key.starts_with(&prefix) {
					continue;
				}
				if pattern.matches(key) {
					out.push(key.clone());
				}
			}
		}
		out
	}

	/// Cursor scan over the keyspace. The cursor is an offset into the
	/// lexicographically sorted live key list, recomputed per call; under
	/// concurrent mutation the guarantee is the usual weak one (keys
	/// present for the whole scan are returned at least once).
	pub fn scan(&self, cursor: u64, pattern: &GlobPattern, count: usize) -> ScanPage {
		let mut all = self.keys(&GlobPattern::compile(b"*").expect("universal pattern"));
		all.sort();
		let start = (cursor as usize).min(all.len());
		let count = count.max(1);
		let mut keys = Vec::new();
		let mut index = start;
		while index < all.len() && index - start < count {
			if pattern.matches(&all[index]) {
				keys.push(all[index].clone());
			}
			index += 1;
		}
		let next = if index >= all.len() { 0 } else { index as u64 };
		ScanPage { cursor: next, keys }
	}

	/// Read-only walk over every live entry, shard by shard. Used for the
	/// replication full-state dump and recovery verification.
	pub fn for_each(&self, mut f: impl FnMut(&[u8], &Entry)) {
		let now = now_ms();
		for shard in self.shards.iter() {
			let shard = shard.read();
			for (key, entry) in shard.iter() {
				if !entry.is_expired(now) {
					f(key, entry);
				}
			}
		}
	}

	/// Rebuilds shard tables whose occupancy dropped below the threshold.
	pub fn defragment(&self, threshold: f64) -> DefragReport {
		let mut report = DefragReport::default();
		for shard in self.shards.iter() {
			let mut shard = shard.write();
			report.shards_scanned += 1;
			let capacity = shard.capacity();
			if capacity > 64 && (shard.len() as f64) < threshold * capacity as f64 {
				shard.shrink_to_fit();
				report.shards_rebuilt += 1;
			}
		}
		if report.shards_rebuilt > 0 {
			debug!(rebuilt = report.shards_rebuilt, "keyspace shards defragmented");
		}
		report
	}
}
