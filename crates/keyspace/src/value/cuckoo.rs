// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rand::Rng;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

const SLOTS_PER_BUCKET: usize = 4;
const MAX_KICKS: usize = 500;

/// Cuckoo filter over 4-slot buckets with one-byte fingerprints.
///
/// An item lives in one of two buckets derived by partial-key hashing
/// (`i2 = i1 ^ hash(fingerprint)`), so relocation never needs the original
/// key. Insertion under pressure evicts a random resident fingerprint and
/// rehomes it, up to a bounded kick count; exhausting the budget reports
/// the filter as full (`add` returns false, not an error) with the evicted
/// fingerprint reinstated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuckooFilter {
	/// Flat `bucket_count * SLOTS_PER_BUCKET` slots; zero means empty.
	slots: Vec<u8>,
	bucket_count: usize,
	inserted: u64,
}

impl CuckooFilter {
	pub fn new(capacity: u64) -> Self {
		// Round buckets up to a power of two so the XOR partner index
		// stays in range.
		let wanted = (capacity.max(4) as usize).div_ceil(SLOTS_PER_BUCKET);
		let bucket_count = wanted.next_power_of_two();
		Self {
			slots: vec![0; bucket_count * SLOTS_PER_BUCKET],
			bucket_count,
			inserted: 0,
		}
	}

	pub fn with_defaults() -> Self {
		Self::new(1024)
	}

	pub fn capacity(&self) -> u64 {
		(self.bucket_count * SLOTS_PER_BUCKET) as u64
	}

	pub fn len(&self) -> u64 {
		self.inserted
	}

	fn fingerprint(data: &[u8]) -> u8 {
		// Fingerprints must be non-zero; zero marks an empty slot.
		let h = xxh3_64_with_seed(data, 0xc3a5_c85c_97cb_3127);
		((h % 255) + 1) as u8
	}

	fn primary_index(&self, data: &[u8]) -> usize {
		(xxh3_64(data) as usize) & (self.bucket_count - 1)
	}

	fn partner_index(&self, index: usize, fingerprint: u8) -> usize {
		(index ^ xxh3_64(&[fingerprint]) as usize) & (self.bucket_count - 1)
	}

	fn bucket(&self, index: usize) -> &[u8] {
		&self.slots[index * SLOTS_PER_BUCKET..(index + 1) * SLOTS_PER_BUCKET]
	}

	fn bucket_mut(&mut self, index: usize) -> &mut [u8] {
		&mut self.slots[index * SLOTS_PER_BUCKET..(index + 1) * SLOTS_PER_BUCKET]
	}

	fn try_place(&mut self, index: usize, fingerprint: u8) -> bool {
		for slot in self.bucket_mut(index) {
			if *slot == 0 {
				*slot = fingerprint;
				return true;
			}
		}
		false
	}

	/// Inserts the item. Returns false when the filter is full.
	pub fn add(&mut self, data: &[u8]) -> bool {
		let fingerprint = Self::fingerprint(data);
		let i1 = self.primary_index(data);
		let i2 = self.partner_index(i1, fingerprint);
		if self.try_place(i1, fingerprint) || self.try_place(i2, fingerprint) {
			self.inserted += 1;
			return true;
		}

		let mut rng = rand::rng();
		let mut index = if rng.random_bool(0.5) { i1 } else { i2 };
		let mut hand = fingerprint;
		let mut path: Vec<(usize, usize)> = Vec::new();
		for _ in 0..MAX_KICKS {
			let victim_slot = rng.random_range(0..SLOTS_PER_BUCKET);
			let bucket = self.bucket_mut(index);
			std::mem::swap(&mut bucket[victim_slot], &mut hand);
			path.push((index, victim_slot));
			index = self.partner_index(index, hand);
			if self.try_place(index, hand) {
				self.inserted += 1;
				return true;
			}
		}
		// Out of kicks: rewind the eviction chain so no resident entry is
		// lost, then report full.
		for &(bucket, slot) in path.iter().rev() {
			std::mem::swap(&mut self.slots[bucket * SLOTS_PER_BUCKET + slot], &mut hand);
		}
		false
	}

	/// Inserts only when the item does not already appear.
	pub fn add_unless_exists(&mut self, data: &[u8]) -> bool {
		if self.contains(data) {
			return false;
		}
		self.add(data)
	}

	pub fn contains(&self, data: &[u8]) -> bool {
		let fingerprint = Self::fingerprint(data);
		let i1 = self.primary_index(data);
		let i2 = self.partner_index(i1, fingerprint);
		self.bucket(i1).contains(&fingerprint) || self.bucket(i2).contains(&fingerprint)
	}

	/// Removes one copy of the item's fingerprint. Deleting an item that
	/// was never added can evict a colliding entry; that is inherent to
	/// the structure and mirrors its reference behavior.
	pub fn remove(&mut self, data: &[u8]) -> bool {
		let fingerprint = Self::fingerprint(data);
		let i1 = self.primary_index(data);
		let i2 = self.partner_index(i1, fingerprint);
		for index in [i1, i2] {
			for slot in self.bucket_mut(index) {
				if *slot == fingerprint {
					*slot = 0;
					self.inserted = self.inserted.saturating_sub(1);
					return true;
				}
			}
		}
		false
	}

	/// How many copies of the item's fingerprint are present.
	pub fn count(&self, data: &[u8]) -> u64 {
		let fingerprint = Self::fingerprint(data);
		let i1 = self.primary_index(data);
		let i2 = self.partner_index(i1, fingerprint);
		let mut copies =
			self.bucket(i1).iter().filter(|&&slot| slot == fingerprint).count() as u64;
		if i2 != i1 {
			copies += self.bucket(i2).iter().filter(|&&slot| slot == fingerprint).count()
				as u64;
		}
		copies
	}
}
