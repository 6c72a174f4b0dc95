// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Bloom filter sized from an expected item count and target false-positive
/// rate using the standard formulas `m = -n ln p / ln^2 2`, `k = m/n ln 2`.
///
/// Probing uses double hashing over two xxh3 seeds, which preserves the
/// false-positive guarantee without paying for k independent hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomFilter {
	bits: Vec<u8>,
	bit_count: u64,
	hash_count: u32,
	capacity: u64,
	inserted: u64,
	error_rate: f64,
}

impl BloomFilter {
	pub fn new(capacity: u64, error_rate: f64) -> Self {
		let n = capacity.max(1) as f64;
		let ln2 = std::f64::consts::LN_2;
		let bit_count = ((-(n * error_rate.ln()) / (ln2 * ln2)).ceil() as u64).max(8);
		let hash_count = (((bit_count as f64 / n) * ln2).round() as u32).clamp(1, 30);
		Self {
			bits: vec![0; bit_count.div_ceil(8) as usize],
			bit_count,
			hash_count,
			capacity,
			inserted: 0,
			error_rate,
		}
	}

	/// Default sizing when `BF.ADD` hits a missing key: 100 items at 1%.
	pub fn with_defaults() -> Self {
		Self::new(100, 0.01)
	}

	pub fn capacity(&self) -> u64 {
		self.capacity
	}

	pub fn error_rate(&self) -> f64 {
		self.error_rate
	}

	/// Items actually inserted (first-time adds).
	pub fn cardinality(&self) -> u64 {
		self.inserted
	}

	pub fn size_bytes(&self) -> usize {
		self.bits.len()
	}

	/// Returns true when the item was not present before (by the filter's
	/// own approximate judgement).
	pub fn add(&mut self, data: &[u8]) -> bool {
		let (h1, h2) = self.hash_pair(data);
		let mut new_bits = false;
		for i in 0..self.hash_count {
			let bit = self.probe(h1, h2, i);
			let (byte, mask) = (bit / 8, 1u8 << (bit % 8));
			if self.bits[byte as usize] & mask == 0 {
				self.bits[byte as usize] |= mask;
				new_bits = true;
			}
		}
		if new_bits {
			self.inserted += 1;
		}
		new_bits
	}

	pub fn contains(&self, data: &[u8]) -> bool {
		let (h1, h2) = self.hash_pair(data);
		(0..self.hash_count).all(|i| {
			let bit = self.probe(h1, h2, i);
			self.bits[(bit / 8) as usize] & (1u8 << (bit % 8)) != 0
		})
	}

	fn hash_pair(&self, data: &[u8]) -> (u64, u64) {
		(xxh3_64_with_seed(data, 0), xxh3_64_with_seed(data, 0x9e3779b97f4a7c15))
	}

	fn probe(&self, h1: u64, h2: u64, i: u32) -> u64 {
		h1.wrapping_add((i as u64).wrapping_mul(h2 | 1)) % self.bit_count
	}
}
