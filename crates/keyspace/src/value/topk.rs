// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rand::Rng;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// HeavyKeeper-style top-k tracker.
///
/// A grid of `(fingerprint, count)` buckets estimates per-item frequency;
/// colliding minority items decay the resident count probabilistically, so
/// heavy hitters survive and mice are forgotten. A side list of the current
/// k heaviest items (exact membership, estimated counts) answers queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopK {
	k: usize,
	width: usize,
	depth: usize,
	decay: f64,
	buckets: Vec<(u32, u64)>,
	/// Current top items, unsorted; never longer than `k`.
	leaders: Vec<(Vec<u8>, u64)>,
}

impl TopK {
	pub fn new(k: usize, width: usize, depth: usize, decay: f64) -> Self {
		let k = k.max(1);
		let width = width.max(8);
		let depth = depth.max(1);
		Self {
			k,
			width,
			depth,
			decay: decay.clamp(0.1, 1.0),
			buckets: vec![(0, 0); width * depth],
			leaders: Vec::with_capacity(k),
		}
	}

	pub fn with_defaults(k: usize) -> Self {
		Self::new(k, 8 * k.max(1), 7, 0.9)
	}

	pub fn k(&self) -> usize {
		self.k
	}

	/// Observes the item `increment` times. Returns the item expelled from
	/// the leader list, if the newcomer displaced one.
	pub fn add(&mut self, item: &[u8], increment: u64) -> Option<Vec<u8>> {
		let fingerprint = (xxh3_64_with_seed(item, 0x5851_f42d_4c95_7f2d) as u32).max(1);
		let mut rng = rand::rng();
		let mut estimate = 0u64;
		for row in 0..self.depth {
			let column = (xxh3_64_with_seed(item, row as u64) % self.width as u64) as usize;
			let bucket = &mut self.buckets[row * self.width + column];
			if bucket.1 == 0 {
				*bucket = (fingerprint, increment);
				estimate = estimate.max(increment);
			} else if bucket.0 == fingerprint {
				bucket.1 += increment;
				estimate = estimate.max(bucket.1);
			} else {
				// Decay the resident; take over once it hits zero.
				let mut remaining = increment;
				while remaining > 0 && bucket.1 > 0 {
					let p = self.decay.powi(bucket.1.min(1_000) as i32);
					if rng.random::<f64>() < p {
						bucket.1 -= 1;
					}
					remaining -= 1;
				}
				if bucket.1 == 0 && remaining > 0 {
					*bucket = (fingerprint, remaining);
					estimate = estimate.max(remaining);
				}
			}
		}
		self.promote(item, estimate)
	}

	fn promote(&mut self, item: &[u8], estimate: u64) -> Option<Vec<u8>> {
		if let Some(slot) = self.leaders.iter_mut().find(|(leader, _)| leader == item) {
			slot.1 = slot.1.max(estimate);
			return None;
		}
		if self.leaders.len() < self.k {
			self.leaders.push((item.to_vec(), estimate));
			return None;
		}
		let mut weakest = 0;
		for i in 1..self.leaders.len() {
			if self.leaders[i].1 < self.leaders[weakest].1 {
				weakest = i;
			}
		}
		if estimate > self.leaders[weakest].1 {
			let expelled = std::mem::replace(
				&mut self.leaders[weakest],
				(item.to_vec(), estimate),
			);
			return Some(expelled.0);
		}
		None
	}

	/// Whether the item currently sits in the leader list.
	pub fn query(&self, item: &[u8]) -> bool {
		self.leaders.iter().any(|(leader, _)| leader == item)
	}

	/// Estimated count for the item (zero when it never reached a bucket).
	pub fn count(&self, item: &[u8]) -> u64 {
		let fingerprint = (xxh3_64_with_seed(item, 0x5851_f42d_4c95_7f2d) as u32).max(1);
		let mut estimate = 0u64;
		for row in 0..self.depth {
			let column = (xxh3_64_with_seed(item, row as u64) % self.width as u64) as usize;
			let bucket = &self.buckets[row * self.width + column];
			if bucket.0 == fingerprint {
				estimate = estimate.max(bucket.1);
			}
		}
		estimate
	}

	/// The leader list, heaviest first, ties by member bytes.
	pub fn list(&self) -> Vec<(Vec<u8>, u64)> {
		let mut sorted = self.leaders.clone();
		sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		sorted
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_heavy_hitters_dominate() {
		let mut topk = TopK::with_defaults(3);
		for _ in 0..1_000 {
			topk.add(b"whale", 1);
		}
		for _ in 0..800 {
			topk.add(b"shark", 1);
		}
		for _ in 0..600 {
			topk.add(b"tuna", 1);
		}
		for i in 0..300u32 {
			topk.add(format!("minnow-{i}").as_bytes(), 1);
		}
		assert!(topk.query(b"whale"));
		assert!(topk.query(b"shark"));
		assert!(topk.query(b"tuna"));
		let list = topk.list();
		assert_eq!(list[0].0, b"whale".to_vec());
	}

	#[test]
	fn test_count_tracks_magnitude() {
		let mut topk = TopK::with_defaults(2);
		for _ in 0..500 {
			topk.add(b"popular", 1);
		}
		let count = topk.count(b"popular");
		assert!(count >= 450, "count {count}");
		assert_eq!(topk.count(b"never-seen"), 0);
	}

	#[test]
	fn test_list_is_sorted_descending() {
		let mut topk = TopK::with_defaults(3);
		topk.add(b"a", 10);
		topk.add(b"b", 30);
		topk.add(b"c", 20);
		let counts: Vec<u64> = topk.list().iter().map(|(_, c)| *c).collect();
		assert!(counts.windows(2).all(|w| w[0] >= w[1]));
	}
}
