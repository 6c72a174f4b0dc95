// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Count-Min sketch: `depth` rows of `width` saturating counters.
///
/// Point queries return the row-wise minimum, an overestimate bounded by
/// `epsilon * total` with probability `1 - delta` when sized via
/// [`CountMinSketch::by_prob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountMinSketch {
	width: usize,
	depth: usize,
	counters: Vec<u64>,
	total: u64,
}

impl CountMinSketch {
	pub fn by_dim(width: usize, depth: usize) -> Self {
		let width = width.max(1);
		let depth = depth.max(1);
		Self {
			width,
			depth,
			counters: vec![0; width * depth],
			total: 0,
		}
	}

	/// `width = ceil(e / epsilon)`, `depth = ceil(ln(1 / delta))`.
	pub fn by_prob(epsilon: f64, delta: f64) -> Self {
		let width = (std::f64::consts::E / epsilon).ceil() as usize;
		let depth = (1.0 / delta).ln().ceil() as usize;
		Self::by_dim(width, depth)
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	/// Adds `count` observations of the item and returns its new estimate.
	pub fn increment(&mut self, data: &[u8], count: u64) -> u64 {
		let mut estimate = u64::MAX;
		for row in 0..self.depth {
			let column = self.column(data, row);
			let cell = &mut self.counters[row * self.width + column];
			*cell = cell.saturating_add(count);
			estimate = estimate.min(*cell);
		}
		self.total = self.total.saturating_add(count);
		estimate
	}

	pub fn query(&self, data: &[u8]) -> u64 {
		(0..self.depth)
			.map(|row| self.counters[row * self.width + self.column(data, row)])
			.min()
			.unwrap_or(0)
	}

	fn column(&self, data: &[u8], row: usize) -> usize {
		(xxh3_64_with_seed(data, row as u64) % self.width as u64) as usize
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_query_never_underestimates() {
		let mut sketch = CountMinSketch::by_dim(256, 4);
		for i in 0..1_000u32 {
			sketch.increment(format!("k{}", i % 50).as_bytes(), 1);
		}
		for i in 0..50u32 {
			assert!(sketch.query(format!("k{i}").as_bytes()) >= 20);
		}
	}

	#[test]
	fn test_by_prob_dimensions() {
		let sketch = CountMinSketch::by_prob(0.001, 0.01);
		assert_eq!(sketch.width(), 2719);
		assert_eq!(sketch.depth(), 5);
	}

	#[test]
	fn test_increment_returns_estimate() {
		let mut sketch = CountMinSketch::by_dim(128, 3);
		assert_eq!(sketch.increment(b"x", 3), 3);
		assert_eq!(sketch.increment(b"x", 2), 5);
		assert_eq!(sketch.query(b"x"), 5);
		assert_eq!(sketch.query(b"unseen"), 0);
		assert_eq!(sketch.total(), 5);
	}
}
