// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};

/// Merging t-digest for streaming quantile estimation.
///
/// Incoming values buffer until the buffer reaches the compression budget,
/// then merge into the centroid list in one sorted pass. Centroid capacity
/// follows the `q(1-q)` scale bound, so resolution concentrates at the
/// tails and the centroid count stays proportional to the compression
/// parameter regardless of stream length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TDigest {
	compression: f64,
	centroids: Vec<Centroid>,
	buffer: Vec<f64>,
	count: u64,
	min: Option<f64>,
	max: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Centroid {
	mean: f64,
	weight: f64,
}

impl TDigest {
	pub fn new(compression: u32) -> Self {
		let compression = compression.clamp(20, 1_000) as f64;
		Self {
			compression,
			centroids: Vec::new(),
			buffer: Vec::with_capacity(compression as usize * 4),
			count: 0,
			min: None,
			max: None,
		}
	}

	pub fn with_defaults() -> Self {
		Self::new(100)
	}

	pub fn compression(&self) -> u32 {
		self.compression as u32
	}

	pub fn count(&self) -> u64 {
		self.count
	}

	pub fn min(&self) -> Option<f64> {
		self.min
	}

	pub fn max(&self) -> Option<f64> {
		self.max
	}

	pub fn add(&mut self, value: f64) {
		self.count += 1;
		self.min = Some(self.min.map_or(value, |current| current.min(value)));
		self.max = Some(self.max.map_or(value, |current| current.max(value)));
		self.buffer.push(value);
		if self.buffer.len() >= self.buffer.capacity() {
			self.compress();
		}
	}

	pub fn reset(&mut self) {
		self.centroids.clear();
		self.buffer.clear();
		self.count = 0;
		self.min = None;
		self.max = None;
	}

	/// Estimated value at quantile `q` in `[0, 1]`.
	pub fn quantile(&mut self, q: f64) -> Option<f64> {
		if self.count == 0 {
			return None;
		}
		self.compress();
		let q = q.clamp(0.0, 1.0);
		if q == 0.0 {
			return self.min;
		}
		if q == 1.0 {
			return self.max;
		}
		let target = q * self.count as f64;
		let mut seen = 0.0;
		for (i, centroid) in self.centroids.iter().enumerate() {
			let half = centroid.weight / 2.0;
			if seen + half >= target || i == self.centroids.len() - 1 {
				// Interpolate between the previous centroid mean and
				// this one across the half-weights.
				let previous = if i == 0 {
					(self.min.unwrap_or(centroid.mean), seen)
				} else {
					let p = self.centroids[i - 1];
					(p.mean, seen - p.weight / 2.0)
				};
				let span = (seen + half - previous.1).max(f64::MIN_POSITIVE);
				let fraction = ((target - previous.1) / span).clamp(0.0, 1.0);
				return Some(previous.0 + (centroid.mean - previous.0) * fraction);
			}
			seen += centroid.weight;
		}
		self.max
	}

	/// Fraction of observed values at or below `x`.
	pub fn cdf(&mut self, x: f64) -> Option<f64> {
		if self.count == 0 {
			return None;
		}
		self.compress();
		let (min, max) = match (self.min, self.max) {
			(Some(min), Some(max)) => (min, max),
			_ => return None,
		};
		if x < min {
			return Some(0.0);
		}
		if x >= max {
			return Some(1.0);
		}
		let mut seen = 0.0;
		for centroid in &self.centroids {
			if centroid.mean >= x {
				return Some((seen / self.count as f64).clamp(0.0, 1.0));
			}
			seen += centroid.weight;
		}
		Some(1.0)
	}

	fn compress(&mut self) {
		if self.buffer.is_empty() {
			return;
		}
		let mut merged: Vec<Centroid> = self
			.centroids
			.drain(..)
			.chain(self.buffer.drain(..).map(|value| Centroid {
				mean: value,
				weight: 1.0,
			}))
			.collect();
		merged.sort_by(|a, b| a.mean.total_cmp(&b.mean));

		let total: f64 = merged.iter().map(|c| c.weight).sum();
		let mut result: Vec<Centroid> = Vec::new();
		let mut seen = 0.0;
		for centroid in merged {
			match result.last_mut() {
				Some(last) => {
					let candidate = last.weight + centroid.weight;
					let q = (seen + candidate / 2.0) / total;
					let limit = 4.0 * total * q * (1.0 - q) / self.compression;
					if candidate <= limit.max(1.0) {
						// Weighted average keeps the merged mean exact.
						last.mean = (last.mean * last.weight
							+ centroid.mean * centroid.weight)
							/ candidate;
						last.weight = candidate;
					} else {
						seen += last.weight;
						result.push(centroid);
					}
				}
				None => result.push(centroid),
			}
		}
		self.centroids = result;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_digest_has_no_answers() {
		let mut digest = TDigest::with_defaults();
		assert_eq!(digest.quantile(0.5), None);
		assert_eq!(digest.cdf(1.0), None);
		assert_eq!(digest.min(), None);
	}

	#[test]
	fn test_extremes_are_exact() {
		let mut digest = TDigest::with_defaults();
		for i in 0..10_000 {
			digest.add(i as f64);
		}
		assert_eq!(digest.quantile(0.0), Some(0.0));
		assert_eq!(digest.quantile(1.0), Some(9_999.0));
		assert_eq!(digest.min(), Some(0.0));
		assert_eq!(digest.max(), Some(9_999.0));
	}

	#[test]
	fn test_median_of_uniform_stream() {
		let mut digest = TDigest::with_defaults();
		for i in 0..100_001 {
			digest.add(i as f64 / 100_000.0);
		}
		let median = digest.quantile(0.5).unwrap();
		assert!((median - 0.5).abs() < 0.01, "median {median}");
	}

	#[test]
	fn test_cdf_roughly_inverts_quantile() {
		let mut digest = TDigest::with_defaults();
		for i in 0..50_000 {
			digest.add(i as f64);
		}
		let cdf = digest.cdf(25_000.0).unwrap();
		assert!((cdf - 0.5).abs() < 0.02, "cdf {cdf}");
	}

	#[test]
	fn test_centroid_count_stays_bounded() {
		let mut digest = TDigest::new(100);
		for i in 0..200_000 {
			digest.add((i % 1_000) as f64);
		}
		digest.compress();
		assert!(digest.centroids.len() < 400, "{} centroids", digest.centroids.len());
	}

	#[test]
	fn test_reset_clears_everything() {
		let mut digest = TDigest::with_defaults();
		digest.add(1.0);
		digest.reset();
		assert_eq!(digest.count(), 0);
		assert_eq!(digest.quantile(0.5), None);
	}
}
