// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::CommandError;
use ember_keyspace::{CountMinSketch, Keyspace, Value};

use super::{already_exists, missing};

/// `CMS.INITBYDIM key width depth`.
pub fn init_by_dim(ks: &Keyspace, key: &[u8], width: u64, depth: u64) -> crate::Result<()> {
	if width == 0 || depth == 0 {
		return Err(CommandError::OutOfRange(
			"CMS: invalid dimensions".to_string(),
		));
	}
	if ks.contains(key) {
		return Err(already_exists("CMS"));
	}
	ks.insert(key, Value::Cms(CountMinSketch::by_dim(width as usize, depth as usize)));
	Ok(())
}

/// `CMS.INITBYPROB key error probability`.
pub fn init_by_prob(ks: &Keyspace, key: &[u8], error: f64, probability: f64) -> crate::Result<()> {
	if !(error > 0.0 && error < 1.0) || !(probability > 0.0 && probability < 1.0) {
		return Err(CommandError::OutOfRange("CMS: invalid prob value".to_string()));
	}
	if ks.contains(key) {
		return Err(already_exists("CMS"));
	}
	ks.insert(key, Value::Cms(CountMinSketch::by_prob(error, probability)));
	Ok(())
}

/// `CMS.INCRBY key item increment [item increment ...]`. Requires an
/// initialized sketch; returns the new estimate per item.
pub fn incrby(
	ks: &Keyspace,
	key: &[u8],
	pairs: &[(Vec<u8>, u64)],
) -> crate::Result<Vec<u64>> {
	ks.mutate(key, |value| {
		let sketch = value.as_cms_mut()?;
		Ok(pairs.iter().map(|(item, count)| sketch.increment(item, *count)).collect())
	})?
	.ok_or_else(|| missing("CMS"))
}

/// `CMS.QUERY key item [item ...]`.
pub fn query(ks: &Keyspace, key: &[u8], items: &[Vec<u8>]) -> crate::Result<Vec<u64>> {
	ks.read(key, |value| {
		let sketch = value.as_cms()?;
		Ok(items.iter().map(|item| sketch.query(item)).collect())
	})?
	.ok_or_else(|| missing("CMS"))
}

/// `CMS.INFO` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmsInfo {
	pub width: usize,
	pub depth: usize,
	pub total: u64,
}

pub fn info(ks: &Keyspace, key: &[u8]) -> crate::Result<CmsInfo> {
	ks.read(key, |value| {
		let sketch = value.as_cms()?;
		Ok(CmsInfo {
			width: sketch.width(),
			depth: sketch.depth(),
			total: sketch.total(),
		})
	})?
	.ok_or_else(|| missing("CMS"))
}
