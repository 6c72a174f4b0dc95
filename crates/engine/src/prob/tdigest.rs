// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::CommandError;
use ember_keyspace::{Keyspace, TDigest, Value};

use super::{already_exists, missing};

/// `TDIGEST.CREATE key [COMPRESSION c]`.
pub fn create(ks: &Keyspace, key: &[u8], compression: Option<u32>) -> crate::Result<()> {
	if ks.contains(key) {
		return Err(already_exists("T-Digest"));
	}
	let digest = match compression {
		None => TDigest::with_defaults(),
		Some(c) if (20..=1_000).contains(&c) => TDigest::new(c),
		Some(_) => {
			return Err(CommandError::OutOfRange(
				"T-Digest: invalid compression".to_string(),
			));
		}
	};
	ks.insert(key, Value::TDigest(digest));
	Ok(())
}

/// `TDIGEST.ADD key value [value ...]`.
pub fn add(ks: &Keyspace, key: &[u8], values: &[f64]) -> crate::Result<()> {
	if values.iter().any(|value| !value.is_finite()) {
		return Err(CommandError::NotFloat);
	}
	ks.mutate(key, |entry| {
		let digest = entry.as_tdigest_mut()?;
		for value in values {
			digest.add(*value);
		}
		Ok(())
	})?
	.ok_or_else(|| missing("T-Digest"))
}

/// `TDIGEST.QUANTILE key q [q ...]`. `None` per slot when the digest is
/// empty.
pub fn quantile(ks: &Keyspace, key: &[u8], quantiles: &[f64]) -> crate::Result<Vec<Option<f64>>> {
	ks.mutate(key, |entry| {
		let digest = entry.as_tdigest_mut()?;
		Ok(quantiles.iter().map(|q| digest.quantile(*q)).collect())
	})?
	.ok_or_else(|| missing("T-Digest"))
}

/// `TDIGEST.CDF key value [value ...]`.
pub fn cdf(ks: &Keyspace, key: &[u8], values: &[f64]) -> crate::Result<Vec<Option<f64>>> {
	ks.mutate(key, |entry| {
		let digest = entry.as_tdigest_mut()?;
		Ok(values.iter().map(|value| digest.cdf(*value)).collect())
	})?
	.ok_or_else(|| missing("T-Digest"))
}

pub fn min(ks: &Keyspace, key: &[u8]) -> crate::Result<Option<f64>> {
	ks.read(key, |value| Ok(value.as_tdigest()?.min()))?.ok_or_else(|| missing("T-Digest"))
}

pub fn max(ks: &Keyspace, key: &[u8]) -> crate::Result<Option<f64>> {
	ks.read(key, |value| Ok(value.as_tdigest()?.max()))?.ok_or_else(|| missing("T-Digest"))
}

/// `TDIGEST.RESET`.
pub fn reset(ks: &Keyspace, key: &[u8]) -> crate::Result<()> {
	ks.mutate(key, |value| {
		value.as_tdigest_mut()?.reset();
		Ok(())
	})?
	.ok_or_else(|| missing("T-Digest"))
}
