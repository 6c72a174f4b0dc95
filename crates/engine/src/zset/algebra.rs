// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use ember_core::CommandError;
use ember_keyspace::{Keyspace, SortedSet, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
	Sum,
	Min,
	Max,
}

impl Aggregate {
	fn combine(self, a: f64, b: f64) -> f64 {
		match self {
			Aggregate::Sum => a + b,
			Aggregate::Min => a.min(b),
			Aggregate::Max => a.max(b),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
	Union,
	Intersection,
	Difference,
}

/// Weighted sorted-set algebra shared by `ZUNION`, `ZINTER`, `ZDIFF` and
/// their `STORE` forms.
///
/// A plain set participates with every member at score 1.0; a missing key
/// is the empty set, never an error. `weights`, when given, must match the
/// key count; the default weight is 1.0 and the default aggregate is sum.
/// The result carries the sorted-view order.
pub fn zsetop(
	ks: &Keyspace,
	op: SetOp,
	keys: &[Vec<u8>],
	weights: Option<&[f64]>,
	aggregate: Aggregate,
) -> crate::Result<Vec<(Vec<u8>, f64)>> {
	if keys.is_empty() {
		return Err(CommandError::Other(
			"at least 1 input key is needed".to_string(),
		));
	}
	if let Some(weights) = weights
		&& weights.len() != keys.len()
	{
		return Err(CommandError::Syntax);
	}

	let mut inputs: Vec<HashMap<Vec<u8>, f64>> = Vec::with_capacity(keys.len());
	for (index, key) in keys.iter().enumerate() {
		let weight = weights.map(|w| w[index]).unwrap_or(1.0);
		let members = ks
			.read(key, |value| match value {
				Value::Zset(zset) => Ok(zset
					.iter()
					.map(|(member, score)| (member.clone(), score * weight))
					.collect::<HashMap<_, _>>()),
				Value::Set(set) => Ok(set
					.iter()
					.map(|member| (member.clone(), weight))
					.collect::<HashMap<_, _>>()),
				_ => Err(CommandError::WrongType),
			})?
			.unwrap_or_default();
		inputs.push(members);
	}

	let mut iter = inputs.into_iter();
	let first = iter.next().unwrap_or_default();
	let combined: HashMap<Vec<u8>, f64> = match op {
		SetOp::Union => {
			let mut acc = first;
			for input in iter {
				for (member, score) in input {
					acc.entry(member)
						.and_modify(|existing| {
							*existing = aggregate.combine(*existing, score)
						})
						.or_insert(score);
				}
			}
			acc
		}
		SetOp::Intersection => {
			let mut acc = first;
			for input in iter {
				acc = acc
					.into_iter()
					.filter_map(|(member, score)| {
						input.get(&member).map(|other| {
							(member, aggregate.combine(score, *other))
						})
					})
					.collect();
			}
			acc
		}
		SetOp::Difference => {
			let mut acc = first;
			for input in iter {
				acc.retain(|member, _| !input.contains_key(member));
			}
			acc
		}
	};

	// Render in sorted-view order through the authoritative index type.
	let mut ordered = SortedSet::new();
	for (member, score) in combined {
		let score = if score.is_nan() { 0.0 } else { score };
		ordered.insert(member, score)?;
	}
	Ok(ordered.iter().map(|(member, score)| (member.clone(), score)).collect())
}

/// `ZUNIONSTORE`/`ZINTERSTORE`/`ZDIFFSTORE`. An empty result deletes the
/// destination. Returns the stored cardinality.
pub fn zsetop_store(
	ks: &Keyspace,
	op: SetOp,
	destination: &[u8],
	keys: &[Vec<u8>],
	weights: Option<&[f64]>,
	aggregate: Aggregate,
) -> crate::Result<i64> {
	let pairs = zsetop(ks, op, keys, weights, aggregate)?;
	let stored = pairs.len() as i64;
	if pairs.is_empty() {
		ks.remove(destination);
	} else {
		let mut zset = SortedSet::new();
		for (member, score) in pairs {
			zset.insert(member, score)?;
		}
		ks.insert(destination, Value::Zset(zset));
	}
	Ok(stored)
}

/// `ZINTERCARD`. `limit` of zero means unlimited.
pub fn zintercard(ks: &Keyspace, keys: &[Vec<u8>], limit: usize) -> crate::Result<i64> {
	let pairs = zsetop(ks, SetOp::Intersection, keys, None, Aggregate::Sum)?;
	let cardinality = pairs.len();
	Ok(if limit == 0 { cardinality } else { cardinality.min(limit) } as i64)
}
