// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::{CommandError, parse};
use ember_keyspace::{Keyspace, Value};

/// `SORT` options. `limit` is `(offset, count)` over the sorted result.
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
	pub alpha: bool,
	pub descending: bool,
	pub limit: Option<(usize, usize)>,
	pub store: Option<Vec<u8>>,
}

/// `SORT`: the one cross-type command. Accepts a list, set or sorted set;
/// sorts numerically by default (failing on any non-numeric element) or
/// lexicographically under `ALPHA`. With `STORE`, the rendered result is
/// persisted newline-joined as a string at the destination.
pub fn sort(ks: &Keyspace, key: &[u8], options: &SortOptions) -> crate::Result<Vec<Vec<u8>>> {
	let elements = ks
		.read(key, |value| match value {
			Value::List(list) => Ok(list.iter().cloned().collect::<Vec<_>>()),
			Value::Set(set) => Ok(set.iter().cloned().collect()),
			Value::Zset(zset) => Ok(zset.iter().map(|(member, _)| member.clone()).collect()),
			_ => Err(CommandError::WrongType),
		})?
		.unwrap_or_default();

	let mut sorted = elements;
	if options.alpha {
		sorted.sort();
	} else {
		let mut keyed = Vec::with_capacity(sorted.len());
		for element in sorted {
			let weight = parse::parse_f64(&element)
				.map_err(|_| CommandError::Other(
					"One or more scores can't be converted into double".to_string(),
				))?;
			keyed.push((weight, element));
		}
		keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
		sorted = keyed.into_iter().map(|(_, element)| element).collect();
	}
	if options.descending {
		sorted.reverse();
	}
	if let Some((offset, count)) = options.limit {
		sorted = sorted.into_iter().skip(offset).take(count).collect();
	}

	if let Some(destination) = &options.store {
		let joined = sorted.join(&b'\n');
		ks.insert(destination, Value::Str(joined));
	}
	Ok(sorted)
}
