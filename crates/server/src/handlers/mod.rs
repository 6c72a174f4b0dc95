// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! One module per command family; [`all`] assembles the registry.

mod bitmap;
mod generic;
mod hash;
mod list;
mod prob;
mod server_info;
mod set;
mod string;
mod txn;
mod zset;

use ember_core::{CommandError, parse};

use crate::command::CommandSpec;

pub fn all() -> Vec<CommandSpec> {
	let mut specs = Vec::new();
	specs.extend(string::commands());
	specs.extend(list::commands());
	specs.extend(set::commands());
	specs.extend(hash::commands());
	specs.extend(zset::commands());
	specs.extend(bitmap::commands());
	specs.extend(prob::commands());
	specs.extend(generic::commands());
	specs.extend(txn::commands());
	specs.extend(server_info::commands());
	specs
}

/// Matches an option token case-insensitively.
pub(crate) fn token_is(arg: &[u8], word: &str) -> bool {
	arg.eq_ignore_ascii_case(word.as_bytes())
}

pub(crate) fn parse_index(arg: &[u8]) -> Result<i64, CommandError> {
	parse::parse_i64(arg)
}

/// Counts must be non-negative and fit a usize.
pub(crate) fn parse_count(arg: &[u8]) -> Result<usize, CommandError> {
	let count = parse::parse_i64(arg)?;
	if count < 0 {
		return Err(CommandError::OutOfRange("COUNT can't be negative".to_string()));
	}
	Ok(count as usize)
}

/// `MATCH`/`COUNT` tail shared by the SCAN family. Returns the compiled
/// pattern (if any) and the page size.
pub(crate) fn parse_scan_tail(
	server: &crate::server::Server,
	args: &[Vec<u8>],
) -> Result<(Option<std::sync::Arc<ember_core::GlobPattern>>, usize), CommandError> {
	let mut pattern = None;
	let mut count = 10usize;
	let mut index = 0;
	while index < args.len() {
		if token_is(&args[index], "MATCH") {
			let raw = args.get(index + 1).ok_or(CommandError::Syntax)?;
			pattern = Some(server.patterns.get(raw)?);
			index += 2;
		} else if token_is(&args[index], "COUNT") {
			let raw = args.get(index + 1).ok_or(CommandError::Syntax)?;
			count = parse_count(raw)?.max(1);
			index += 2;
		} else {
			return Err(CommandError::Syntax);
		}
	}
	Ok((pattern, count))
}
