// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

/// Per-connection transaction state.
///
/// The queue holds raw argument vectors validated for name and arity only;
/// nothing executes until `EXEC`. Watches snapshot the per-key version (or
/// its absence) at `WATCH` time and are always cleared by `EXEC` and
/// `DISCARD`.
#[derive(Debug, Default)]
pub struct TxnState {
	pub in_multi: bool,
	pub queue: Vec<Vec<Vec<u8>>>,
	pub watches: HashMap<Vec<u8>, Option<u64>>,
}

impl TxnState {
	pub fn reset(&mut self) {
		self.in_multi = false;
		self.queue.clear();
		self.watches.clear();
	}
}

/// Per-connection state the dispatcher consults.
#[derive(Debug, Default)]
pub struct Session {
	/// Authenticated ACL user, when authentication is enabled.
	pub user: Option<String>,
	pub txn: TxnState,
	/// Set once the peer registers with `REPLCONF`.
	pub is_replica_link: bool,
	/// Commands applied from the master replication stream bypass the
	/// read-only gate and are never propagated back.
	pub from_master: bool,
}

impl Session {
	pub fn new() -> Self {
		Self::default()
	}

	/// Session used by AOF replay and the replica apply loop.
	pub fn privileged() -> Self {
		Self {
			from_master: true,
			..Self::default()
		}
	}
}
