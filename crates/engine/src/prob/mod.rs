// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Command surfaces of the probabilistic structures.
//!
//! The structures themselves live with the keyspace values; these modules
//! add the per-command contracts: which commands auto-create, which demand
//! an existing key, and how estimates are reported.

pub mod bloom;
pub mod cms;
pub mod cuckoo;
pub mod hll;
pub mod tdigest;
pub mod topk;

use ember_core::CommandError;

pub(crate) fn missing(kind: &str) -> CommandError {
	CommandError::Other(format!("{kind}: key does not exist"))
}

pub(crate) fn already_exists(kind: &str) -> CommandError {
	CommandError::Other(format!("{kind}: key already exists"))
}
