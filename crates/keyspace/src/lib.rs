// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use keyspace::{DefragReport, InsertPolicy, Keyspace, ScanPage};
pub use value::{Entry, SortedSet, Value};
pub use value::{BloomFilter, CountMinSketch, CuckooFilter, HyperLogLog, TDigest, TopK};

mod clock;
mod keyspace;
pub mod value;

pub use clock::now_ms;

pub type Result<T> = std::result::Result<T, ember_core::CommandError>;
