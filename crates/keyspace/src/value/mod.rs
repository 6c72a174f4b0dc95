// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

pub use bloom::BloomFilter;
pub use cms::CountMinSketch;
pub use cuckoo::CuckooFilter;
pub use hll::HyperLogLog;
pub use tdigest::TDigest;
pub use topk::TopK;
pub use zset::SortedSet;

mod bloom;
mod cms;
mod cuckoo;
mod hll;
mod tdigest;
mod topk;
mod zset;

use std::collections::{HashMap, HashSet, VecDeque};

use ember_core::CommandError;

/// The typed payload of one keyspace entry.
///
/// A key holds exactly one variant for its whole lifetime; changing variant
/// requires deleting the key first. Typed accessors return `WRONGTYPE` on a
/// mismatch, which the dispatcher forwards verbatim.
#[derive(Debug, Clone)]
pub enum Value {
	Str(Vec<u8>),
	List(VecDeque<Vec<u8>>),
	Set(HashSet<Vec<u8>>),
	Hash(HashMap<Vec<u8>, Vec<u8>>),
	Zset(SortedSet),
	Bitmap(Vec<u8>),
	Hll(HyperLogLog),
	Bloom(BloomFilter),
	Cms(CountMinSketch),
	Cuckoo(CuckooFilter),
	TopK(TopK),
	TDigest(TDigest),
}

impl Value {
	/// The name `TYPE` reports.
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Str(_) => "string",
			Value::List(_) => "list",
			Value::Set(_) => "set",
			Value::Hash(_) => "hash",
			Value::Zset(_) => "zset",
			Value::Bitmap(_) => "bitmap",
			Value::Hll(_) => "hyperloglog",
			Value::Bloom(_) => "bloomfilter",
			Value::Cms(_) => "countminsketch",
			Value::Cuckoo(_) => "cuckoofilter",
			Value::TopK(_) => "topk",
			Value::TDigest(_) => "tdigest",
		}
	}

	/// A container that emptied out must disappear from the keyspace.
	/// Scalars and probabilistic values never self-delete.
	pub fn is_empty_container(&self) -> bool {
		match self {
			Value::List(list) => list.is_empty(),
			Value::Set(set) => set.is_empty(),
			Value::Hash(hash) => hash.is_empty(),
			Value::Zset(zset) => zset.is_empty(),
			_ => false,
		}
	}

	pub fn as_str(&self) -> Result<&Vec<u8>, CommandError> {
		match self {
			Value::Str(bytes) => Ok(bytes),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_str_mut(&mut self) -> Result<&mut Vec<u8>, CommandError> {
		match self {
			Value::Str(bytes) => Ok(bytes),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_list(&self) -> Result<&VecDeque<Vec<u8>>, CommandError> {
		match self {
			Value::List(list) => Ok(list),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_list_mut(&mut self) -> Result<&mut VecDeque<Vec<u8>>, CommandError> {
		match self {
			Value::List(list) => Ok(list),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_set(&self) -> Result<&HashSet<Vec<u8>>, CommandError> {
		match self {
			Value::Set(set) => Ok(set),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_set_mut(&mut self) -> Result<&mut HashSet<Vec<u8>>, CommandError> {
		match self {
			Value::Set(set) => Ok(set),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_hash(&self) -> Result<&HashMap<Vec<u8>, Vec<u8>>, CommandError> {
		match self {
			Value::Hash(hash) => Ok(hash),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_hash_mut(&mut self) -> Result<&mut HashMap<Vec<u8>, Vec<u8>>, CommandError> {
		match self {
			Value::Hash(hash) => Ok(hash),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_zset(&self) -> Result<&SortedSet, CommandError> {
		match self {
			Value::Zset(zset) => Ok(zset),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_zset_mut(&mut self) -> Result<&mut SortedSet, CommandError> {
		match self {
			Value::Zset(zset) => Ok(zset),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_bitmap(&self) -> Result<&Vec<u8>, CommandError> {
		match self {
			// SETBIT over a plain string is legal; they share storage.
			Value::Bitmap(bytes) | Value::Str(bytes) => Ok(bytes),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_bitmap_mut(&mut self) -> Result<&mut Vec<u8>, CommandError> {
		match self {
			Value::Bitmap(bytes) | Value::Str(bytes) => Ok(bytes),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_hll_mut(&mut self) -> Result<&mut HyperLogLog, CommandError> {
		match self {
			Value::Hll(hll) => Ok(hll),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_hll(&self) -> Result<&HyperLogLog, CommandError> {
		match self {
			Value::Hll(hll) => Ok(hll),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_bloom_mut(&mut self) -> Result<&mut BloomFilter, CommandError> {
		match self {
			Value::Bloom(bloom) => Ok(bloom),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_bloom(&self) -> Result<&BloomFilter, CommandError> {
		match self {
			Value::Bloom(bloom) => Ok(bloom),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_cms_mut(&mut self) -> Result<&mut CountMinSketch, CommandError> {
		match self {
			Value::Cms(cms) => Ok(cms),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_cms(&self) -> Result<&CountMinSketch, CommandError> {
		match self {
			Value::Cms(cms) => Ok(cms),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_cuckoo_mut(&mut self) -> Result<&mut CuckooFilter, CommandError> {
		match self {
			Value::Cuckoo(filter) => Ok(filter),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_cuckoo(&self) -> Result<&CuckooFilter, CommandError> {
		match self {
			Value::Cuckoo(filter) => Ok(filter),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_topk_mut(&mut self) -> Result<&mut TopK, CommandError> {
		match self {
			Value::TopK(topk) => Ok(topk),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_topk(&self) -> Result<&TopK, CommandError> {
		match self {
			Value::TopK(topk) => Ok(topk),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_tdigest_mut(&mut self) -> Result<&mut TDigest, CommandError> {
		match self {
			Value::TDigest(digest) => Ok(digest),
			_ => Err(CommandError::WrongType),
		}
	}

	pub fn as_tdigest(&self) -> Result<&TDigest, CommandError> {
		match self {
			Value::TDigest(digest) => Ok(digest),
			_ => Err(CommandError::WrongType),
		}
	}

	/// Serializes a probabilistic value for the replication full-state
	/// dump. Plain containers reconstruct from ordinary commands and
	/// return `None` here.
	pub fn serialize_opaque(&self) -> Option<(&'static str, Vec<u8>)> {
		let payload = match self {
			Value::Hll(hll) => serde_json::to_vec(hll),
			Value::Bloom(bloom) => serde_json::to_vec(bloom),
			Value::Cms(cms) => serde_json::to_vec(cms),
			Value::Cuckoo(filter) => serde_json::to_vec(filter),
			Value::TopK(topk) => serde_json::to_vec(topk),
			Value::TDigest(digest) => serde_json::to_vec(digest),
			_ => return None,
		};
		payload.ok().map(|payload| (self.type_name(), payload))
	}

	/// Inverse of [`Value::serialize_opaque`], plus the raw-bytes bitmap
	/// form the dump uses because no public command retags a string.
	pub fn deserialize_opaque(kind: &[u8], payload: &[u8]) -> Result<Value, CommandError> {
		let invalid = |_| CommandError::Other("invalid opaque value payload".to_string());
		match kind {
			b"bitmap" => Ok(Value::Bitmap(payload.to_vec())),
			b"hyperloglog" => Ok(Value::Hll(serde_json::from_slice(payload).map_err(invalid)?)),
			b"bloomfilter" => Ok(Value::Bloom(serde_json::from_slice(payload).map_err(invalid)?)),
			b"countminsketch" => Ok(Value::Cms(serde_json::from_slice(payload).map_err(invalid)?)),
			b"cuckoofilter" => {
				Ok(Value::Cuckoo(serde_json::from_slice(payload).map_err(invalid)?))
			}
			b"topk" => Ok(Value::TopK(serde_json::from_slice(payload).map_err(invalid)?)),
			b"tdigest" => {
				Ok(Value::TDigest(serde_json::from_slice(payload).map_err(invalid)?))
			}
			_ => Err(CommandError::Other("unknown opaque value kind".to_string())),
		}
	}
}

/// One keyspace slot: payload, mutation version, optional expiry.
///
/// The version is folded into the entry so a write touches one map slot,
/// and it is drawn from a process-global monotonic counter so a deleted and
/// recreated key can never reproduce a version a WATCH snapshotted.
#[derive(Debug, Clone)]
pub struct Entry {
	pub value: Value,
	pub version: u64,
	/// Absolute expiry in epoch milliseconds.
	pub expires_at: Option<u64>,
}

impl Entry {
	pub fn new(value: Value, version: u64) -> Self {
		Self {
			value,
			version,
			expires_at: None,
		}
	}

	pub fn is_expired(&self, now_ms: u64) -> bool {
		matches!(self.expires_at, Some(deadline) if deadline <= now_ms)
	}
}
