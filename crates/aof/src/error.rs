// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AofError {
	#[error("append-only file is locked by another process (lock file: {path})")]
	Locked { path: String },

	#[error("append-only file i/o failed: {source}")]
	Io {
		#[from]
		source: std::io::Error,
	},

	#[error("append-only file corrupt at byte {offset}: {reason}")]
	Corrupt { offset: u64, reason: String },

	#[error("append-only writer is closed")]
	Closed,
}
