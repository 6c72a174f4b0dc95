// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Expiry deadlines are absolute wall
/// clock stamps so they survive AOF replay unchanged.
pub fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}
