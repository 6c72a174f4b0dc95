// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ember_protocol::Decoder;
use tracing::{info, warn};

use crate::AofError;

/// Outcome of one recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
	pub applied: u64,
	pub failed: u64,
	/// Bytes of a trailing partial frame left behind by a crash mid-write.
	pub truncated_bytes: u64,
}

/// Replays the append-only file through `apply`, one framed command at a
/// time, in write order.
///
/// A trailing partial frame (crash mid-write) stops recovery cleanly
/// without discarding the frames before it. A malformed frame anywhere
/// else is corruption and aborts with [`AofError::Corrupt`]. Command-level
/// failures from `apply` are counted and skipped: the log may legitimately
/// contain commands that fail against an already-recovered state.
pub fn replay(
	path: &Path,
	mut apply: impl FnMut(Vec<Vec<u8>>) -> Result<(), ember_core::CommandError>,
) -> crate::Result<ReplayStats> {
	let mut file = match File::open(path) {
		Ok(file) => file,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
			return Ok(ReplayStats::default());
		}
		Err(err) => return Err(AofError::Io { source: err }),
	};

	let mut decoder = Decoder::new();
	let mut chunk = [0u8; 64 * 1024];
	let mut consumed: u64 = 0;
	let mut stats = ReplayStats::default();
	loop {
		let read = file.read(&mut chunk)?;
		if read == 0 {
			break;
		}
		decoder.feed(&chunk[..read]);
		drain(&mut decoder, &mut consumed, &mut stats, &mut apply)?;
	}
	// Whatever the decoder still holds is a partial tail.
	drain(&mut decoder, &mut consumed, &mut stats, &mut apply)?;
	stats.truncated_bytes = decoder.pending() as u64;
	if stats.truncated_bytes > 0 {
		warn!(
			bytes = stats.truncated_bytes,
			"aof ends in a partial frame; recovery stopped before it"
		);
	}
	info!(applied = stats.applied, failed = stats.failed, "aof replay complete");
	Ok(stats)
}

fn drain(
	decoder: &mut Decoder,
	consumed: &mut u64,
	stats: &mut ReplayStats,
	apply: &mut impl FnMut(Vec<Vec<u8>>) -> Result<(), ember_core::CommandError>,
) -> crate::Result<()> {
	loop {
		let before = decoder.pending() as u64;
		match decoder.try_next() {
			Ok(None) => return Ok(()),
			Ok(Some(frame)) => {
				*consumed += before - decoder.pending() as u64;
				let args = frame.into_command().map_err(|err| AofError::Corrupt {
					offset: *consumed,
					reason: err.to_string(),
				})?;
				match apply(args) {
					Ok(()) => stats.applied += 1,
					Err(err) => {
						stats.failed += 1;
						warn!(%err, "aof replay command failed");
					}
				}
			}
			Err(err) => {
				return Err(AofError::Corrupt {
					offset: *consumed,
					reason: err.to_string(),
				});
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_protocol::{Frame, encode_to_vec};

	fn temp_path(name: &str) -> std::path::PathBuf {
		std::env::temp_dir().join(format!("ember-aof-replay-{}-{name}.aof", std::process::id()))
	}

	fn command(words: &[&str]) -> Vec<u8> {
		let args: Vec<Vec<u8>> = words.iter().map(|w| w.as_bytes().to_vec()).collect();
		encode_to_vec(&Frame::command(&args))
	}

	#[test]
	fn test_replay_in_order() {
		let path = temp_path("order");
		let mut log = Vec::new();
		log.extend(command(&["SET", "k1", "v1"]));
		log.extend(command(&["DEL", "k1"]));
		std::fs::write(&path, &log).unwrap();

		let mut seen = Vec::new();
		let stats = replay(&path, |args| {
			seen.push(args[0].clone());
			Ok(())
		})
		.unwrap();
		assert_eq!(stats.applied, 2);
		assert_eq!(stats.truncated_bytes, 0);
		assert_eq!(seen, vec![b"SET".to_vec(), b"DEL".to_vec()]);
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_trailing_partial_frame_stops_cleanly() {
		let path = temp_path("partial");
		let mut log = command(&["SET", "k", "v"]);
		log.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$1");
		std::fs::write(&path, &log).unwrap();

		let mut applied = 0;
		let stats = replay(&path, |_| {
			applied += 1;
			Ok(())
		})
		.unwrap();
		assert_eq!(applied, 1);
		assert!(stats.truncated_bytes > 0);
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_mid_file_corruption_aborts() {
		let path = temp_path("corrupt");
		let mut log = b"!garbage\r\n".to_vec();
		log.extend(command(&["SET", "k", "v"]));
		std::fs::write(&path, &log).unwrap();

		assert!(matches!(
			replay(&path, |_| Ok(())),
			Err(AofError::Corrupt { .. })
		));
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_missing_file_is_empty_log() {
		let stats = replay(&temp_path("missing"), |_| Ok(())).unwrap();
		assert_eq!(stats, ReplayStats::default());
	}

	#[test]
	fn test_command_failures_are_counted_not_fatal() {
		let path = temp_path("cmdfail");
		let mut log = Vec::new();
		log.extend(command(&["SET", "k", "v"]));
		log.extend(command(&["LPUSH", "k", "x"]));
		std::fs::write(&path, &log).unwrap();

		let stats = replay(&path, |args| {
			if args[0] == b"LPUSH" {
				Err(ember_core::CommandError::WrongType)
			} else {
				Ok(())
			}
		})
		.unwrap();
		assert_eq!(stats.applied, 1);
		assert_eq!(stats.failed, 1);
		std::fs::remove_file(&path).unwrap();
	}
}
