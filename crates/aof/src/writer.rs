// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use ember_core::{AofConfig, SyncStrategy};
use tracing::{debug, error, info, warn};

use crate::{AofError, LockFile};

/// Frames arriving within this window coalesce into one buffered write.
const BATCH_WINDOW: Duration = Duration::from_millis(100);

/// Handle to the append-only log.
///
/// Producers enqueue pre-framed commands on a bounded channel; one consumer
/// thread owns the file descriptor, batches writes, applies the fsync
/// strategy and rotates the file when it outgrows the configured size. A
/// full queue blocks the producer briefly, which is the back-pressure the
/// command pipeline expects. Dropping the handle drains the queue and
/// performs a final fsync before the thread exits.
pub struct AofWriter {
	tx: Option<Sender<Vec<u8>>>,
	consumer: Option<JoinHandle<()>>,
	failed_writes: Arc<AtomicU64>,
	fatal: Arc<AtomicBool>,
	_lock: LockFile,
}

impl AofWriter {
	/// Acquires the advisory lock, opens the file for append and starts
	/// the consumer thread.
	pub fn open(config: AofConfig) -> crate::Result<Self> {
		let lock = LockFile::acquire(&config.path)?;
		let file = OpenOptions::new().create(true).append(true).open(&config.path)?;
		let size = file.metadata()?.len();

		let (tx, rx) = bounded::<Vec<u8>>(config.buffer_size.max(1));
		let failed_writes = Arc::new(AtomicU64::new(0));
		let fatal = Arc::new(AtomicBool::new(false));

		let consumer = Consumer {
			config,
			rx,
			writer: BufWriter::new(file),
			size,
			unsynced: false,
			last_sync: Instant::now(),
			failed_writes: failed_writes.clone(),
			fatal: fatal.clone(),
		};
		let handle = std::thread::Builder::new()
			.name("aof-writer".to_string())
			.spawn(move || consumer.run())?;

		Ok(Self {
			tx: Some(tx),
			consumer: Some(handle),
			failed_writes,
			fatal,
			_lock: lock,
		})
	}

	/// Enqueues one framed command. Blocks while the queue is full; a
	/// closed queue (shutdown race) only logs, because append failures
	/// must never fail the client reply.
	pub fn append(&self, frame: Vec<u8>) {
		if let Some(tx) = &self.tx
			&& tx.send(frame).is_err()
		{
			warn!("aof queue closed; frame dropped");
		}
	}

	/// Write failures observed so far; surfaced through `INFO`.
	pub fn failed_writes(&self) -> u64 {
		self.failed_writes.load(Ordering::Relaxed)
	}

	/// True after an unrecoverable writer failure (reopen or rotation
	/// failed). The server treats this as a shutdown trigger.
	pub fn is_fatal(&self) -> bool {
		self.fatal.load(Ordering::Relaxed)
	}

	/// Drains outstanding frames and fsyncs before returning.
	pub fn close(mut self) {
		self.shutdown();
	}

	fn shutdown(&mut self) {
		drop(self.tx.take());
		if let Some(handle) = self.consumer.take()
			&& handle.join().is_err()
		{
			error!("aof consumer thread panicked");
		}
	}
}

impl Drop for AofWriter {
	fn drop(&mut self) {
		self.shutdown();
	}
}

struct Consumer {
	config: AofConfig,
	rx: Receiver<Vec<u8>>,
	writer: BufWriter<File>,
	size: u64,
	unsynced: bool,
	last_sync: Instant,
	failed_writes: Arc<AtomicU64>,
	fatal: Arc<AtomicBool>,
}

impl Consumer {
	fn run(mut self) {
		loop {
			match self.rx.recv_timeout(BATCH_WINDOW) {
				Ok(frame) => {
					let mut batch = vec![frame];
					// Everything already queued joins this batch.
					while let Ok(frame) = self.rx.try_recv() {
						batch.push(frame);
					}
					self.write_batch(&batch);
				}
				Err(RecvTimeoutError::Timeout) => self.tick(),
				Err(RecvTimeoutError::Disconnected) => break,
			}
			if self.fatal.load(Ordering::Relaxed) {
				break;
			}
		}
		self.flush_and_sync();
		debug!("aof consumer stopped");
	}

	fn write_batch(&mut self, batch: &[Vec<u8>]) {
		for frame in batch {
			if self.config.enable_rotation
				&& self.size > 0 && self.size + frame.len() as u64
				> self.config.rotation_size
			{
				self.rotate();
			}
			match self.writer.write_all(frame) {
				Ok(()) => self.size += frame.len() as u64,
				Err(err) => {
					self.failed_writes.fetch_add(1, Ordering::Relaxed);
					error!(%err, "aof write failed");
				}
			}
		}
		self.unsynced = true;
		match self.config.sync_strategy {
			SyncStrategy::Always => self.flush_and_sync(),
			SyncStrategy::EverySec => self.tick(),
			SyncStrategy::No => {
				if let Err(err) = self.writer.flush() {
					self.failed_writes.fetch_add(1, Ordering::Relaxed);
					error!(%err, "aof flush failed");
				}
			}
		}
	}

	/// Timer-driven flush path for the `everysec` strategy.
	fn tick(&mut self) {
		if self.config.sync_strategy == SyncStrategy::EverySec
			&& self.unsynced && self.last_sync.elapsed() >= self.config.sync_interval()
		{
			self.flush_and_sync();
		}
	}

	fn flush_and_sync(&mut self) {
		if let Err(err) = self.writer.flush() {
			self.failed_writes.fetch_add(1, Ordering::Relaxed);
			error!(%err, "aof flush failed");
			return;
		}
		if self.config.sync_strategy != SyncStrategy::No
			&& let Err(err) = self.writer.get_ref().sync_data()
		{
			self.failed_writes.fetch_add(1, Ordering::Relaxed);
			error!(%err, "aof fsync failed");
			return;
		}
		self.unsynced = false;
		self.last_sync = Instant::now();
	}

	/// Renames the current file with a timestamp suffix and starts a fresh
	/// one. The rename completes before any frame lands in the new file.
	fn rotate(&mut self) {
		self.flush_and_sync();
		let suffix = timestamp_suffix();
		let mut rotated = format!("{}.{}", self.config.path, suffix);
		// Two rotations inside one second would collide on the suffix.
		let mut attempt = 1;
		while std::path::Path::new(&rotated).exists() {
			rotated = format!("{}.{}-{attempt}", self.config.path, suffix);
			attempt += 1;
		}
		if let Err(err) = std::fs::rename(&self.config.path, &rotated) {
			error!(%err, rotated, "aof rotation rename failed");
			self.fatal.store(true, Ordering::Relaxed);
			return;
		}
		match OpenOptions::new().create(true).append(true).open(&self.config.path) {
			Ok(file) => {
				self.writer = BufWriter::new(file);
				self.size = 0;
				info!(rotated, "aof rotated");
			}
			Err(err) => {
				error!(%err, "aof reopen after rotation failed");
				self.fatal.store(true, Ordering::Relaxed);
			}
		}
	}
}

/// `YYYYMMDDhhmmss` in UTC for rotation suffixes.
fn timestamp_suffix() -> String {
	let secs = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0);
	let days = (secs / 86_400) as i64;
	let (year, month, day) = civil_from_days(days);
	let rem = secs % 86_400;
	format!(
		"{year:04}{month:02}{day:02}{:02}{:02}{:02}",
		rem / 3_600,
		(rem % 3_600) / 60,
		rem % 60
	)
}

/// Days-since-epoch to civil date (Howard Hinnant's algorithm).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
	let days = days + 719_468;
	let era = days.div_euclid(146_097);
	let doe = days.rem_euclid(146_097);
	let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
	let year = yoe + era * 400;
	let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
	let mp = (5 * doy + 2) / 153;
	let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
	let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
	(if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_config(name: &str) -> AofConfig {
		AofConfig {
			path: std::env::temp_dir()
				.join(format!("ember-aof-writer-{}-{name}.aof", std::process::id()))
				.display()
				.to_string(),
			sync_strategy: SyncStrategy::Always,
			..Default::default()
		}
	}

	fn cleanup(config: &AofConfig) {
		let dir = std::path::Path::new(&config.path).parent().unwrap().to_path_buf();
		let base = std::path::Path::new(&config.path)
			.file_name()
			.unwrap()
			.to_string_lossy()
			.to_string();
		if let Ok(entries) = std::fs::read_dir(dir) {
			for entry in entries.flatten() {
				if entry.file_name().to_string_lossy().starts_with(&base) {
					let _ = std::fs::remove_file(entry.path());
				}
			}
		}
	}

	#[test]
	fn test_append_reaches_disk_on_close() {
		let config = temp_config("basic");
		cleanup(&config);
		let writer = AofWriter::open(config.clone()).unwrap();
		writer.append(b"*1\r\n$4\r\nPING\r\n".to_vec());
		writer.append(b"*1\r\n$4\r\nPING\r\n".to_vec());
		writer.close();
		let contents = std::fs::read(&config.path).unwrap();
		assert_eq!(contents, b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n".to_vec());
		cleanup(&config);
	}

	#[test]
	fn test_second_open_is_locked() {
		let config = temp_config("locked");
		cleanup(&config);
		let writer = AofWriter::open(config.clone()).unwrap();
		assert!(matches!(
			AofWriter::open(config.clone()),
			Err(AofError::Locked { .. })
		));
		writer.close();
		cleanup(&config);
	}

	#[test]
	fn test_rotation_renames_with_suffix() {
		let mut config = temp_config("rotate");
		cleanup(&config);
		config.enable_rotation = true;
		config.rotation_size = 32;
		let writer = AofWriter::open(config.clone()).unwrap();
		for _ in 0..8 {
			writer.append(b"*1\r\n$4\r\nPING\r\n".to_vec());
		}
		writer.close();

		let dir = std::path::Path::new(&config.path).parent().unwrap();
		let base = std::path::Path::new(&config.path)
			.file_name()
			.unwrap()
			.to_string_lossy()
			.to_string();
		let rotated: Vec<String> = std::fs::read_dir(dir)
			.unwrap()
			.flatten()
			.map(|entry| entry.file_name().to_string_lossy().to_string())
			.filter(|name| name.starts_with(&format!("{base}.")) && !name.ends_with(".lock"))
			.collect();
		assert!(!rotated.is_empty(), "expected rotated files");
		// Suffix starts with the 14-digit timestamp; same-second rotations
		// carry a disambiguating tail.
		let suffix = rotated[0].rsplit('.').next().unwrap();
		assert!(suffix.len() >= 14, "suffix {suffix}");
		assert!(suffix.bytes().take(14).all(|b| b.is_ascii_digit()));
		cleanup(&config);
	}

	#[test]
	fn test_civil_from_days() {
		assert_eq!(civil_from_days(0), (1970, 1, 1));
		assert_eq!(civil_from_days(19_723), (2024, 1, 1));
		assert_eq!(civil_from_days(20_483), (2026, 1, 30));
	}
}
