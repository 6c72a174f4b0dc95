// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::warn;

use crate::AofError;

/// Advisory lock guarding the append-only file against a second process.
///
/// The lock is a sibling `<path>.lock` file created with `create_new`, so
/// acquisition is atomic on every platform. The owner's pid is recorded for
/// operators; the file is removed on drop.
#[derive(Debug)]
pub struct LockFile {
	path: PathBuf,
}

impl LockFile {
	pub fn acquire(aof_path: &str) -> crate::Result<Self> {
		let path = PathBuf::from(format!("{aof_path}.lock"));
		let mut file = OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(&path)
			.map_err(|err| {
				if err.kind() == std::io::ErrorKind::AlreadyExists {
					AofError::Locked {
						path: path.display().to_string(),
					}
				} else {
					AofError::Io { source: err }
				}
			})?;
		let _ = writeln!(file, "{}", std::process::id());
		Ok(Self { path })
	}
}

impl Drop for LockFile {
	fn drop(&mut self) {
		if let Err(err) = fs::remove_file(&self.path) {
			warn!(path = %self.path.display(), %err, "failed to remove aof lock file");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_path(name: &str) -> String {
		std::env::temp_dir()
			.join(format!("ember-lock-test-{}-{name}", std::process::id()))
			.display()
			.to_string()
	}

	#[test]
	fn test_exclusive_acquire_and_release() {
		let path = temp_path("basic");
		let lock = LockFile::acquire(&path).unwrap();
		assert!(matches!(
			LockFile::acquire(&path),
			Err(AofError::Locked { .. })
		));
		drop(lock);
		let relocked = LockFile::acquire(&path).unwrap();
		drop(relocked);
	}

	#[test]
	fn test_lock_file_records_pid() {
		let path = temp_path("pid");
		let lock = LockFile::acquire(&path).unwrap();
		let contents = std::fs::read_to_string(format!("{path}.lock")).unwrap();
		assert_eq!(contents.trim(), std::process::id().to_string());
		drop(lock);
	}
}
