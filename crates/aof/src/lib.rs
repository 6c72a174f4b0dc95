// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use error::AofError;
pub use lock::LockFile;
pub use recovery::{ReplayStats, replay};
pub use writer::AofWriter;

mod error;
mod lock;
mod recovery;
mod writer;

pub type Result<T> = std::result::Result<T, AofError>;
