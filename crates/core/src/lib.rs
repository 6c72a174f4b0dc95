// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use config::{
	AclConfig, AclUserConfig, AofConfig, Config, DefragConfig, ReplicationConfig, Role,
	ServerConfig, SyncStrategy,
};
pub use error::CommandError;
pub use float::{OrderedF64, format_f64};
pub use pattern::{GlobPattern, PatternCache, literal_prefix};

mod config;
mod error;
mod float;
pub mod parse;
mod pattern;

pub type Result<T> = std::result::Result<T, CommandError>;
