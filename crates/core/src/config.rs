// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate runtime configuration.
///
/// The library consumes this typed form only; how it gets populated (file,
/// environment, defaults) is the binary's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub server: ServerConfig,
	pub aof: AofConfig,
	pub defrag: DefragConfig,
	pub replication: ReplicationConfig,
	pub acl: AclConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	pub max_connections: usize,
	/// Zero disables the corresponding timeout.
	pub read_timeout_ms: u64,
	pub write_timeout_ms: u64,
	pub idle_timeout_ms: u64,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 6379,
			max_connections: 10_000,
			read_timeout_ms: 0,
			write_timeout_ms: 30_000,
			idle_timeout_ms: 0,
		}
	}
}

impl ServerConfig {
	pub fn read_timeout(&self) -> Option<Duration> {
		duration_opt(self.read_timeout_ms)
	}

	pub fn write_timeout(&self) -> Option<Duration> {
		duration_opt(self.write_timeout_ms)
	}

	pub fn idle_timeout(&self) -> Option<Duration> {
		duration_opt(self.idle_timeout_ms)
	}
}

fn duration_opt(ms: u64) -> Option<Duration> {
	if ms == 0 { None } else { Some(Duration::from_millis(ms)) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
	/// fsync after every drained batch.
	Always,
	/// fsync on a timer, `sync_interval` apart.
	EverySec,
	/// Leave flushing to the operating system.
	No,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AofConfig {
	pub enabled: bool,
	pub path: String,
	pub sync_strategy: SyncStrategy,
	pub sync_interval_ms: u64,
	/// Queue capacity in frames; a full queue blocks producers.
	pub buffer_size: usize,
	pub enable_rotation: bool,
	pub rotation_size: u64,
}

impl Default for AofConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			path: "ember.aof".to_string(),
			sync_strategy: SyncStrategy::EverySec,
			sync_interval_ms: 1_000,
			buffer_size: 8_192,
			enable_rotation: false,
			rotation_size: 512 * 1024 * 1024,
		}
	}
}

impl AofConfig {
	pub fn sync_interval(&self) -> Duration {
		Duration::from_millis(self.sync_interval_ms.max(1))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefragConfig {
	pub interval_ms: u64,
	/// Rebuild a shard when live entries / table capacity drops below this.
	pub fragmentation_threshold: f64,
}

impl Default for DefragConfig {
	fn default() -> Self {
		Self {
			interval_ms: 60_000,
			fragmentation_threshold: 0.25,
		}
	}
}

impl DefragConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms.max(100))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Master,
	Replica,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
	pub role: Role,
	pub master_host: String,
	pub master_port: u16,
	/// Port the master listens on for replica registrations; zero disables.
	pub listen_port: u16,
}

impl Default for ReplicationConfig {
	fn default() -> Self {
		Self {
			role: Role::Master,
			master_host: String::new(),
			master_port: 0,
			listen_port: 0,
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
	/// Empty means authentication is disabled and every connection runs as
	/// an implicit superuser.
	pub users: Vec<AclUserConfig>,
}

impl AclConfig {
	pub fn auth_required(&self) -> bool {
		!self.users.is_empty()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AclUserConfig {
	pub name: String,
	pub enabled: bool,
	pub nopass: bool,
	/// Argon2id PHC strings; any one of them authenticates the user.
	pub password_hashes: Vec<String>,
	/// Allowed command categories: `read`, `write`, `admin`, or `all`.
	pub categories: Vec<String>,
	/// Glob patterns over keys; empty means all keys.
	pub key_patterns: Vec<String>,
}

impl Default for AclUserConfig {
	fn default() -> Self {
		Self {
			name: String::new(),
			enabled: true,
			nopass: false,
			password_hashes: Vec::new(),
			categories: vec!["all".to_string()],
			key_patterns: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_round_trip() {
		let config = Config::default();
		let json = serde_json::to_string(&config).unwrap();
		let back: Config = serde_json::from_str(&json).unwrap();
		assert_eq!(back.server.port, 6379);
		assert_eq!(back.aof.sync_strategy, SyncStrategy::EverySec);
		assert_eq!(back.replication.role, Role::Master);
	}

	#[test]
	fn test_partial_config_fills_defaults() {
		let config: Config =
			serde_json::from_str(r#"{"server": {"port": 7000}}"#).unwrap();
		assert_eq!(config.server.port, 7000);
		assert_eq!(config.server.host, "127.0.0.1");
		assert!(config.aof.enabled);
	}

	#[test]
	fn test_zero_timeout_disables() {
		let server = ServerConfig::default();
		assert!(server.read_timeout().is_none());
		assert!(server.write_timeout().is_some());
	}
}
