// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use ember_aof::{AofError, AofWriter};
use ember_auth::{Acl, AuthError};
use ember_core::{Config, PatternCache, Role};
use ember_keyspace::Keyspace;
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{error, info, warn};

use crate::connection;
use crate::dispatch::apply_for_replay;
use crate::replication::{self, ReplicaSet};
use crate::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("invalid acl configuration: {0}")]
	Acl(#[from] AuthError),

	#[error("append-only log failure: {0}")]
	Aof(#[from] AofError),

	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: String,
		source: std::io::Error,
	},

	#[error("i/o failure: {0}")]
	Io(#[from] std::io::Error),
}

/// Run-time counters surfaced through `INFO`.
#[derive(Debug)]
pub struct Stats {
	started: Instant,
	commands: AtomicU64,
	connections: AtomicI64,
	master_link: AtomicBool,
}

impl Default for Stats {
	fn default() -> Self {
		Self {
			started: Instant::now(),
			commands: AtomicU64::new(0),
			connections: AtomicI64::new(0),
			master_link: AtomicBool::new(false),
		}
	}
}

impl Stats {
	pub fn record_command(&self) {
		self.commands.fetch_add(1, Ordering::Relaxed);
	}

	pub fn commands(&self) -> u64 {
		self.commands.load(Ordering::Relaxed)
	}

	pub fn connection_opened(&self) {
		self.connections.fetch_add(1, Ordering::Relaxed);
	}

	pub fn connection_closed(&self) {
		self.connections.fetch_sub(1, Ordering::Relaxed);
	}

	pub fn connections(&self) -> i64 {
		self.connections.load(Ordering::Relaxed).max(0)
	}

	pub fn uptime_seconds(&self) -> u64 {
		self.started.elapsed().as_secs()
	}

	pub fn set_master_link(&self, up: bool) {
		self.master_link.store(up, Ordering::Relaxed);
	}

	pub fn master_link_up(&self) -> bool {
		self.master_link.load(Ordering::Relaxed)
	}
}

/// The shared server state every connection task dispatches against.
pub struct Server {
	pub config: Config,
	pub keyspace: Keyspace,
	pub patterns: PatternCache,
	pub acl: Acl,
	pub aof: Option<AofWriter>,
	pub replicas: ReplicaSet,
	/// Ordinary commands hold this shared; `EXEC` and the replica dump
	/// hold it exclusively so they observe and produce a quiesced
	/// keyspace.
	pub exec_gate: RwLock<()>,
	/// Mutating commands serialize on this across mutation + log append,
	/// which pins AOF append order to keyspace commit order. Reads never
	/// touch it.
	pub commit_seq: Mutex<()>,
	pub stats: Stats,
	shutdown: Notify,
}

impl Server {
	/// Builds the server: compile the ACL, replay the append-only log
	/// through the ordinary dispatch path (with AOF output detached, so
	/// nothing is re-appended), then attach the writer.
	pub fn bootstrap(config: Config) -> crate::Result<Self> {
		let acl = Acl::from_config(&config.acl)?;
		let mut server = Server {
			keyspace: Keyspace::new(),
			patterns: PatternCache::new(),
			acl,
			aof: None,
			replicas: ReplicaSet::new(),
			exec_gate: RwLock::new(()),
			commit_seq: Mutex::new(()),
			stats: Stats::default(),
			shutdown: Notify::new(),
			config,
		};

		if server.config.aof.enabled {
			let path = Path::new(&server.config.aof.path).to_path_buf();
			let stats = ember_aof::replay(&path, |args| {
				let mut session = Session::privileged();
				apply_for_replay(&server, &mut session, &args)
			})?;
			info!(
				applied = stats.applied,
				failed = stats.failed,
				truncated = stats.truncated_bytes,
				"append-only log recovered"
			);
			server.aof = Some(AofWriter::open(server.config.aof.clone())?);
		}
		Ok(server)
	}

	/// In-memory instance for tests and embedded use: no AOF, defaults
	/// everywhere.
	pub fn in_memory(config: Config) -> crate::Result<Self> {
		let mut config = config;
		config.aof.enabled = false;
		Self::bootstrap(config)
	}

	pub fn request_shutdown(&self) {
		self.shutdown.notify_waiters();
	}

	/// Accept loop plus the background tasks (expiry sweeper,
	/// defragmenter, replica link, AOF health watch). Returns after a
	/// shutdown request or ctrl-c, with the AOF drained.
	pub async fn serve(self: Arc<Self>) -> crate::Result<()> {
		let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
		let listener = TcpListener::bind(&addr).await.map_err(|source| {
			ServerError::Bind {
				addr: addr.clone(),
				source,
			}
		})?;
		info!(addr, "listening");

		spawn_background_tasks(&self);

		let replica_listener = match self.config.replication.listen_port {
			0 => None,
			port => {
				let addr = format!("{}:{}", self.config.server.host, port);
				let listener =
					TcpListener::bind(&addr).await.map_err(|source| {
						ServerError::Bind {
							addr: addr.clone(),
							source,
						}
					})?;
				info!(addr, "replication endpoint listening");
				Some(listener)
			}
		};

		let permits = Arc::new(Semaphore::new(self.config.server.max_connections.max(1)));
		loop {
			tokio::select! {
				accepted = listener.accept() => {
					accept_connection(&self, accepted, &permits);
				}
				accepted = accept_optional(replica_listener.as_ref()) => {
					accept_connection(&self, accepted, &permits);
				}
				_ = tokio::signal::ctrl_c() => {
					info!("ctrl-c received; shutting down");
					break;
				}
				_ = self.shutdown.notified() => {
					info!("shutdown requested");
					break;
				}
			}
		}
		Ok(())
	}
}

fn accept_connection(
	server: &Arc<Server>,
	accepted: std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>,
	permits: &Arc<Semaphore>,
) {
	match accepted {
		Err(err) => warn!(%err, "accept failed"),
		Ok((stream, peer)) => {
			let permit = match permits.clone().try_acquire_owned() {
				Ok(permit) => permit,
				Err(_) => {
					warn!(%peer, "connection limit reached; rejecting");
					return;
				}
			};
			let server = server.clone();
			tokio::spawn(async move {
				let _permit = permit;
				connection::handle(server, stream, peer).await;
			});
		}
	}
}

fn spawn_background_tasks(server: &Arc<Server>) {
	let sweeper = server.clone();
	tokio::spawn(async move {
		let mut tick = tokio::time::interval(std::time::Duration::from_millis(500));
		loop {
			tick.tick().await;
			sweeper.keyspace.sweep_expired(512);
		}
	});

	let defrag = server.clone();
	tokio::spawn(async move {
		let mut tick = tokio::time::interval(defrag.config.defrag.interval());
		tick.tick().await;
		loop {
			tick.tick().await;
			defrag.keyspace.defragment(defrag.config.defrag.fragmentation_threshold);
		}
	});

	if server.aof.is_some() {
		let aof_watch = server.clone();
		tokio::spawn(async move {
			let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
			loop {
				tick.tick().await;
				if aof_watch.aof.as_ref().map(|aof| aof.is_fatal()).unwrap_or(false) {
					error!("fatal append-only log failure; shutting down");
					aof_watch.request_shutdown();
					return;
				}
			}
		});
	}

	if server.config.replication.role == Role::Replica
		&& !server.config.replication.master_host.is_empty()
	{
		tokio::spawn(replication::run_link(server.clone()));
	}
}

async fn accept_optional(
	listener: Option<&TcpListener>,
) -> std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)> {
	match listener {
		Some(listener) => listener.accept().await,
		None => std::future::pending().await,
	}
}
