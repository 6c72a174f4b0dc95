// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ember_protocol::{Decoder, Frame, encode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::command::Action;
use crate::dispatch::dispatch;
use crate::replication;
use crate::server::Server;
use crate::session::Session;

/// Drives one client connection to completion. Any exit path releases the
/// session, which discards an in-progress `MULTI` queue and its watches.
pub async fn handle(server: Arc<Server>, stream: TcpStream, peer: SocketAddr) {
	server.stats.connection_opened();
	debug!(%peer, "connection opened");
	if let Err(err) = run(&server, stream).await {
		debug!(%peer, %err, "connection closed with error");
	} else {
		debug!(%peer, "connection closed");
	}
	server.stats.connection_closed();
}

enum Exit {
	/// Peer closed or asked to quit.
	Done,
	/// Connection becomes the master side of a replication stream.
	ReplicaStream,
}

async fn run(server: &Arc<Server>, stream: TcpStream) -> std::io::Result<()> {
	let (mut reader, mut writer) = stream.into_split();
	let mut decoder = Decoder::new();
	let mut session = Session::new();
	let mut buf = [0u8; 16 * 1024];
	let mut out = Vec::new();

	let read_timeout = server
		.config
		.server
		.read_timeout()
		.or(server.config.server.idle_timeout());
	let write_timeout = server.config.server.write_timeout();

	loop {
		let read = match bounded(read_timeout, reader.read(&mut buf)).await {
			None => {
				debug!("read timeout; closing connection");
				return Ok(());
			}
			Some(read) => read?,
		};
		if read == 0 {
			return Ok(());
		}
		decoder.feed(&buf[..read]);

		// Drain every fully buffered frame before replying, so pipelined
		// requests get one batched write in request order.
		out.clear();
		let mut exit = None;
		loop {
			let frame = match decoder.try_next() {
				Ok(None) => break,
				Ok(Some(frame)) => frame,
				Err(err) => {
					warn!(%err, "framing error; closing connection");
					encode(
						&Frame::error(format!("ERR protocol error: {err}")),
						&mut out,
					);
					exit = Some(Exit::Done);
					break;
				}
			};
			let args = match frame.into_command() {
				Ok(args) => args,
				Err(err) => {
					warn!(%err, "malformed command; closing connection");
					encode(
						&Frame::error(format!("ERR protocol error: {err}")),
						&mut out,
					);
					exit = Some(Exit::Done);
					break;
				}
			};
			trace!(command = %String::from_utf8_lossy(&args[0]), "request");
			let (reply, action) = dispatch(server, &mut session, &args);
			match action {
				Some(Action::StartReplicaStream) => {
					exit = Some(Exit::ReplicaStream);
					break;
				}
				Some(Action::CloseConnection) => {
					encode(&reply, &mut out);
					exit = Some(Exit::Done);
					break;
				}
				None => encode(&reply, &mut out),
			}
		}

		if !out.is_empty() {
			match bounded(write_timeout, writer.write_all(&out)).await {
				None => {
					debug!("write timeout; closing connection");
					return Ok(());
				}
				Some(result) => result?,
			}
		}

		match exit {
			None => {}
			Some(Exit::Done) => return Ok(()),
			Some(Exit::ReplicaStream) => {
				return replication::serve_replica(server.clone(), reader, writer)
					.await;
			}
		}
	}
}

/// Applies an optional timeout; `None` in the result means it fired.
async fn bounded<T>(
	timeout: Option<Duration>,
	future: impl Future<Output = T>,
) -> Option<T> {
	match timeout {
		None => Some(future.await),
		Some(limit) => tokio::time::timeout(limit, future).await.ok(),
	}
}
