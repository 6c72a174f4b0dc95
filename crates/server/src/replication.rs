// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;
use std::time::Duration;

use ember_keyspace::{Value, now_ms};
use ember_protocol::{Decoder, Frame, encode, encode_to_vec};
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::dispatch::apply_for_replay;
use crate::server::Server;
use crate::session::Session;

/// Writer handles of the attached replicas.
///
/// Each replica connection owns an unbounded channel drained by its own
/// socket task, so one slow replica never stalls the command pipeline or
/// its siblings. Disconnected replicas are detected on send failure and
/// removed lazily.
#[derive(Debug, Default)]
pub struct ReplicaSet {
	senders: RwLock<Vec<UnboundedSender<Vec<u8>>>>,
}

impl ReplicaSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.senders.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn attach(&self) -> UnboundedReceiver<Vec<u8>> {
		let (tx, rx) = unbounded_channel();
		self.senders.write().push(tx);
		rx
	}

	/// Fans a framed command out to every replica. Closed channels are
	/// pruned afterwards.
	pub fn broadcast(&self, frame: Vec<u8>) {
		let mut lost = false;
		{
			let senders = self.senders.read();
			for sender in senders.iter() {
				lost |= sender.send(frame.clone()).is_err();
			}
		}
		if lost {
			self.senders.write().retain(|sender| !sender.is_closed());
			debug!(remaining = self.len(), "pruned disconnected replicas");
		}
	}
}

/// Commands that rebuild one entry, TTL included. The dump is the
/// concatenation over all live entries.
fn entry_commands(key: &[u8], value: &Value, expires_at: Option<u64>) -> Vec<Vec<Vec<u8>>> {
	let key = key.to_vec();
	let mut commands: Vec<Vec<Vec<u8>>> = Vec::new();
	match value {
		Value::Str(bytes) => {
			commands.push(vec![b"SET".to_vec(), key.clone(), bytes.clone()]);
		}
		Value::Bitmap(bytes) => {
			// SET leaves a string; a trailing SETBIT write would not
			// retag it, so ship the raw value through the internal
			// loader like the probabilistic types.
			commands.push(vec![
				b"EMBER.LOADVALUE".to_vec(),
				key.clone(),
				b"bitmap".to_vec(),
				bytes.clone(),
			]);
		}
		Value::List(list) => {
			let mut command = vec![b"RPUSH".to_vec(), key.clone()];
			command.extend(list.iter().cloned());
			commands.push(command);
		}
		Value::Set(set) => {
			let mut command = vec![b"SADD".to_vec(), key.clone()];
			command.extend(set.iter().cloned());
			commands.push(command);
		}
		Value::Hash(hash) => {
			let mut command = vec![b"HSET".to_vec(), key.clone()];
			for (field, item) in hash {
				command.push(field.clone());
				command.push(item.clone());
			}
			commands.push(command);
		}
		Value::Zset(zset) => {
			let mut command = vec![b"ZADD".to_vec(), key.clone()];
			for (member, score) in zset.iter() {
				command.push(ember_core::format_f64(score).into_bytes());
				command.push(member.clone());
			}
			commands.push(command);
		}
		probabilistic => match probabilistic.serialize_opaque() {
			Some((kind, payload)) => {
				commands.push(vec![
					b"EMBER.LOADVALUE".to_vec(),
					key.clone(),
					kind.as_bytes().to_vec(),
					payload,
				]);
			}
			None => {
				warn!("unserializable value skipped in replica dump");
			}
		},
	}
	if let Some(deadline) = expires_at
		&& deadline > now_ms()
	{
		commands.push(vec![
			b"PEXPIREAT".to_vec(),
			key,
			deadline.to_string().into_bytes(),
		]);
	}
	commands
}

/// Snapshots the keyspace as framed commands and attaches the replica
/// channel atomically: the exclusive gate quiesces writers, so nothing can
/// land in both the dump and the live stream.
fn begin_sync(server: &Server) -> (Vec<Vec<u8>>, UnboundedReceiver<Vec<u8>>) {
	let _exclusive = server.exec_gate.write();
	let receiver = server.replicas.attach();
	let mut frames = Vec::new();
	server.keyspace.for_each(|key, entry| {
		for command in entry_commands(key, &entry.value, entry.expires_at) {
			frames.push(encode_to_vec(&Frame::command(&command)));
		}
	});
	(frames, receiver)
}

/// Master side of `SYNC`: stream the dump, the terminator, then live
/// mutations until either end closes.
pub async fn serve_replica(
	server: Arc<Server>,
	mut reader: OwnedReadHalf,
	mut writer: OwnedWriteHalf,
) -> std::io::Result<()> {
	let (dump, mut live) = begin_sync(&server);
	info!(frames = dump.len(), "replica sync started");

	let mut out = Vec::new();
	for frame in dump {
		out.extend_from_slice(&frame);
	}
	encode(&Frame::simple("SYNC-END"), &mut out);
	writer.write_all(&out).await?;

	let mut discard = [0u8; 512];
	loop {
		tokio::select! {
			frame = live.recv() => match frame {
				None => return Ok(()),
				Some(bytes) => writer.write_all(&bytes).await?,
			},
			read = reader.read(&mut discard) => {
				// Replicas send nothing meaningful after SYNC; zero
				// means the link dropped.
				if read? == 0 {
					info!("replica disconnected");
					return Ok(());
				}
			}
		}
	}
}

/// Replica side: maintain the outbound link to the master, apply the dump
/// and then the live stream, reconnecting with a fixed backoff.
pub async fn run_link(server: Arc<Server>) {
	let target = format!(
		"{}:{}",
		server.config.replication.master_host, server.config.replication.master_port
	);
	loop {
		match TcpStream::connect(&target).await {
			Err(err) => {
				server.stats.set_master_link(false);
				debug!(%err, target, "master connect failed");
			}
			Ok(stream) => {
				info!(target, "master link established");
				server.stats.set_master_link(true);
				if let Err(err) = consume_master(&server, stream).await {
					warn!(%err, "master link lost");
				}
				server.stats.set_master_link(false);
			}
		}
		tokio::time::sleep(Duration::from_secs(1)).await;
	}
}

async fn consume_master(server: &Arc<Server>, mut stream: TcpStream) -> std::io::Result<()> {
	let mut handshake = Vec::new();
	encode(&Frame::command(&[b"REPLCONF".to_vec()]), &mut handshake);
	encode(&Frame::command(&[b"SYNC".to_vec()]), &mut handshake);
	stream.write_all(&handshake).await?;

	// The dump replaces whatever a previous link left behind.
	server.keyspace.clear();

	let mut session = Session::privileged();
	let mut decoder = Decoder::new();
	let mut buf = [0u8; 16 * 1024];
	loop {
		let read = stream.read(&mut buf).await?;
		if read == 0 {
			return Err(std::io::Error::new(
				std::io::ErrorKind::UnexpectedEof,
				"master closed the link",
			));
		}
		decoder.feed(&buf[..read]);
		loop {
			match decoder.try_next() {
				Ok(None) => break,
				Ok(Some(Frame::Simple(text))) => {
					// +OK from REPLCONF, +SYNC-END after the dump.
					debug!(text, "replication control frame");
				}
				Ok(Some(frame)) => match frame.into_command() {
					Ok(args) => {
						if let Err(err) =
							apply_for_replay(server, &mut session, &args)
						{
							warn!(%err, "replicated command failed");
						}
					}
					Err(err) => {
						return Err(std::io::Error::new(
							std::io::ErrorKind::InvalidData,
							err.to_string(),
						));
					}
				},
				Err(err) => {
					return Err(std::io::Error::new(
						std::io::ErrorKind::InvalidData,
						err.to_string(),
					));
				}
			}
		}
	}
}
