// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, Role};
use ember_protocol::{Frame, encode_to_vec};
use tracing::trace;

use crate::command::{
	Action, CommandSpec, Outcome, Propagate, is_acl_exempt, is_repl_control, is_txn_control,
	registry,
};
use crate::server::Server;
use crate::session::Session;

/// Routes one client command through the full pipeline: lookup, arity,
/// authentication, ACL, replica gating, transaction queueing, execution,
/// and propagation to the AOF and replicas.
///
/// Always returns a reply frame; command failures become error frames and
/// never tear down the connection. The optional [`Action`] asks the
/// connection itself to change mode (replica streaming).
pub fn dispatch(server: &Server, session: &mut Session, args: &[Vec<u8>]) -> (Frame, Option<Action>) {
	match dispatch_inner(server, session, args) {
		Ok(outcome) => (outcome.reply, outcome.action),
		Err(err) => (Frame::Error(err.wire()), None),
	}
}

/// Replay path: same pipeline, but command errors are returned for the
/// caller to count instead of being rendered.
pub fn apply_for_replay(
	server: &Server,
	session: &mut Session,
	args: &[Vec<u8>],
) -> Result<(), CommandError> {
	dispatch_inner(server, session, args).map(|_| ())
}

fn dispatch_inner(
	server: &Server,
	session: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	let name = args.first().ok_or(CommandError::Protocol(
		"empty command".to_string(),
	))?;
	let spec = registry().lookup(name).ok_or_else(|| CommandError::UnknownCommand {
		name: String::from_utf8_lossy(name).into_owned(),
	})?;
	if !spec.arity.accepts(args.len()) {
		return Err(CommandError::WrongArity {
			command: spec.name.to_ascii_lowercase(),
		});
	}

	authorize(server, session, spec, args)?;

	if server.config.replication.role == Role::Replica
		&& mutates(spec)
		&& !session.from_master
		&& !is_repl_control(name)
	{
		return Err(CommandError::ReadOnly);
	}

	// Inside MULTI everything but transaction control queues.
	if session.txn.in_multi && !is_txn_control(name) {
		session.txn.queue.push(args.to_vec());
		return Ok(Outcome::silent(Frame::simple("QUEUED")));
	}

	if name.eq_ignore_ascii_case(b"EXEC") {
		return exec(server, session);
	}

	let outcome = {
		// Ordinary commands share the gate; EXEC takes it exclusively.
		let _shared = server.exec_gate.read();
		execute(server, session, spec, args)?
	};
	Ok(outcome)
}

fn authorize(
	server: &Server,
	session: &Session,
	spec: &CommandSpec,
	args: &[Vec<u8>],
) -> Result<(), CommandError> {
	if !server.acl.auth_required() || session.from_master || is_acl_exempt(args[0].as_slice()) {
		return Ok(());
	}
	let name = session.user.as_deref().ok_or(CommandError::NoAuth)?;
	let user = server.acl.user(name).ok_or(CommandError::NoPerm)?;
	if !user.allows_category(spec.category) {
		return Err(CommandError::NoPerm);
	}
	let keys = command_keys(spec, args);
	if !user.allows_keys(keys.iter().map(|key| key.as_slice())) {
		return Err(CommandError::NoPerm);
	}
	Ok(())
}

/// Conservative key extraction for ACL checks: every argument that names a
/// key, per the command's shape. Commands with exotic layouts
/// (subcommand-style probabilistic commands, SORT with STORE) check their
/// first key argument, which is the object the permission protects.
fn command_keys<'a>(spec: &CommandSpec, args: &'a [Vec<u8>]) -> Vec<&'a Vec<u8>> {
	match spec.name {
		"PING" | "ECHO" | "INFO" | "AUTH" | "QUIT" | "MULTI" | "EXEC"
		| "DISCARD" | "UNWATCH" | "FLUSHALL" | "FLUSHDB" | "DBSIZE" | "SCAN" | "KEYS"
		| "REPLCONF" | "SYNC" | "COMMAND" => Vec::new(),
		"MSET" => args[1..].iter().step_by(2).collect(),
		"MGET" | "DEL" | "UNLINK" | "EXISTS" | "WATCH" | "PFCOUNT" | "SINTER" | "SUNION"
		| "SDIFF" => args[1..].iter().collect(),
		_ => args.get(1).map(|key| vec![key]).unwrap_or_default(),
	}
}

fn execute(
	server: &Server,
	session: &mut Session,
	spec: &CommandSpec,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	trace!(command = spec.name, "execute");
	server.stats.record_command();
	// Writes hold the commit sequencer across mutation and append, so the
	// AOF observes commands in the order they became visible.
	let _commit = mutates(spec).then(|| server.commit_seq.lock());
	let outcome = (spec.handler)(server, session, args)?;
	if mutates(spec) {
		propagate(server, args, &outcome.propagate);
	}
	Ok(outcome)
}

/// Admin commands that change state (`FLUSHALL`) persist and replicate
/// like writes.
fn mutates(spec: &CommandSpec) -> bool {
	matches!(spec.category, Category::Write | Category::Admin)
}

/// Feeds the frames a successful write produced to the AOF and, on a
/// master, to every attached replica. Append order follows commit order:
/// the shard mutation already landed, and the gate (shared or exclusive)
/// is still held.
fn propagate(server: &Server, args: &[Vec<u8>], decision: &Propagate) {
	let commands: Vec<Vec<Vec<u8>>> = match decision {
		Propagate::Nothing => return,
		Propagate::Command => vec![args.to_vec()],
		Propagate::Rewritten(commands) => commands.clone(),
	};
	for command in &commands {
		let framed = encode_to_vec(&Frame::command(command));
		if let Some(aof) = &server.aof {
			aof.append(framed.clone());
		}
		if server.config.replication.role == Role::Master {
			server.replicas.broadcast(framed);
		}
	}
}

/// `EXEC`: compare watched versions, then run the queue contiguously under
/// the exclusive gate. A conflict aborts with a null array.
fn exec(server: &Server, session: &mut Session) -> Result<Outcome, CommandError> {
	if !session.txn.in_multi {
		return Err(CommandError::WithoutMulti("EXEC".to_string()));
	}
	let queue = std::mem::take(&mut session.txn.queue);
	let watches = std::mem::take(&mut session.txn.watches);
	session.txn.reset();

	let _exclusive = server.exec_gate.write();
	let conflicted = watches
		.iter()
		.any(|(key, snapshot)| server.keyspace.version(key) != *snapshot);
	if conflicted {
		trace!("exec aborted by watch conflict");
		return Ok(Outcome::silent(Frame::Array(None)));
	}

	let mut replies = Vec::with_capacity(queue.len());
	for args in queue {
		let reply = match registry().lookup(&args[0]) {
			None => Frame::Error(
				CommandError::UnknownCommand {
					name: String::from_utf8_lossy(&args[0]).into_owned(),
				}
				.wire(),
			),
			Some(spec) => match execute(server, session, spec, &args) {
				Ok(outcome) => outcome.reply,
				Err(err) => Frame::Error(err.wire()),
			},
		};
		replies.push(reply);
	}
	Ok(Outcome::silent(Frame::array(replies)))
}
