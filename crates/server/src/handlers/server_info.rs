// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::Write as _;

use ember_auth::Category;
use ember_core::{CommandError, Role};
use ember_protocol::Frame;

use crate::command::{Action, Arity, CommandSpec, Outcome};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::Read;
	vec![
		CommandSpec::new("PING", Arity::AtLeast(1), Read, ping),
		CommandSpec::new("ECHO", Arity::Exact(2), Read, echo),
		CommandSpec::new("AUTH", Arity::AtLeast(2), Read, auth),
		CommandSpec::new("INFO", Arity::AtLeast(1), Read, info),
		CommandSpec::new("QUIT", Arity::Exact(1), Read, quit),
		CommandSpec::new("REPLCONF", Arity::AtLeast(1), Read, replconf),
		CommandSpec::new("SYNC", Arity::Exact(1), Read, sync),
	]
}

fn quit(_: &Server, _: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome {
		reply: reply::ok(),
		propagate: crate::command::Propagate::Nothing,
		action: Some(Action::CloseConnection),
	})
}

fn ping(_: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	match args.get(1) {
		None => Ok(Outcome::reply(Frame::simple("PONG"))),
		Some(payload) => Ok(Outcome::reply(reply::bulk(payload.clone()))),
	}
}

fn echo(_: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk(args[1].clone())))
}

/// `AUTH [username] password`. The single-argument form targets the
/// conventional `default` user.
fn auth(server: &Server, session: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if !server.acl.auth_required() {
		return Err(CommandError::Other(
			"Client sent AUTH, but no password is set".to_string(),
		));
	}
	let (username, credential) = match args.len() {
		2 => ("default".to_string(), &args[1]),
		3 => (String::from_utf8_lossy(&args[1]).into_owned(), &args[2]),
		_ => {
			return Err(CommandError::WrongArity {
				command: "auth".to_string(),
			});
		}
	};
	let credential = String::from_utf8_lossy(credential).into_owned();
	match server.acl.authenticate(&username, &credential) {
		Ok(Some(user)) => {
			session.user = Some(user.name.clone());
			Ok(Outcome::reply(reply::ok()))
		}
		Ok(None) => Err(CommandError::Other(
			"invalid username-password pair or user is disabled".to_string(),
		)),
		Err(err) => Err(CommandError::Other(err.to_string())),
	}
}

fn info(server: &Server, _: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let mut text = String::new();
	let _ = writeln!(text, "# Server");
	let _ = writeln!(text, "ember_version:{}", env!("CARGO_PKG_VERSION"));
	let _ = writeln!(text, "uptime_in_seconds:{}", server.stats.uptime_seconds());
	let _ = writeln!(text);
	let _ = writeln!(text, "# Clients");
	let _ = writeln!(text, "connected_clients:{}", server.stats.connections());
	let _ = writeln!(text);
	let _ = writeln!(text, "# Stats");
	let _ = writeln!(text, "total_commands_processed:{}", server.stats.commands());
	let _ = writeln!(text, "keyspace_keys:{}", server.keyspace.len());
	let _ = writeln!(
		text,
		"aof_failed_writes:{}",
		server.aof.as_ref().map(|aof| aof.failed_writes()).unwrap_or(0)
	);
	let _ = writeln!(text);
	let _ = writeln!(text, "# Replication");
	let role = match server.config.replication.role {
		Role::Master => "master",
		Role::Replica => "slave",
	};
	let _ = writeln!(text, "role:{role}");
	let _ = writeln!(text, "connected_replicas:{}", server.replicas.len());
	if server.config.replication.role == Role::Replica {
		let _ = writeln!(
			text,
			"master_host:{}:{}",
			server.config.replication.master_host, server.config.replication.master_port
		);
		let _ = writeln!(
			text,
			"master_link_status:{}",
			if server.stats.master_link_up() { "up" } else { "down" }
		);
	}
	Ok(Outcome::reply(reply::bulk(text.into_bytes())))
}

fn replconf(_: &Server, session: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	session.is_replica_link = true;
	Ok(Outcome::silent(reply::ok()))
}

/// `SYNC` hands the connection over to replication: the reply frame is
/// ignored and the connection streams the full-state dump instead.
/// Registration via `REPLCONF` must come first.
fn sync(_: &Server, session: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if !session.is_replica_link {
		return Err(CommandError::Other(
			"SYNC requires REPLCONF registration".to_string(),
		));
	}
	Ok(Outcome {
		reply: Frame::Null,
		propagate: crate::command::Propagate::Nothing,
		action: Some(Action::StartReplicaStream),
	})
}
