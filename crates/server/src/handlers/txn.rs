// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::CommandError;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::Read;
	vec![
		CommandSpec::new("MULTI", Arity::Exact(1), Read, multi),
		CommandSpec::new("EXEC", Arity::Exact(1), Read, exec_stub),
		CommandSpec::new("DISCARD", Arity::Exact(1), Read, discard),
		CommandSpec::new("WATCH", Arity::AtLeast(2), Read, watch),
		CommandSpec::new("UNWATCH", Arity::Exact(1), Read, unwatch),
	]
}

fn multi(_: &Server, session: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if session.txn.in_multi {
		return Err(CommandError::NestedMulti);
	}
	session.txn.in_multi = true;
	session.txn.queue.clear();
	Ok(Outcome::silent(reply::ok()))
}

/// Never reached: the dispatcher intercepts `EXEC` so it can take the
/// exclusive gate and re-enter the queued commands. Registered for name
/// and arity validation only.
fn exec_stub(_: &Server, _: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Err(CommandError::WithoutMulti("EXEC".to_string()))
}

fn discard(_: &Server, session: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if !session.txn.in_multi {
		return Err(CommandError::WithoutMulti("DISCARD".to_string()));
	}
	session.txn.reset();
	Ok(Outcome::silent(reply::ok()))
}

/// Snapshots the current version (or absence) of each listed key. Legal
/// only outside `MULTI`.
fn watch(server: &Server, session: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if session.txn.in_multi {
		return Err(CommandError::WatchInMulti);
	}
	for key in &args[1..] {
		let version = server.keyspace.version(key);
		session.txn.watches.insert(key.clone(), version);
	}
	Ok(Outcome::silent(reply::ok()))
}

fn unwatch(_: &Server, session: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	session.txn.watches.clear();
	Ok(Outcome::silent(reply::ok()))
}
