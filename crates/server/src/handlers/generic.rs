// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::sort::{self, SortOptions};
use ember_engine::generic;
use ember_keyspace::now_ms;
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome, Propagate};
use crate::handlers::{parse_count, parse_scan_tail, token_is};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Admin, Read, Write};
	vec![
		CommandSpec::new("DEL", Arity::AtLeast(2), Write, del),
		CommandSpec::new("UNLINK", Arity::AtLeast(2), Write, del),
		CommandSpec::new("EXISTS", Arity::AtLeast(2), Read, exists),
		CommandSpec::new("TYPE", Arity::Exact(2), Read, type_name),
		CommandSpec::new("KEYS", Arity::Exact(2), Read, keys),
		CommandSpec::new("SCAN", Arity::AtLeast(2), Read, scan),
		CommandSpec::new("DBSIZE", Arity::Exact(1), Read, dbsize),
		CommandSpec::new("EXPIRE", Arity::Exact(3), Write, expire),
		CommandSpec::new("PEXPIRE", Arity::Exact(3), Write, pexpire),
		CommandSpec::new("EXPIREAT", Arity::Exact(3), Write, expireat),
		CommandSpec::new("PEXPIREAT", Arity::Exact(3), Write, pexpireat),
		CommandSpec::new("TTL", Arity::Exact(2), Read, ttl),
		CommandSpec::new("PTTL", Arity::Exact(2), Read, pttl),
		CommandSpec::new("PERSIST", Arity::Exact(2), Write, persist),
		CommandSpec::new("RENAME", Arity::Exact(3), Write, rename),
		CommandSpec::new("FLUSHALL", Arity::Exact(1), Admin, flushall),
		CommandSpec::new("FLUSHDB", Arity::Exact(1), Admin, flushall),
		CommandSpec::new("SORT", Arity::AtLeast(2), Write, sort_cmd),
	]
}

fn del(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(generic::del(&server.keyspace, &args[1..]))))
}

fn exists(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(generic::exists(&server.keyspace, &args[1..]))))
}

fn type_name(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(Frame::simple(generic::type_name(&server.keyspace, &args[1]))))
}

fn keys(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let pattern = server.patterns.get(&args[1])?;
	Ok(Outcome::reply(reply::bulk_array(generic::keys(&server.keyspace, &pattern))))
}

fn scan(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let cursor = parse::parse_u64(&args[1]).map_err(|_| CommandError::InvalidCursor)?;
	let (pattern, count) = parse_scan_tail(server, &args[2..])?;
	let pattern = match pattern {
		Some(pattern) => pattern,
		None => server.patterns.get(b"*")?,
	};
	let page = generic::scan(&server.keyspace, cursor, &pattern, count);
	Ok(Outcome::reply(reply::scan_reply(page.cursor, reply::bulk_array(page.keys))))
}

fn dbsize(server: &Server, _: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(generic::dbsize(&server.keyspace))))
}

/// Relative expiries propagate as an absolute `PEXPIREAT` so replay and
/// replicas land on the same wall-clock deadline.
fn expire_reply(server: &Server, key: &[u8], deadline_ms: i64) -> Outcome {
	let applied = generic::expire_at(&server.keyspace, key, deadline_ms);
	let propagate = if applied {
		Propagate::Rewritten(vec![vec![
			b"PEXPIREAT".to_vec(),
			key.to_vec(),
			deadline_ms.to_string().into_bytes(),
		]])
	} else {
		Propagate::Nothing
	};
	Outcome {
		reply: reply::boolean(applied),
		propagate,
		action: None,
	}
}

fn expire(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let seconds = parse::parse_i64(&args[2])?;
	let deadline = (now_ms() as i64).saturating_add(seconds.saturating_mul(1_000));
	Ok(expire_reply(server, &args[1], deadline))
}

fn pexpire(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let millis = parse::parse_i64(&args[2])?;
	Ok(expire_reply(server, &args[1], (now_ms() as i64).saturating_add(millis)))
}

fn expireat(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let seconds = parse::parse_i64(&args[2])?;
	Ok(expire_reply(server, &args[1], seconds.saturating_mul(1_000)))
}

fn pexpireat(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let millis = parse::parse_i64(&args[2])?;
	Ok(expire_reply(server, &args[1], millis))
}

fn ttl(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(generic::ttl(&server.keyspace, &args[1], false))))
}

fn pttl(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(generic::ttl(&server.keyspace, &args[1], true))))
}

fn persist(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let removed = generic::persist(&server.keyspace, &args[1]);
	Ok(Outcome {
		reply: reply::boolean(removed),
		propagate: if removed { Propagate::Command } else { Propagate::Nothing },
		action: None,
	})
}

fn rename(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	generic::rename(&server.keyspace, &args[1], &args[2])?;
	Ok(Outcome::reply(reply::ok()))
}

fn flushall(server: &Server, _: &mut Session, _: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	generic::flushall(&server.keyspace);
	// Admin category does not auto-propagate; replicas must still flush.
	Ok(Outcome {
		reply: reply::ok(),
		propagate: Propagate::Command,
		action: None,
	})
}

fn sort_cmd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let mut options = SortOptions::default();
	let mut index = 2;
	while index < args.len() {
		let arg = &args[index];
		if token_is(arg, "ALPHA") {
			options.alpha = true;
			index += 1;
		} else if token_is(arg, "ASC") {
			options.descending = false;
			index += 1;
		} else if token_is(arg, "DESC") {
			options.descending = true;
			index += 1;
		} else if token_is(arg, "LIMIT") {
			let offset = args.get(index + 1).ok_or(CommandError::Syntax)?;
			let count = args.get(index + 2).ok_or(CommandError::Syntax)?;
			options.limit = Some((parse_count(offset)?, parse_count(count)?));
			index += 3;
		} else if token_is(arg, "STORE") {
			let destination = args.get(index + 1).ok_or(CommandError::Syntax)?;
			options.store = Some(destination.clone());
			index += 2;
		} else {
			return Err(CommandError::Syntax);
		}
	}
	let stored = options.store.is_some();
	let sorted = sort::sort(&server.keyspace, &args[1], &options)?;
	let reply = if stored {
		reply::int(sorted.len() as i64)
	} else {
		reply::bulk_array(sorted)
	};
	Ok(Outcome {
		reply,
		// Without STORE nothing mutated; keep the log clean.
		propagate: if stored { Propagate::Command } else { Propagate::Nothing },
		action: None,
	})
}
