// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::set::{self, Algebra};

use crate::command::{Arity, CommandSpec, Outcome, Propagate};
use crate::handlers::{parse_count, parse_scan_tail};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("SADD", Arity::AtLeast(3), Write, sadd),
		CommandSpec::new("SREM", Arity::AtLeast(3), Write, srem),
		CommandSpec::new("SMEMBERS", Arity::Exact(2), Read, smembers),
		CommandSpec::new("SCARD", Arity::Exact(2), Read, scard),
		CommandSpec::new("SISMEMBER", Arity::Exact(3), Read, sismember),
		CommandSpec::new("SMISMEMBER", Arity::AtLeast(3), Read, smismember),
		CommandSpec::new("SRANDMEMBER", Arity::AtLeast(2), Read, srandmember),
		CommandSpec::new("SPOP", Arity::AtLeast(2), Write, spop),
		CommandSpec::new("SMOVE", Arity::Exact(4), Write, smove),
		CommandSpec::new("SINTER", Arity::AtLeast(2), Read, sinter),
		CommandSpec::new("SUNION", Arity::AtLeast(2), Read, sunion),
		CommandSpec::new("SDIFF", Arity::AtLeast(2), Read, sdiff),
		CommandSpec::new("SINTERSTORE", Arity::AtLeast(3), Write, sinterstore),
		CommandSpec::new("SUNIONSTORE", Arity::AtLeast(3), Write, sunionstore),
		CommandSpec::new("SDIFFSTORE", Arity::AtLeast(3), Write, sdiffstore),
		CommandSpec::new("SSCAN", Arity::AtLeast(3), Read, sscan),
	]
}

fn sadd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(set::sadd(&server.keyspace, &args[1], &args[2..])?)))
}

fn srem(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(set::srem(&server.keyspace, &args[1], &args[2..])?)))
}

fn smembers(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_array(set::smembers(&server.keyspace, &args[1])?)))
}

fn scard(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(set::scard(&server.keyspace, &args[1])?)))
}

fn sismember(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(set::sismember(&server.keyspace, &args[1], &args[2])?)))
}

fn smismember(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let memberships = set::smismember(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::array(
		memberships.into_iter().map(reply::boolean).collect(),
	)))
}

fn srandmember(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	match args.get(2) {
		None => {
			let sample = set::srandmember(&server.keyspace, &args[1], None)?;
			Ok(Outcome::reply(reply::bulk_or_null(sample.into_iter().next())))
		}
		Some(raw) => {
			let count = parse::parse_i64(raw)?;
			let sample = set::srandmember(&server.keyspace, &args[1], Some(count))?;
			Ok(Outcome::reply(reply::bulk_array(sample)))
		}
	}
}

/// `SPOP` is non-deterministic, so the popped members propagate as an
/// explicit `SREM` instead of the original command.
fn spop(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let count = match args.get(2) {
		None => None,
		Some(raw) => Some(parse_count(raw)?),
	};
	let popped = set::spop(&server.keyspace, &args[1], count)?;
	let reply = match count {
		None => reply::bulk_or_null(popped.first().cloned()),
		Some(_) => reply::bulk_array(popped.clone()),
	};
	let propagate = if popped.is_empty() {
		Propagate::Nothing
	} else {
		let mut rewritten = vec![b"SREM".to_vec(), args[1].clone()];
		rewritten.extend(popped);
		Propagate::Rewritten(vec![rewritten])
	};
	Ok(Outcome {
		reply,
		propagate,
		action: None,
	})
}

fn smove(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let moved = set::smove(&server.keyspace, &args[1], &args[2], &args[3])?;
	Ok(Outcome {
		reply: reply::boolean(moved),
		propagate: if moved { Propagate::Command } else { Propagate::Nothing },
		action: None,
	})
}

fn algebra(server: &Server, args: &[Vec<u8>], op: Algebra) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_array(set::algebra(&server.keyspace, op, &args[1..])?)))
}

fn sinter(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra(server, args, Algebra::Intersection)
}

fn sunion(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra(server, args, Algebra::Union)
}

fn sdiff(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra(server, args, Algebra::Difference)
}

fn algebra_store(server: &Server, args: &[Vec<u8>], op: Algebra) -> Result<Outcome, CommandError> {
	let stored = set::algebra_store(&server.keyspace, op, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::int(stored)))
}

fn sinterstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra_store(server, args, Algebra::Intersection)
}

fn sunionstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra_store(server, args, Algebra::Union)
}

fn sdiffstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	algebra_store(server, args, Algebra::Difference)
}

fn sscan(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let cursor = parse::parse_u64(&args[2]).map_err(|_| CommandError::InvalidCursor)?;
	let (pattern, count) = parse_scan_tail(server, &args[3..])?;
	let (next, members) =
		set::sscan(&server.keyspace, &args[1], cursor, pattern.as_deref(), count)?;
	Ok(Outcome::reply(reply::scan_reply(next, reply::bulk_array(members))))
}
