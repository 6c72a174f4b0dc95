// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::CommandError;
use ember_engine::list::{self, End};
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::handlers::{parse_count, parse_index, token_is};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("LPUSH", Arity::AtLeast(3), Write, lpush),
		CommandSpec::new("RPUSH", Arity::AtLeast(3), Write, rpush),
		CommandSpec::new("LPOP", Arity::AtLeast(2), Write, lpop),
		CommandSpec::new("RPOP", Arity::AtLeast(2), Write, rpop),
		CommandSpec::new("LLEN", Arity::Exact(2), Read, llen),
		CommandSpec::new("LRANGE", Arity::Exact(4), Read, lrange),
		CommandSpec::new("LINDEX", Arity::Exact(3), Read, lindex),
		CommandSpec::new("LSET", Arity::Exact(4), Write, lset),
		CommandSpec::new("LREM", Arity::Exact(4), Write, lrem),
		CommandSpec::new("LTRIM", Arity::Exact(4), Write, ltrim),
		CommandSpec::new("LINSERT", Arity::Exact(5), Write, linsert),
		CommandSpec::new("LMOVE", Arity::Exact(5), Write, lmove),
	]
}

fn push(
	server: &Server,
	args: &[Vec<u8>],
	end: End,
) -> Result<Outcome, CommandError> {
	let len = list::push(&server.keyspace, &args[1], end, &args[2..])?;
	Ok(Outcome::reply(reply::int(len)))
}

fn lpush(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	push(server, args, End::Left)
}

fn rpush(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	push(server, args, End::Right)
}

fn pop(server: &Server, args: &[Vec<u8>], end: End) -> Result<Outcome, CommandError> {
	let count = match args.get(2) {
		None => None,
		Some(raw) => Some(parse_count(raw)?),
	};
	let popped = list::pop(&server.keyspace, &args[1], end, count)?;
	let reply = match count {
		// Scalar form: one bulk or null.
		None => reply::bulk_or_null(popped.into_iter().next()),
		Some(_) if popped.is_empty() => Frame::Array(None),
		Some(_) => reply::bulk_array(popped),
	};
	Ok(Outcome::reply(reply))
}

fn lpop(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	pop(server, args, End::Left)
}

fn rpop(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	pop(server, args, End::Right)
}

fn llen(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(list::llen(&server.keyspace, &args[1])?)))
}

fn lrange(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let start = parse_index(&args[2])?;
	let stop = parse_index(&args[3])?;
	Ok(Outcome::reply(reply::bulk_array(list::lrange(
		&server.keyspace,
		&args[1],
		start,
		stop,
	)?)))
}

fn lindex(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let index = parse_index(&args[2])?;
	Ok(Outcome::reply(reply::bulk_or_null(list::lindex(&server.keyspace, &args[1], index)?)))
}

fn lset(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let index = parse_index(&args[2])?;
	list::lset(&server.keyspace, &args[1], index, args[3].clone())?;
	Ok(Outcome::reply(reply::ok()))
}

fn lrem(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let count = parse_index(&args[2])?;
	Ok(Outcome::reply(reply::int(list::lrem(&server.keyspace, &args[1], count, &args[3])?)))
}

fn ltrim(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let start = parse_index(&args[2])?;
	let stop = parse_index(&args[3])?;
	list::ltrim(&server.keyspace, &args[1], start, stop)?;
	Ok(Outcome::reply(reply::ok()))
}

fn linsert(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let before = if token_is(&args[2], "BEFORE") {
		true
	} else if token_is(&args[2], "AFTER") {
		false
	} else {
		return Err(CommandError::Syntax);
	};
	Ok(Outcome::reply(reply::int(list::linsert(
		&server.keyspace,
		&args[1],
		before,
		&args[3],
		args[4].clone(),
	)?)))
}

fn parse_end(arg: &[u8]) -> Result<End, CommandError> {
	if token_is(arg, "LEFT") {
		Ok(End::Left)
	} else if token_is(arg, "RIGHT") {
		Ok(End::Right)
	} else {
		Err(CommandError::Syntax)
	}
}

fn lmove(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let from = parse_end(&args[3])?;
	let to = parse_end(&args[4])?;
	let moved = list::lmove(&server.keyspace, &args[1], &args[2], from, to)?;
	match moved {
		None => Ok(Outcome::silent(Frame::Bulk(None))),
		Some(item) => Ok(Outcome::reply(reply::bulk(item))),
	}
}
