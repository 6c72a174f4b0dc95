// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::string;
use ember_keyspace::now_ms;
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome, Propagate};
use crate::handlers::token_is;
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("SET", Arity::AtLeast(3), Write, set),
		CommandSpec::new("GET", Arity::Exact(2), Read, get),
		CommandSpec::new("MGET", Arity::AtLeast(2), Read, mget),
		CommandSpec::new("MSET", Arity::AtLeast(3), Write, mset),
		CommandSpec::new("APPEND", Arity::Exact(3), Write, append),
		CommandSpec::new("STRLEN", Arity::Exact(2), Read, strlen),
		CommandSpec::new("INCR", Arity::Exact(2), Write, incr),
		CommandSpec::new("DECR", Arity::Exact(2), Write, decr),
		CommandSpec::new("INCRBY", Arity::Exact(3), Write, incrby),
		CommandSpec::new("DECRBY", Arity::Exact(3), Write, decrby),
		CommandSpec::new("INCRBYFLOAT", Arity::Exact(3), Write, incrbyfloat),
		CommandSpec::new("GETRANGE", Arity::Exact(4), Read, getrange),
		CommandSpec::new("SETRANGE", Arity::Exact(4), Write, setrange),
	]
}

fn set(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let mut options = string::SetOptions::default();
	let mut index = 3;
	while index < args.len() {
		let arg = &args[index];
		if token_is(arg, "NX") {
			options.if_absent = true;
			index += 1;
		} else if token_is(arg, "XX") {
			options.if_present = true;
			index += 1;
		} else if token_is(arg, "EX") || token_is(arg, "PX") {
			let raw = args.get(index + 1).ok_or(CommandError::Syntax)?;
			let amount = parse::parse_i64(raw)?;
			if amount <= 0 {
				return Err(CommandError::OutOfRange(
					"invalid expire time in 'set' command".to_string(),
				));
			}
			let millis =
				if token_is(arg, "EX") { amount as u64 * 1_000 } else { amount as u64 };
			options.expire_at_ms = Some(now_ms() + millis);
			index += 2;
		} else {
			return Err(CommandError::Syntax);
		}
	}

	let applied = string::set(&server.keyspace, &args[1], args[2].clone(), options)?;
	if !applied {
		return Ok(Outcome::silent(Frame::Bulk(None)));
	}
	// Relative expiries propagate as an absolute PEXPIREAT so replay and
	// replicas land on the same deadline.
	let propagate = match options.expire_at_ms {
		None if args.len() == 3 => Propagate::Command,
		None => Propagate::Rewritten(vec![vec![
			b"SET".to_vec(),
			args[1].clone(),
			args[2].clone(),
		]]),
		Some(deadline) => Propagate::Rewritten(vec![
			vec![b"SET".to_vec(), args[1].clone(), args[2].clone()],
			vec![
				b"PEXPIREAT".to_vec(),
				args[1].clone(),
				deadline.to_string().into_bytes(),
			],
		]),
	};
	Ok(Outcome {
		reply: reply::ok(),
		propagate,
		action: None,
	})
}

fn get(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_or_null(string::get(&server.keyspace, &args[1])?)))
}

fn mget(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let values = string::mget(&server.keyspace, &args[1..]);
	Ok(Outcome::reply(reply::array(
		values.into_iter().map(reply::bulk_or_null).collect(),
	)))
}

fn mset(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if args.len() % 2 != 1 {
		return Err(CommandError::WrongArity {
			command: "mset".to_string(),
		});
	}
	let pairs: Vec<(Vec<u8>, Vec<u8>)> = args[1..]
		.chunks_exact(2)
		.map(|chunk| (chunk[0].clone(), chunk[1].clone()))
		.collect();
	string::mset(&server.keyspace, &pairs);
	Ok(Outcome::reply(reply::ok()))
}

fn append(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(string::append(&server.keyspace, &args[1], &args[2])?)))
}

fn strlen(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(string::strlen(&server.keyspace, &args[1])?)))
}

fn incr(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(string::incr_by(&server.keyspace, &args[1], 1)?)))
}

fn decr(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(string::incr_by(&server.keyspace, &args[1], -1)?)))
}

fn incrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_i64(&args[2])?;
	Ok(Outcome::reply(reply::int(string::incr_by(&server.keyspace, &args[1], delta)?)))
}

fn decrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_i64(&args[2])?.checked_neg().ok_or(CommandError::NotInteger)?;
	Ok(Outcome::reply(reply::int(string::incr_by(&server.keyspace, &args[1], delta)?)))
}

fn incrbyfloat(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_finite_f64(&args[2])?;
	let value = string::incr_by_float(&server.keyspace, &args[1], delta)?;
	Ok(Outcome::reply(reply::score(value)))
}

fn getrange(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let start = parse::parse_i64(&args[2])?;
	let stop = parse::parse_i64(&args[3])?;
	Ok(Outcome::reply(reply::bulk(string::getrange(&server.keyspace, &args[1], start, stop)?)))
}

fn setrange(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let offset = parse::parse_u64(&args[2])?;
	Ok(Outcome::reply(reply::int(string::setrange(
		&server.keyspace,
		&args[1],
		offset,
		&args[3],
	)?)))
}
