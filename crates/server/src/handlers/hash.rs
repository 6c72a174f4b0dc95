// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::hash;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::handlers::parse_scan_tail;
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("HSET", Arity::AtLeast(4), Write, hset),
		CommandSpec::new("HSETNX", Arity::Exact(4), Write, hsetnx),
		CommandSpec::new("HGET", Arity::Exact(3), Read, hget),
		CommandSpec::new("HMGET", Arity::AtLeast(3), Read, hmget),
		CommandSpec::new("HGETALL", Arity::Exact(2), Read, hgetall),
		CommandSpec::new("HDEL", Arity::AtLeast(3), Write, hdel),
		CommandSpec::new("HEXISTS", Arity::Exact(3), Read, hexists),
		CommandSpec::new("HLEN", Arity::Exact(2), Read, hlen),
		CommandSpec::new("HSTRLEN", Arity::Exact(3), Read, hstrlen),
		CommandSpec::new("HKEYS", Arity::Exact(2), Read, hkeys),
		CommandSpec::new("HVALS", Arity::Exact(2), Read, hvals),
		CommandSpec::new("HRANDFIELD", Arity::AtLeast(2), Read, hrandfield),
		CommandSpec::new("HSCAN", Arity::AtLeast(3), Read, hscan),
		CommandSpec::new("HINCRBY", Arity::Exact(4), Write, hincrby),
		CommandSpec::new("HINCRBYFLOAT", Arity::Exact(4), Write, hincrbyfloat),
		CommandSpec::new("HDELIF", Arity::Exact(4), Write, hdelif),
		CommandSpec::new("HINCRBYFLOATIF", Arity::Exact(5), Write, hincrbyfloatif),
	]
}

fn hset(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	if args.len() % 2 != 0 {
		return Err(CommandError::WrongArity {
			command: "hset".to_string(),
		});
	}
	let pairs: Vec<(Vec<u8>, Vec<u8>)> = args[2..]
		.chunks_exact(2)
		.map(|chunk| (chunk[0].clone(), chunk[1].clone()))
		.collect();
	Ok(Outcome::reply(reply::int(hash::hset(&server.keyspace, &args[1], &pairs)?)))
}

fn hsetnx(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let created = hash::hsetnx(&server.keyspace, &args[1], &args[2], args[3].clone())?;
	Ok(Outcome::reply(reply::boolean(created)))
}

fn hget(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_or_null(hash::hget(&server.keyspace, &args[1], &args[2])?)))
}

fn hmget(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let values = hash::hmget(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::array(
		values.into_iter().map(reply::bulk_or_null).collect(),
	)))
}

fn hgetall(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let pairs = hash::hgetall(&server.keyspace, &args[1])?;
	let mut flat = Vec::with_capacity(pairs.len() * 2);
	for (field, value) in pairs {
		flat.push(field);
		flat.push(value);
	}
	Ok(Outcome::reply(reply::bulk_array(flat)))
}

fn hdel(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(hash::hdel(&server.keyspace, &args[1], &args[2..])?)))
}

fn hexists(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(hash::hexists(&server.keyspace, &args[1], &args[2])?)))
}

fn hlen(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(hash::hlen(&server.keyspace, &args[1])?)))
}

fn hstrlen(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(hash::hstrlen(&server.keyspace, &args[1], &args[2])?)))
}

fn hkeys(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_array(hash::hkeys(&server.keyspace, &args[1])?)))
}

fn hvals(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::bulk_array(hash::hvals(&server.keyspace, &args[1])?)))
}

fn hrandfield(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	match args.get(2) {
		None => {
			let fields = hash::hrandfield(&server.keyspace, &args[1], None)?;
			Ok(Outcome::reply(reply::bulk_or_null(fields.into_iter().next())))
		}
		Some(raw) => {
			let count = parse::parse_i64(raw)?;
			let fields = hash::hrandfield(&server.keyspace, &args[1], Some(count))?;
			Ok(Outcome::reply(reply::bulk_array(fields)))
		}
	}
}

fn hscan(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let cursor = parse::parse_u64(&args[2]).map_err(|_| CommandError::InvalidCursor)?;
	let (pattern, count) = parse_scan_tail(server, &args[3..])?;
	let (next, pairs) =
		hash::hscan(&server.keyspace, &args[1], cursor, pattern.as_deref(), count)?;
	let mut flat = Vec::with_capacity(pairs.len() * 2);
	for (field, value) in pairs {
		flat.push(field);
		flat.push(value);
	}
	Ok(Outcome::reply(reply::scan_reply(next, reply::bulk_array(flat))))
}

fn hincrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_i64(&args[3])?;
	Ok(Outcome::reply(reply::int(hash::hincrby(&server.keyspace, &args[1], &args[2], delta)?)))
}

fn hincrbyfloat(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_finite_f64(&args[3])?;
	let value = hash::hincrbyfloat(&server.keyspace, &args[1], &args[2], delta)?;
	Ok(Outcome::reply(reply::score(value)))
}

fn hdelif(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let deleted = hash::hdelif(&server.keyspace, &args[1], &args[2], &args[3])?;
	Ok(Outcome::reply(reply::boolean(deleted)))
}

fn hincrbyfloatif(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_finite_f64(&args[3])?;
	let applied = hash::hincrbyfloatif(&server.keyspace, &args[1], &args[2], delta, &args[4])?;
	Ok(Outcome::reply(reply::score_or_null(applied)))
}
