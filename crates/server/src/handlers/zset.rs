// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::zset::{
	self, LexBound, ScoreBound, ZaddOptions,
	algebra::{Aggregate, SetOp, zintercard, zsetop, zsetop_store},
	range,
};
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::handlers::{parse_count, parse_index, parse_scan_tail, token_is};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("ZADD", Arity::AtLeast(4), Write, zadd),
		CommandSpec::new("ZINCRBY", Arity::Exact(4), Write, zincrby),
		CommandSpec::new("ZREM", Arity::AtLeast(3), Write, zrem),
		CommandSpec::new("ZSCORE", Arity::Exact(3), Read, zscore),
		CommandSpec::new("ZMSCORE", Arity::AtLeast(3), Read, zmscore),
		CommandSpec::new("ZCARD", Arity::Exact(2), Read, zcard),
		CommandSpec::new("ZCOUNT", Arity::Exact(4), Read, zcount),
		CommandSpec::new("ZLEXCOUNT", Arity::Exact(4), Read, zlexcount),
		CommandSpec::new("ZRANGE", Arity::AtLeast(4), Read, zrange),
		CommandSpec::new("ZREVRANGE", Arity::AtLeast(4), Read, zrevrange),
		CommandSpec::new("ZRANGEBYSCORE", Arity::AtLeast(4), Read, zrangebyscore),
		CommandSpec::new("ZREVRANGEBYSCORE", Arity::AtLeast(4), Read, zrevrangebyscore),
		CommandSpec::new("ZRANGEBYLEX", Arity::Exact(4), Read, zrangebylex),
		CommandSpec::new("ZREVRANGEBYLEX", Arity::Exact(4), Read, zrevrangebylex),
		CommandSpec::new("ZRANK", Arity::Exact(3), Read, zrank),
		CommandSpec::new("ZREVRANK", Arity::Exact(3), Read, zrevrank),
		CommandSpec::new("ZREMRANGEBYRANK", Arity::Exact(4), Write, zremrangebyrank),
		CommandSpec::new("ZREMRANGEBYSCORE", Arity::Exact(4), Write, zremrangebyscore),
		CommandSpec::new("ZREMRANGEBYLEX", Arity::Exact(4), Write, zremrangebylex),
		CommandSpec::new("ZPOPMIN", Arity::AtLeast(2), Write, zpopmin),
		CommandSpec::new("ZPOPMAX", Arity::AtLeast(2), Write, zpopmax),
		CommandSpec::new("ZRANDMEMBER", Arity::AtLeast(2), Read, zrandmember),
		CommandSpec::new("ZSCAN", Arity::AtLeast(3), Read, zscan),
		CommandSpec::new("ZRANGESTORE", Arity::AtLeast(5), Write, zrangestore),
		CommandSpec::new("ZUNION", Arity::AtLeast(3), Read, zunion),
		CommandSpec::new("ZINTER", Arity::AtLeast(3), Read, zinter),
		CommandSpec::new("ZDIFF", Arity::AtLeast(3), Read, zdiff),
		CommandSpec::new("ZUNIONSTORE", Arity::AtLeast(4), Write, zunionstore),
		CommandSpec::new("ZINTERSTORE", Arity::AtLeast(4), Write, zinterstore),
		CommandSpec::new("ZDIFFSTORE", Arity::AtLeast(4), Write, zdiffstore),
		CommandSpec::new("ZINTERCARD", Arity::AtLeast(3), Read, zintercard_cmd),
	]
}

fn zadd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let mut options = ZaddOptions::default();
	let mut incr = false;
	let mut index = 2;
	while index < args.len() {
		let arg = &args[index];
		if token_is(arg, "NX") {
			options.if_absent = true;
		} else if token_is(arg, "XX") {
			options.if_present = true;
		} else if token_is(arg, "GT") {
			options.greater_only = true;
		} else if token_is(arg, "LT") {
			options.less_only = true;
		} else if token_is(arg, "CH") {
			options.count_changed = true;
		} else if token_is(arg, "INCR") {
			incr = true;
		} else {
			break;
		}
		index += 1;
	}
	let rest = &args[index..];
	if rest.is_empty() || rest.len() % 2 != 0 {
		return Err(CommandError::Syntax);
	}
	let mut pairs = Vec::with_capacity(rest.len() / 2);
	for chunk in rest.chunks_exact(2) {
		pairs.push((parse::parse_f64(&chunk[0])?, chunk[1].clone()));
	}

	if incr {
		if pairs.len() != 1 {
			return Err(CommandError::Other(
				"INCR option supports a single increment-element pair".to_string(),
			));
		}
		let (delta, member) = &pairs[0];
		let existing = zset::zscore(&server.keyspace, &args[1], member)?;
		let apply = match existing {
			None => !options.if_present,
			Some(_) => !options.if_absent,
		};
		if !apply {
			return Ok(Outcome::silent(Frame::Bulk(None)));
		}
		let value = zset::zincrby(&server.keyspace, &args[1], *delta, member)?;
		return Ok(Outcome::reply(reply::score(value)));
	}

	let touched = zset::zadd(&server.keyspace, &args[1], options, &pairs)?;
	Ok(Outcome::reply(reply::int(touched)))
}

fn zincrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let delta = parse::parse_f64(&args[2])?;
	let value = zset::zincrby(&server.keyspace, &args[1], delta, &args[3])?;
	Ok(Outcome::reply(reply::score(value)))
}

fn zrem(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(zset::zrem(&server.keyspace, &args[1], &args[2..])?)))
}

fn zscore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::score_or_null(zset::zscore(
		&server.keyspace,
		&args[1],
		&args[2],
	)?)))
}

fn zmscore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let scores = zset::zmscore(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::array(
		scores.into_iter().map(reply::score_or_null).collect(),
	)))
}

fn zcard(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(zset::zcard(&server.keyspace, &args[1])?)))
}

fn zcount(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let min = ScoreBound::parse(&args[2])?;
	let max = ScoreBound::parse(&args[3])?;
	Ok(Outcome::reply(reply::int(range::zcount(&server.keyspace, &args[1], min, max)?)))
}

fn zlexcount(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let min = LexBound::parse(&args[2])?;
	let max = LexBound::parse(&args[3])?;
	Ok(Outcome::reply(reply::int(range::zlexcount(&server.keyspace, &args[1], &min, &max)?)))
}

fn withscores_flag(args: &[Vec<u8>]) -> Result<bool, CommandError> {
	match args {
		[] => Ok(false),
		[flag] if token_is(flag, "WITHSCORES") => Ok(true),
		_ => Err(CommandError::Syntax),
	}
}

fn rank_range(
	server: &Server,
	args: &[Vec<u8>],
	reverse: bool,
) -> Result<Outcome, CommandError> {
	let start = parse_index(&args[2])?;
	let stop = parse_index(&args[3])?;
	let withscores = withscores_flag(&args[4..])?;
	let pairs = range::zrange(&server.keyspace, &args[1], start, stop, reverse)?;
	Ok(Outcome::reply(reply::member_score_array(pairs, withscores)))
}

fn zrange(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	rank_range(server, args, false)
}

fn zrevrange(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	rank_range(server, args, true)
}

fn score_range(
	server: &Server,
	args: &[Vec<u8>],
	reverse: bool,
) -> Result<Outcome, CommandError> {
	// The reversed form takes (max, min); normalize to (min, max).
	let (low, high) = if reverse { (&args[3], &args[2]) } else { (&args[2], &args[3]) };
	let min = ScoreBound::parse(low)?;
	let max = ScoreBound::parse(high)?;
	let withscores = withscores_flag(&args[4..])?;
	let pairs = range::zrangebyscore(&server.keyspace, &args[1], min, max, reverse)?;
	Ok(Outcome::reply(reply::member_score_array(pairs, withscores)))
}

fn zrangebyscore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	score_range(server, args, false)
}

fn zrevrangebyscore(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	score_range(server, args, true)
}

fn lex_range(server: &Server, args: &[Vec<u8>], reverse: bool) -> Result<Outcome, CommandError> {
	let (low, high) = if reverse { (&args[3], &args[2]) } else { (&args[2], &args[3]) };
	let min = LexBound::parse(low)?;
	let max = LexBound::parse(high)?;
	let members = range::zrangebylex(&server.keyspace, &args[1], &min, &max, reverse)?;
	Ok(Outcome::reply(reply::bulk_array(members)))
}

fn zrangebylex(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	lex_range(server, args, false)
}

fn zrevrangebylex(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	lex_range(server, args, true)
}

fn rank_reply(rank: Option<i64>) -> Frame {
	match rank {
		None => Frame::Bulk(None),
		Some(rank) => Frame::Integer(rank),
	}
}

fn zrank(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(rank_reply(range::zrank(&server.keyspace, &args[1], &args[2], false)?)))
}

fn zrevrank(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(rank_reply(range::zrank(&server.keyspace, &args[1], &args[2], true)?)))
}

fn zremrangebyrank(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	let start = parse_index(&args[2])?;
	let stop = parse_index(&args[3])?;
	Ok(Outcome::reply(reply::int(range::zremrangebyrank(
		&server.keyspace,
		&args[1],
		start,
		stop,
	)?)))
}

fn zremrangebyscore(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	let min = ScoreBound::parse(&args[2])?;
	let max = ScoreBound::parse(&args[3])?;
	Ok(Outcome::reply(reply::int(range::zremrangebyscore(
		&server.keyspace,
		&args[1],
		min,
		max,
	)?)))
}

fn zremrangebylex(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	let min = LexBound::parse(&args[2])?;
	let max = LexBound::parse(&args[3])?;
	Ok(Outcome::reply(reply::int(range::zremrangebylex(
		&server.keyspace,
		&args[1],
		&min,
		&max,
	)?)))
}

fn zpop(server: &Server, args: &[Vec<u8>], lowest: bool) -> Result<Outcome, CommandError> {
	let count = match args.get(2) {
		None => 1,
		Some(raw) => parse_count(raw)?,
	};
	let popped = zset::zpop(&server.keyspace, &args[1], lowest, count)?;
	Ok(Outcome::reply(reply::member_score_array(popped, true)))
}

fn zpopmin(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	zpop(server, args, true)
}

fn zpopmax(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	zpop(server, args, false)
}

fn zrandmember(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	match args.get(2) {
		None => {
			let sample = zset::zrandmember(&server.keyspace, &args[1], None)?;
			Ok(Outcome::reply(reply::bulk_or_null(
				sample.into_iter().next().map(|(member, _)| member),
			)))
		}
		Some(raw) => {
			let count = parse::parse_i64(raw)?;
			let withscores = withscores_flag(&args[3..])?;
			let sample = zset::zrandmember(&server.keyspace, &args[1], Some(count))?;
			Ok(Outcome::reply(reply::member_score_array(sample, withscores)))
		}
	}
}

fn zscan(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let cursor = parse::parse_u64(&args[2]).map_err(|_| CommandError::InvalidCursor)?;
	let (pattern, count) = parse_scan_tail(server, &args[3..])?;
	let (next, pairs) =
		zset::zscan(&server.keyspace, &args[1], cursor, pattern.as_deref(), count)?;
	Ok(Outcome::reply(reply::scan_reply(
		next,
		reply::member_score_array(pairs, true),
	)))
}

fn zrangestore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let start = parse_index(&args[3])?;
	let stop = parse_index(&args[4])?;
	let reverse = match &args[5..] {
		[] => false,
		[flag] if token_is(flag, "REV") => true,
		_ => return Err(CommandError::Syntax),
	};
	let stored = range::zrangestore(&server.keyspace, &args[1], &args[2], start, stop, reverse)?;
	Ok(Outcome::reply(reply::int(stored)))
}

/// `numkeys key... [WEIGHTS w...] [AGGREGATE SUM|MIN|MAX] [WITHSCORES]`
struct SetOpArgs {
	keys: Vec<Vec<u8>>,
	weights: Option<Vec<f64>>,
	aggregate: Aggregate,
	withscores: bool,
}

fn parse_setop_args(
	args: &[Vec<u8>],
	allow_weights: bool,
	allow_withscores: bool,
) -> Result<SetOpArgs, CommandError> {
	let numkeys = parse::parse_i64(&args[0])?;
	if numkeys <= 0 {
		return Err(CommandError::Other(
			"at least 1 input key is needed".to_string(),
		));
	}
	let numkeys = numkeys as usize;
	if args.len() < 1 + numkeys {
		return Err(CommandError::Syntax);
	}
	let keys = args[1..1 + numkeys].to_vec();
	let mut weights = None;
	let mut aggregate = Aggregate::Sum;
	let mut withscores = false;
	let mut index = 1 + numkeys;
	while index < args.len() {
		let arg = &args[index];
		if allow_weights && token_is(arg, "WEIGHTS") {
			if args.len() < index + 1 + numkeys {
				return Err(CommandError::Syntax);
			}
			let mut parsed = Vec::with_capacity(numkeys);
			for raw in &args[index + 1..index + 1 + numkeys] {
				parsed.push(parse::parse_f64(raw)?);
			}
			weights = Some(parsed);
			index += 1 + numkeys;
		} else if allow_weights && token_is(arg, "AGGREGATE") {
			let mode = args.get(index + 1).ok_or(CommandError::Syntax)?;
			aggregate = if token_is(mode, "SUM") {
				Aggregate::Sum
			} else if token_is(mode, "MIN") {
				Aggregate::Min
			} else if token_is(mode, "MAX") {
				Aggregate::Max
			} else {
				return Err(CommandError::Syntax);
			};
			index += 2;
		} else if allow_withscores && token_is(arg, "WITHSCORES") {
			withscores = true;
			index += 1;
		} else {
			return Err(CommandError::Syntax);
		}
	}
	Ok(SetOpArgs {
		keys,
		weights,
		aggregate,
		withscores,
	})
}

fn setop(server: &Server, args: &[Vec<u8>], op: SetOp) -> Result<Outcome, CommandError> {
	let allow_weights = op != SetOp::Difference;
	let parsed = parse_setop_args(&args[1..], allow_weights, true)?;
	let pairs = zsetop(
		&server.keyspace,
		op,
		&parsed.keys,
		parsed.weights.as_deref(),
		parsed.aggregate,
	)?;
	Ok(Outcome::reply(reply::member_score_array(pairs, parsed.withscores)))
}

fn zunion(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop(server, args, SetOp::Union)
}

fn zinter(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop(server, args, SetOp::Intersection)
}

fn zdiff(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop(server, args, SetOp::Difference)
}

fn setop_store(server: &Server, args: &[Vec<u8>], op: SetOp) -> Result<Outcome, CommandError> {
	let allow_weights = op != SetOp::Difference;
	let parsed = parse_setop_args(&args[2..], allow_weights, false)?;
	let stored = zsetop_store(
		&server.keyspace,
		op,
		&args[1],
		&parsed.keys,
		parsed.weights.as_deref(),
		parsed.aggregate,
	)?;
	Ok(Outcome::reply(reply::int(stored)))
}

fn zunionstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop_store(server, args, SetOp::Union)
}

fn zinterstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop_store(server, args, SetOp::Intersection)
}

fn zdiffstore(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	setop_store(server, args, SetOp::Difference)
}

fn zintercard_cmd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let numkeys = parse::parse_i64(&args[1])?;
	if numkeys <= 0 {
		return Err(CommandError::Other(
			"at least 1 input key is needed".to_string(),
		));
	}
	let numkeys = numkeys as usize;
	if args.len() < 2 + numkeys {
		return Err(CommandError::Syntax);
	}
	let keys = args[2..2 + numkeys].to_vec();
	let limit = match &args[2 + numkeys..] {
		[] => 0,
		[word, raw] if token_is(word, "LIMIT") => parse_count(raw)?,
		_ => return Err(CommandError::Syntax),
	};
	Ok(Outcome::reply(reply::int(zintercard(&server.keyspace, &keys, limit)?)))
}
