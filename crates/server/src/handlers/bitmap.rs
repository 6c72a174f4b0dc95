// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::bitfield;
use ember_engine::bitmap::{self, BitOp};
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::handlers::{parse_index, token_is};
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("SETBIT", Arity::Exact(4), Write, setbit),
		CommandSpec::new("GETBIT", Arity::Exact(3), Read, getbit),
		CommandSpec::new("BITCOUNT", Arity::AtLeast(2), Read, bitcount),
		CommandSpec::new("BITPOS", Arity::AtLeast(3), Read, bitpos),
		CommandSpec::new("BITOP", Arity::AtLeast(4), Write, bitop),
		CommandSpec::new("BITFIELD", Arity::AtLeast(2), Write, bitfield_cmd),
		CommandSpec::new("BITFIELD_RO", Arity::AtLeast(2), Read, bitfield_ro),
	]
}

fn parse_bit(raw: &[u8]) -> Result<bool, CommandError> {
	match parse::parse_i64(raw)? {
		0 => Ok(false),
		1 => Ok(true),
		_ => Err(CommandError::OutOfRange(
			"bit is not an integer or out of range".to_string(),
		)),
	}
}

fn setbit(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let offset = parse::parse_u64(&args[2])?;
	let bit = parse_bit(&args[3])?;
	Ok(Outcome::reply(reply::int(bitmap::setbit(&server.keyspace, &args[1], offset, bit)?)))
}

fn getbit(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let offset = parse::parse_u64(&args[2])?;
	Ok(Outcome::reply(reply::int(bitmap::getbit(&server.keyspace, &args[1], offset)?)))
}

fn bitcount(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let range = match &args[2..] {
		[] => None,
		[start, end] => Some((parse_index(start)?, parse_index(end)?)),
		_ => return Err(CommandError::Syntax),
	};
	Ok(Outcome::reply(reply::int(bitmap::bitcount(&server.keyspace, &args[1], range)?)))
}

fn bitpos(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let bit = parse_bit(&args[2])?;
	let mut rest = &args[3..];
	let reverse = match rest.last() {
		Some(flag) if token_is(flag, "REV") => {
			rest = &rest[..rest.len() - 1];
			true
		}
		_ => false,
	};
	let (start, end) = match rest {
		[] => (0, None),
		[start] => (parse_index(start)?, None),
		[start, end] => (parse_index(start)?, Some(parse_index(end)?)),
		_ => return Err(CommandError::Syntax),
	};
	Ok(Outcome::reply(reply::int(bitmap::bitpos(
		&server.keyspace,
		&args[1],
		bit,
		start,
		end,
		reverse,
	)?)))
}

fn bitop(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let op = if token_is(&args[1], "AND") {
		BitOp::And
	} else if token_is(&args[1], "OR") {
		BitOp::Or
	} else if token_is(&args[1], "XOR") {
		BitOp::Xor
	} else if token_is(&args[1], "NOT") {
		BitOp::Not
	} else {
		return Err(CommandError::Syntax);
	};
	Ok(Outcome::reply(reply::int(bitmap::bitop(&server.keyspace, op, &args[2], &args[3..])?)))
}

fn bitfield_reply(results: Vec<Option<i64>>) -> Frame {
	reply::array(
		results
			.into_iter()
			.map(|slot| match slot {
				None => Frame::Bulk(None),
				Some(value) => Frame::Integer(value),
			})
			.collect(),
	)
}

fn bitfield_cmd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let ops = bitfield::parse_ops(&args[2..], false)?;
	Ok(Outcome::reply(bitfield_reply(bitfield::bitfield(&server.keyspace, &args[1], &ops)?)))
}

fn bitfield_ro(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let ops = bitfield::parse_ops(&args[2..], true)?;
	Ok(Outcome::reply(bitfield_reply(bitfield::bitfield(&server.keyspace, &args[1], &ops)?)))
}
