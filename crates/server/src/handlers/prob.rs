// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_auth::Category;
use ember_core::{CommandError, parse};
use ember_engine::prob::{bloom, cms, cuckoo, hll, tdigest, topk};
use ember_protocol::Frame;

use crate::command::{Arity, CommandSpec, Outcome};
use crate::handlers::token_is;
use crate::reply;
use crate::server::Server;
use crate::session::Session;

pub fn commands() -> Vec<CommandSpec> {
	use Category::{Read, Write};
	vec![
		CommandSpec::new("PFADD", Arity::AtLeast(2), Write, pfadd),
		CommandSpec::new("PFCOUNT", Arity::AtLeast(2), Read, pfcount),
		CommandSpec::new("PFMERGE", Arity::AtLeast(2), Write, pfmerge),
		CommandSpec::new("BF.RESERVE", Arity::Exact(4), Write, bf_reserve),
		CommandSpec::new("BF.ADD", Arity::Exact(3), Write, bf_add),
		CommandSpec::new("BF.MADD", Arity::AtLeast(3), Write, bf_madd),
		CommandSpec::new("BF.EXISTS", Arity::Exact(3), Read, bf_exists),
		CommandSpec::new("BF.MEXISTS", Arity::AtLeast(3), Read, bf_mexists),
		CommandSpec::new("BF.CARD", Arity::Exact(2), Read, bf_card),
		CommandSpec::new("BF.INFO", Arity::Exact(2), Read, bf_info),
		CommandSpec::new("CMS.INITBYDIM", Arity::Exact(4), Write, cms_initbydim),
		CommandSpec::new("CMS.INITBYPROB", Arity::Exact(4), Write, cms_initbyprob),
		CommandSpec::new("CMS.INCRBY", Arity::AtLeast(4), Write, cms_incrby),
		CommandSpec::new("CMS.QUERY", Arity::AtLeast(3), Read, cms_query),
		CommandSpec::new("CMS.INFO", Arity::Exact(2), Read, cms_info),
		CommandSpec::new("CF.RESERVE", Arity::Exact(3), Write, cf_reserve),
		CommandSpec::new("CF.ADD", Arity::Exact(3), Write, cf_add),
		CommandSpec::new("CF.ADDNX", Arity::Exact(3), Write, cf_addnx),
		CommandSpec::new("CF.EXISTS", Arity::Exact(3), Read, cf_exists),
		CommandSpec::new("CF.DEL", Arity::Exact(3), Write, cf_del),
		CommandSpec::new("CF.COUNT", Arity::Exact(3), Read, cf_count),
		CommandSpec::new("TOPK.RESERVE", Arity::AtLeast(3), Write, topk_reserve),
		CommandSpec::new("TOPK.ADD", Arity::AtLeast(3), Write, topk_add),
		CommandSpec::new("TOPK.INCRBY", Arity::AtLeast(4), Write, topk_incrby),
		CommandSpec::new("TOPK.QUERY", Arity::AtLeast(3), Read, topk_query),
		CommandSpec::new("TOPK.COUNT", Arity::AtLeast(3), Read, topk_count),
		CommandSpec::new("TOPK.LIST", Arity::AtLeast(2), Read, topk_list),
		CommandSpec::new("TDIGEST.CREATE", Arity::AtLeast(2), Write, tdigest_create),
		CommandSpec::new("TDIGEST.ADD", Arity::AtLeast(3), Write, tdigest_add),
		CommandSpec::new("TDIGEST.QUANTILE", Arity::AtLeast(3), Read, tdigest_quantile),
		CommandSpec::new("TDIGEST.CDF", Arity::AtLeast(3), Read, tdigest_cdf),
		CommandSpec::new("TDIGEST.MIN", Arity::Exact(2), Read, tdigest_min),
		CommandSpec::new("TDIGEST.MAX", Arity::Exact(2), Read, tdigest_max),
		CommandSpec::new("TDIGEST.RESET", Arity::Exact(2), Write, tdigest_reset),
		// Internal: replication/recovery loader for values that no public
		// command can reconstruct byte-for-byte.
		CommandSpec::new("EMBER.LOADVALUE", Arity::Exact(4), Write, load_value),
	]
}

fn load_value(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let value = ember_keyspace::Value::deserialize_opaque(&args[2], &args[3])?;
	server.keyspace.insert(&args[1], value);
	Ok(Outcome::reply(reply::ok()))
}

fn bools(flags: Vec<bool>) -> Frame {
	reply::array(flags.into_iter().map(reply::boolean).collect())
}

fn pfadd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let changed = hll::pfadd(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::boolean(changed)))
}

fn pfcount(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(hll::pfcount(&server.keyspace, &args[1..])? as i64)))
}

fn pfmerge(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	hll::pfmerge(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::ok()))
}

fn bf_reserve(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let error_rate = parse::parse_finite_f64(&args[2])?;
	let capacity = parse::parse_u64(&args[3])?;
	bloom::reserve(&server.keyspace, &args[1], error_rate, capacity)?;
	Ok(Outcome::reply(reply::ok()))
}

fn bf_add(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let added = bloom::add(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::boolean(added[0])))
}

fn bf_madd(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(bools(bloom::add(&server.keyspace, &args[1], &args[2..])?)))
}

fn bf_exists(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let found = bloom::exists(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::boolean(found[0])))
}

fn bf_mexists(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(bools(bloom::exists(&server.keyspace, &args[1], &args[2..])?)))
}

fn bf_card(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(bloom::card(&server.keyspace, &args[1])? as i64)))
}

fn bf_info(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let info = bloom::info(&server.keyspace, &args[1])?;
	Ok(Outcome::reply(reply::array(vec![
		reply::bulk("Capacity"),
		reply::int(info.capacity as i64),
		reply::bulk("Size"),
		reply::int(info.size_bytes as i64),
		reply::bulk("Number of items inserted"),
		reply::int(info.inserted as i64),
		reply::bulk("Error rate"),
		reply::score(info.error_rate),
	])))
}

fn cms_initbydim(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let width = parse::parse_u64(&args[2])?;
	let depth = parse::parse_u64(&args[3])?;
	cms::init_by_dim(&server.keyspace, &args[1], width, depth)?;
	Ok(Outcome::reply(reply::ok()))
}

fn cms_initbyprob(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let error = parse::parse_finite_f64(&args[2])?;
	let probability = parse::parse_finite_f64(&args[3])?;
	cms::init_by_prob(&server.keyspace, &args[1], error, probability)?;
	Ok(Outcome::reply(reply::ok()))
}

fn item_count_pairs(args: &[Vec<u8>]) -> Result<Vec<(Vec<u8>, u64)>, CommandError> {
	if args.is_empty() || args.len() % 2 != 0 {
		return Err(CommandError::Syntax);
	}
	args.chunks_exact(2)
		.map(|chunk| Ok((chunk[0].clone(), parse::parse_u64(&chunk[1])?)))
		.collect()
}

fn cms_incrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let pairs = item_count_pairs(&args[2..])?;
	let estimates = cms::incrby(&server.keyspace, &args[1], &pairs)?;
	Ok(Outcome::reply(reply::array(
		estimates.into_iter().map(|estimate| reply::int(estimate as i64)).collect(),
	)))
}

fn cms_query(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let estimates = cms::query(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::array(
		estimates.into_iter().map(|estimate| reply::int(estimate as i64)).collect(),
	)))
}

fn cms_info(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let info = cms::info(&server.keyspace, &args[1])?;
	Ok(Outcome::reply(reply::array(vec![
		reply::bulk("width"),
		reply::int(info.width as i64),
		reply::bulk("depth"),
		reply::int(info.depth as i64),
		reply::bulk("count"),
		reply::int(info.total as i64),
	])))
}

fn cf_reserve(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let capacity = parse::parse_u64(&args[2])?;
	cuckoo::reserve(&server.keyspace, &args[1], capacity)?;
	Ok(Outcome::reply(reply::ok()))
}

fn cf_add(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(cuckoo::add(&server.keyspace, &args[1], &args[2])?)))
}

fn cf_addnx(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(cuckoo::add_unless_exists(
		&server.keyspace,
		&args[1],
		&args[2],
	)?)))
}

fn cf_exists(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(cuckoo::exists(&server.keyspace, &args[1], &args[2])?)))
}

fn cf_del(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::boolean(cuckoo::del(&server.keyspace, &args[1], &args[2])?)))
}

fn cf_count(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::int(cuckoo::count(&server.keyspace, &args[1], &args[2])? as i64)))
}

fn topk_reserve(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let k = parse::parse_u64(&args[2])?;
	let dims = match &args[3..] {
		[] => None,
		[width, depth, decay] => Some((
			parse::parse_u64(width)?,
			parse::parse_u64(depth)?,
			parse::parse_finite_f64(decay)?,
		)),
		_ => return Err(CommandError::Syntax),
	};
	topk::reserve(&server.keyspace, &args[1], k, dims)?;
	Ok(Outcome::reply(reply::ok()))
}

fn expelled(slots: Vec<Option<Vec<u8>>>) -> Frame {
	reply::array(slots.into_iter().map(reply::bulk_or_null).collect())
}

fn topk_add(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(expelled(topk::add(&server.keyspace, &args[1], &args[2..])?)))
}

fn topk_incrby(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let pairs = item_count_pairs(&args[2..])?;
	Ok(Outcome::reply(expelled(topk::incrby(&server.keyspace, &args[1], &pairs)?)))
}

fn topk_query(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(bools(topk::query(&server.keyspace, &args[1], &args[2..])?)))
}

fn topk_count(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let counts = topk::count(&server.keyspace, &args[1], &args[2..])?;
	Ok(Outcome::reply(reply::array(
		counts.into_iter().map(|count| reply::int(count as i64)).collect(),
	)))
}

fn topk_list(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let withcount = match &args[2..] {
		[] => false,
		[flag] if token_is(flag, "WITHCOUNT") => true,
		_ => return Err(CommandError::Syntax),
	};
	let leaders = topk::list(&server.keyspace, &args[1])?;
	let mut frames = Vec::with_capacity(leaders.len() * if withcount { 2 } else { 1 });
	for (item, count) in leaders {
		frames.push(reply::bulk(item));
		if withcount {
			frames.push(reply::int(count as i64));
		}
	}
	Ok(Outcome::reply(reply::array(frames)))
}

fn tdigest_create(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let compression = match &args[2..] {
		[] => None,
		[word, raw] if token_is(word, "COMPRESSION") => {
			let compression = u32::try_from(parse::parse_u64(raw)?).map_err(|_| {
				CommandError::OutOfRange("T-Digest: invalid compression".to_string())
			})?;
			Some(compression)
		}
		_ => return Err(CommandError::Syntax),
	};
	tdigest::create(&server.keyspace, &args[1], compression)?;
	Ok(Outcome::reply(reply::ok()))
}

fn float_args(args: &[Vec<u8>]) -> Result<Vec<f64>, CommandError> {
	args.iter().map(|raw| parse::parse_f64(raw)).collect()
}

fn tdigest_add(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	tdigest::add(&server.keyspace, &args[1], &float_args(&args[2..])?)?;
	Ok(Outcome::reply(reply::ok()))
}

fn optional_scores(values: Vec<Option<f64>>) -> Frame {
	reply::array(values.into_iter().map(reply::score_or_null).collect())
}

fn tdigest_quantile(
	server: &Server,
	_: &mut Session,
	args: &[Vec<u8>],
) -> Result<Outcome, CommandError> {
	let quantiles = float_args(&args[2..])?;
	Ok(Outcome::reply(optional_scores(tdigest::quantile(
		&server.keyspace,
		&args[1],
		&quantiles,
	)?)))
}

fn tdigest_cdf(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	let values = float_args(&args[2..])?;
	Ok(Outcome::reply(optional_scores(tdigest::cdf(&server.keyspace, &args[1], &values)?)))
}

fn tdigest_min(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::score_or_null(tdigest::min(&server.keyspace, &args[1])?)))
}

fn tdigest_max(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	Ok(Outcome::reply(reply::score_or_null(tdigest::max(&server.keyspace, &args[1])?)))
}

fn tdigest_reset(server: &Server, _: &mut Session, args: &[Vec<u8>]) -> Result<Outcome, CommandError> {
	tdigest::reset(&server.keyspace, &args[1])?;
	Ok(Outcome::reply(reply::ok()))
}
