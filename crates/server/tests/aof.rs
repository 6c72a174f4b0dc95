// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! End-to-end append-only log round trip: write through the dispatcher,
//! restart, verify the recovered keyspace.

use ember_core::{Config, SyncStrategy};
use ember_protocol::Frame;
use ember_server::{Server, Session, dispatch};

fn temp_aof(name: &str) -> String {
	std::env::temp_dir()
		.join(format!("ember-server-aof-{}-{name}.aof", std::process::id()))
		.display()
		.to_string()
}

fn config(path: &str) -> Config {
	let mut config = Config::default();
	config.aof.enabled = true;
	config.aof.path = path.to_string();
	config.aof.sync_strategy = SyncStrategy::Always;
	config
}

fn cleanup(path: &str) {
	let _ = std::fs::remove_file(path);
	let _ = std::fs::remove_file(format!("{path}.lock"));
}

fn run(server: &Server, session: &mut Session, words: &[&str]) -> Frame {
	let args: Vec<Vec<u8>> = words.iter().map(|w| w.as_bytes().to_vec()).collect();
	dispatch(server, session, &args).0
}

fn bulk(text: &str) -> Frame {
	Frame::Bulk(Some(text.as_bytes().to_vec()))
}

#[test]
fn test_recovery_restores_state() {
	let path = temp_aof("recovery");
	cleanup(&path);
	{
		let server = Server::bootstrap(config(&path)).unwrap();
		let mut session = Session::new();
		run(&server, &mut session, &["SET", "k1", "v1"]);
		run(&server, &mut session, &["HSET", "h1", "f", "v"]);
		run(&server, &mut session, &["ZADD", "z", "3", "m"]);
		run(&server, &mut session, &["DEL", "k1"]);
		// Drop drains the queue and fsyncs.
	}

	let server = Server::bootstrap(config(&path)).unwrap();
	let mut session = Session::new();
	assert_eq!(run(&server, &mut session, &["EXISTS", "k1"]), Frame::Integer(0));
	assert_eq!(run(&server, &mut session, &["HGET", "h1", "f"]), bulk("v"));
	assert_eq!(run(&server, &mut session, &["ZSCORE", "z", "m"]), bulk("3"));
	drop(server);
	cleanup(&path);
}

#[test]
fn test_recovery_is_replay_equivalent() {
	let path = temp_aof("equiv");
	cleanup(&path);
	{
		let server = Server::bootstrap(config(&path)).unwrap();
		let mut session = Session::new();
		run(&server, &mut session, &["RPUSH", "l", "a", "b", "c"]);
		run(&server, &mut session, &["LPOP", "l"]);
		run(&server, &mut session, &["SADD", "s", "x", "y"]);
		run(&server, &mut session, &["SREM", "s", "x"]);
		run(&server, &mut session, &["INCR", "n"]);
		run(&server, &mut session, &["INCR", "n"]);
		run(&server, &mut session, &["SETBIT", "b", "9", "1"]);
	}

	let server = Server::bootstrap(config(&path)).unwrap();
	let mut session = Session::new();
	assert_eq!(
		run(&server, &mut session, &["LRANGE", "l", "0", "-1"]),
		Frame::array(vec![bulk("b"), bulk("c")])
	);
	assert_eq!(
		run(&server, &mut session, &["SMEMBERS", "s"]),
		Frame::array(vec![bulk("y")])
	);
	assert_eq!(run(&server, &mut session, &["GET", "n"]), bulk("2"));
	assert_eq!(run(&server, &mut session, &["GETBIT", "b", "9"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["DBSIZE"]), Frame::Integer(4));
	drop(server);
	cleanup(&path);
}

#[test]
fn test_spop_recovers_deterministically() {
	let path = temp_aof("spop");
	cleanup(&path);
	let survivors = {
		let server = Server::bootstrap(config(&path)).unwrap();
		let mut session = Session::new();
		run(&server, &mut session, &["SADD", "s", "a", "b", "c", "d"]);
		run(&server, &mut session, &["SPOP", "s", "2"]);
		match run(&server, &mut session, &["SMEMBERS", "s"]) {
			Frame::Array(Some(members)) => members,
			other => panic!("expected array, got {other:?}"),
		}
	};

	// SPOP propagates as SREM of the popped members, so the recovered set
	// must equal the survivors exactly.
	let server = Server::bootstrap(config(&path)).unwrap();
	let mut session = Session::new();
	assert_eq!(
		run(&server, &mut session, &["SMEMBERS", "s"]),
		Frame::Array(Some(survivors))
	);
	drop(server);
	cleanup(&path);
}

#[test]
fn test_trailing_partial_frame_tolerated() {
	let path = temp_aof("partial");
	cleanup(&path);
	{
		let server = Server::bootstrap(config(&path)).unwrap();
		let mut session = Session::new();
		run(&server, &mut session, &["SET", "k", "v"]);
	}
	// Simulate a crash mid-append.
	use std::io::Write as _;
	let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
	file.write_all(b"*3\r\n$3\r\nSET\r\n$2\r\nk2").unwrap();
	drop(file);

	let server = Server::bootstrap(config(&path)).unwrap();
	let mut session = Session::new();
	assert_eq!(run(&server, &mut session, &["GET", "k"]), bulk("v"));
	assert_eq!(run(&server, &mut session, &["EXISTS", "k2"]), Frame::Integer(0));
	drop(server);
	cleanup(&path);
}

#[test]
fn test_corrupt_log_fails_startup() {
	let path = temp_aof("corrupt");
	cleanup(&path);
	std::fs::write(&path, b"!this is not resp\r\n").unwrap();
	assert!(Server::bootstrap(config(&path)).is_err());
	cleanup(&path);
}

#[test]
fn test_expire_recovers_as_absolute_deadline() {
	let path = temp_aof("expire");
	cleanup(&path);
	{
		let server = Server::bootstrap(config(&path)).unwrap();
		let mut session = Session::new();
		run(&server, &mut session, &["SET", "k", "v"]);
		run(&server, &mut session, &["EXPIRE", "k", "3600"]);
	}

	let server = Server::bootstrap(config(&path)).unwrap();
	let mut session = Session::new();
	match run(&server, &mut session, &["TTL", "k"]) {
		Frame::Integer(ttl) => assert!((1..=3600).contains(&ttl), "ttl {ttl}"),
		other => panic!("expected integer, got {other:?}"),
	}
	drop(server);
	cleanup(&path);
}
