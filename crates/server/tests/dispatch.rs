// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Dispatcher-level scenarios: the full command pipeline without sockets.

use ember_core::Config;
use ember_protocol::Frame;
use ember_server::{Server, Session, dispatch};

fn server() -> Server {
	Server::in_memory(Config::default()).unwrap()
}

fn run(server: &Server, session: &mut Session, words: &[&str]) -> Frame {
	let args: Vec<Vec<u8>> = words.iter().map(|w| w.as_bytes().to_vec()).collect();
	dispatch(server, session, &args).0
}

fn bulk(text: &str) -> Frame {
	Frame::Bulk(Some(text.as_bytes().to_vec()))
}

#[test]
fn test_set_get_del_round_trip() {
	let server = server();
	let mut session = Session::new();
	assert_eq!(run(&server, &mut session, &["SET", "k", "v"]), Frame::simple("OK"));
	assert_eq!(run(&server, &mut session, &["GET", "k"]), bulk("v"));
	assert_eq!(run(&server, &mut session, &["DEL", "k"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["EXISTS", "k"]), Frame::Integer(0));
	assert_eq!(run(&server, &mut session, &["GET", "k"]), Frame::Bulk(None));
}

#[test]
fn test_unknown_command_and_arity() {
	let server = server();
	let mut session = Session::new();
	match run(&server, &mut session, &["FROBNICATE"]) {
		Frame::Error(text) => assert!(text.starts_with("ERR unknown command")),
		other => panic!("expected error, got {other:?}"),
	}
	match run(&server, &mut session, &["GET"]) {
		Frame::Error(text) => assert!(text.contains("wrong number of arguments")),
		other => panic!("expected error, got {other:?}"),
	}
}

#[test]
fn test_wrongtype_reply() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["SET", "k", "s"]);
	match run(&server, &mut session, &["LPUSH", "k", "x"]) {
		Frame::Error(text) => assert!(text.starts_with("WRONGTYPE ")),
		other => panic!("expected WRONGTYPE, got {other:?}"),
	}
}

#[test]
fn test_transaction_commit() {
	let server = server();
	let mut session = Session::new();
	assert_eq!(run(&server, &mut session, &["MULTI"]), Frame::simple("OK"));
	assert_eq!(run(&server, &mut session, &["SET", "a", "1"]), Frame::simple("QUEUED"));
	assert_eq!(run(&server, &mut session, &["INCR", "a"]), Frame::simple("QUEUED"));
	assert_eq!(
		run(&server, &mut session, &["EXEC"]),
		Frame::array(vec![Frame::simple("OK"), Frame::Integer(2)])
	);
	assert_eq!(run(&server, &mut session, &["GET", "a"]), bulk("2"));
}

#[test]
fn test_transaction_abort_via_watch() {
	let server = server();
	let mut watcher = Session::new();
	let mut writer = Session::new();

	run(&server, &mut watcher, &["SET", "x", "1"]);
	assert_eq!(run(&server, &mut watcher, &["WATCH", "x"]), Frame::simple("OK"));
	run(&server, &mut watcher, &["MULTI"]);
	run(&server, &mut watcher, &["INCR", "x"]);

	// A second connection writes the watched key before EXEC.
	assert_eq!(run(&server, &mut writer, &["SET", "x", "99"]), Frame::simple("OK"));

	assert_eq!(run(&server, &mut watcher, &["EXEC"]), Frame::Array(None));
	assert_eq!(run(&server, &mut watcher, &["GET", "x"]), bulk("99"));
}

#[test]
fn test_watch_on_missing_key_sees_creation() {
	let server = server();
	let mut watcher = Session::new();
	let mut writer = Session::new();

	run(&server, &mut watcher, &["WATCH", "ghost"]);
	run(&server, &mut watcher, &["MULTI"]);
	run(&server, &mut watcher, &["SET", "ghost", "mine"]);
	run(&server, &mut writer, &["SET", "ghost", "theirs"]);
	assert_eq!(run(&server, &mut watcher, &["EXEC"]), Frame::Array(None));
}

#[test]
fn test_watch_delete_and_recreate_still_aborts() {
	let server = server();
	let mut watcher = Session::new();
	let mut writer = Session::new();

	run(&server, &mut watcher, &["SET", "x", "1"]);
	run(&server, &mut watcher, &["WATCH", "x"]);
	run(&server, &mut watcher, &["MULTI"]);
	run(&server, &mut watcher, &["INCR", "x"]);
	run(&server, &mut writer, &["DEL", "x"]);
	run(&server, &mut writer, &["SET", "x", "1"]);
	assert_eq!(run(&server, &mut watcher, &["EXEC"]), Frame::Array(None));
}

#[test]
fn test_unwatched_exec_equivalent_to_plain_execution() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["WATCH", "k"]);
	run(&server, &mut session, &["MULTI"]);
	run(&server, &mut session, &["SET", "k", "v"]);
	run(&server, &mut session, &["APPEND", "k", "!"]);
	assert_eq!(
		run(&server, &mut session, &["EXEC"]),
		Frame::array(vec![Frame::simple("OK"), Frame::Integer(2)])
	);
	assert_eq!(run(&server, &mut session, &["GET", "k"]), bulk("v!"));
}

#[test]
fn test_nested_multi_and_stray_exec() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["MULTI"]);
	match run(&server, &mut session, &["MULTI"]) {
		Frame::Error(text) => assert!(text.contains("MULTI calls can not be nested")),
		other => panic!("expected error, got {other:?}"),
	}
	run(&server, &mut session, &["DISCARD"]);
	match run(&server, &mut session, &["EXEC"]) {
		Frame::Error(text) => assert!(text.contains("EXEC without MULTI")),
		other => panic!("expected error, got {other:?}"),
	}
}

#[test]
fn test_discard_drops_queue() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["MULTI"]);
	run(&server, &mut session, &["SET", "never", "written"]);
	assert_eq!(run(&server, &mut session, &["DISCARD"]), Frame::simple("OK"));
	assert_eq!(run(&server, &mut session, &["EXISTS", "never"]), Frame::Integer(0));
}

#[test]
fn test_sorted_set_scenario() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["ZADD", "s", "1", "c"]);
	run(&server, &mut session, &["ZADD", "s", "1", "a"]);
	run(&server, &mut session, &["ZADD", "s", "2", "b"]);

	assert_eq!(
		run(&server, &mut session, &["ZRANGE", "s", "0", "-1", "WITHSCORES"]),
		Frame::array(vec![
			bulk("a"),
			bulk("1"),
			bulk("c"),
			bulk("1"),
			bulk("b"),
			bulk("2"),
		])
	);
	assert_eq!(
		run(&server, &mut session, &["ZRANGEBYLEX", "s", "[a", "(c"]),
		Frame::array(vec![bulk("a")])
	);
	assert_eq!(
		run(&server, &mut session, &["ZRANGEBYSCORE", "s", "-inf", "+inf"]),
		Frame::array(vec![bulk("a"), bulk("c"), bulk("b")])
	);
}

#[test]
fn test_empty_container_reports_none() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["LPUSH", "l", "only"]);
	run(&server, &mut session, &["LPOP", "l"]);
	assert_eq!(run(&server, &mut session, &["EXISTS", "l"]), Frame::Integer(0));
	assert_eq!(run(&server, &mut session, &["TYPE", "l"]), Frame::simple("none"));
}

#[test]
fn test_bitcount_missing_key() {
	let server = server();
	let mut session = Session::new();
	assert_eq!(
		run(&server, &mut session, &["BITCOUNT", "nope", "0", "-1"]),
		Frame::Integer(0)
	);
}

#[test]
fn test_sort_non_numeric_fails_whole_command() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["RPUSH", "l", "1", "banana"]);
	match run(&server, &mut session, &["SORT", "l"]) {
		Frame::Error(text) => assert!(text.starts_with("ERR ")),
		other => panic!("expected error, got {other:?}"),
	}
}

#[test]
fn test_ping_info_exempt_under_acl() {
	let mut config = Config::default();
	config.acl.users.push(ember_core::AclUserConfig {
		name: "app".to_string(),
		nopass: true,
		categories: vec!["read".to_string()],
		..Default::default()
	});
	let server = Server::in_memory(config).unwrap();
	let mut session = Session::new();

	// Unauthenticated: data commands refuse, exempt commands work.
	match run(&server, &mut session, &["GET", "k"]) {
		Frame::Error(text) => assert!(text.starts_with("NOAUTH ")),
		other => panic!("expected NOAUTH, got {other:?}"),
	}
	assert_eq!(run(&server, &mut session, &["PING"]), Frame::simple("PONG"));

	assert_eq!(run(&server, &mut session, &["AUTH", "app", "anything"]), Frame::simple("OK"));
	assert_eq!(run(&server, &mut session, &["GET", "k"]), Frame::Bulk(None));
	// Read-only user: writes are NOPERM.
	match run(&server, &mut session, &["SET", "k", "v"]) {
		Frame::Error(text) => assert!(text.starts_with("NOPERM ")),
		other => panic!("expected NOPERM, got {other:?}"),
	}
}

#[test]
fn test_acl_key_patterns() {
	let mut config = Config::default();
	config.acl.users.push(ember_core::AclUserConfig {
		name: "scoped".to_string(),
		nopass: true,
		key_patterns: vec!["app:*".to_string()],
		..Default::default()
	});
	let server = Server::in_memory(config).unwrap();
	let mut session = Session::new();
	run(&server, &mut session, &["AUTH", "scoped", "x"]);
	assert_eq!(run(&server, &mut session, &["SET", "app:1", "v"]), Frame::simple("OK"));
	match run(&server, &mut session, &["SET", "other", "v"]) {
		Frame::Error(text) => assert!(text.starts_with("NOPERM ")),
		other => panic!("expected NOPERM, got {other:?}"),
	}
}

#[test]
fn test_replica_rejects_writes() {
	let mut config = Config::default();
	config.replication.role = ember_core::Role::Replica;
	let server = Server::in_memory(config).unwrap();
	let mut session = Session::new();
	match run(&server, &mut session, &["SET", "k", "v"]) {
		Frame::Error(text) => assert!(text.starts_with("READONLY ")),
		other => panic!("expected READONLY, got {other:?}"),
	}
	assert_eq!(run(&server, &mut session, &["GET", "k"]), Frame::Bulk(None));
}

#[test]
fn test_expire_ttl_persist() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["SET", "k", "v"]);
	assert_eq!(run(&server, &mut session, &["TTL", "k"]), Frame::Integer(-1));
	assert_eq!(run(&server, &mut session, &["EXPIRE", "k", "100"]), Frame::Integer(1));
	match run(&server, &mut session, &["TTL", "k"]) {
		Frame::Integer(ttl) => assert!((1..=100).contains(&ttl)),
		other => panic!("expected integer, got {other:?}"),
	}
	assert_eq!(run(&server, &mut session, &["PERSIST", "k"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["TTL", "k"]), Frame::Integer(-1));
	assert_eq!(run(&server, &mut session, &["TTL", "ghost"]), Frame::Integer(-2));
}

#[test]
fn test_probabilistic_surface() {
	let server = server();
	let mut session = Session::new();
	assert_eq!(
		run(&server, &mut session, &["PFADD", "h", "a", "b", "c"]),
		Frame::Integer(1)
	);
	assert_eq!(run(&server, &mut session, &["PFCOUNT", "h"]), Frame::Integer(3));

	assert_eq!(
		run(&server, &mut session, &["BF.RESERVE", "f", "0.01", "100"]),
		Frame::simple("OK")
	);
	assert_eq!(run(&server, &mut session, &["BF.ADD", "f", "x"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["BF.EXISTS", "f", "x"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["BF.EXISTS", "f", "y"]), Frame::Integer(0));

	assert_eq!(
		run(&server, &mut session, &["CMS.INITBYDIM", "c", "64", "3"]),
		Frame::simple("OK")
	);
	assert_eq!(
		run(&server, &mut session, &["CMS.INCRBY", "c", "item", "5"]),
		Frame::array(vec![Frame::Integer(5)])
	);

	assert_eq!(run(&server, &mut session, &["CF.ADD", "cf", "x"]), Frame::Integer(1));
	assert_eq!(run(&server, &mut session, &["CF.EXISTS", "cf", "x"]), Frame::Integer(1));

	assert_eq!(
		run(&server, &mut session, &["TOPK.RESERVE", "t", "3"]),
		Frame::simple("OK")
	);
	assert_eq!(
		run(&server, &mut session, &["TOPK.ADD", "t", "hot"]),
		Frame::array(vec![Frame::Bulk(None)])
	);

	assert_eq!(run(&server, &mut session, &["TDIGEST.CREATE", "d"]), Frame::simple("OK"));
	assert_eq!(
		run(&server, &mut session, &["TDIGEST.ADD", "d", "1", "2", "3"]),
		Frame::simple("OK")
	);
	assert_eq!(
		run(&server, &mut session, &["TDIGEST.MIN", "d"]),
		Frame::Bulk(Some(b"1".to_vec()))
	);
}

#[test]
fn test_exec_runs_queued_commands_in_order_with_errors_inline() {
	let server = server();
	let mut session = Session::new();
	run(&server, &mut session, &["SET", "s", "str"]);
	run(&server, &mut session, &["MULTI"]);
	run(&server, &mut session, &["SET", "a", "1"]);
	run(&server, &mut session, &["LPUSH", "s", "x"]);
	run(&server, &mut session, &["INCR", "a"]);
	match run(&server, &mut session, &["EXEC"]) {
		Frame::Array(Some(replies)) => {
			assert_eq!(replies.len(), 3);
			assert_eq!(replies[0], Frame::simple("OK"));
			assert!(matches!(&replies[1], Frame::Error(text) if text.starts_with("WRONGTYPE")));
			assert_eq!(replies[2], Frame::Integer(2));
		}
		other => panic!("expected array, got {other:?}"),
	}
}
