// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use ember_auth::Category;
use ember_core::CommandError;
use ember_protocol::Frame;
use once_cell::sync::Lazy;

use crate::server::Server;
use crate::session::Session;

/// Arity contract, counted like the wire: command name included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
	Exact(usize),
	AtLeast(usize),
}

impl Arity {
	pub fn accepts(&self, argc: usize) -> bool {
		match self {
			Arity::Exact(n) => argc == *n,
			Arity::AtLeast(n) => argc >= *n,
		}
	}
}

/// What the dispatcher should feed to the AOF and the replica stream after
/// a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum Propagate {
	/// The command as the client sent it.
	Command,
	/// Nothing; the command turned out not to mutate (e.g. `SORT` without
	/// `STORE`).
	Nothing,
	/// Deterministic replacements (e.g. `SPOP` becomes `SREM` of the
	/// popped members; relative expiries become `PEXPIREAT`).
	Rewritten(Vec<Vec<Vec<u8>>>),
}

/// A handler's result: the reply frame plus the propagation decision and
/// an optional connection-level action.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
	pub reply: Frame,
	pub propagate: Propagate,
	pub action: Option<Action>,
}

/// Connection-level side effects a handler can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	/// `SYNC`: after the reply, dump the keyspace and attach the
	/// connection to the live replication stream.
	StartReplicaStream,
	/// `QUIT`: flush the reply, then close.
	CloseConnection,
}

impl Outcome {
	/// Plain reply; write commands propagate as sent.
	pub fn reply(reply: Frame) -> Self {
		Self {
			reply,
			propagate: Propagate::Command,
			action: None,
		}
	}

	pub fn silent(reply: Frame) -> Self {
		Self {
			reply,
			propagate: Propagate::Nothing,
			action: None,
		}
	}

	pub fn rewritten(reply: Frame, commands: Vec<Vec<Vec<u8>>>) -> Self {
		Self {
			reply,
			propagate: Propagate::Rewritten(commands),
			action: None,
		}
	}
}

pub type Handler =
	fn(&Server, &mut Session, &[Vec<u8>]) -> Result<Outcome, CommandError>;

pub struct CommandSpec {
	pub name: &'static str,
	pub arity: Arity,
	pub category: Category,
	pub handler: Handler,
}

impl CommandSpec {
	pub const fn new(
		name: &'static str,
		arity: Arity,
		category: Category,
		handler: Handler,
	) -> Self {
		Self {
			name,
			arity,
			category,
			handler,
		}
	}

	pub fn is_write(&self) -> bool {
		self.category == Category::Write
	}
}

/// The case-insensitive command table. Names are stored uppercase; lookup
/// uppercases the probe.
pub struct Registry {
	commands: HashMap<&'static str, CommandSpec>,
}

impl Registry {
	pub fn lookup(&self, name: &[u8]) -> Option<&CommandSpec> {
		let upper = String::from_utf8_lossy(name).to_ascii_uppercase();
		self.commands.get(upper.as_str())
	}

	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}
}

pub fn registry() -> &'static Registry {
	static REGISTRY: Lazy<Registry> = Lazy::new(|| {
		let mut commands = HashMap::new();
		for spec in crate::handlers::all() {
			let previous = commands.insert(spec.name, spec);
			assert!(previous.is_none(), "duplicate command registration");
		}
		Registry { commands }
	});
	Lazy::force(&REGISTRY)
}

/// Transaction-control commands execute immediately even inside `MULTI`.
pub fn is_txn_control(name: &[u8]) -> bool {
	let upper = name.to_ascii_uppercase();
	matches!(upper.as_slice(), b"MULTI" | b"EXEC" | b"DISCARD" | b"WATCH" | b"UNWATCH")
}

/// Commands exempt from ACL permission checks.
pub fn is_acl_exempt(name: &[u8]) -> bool {
	let upper = name.to_ascii_uppercase();
	matches!(upper.as_slice(), b"AUTH" | b"PING" | b"INFO" | b"QUIT")
}

/// Replication-control commands a replica always accepts.
pub fn is_repl_control(name: &[u8]) -> bool {
	let upper = name.to_ascii_uppercase();
	matches!(upper.as_slice(), b"REPLCONF" | b"SYNC")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_arity() {
		assert!(Arity::Exact(2).accepts(2));
		assert!(!Arity::Exact(2).accepts(3));
		assert!(Arity::AtLeast(2).accepts(2));
		assert!(Arity::AtLeast(2).accepts(9));
		assert!(!Arity::AtLeast(2).accepts(1));
	}

	#[test]
	fn test_registry_is_case_insensitive() {
		let registry = registry();
		assert!(registry.lookup(b"get").is_some());
		assert!(registry.lookup(b"GeT").is_some());
		assert!(registry.lookup(b"NOPE").is_none());
		assert!(!registry.is_empty());
	}

	#[test]
	fn test_classifications() {
		assert!(is_txn_control(b"multi"));
		assert!(is_txn_control(b"WATCH"));
		assert!(!is_txn_control(b"SET"));
		assert!(is_acl_exempt(b"ping"));
		assert!(!is_acl_exempt(b"set"));
		assert!(is_repl_control(b"sync"));
	}
}
