// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use thiserror::Error;

/// A recoverable, reply-only command failure.
///
/// Every variant renders to exactly one RESP error frame; none of them
/// terminate the connection. The wire text is produced by [`CommandError::wire`]
/// and always starts with the error class the client dispatches on
/// (`ERR`, `WRONGTYPE`, `NOAUTH`, `NOPERM`, `READONLY`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
	#[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
	WrongType,

	#[error("ERR unknown command '{name}'")]
	UnknownCommand { name: String },

	#[error("ERR wrong number of arguments for '{command}' command")]
	WrongArity { command: String },

	#[error("ERR value is not an integer or out of range")]
	NotInteger,

	#[error("ERR value is not a valid float")]
	NotFloat,

	#[error("ERR increment or decrement would overflow")]
	IntegerOverflow,

	#[error("ERR index out of range")]
	IndexOutOfRange,

	#[error("ERR {0}")]
	OutOfRange(String),

	#[error("ERR syntax error")]
	Syntax,

	#[error("ERR {0}")]
	Protocol(String),

	#[error("ERR min or max is not a float")]
	InvalidScoreBound,

	#[error("ERR min or max not valid string range item")]
	InvalidLexBound,

	#[error("ERR invalid cursor")]
	InvalidCursor,

	#[error("ERR MULTI calls can not be nested")]
	NestedMulti,

	#[error("ERR {0} without MULTI")]
	WithoutMulti(String),

	#[error("ERR WATCH inside MULTI is not allowed")]
	WatchInMulti,

	#[error("NOAUTH Authentication required.")]
	NoAuth,

	#[error("NOPERM insufficient permissions")]
	NoPerm,

	#[error("READONLY You can't write against a read only replica.")]
	ReadOnly,

	#[error("ERR {0}")]
	Other(String),
}

impl CommandError {
	/// The full wire text of the error reply, class prefix included.
	pub fn wire(&self) -> String {
		self.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_classes() {
		assert!(CommandError::WrongType.wire().starts_with("WRONGTYPE "));
		assert!(CommandError::NoAuth.wire().starts_with("NOAUTH "));
		assert!(CommandError::NoPerm.wire().starts_with("NOPERM "));
		assert!(CommandError::ReadOnly.wire().starts_with("READONLY "));
		assert!(CommandError::NotInteger.wire().starts_with("ERR "));
	}

	#[test]
	fn test_unknown_command_names_offender() {
		let err = CommandError::UnknownCommand {
			name: "FOOBAR".to_string(),
		};
		assert_eq!(err.wire(), "ERR unknown command 'FOOBAR'");
	}
}
