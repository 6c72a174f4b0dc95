// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use thiserror::Error;

/// A framing failure.
///
/// Framing errors are fatal for the connection that produced them: once the
/// stream position is ambiguous there is no way to resynchronize on frame
/// boundaries. They never terminate the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
	#[error("unknown frame marker 0x{marker:02x}")]
	UnknownMarker { marker: u8 },

	#[error("invalid length in {frame} frame")]
	InvalidLength { frame: &'static str },

	#[error("line exceeds maximum length")]
	LineTooLong,

	#[error("bulk payload missing CRLF terminator")]
	MissingTerminator,

	#[error("invalid boolean frame")]
	InvalidBoolean,

	#[error("invalid double frame")]
	InvalidDouble,

	#[error("invalid verbatim frame")]
	InvalidVerbatim,

	#[error("frame nesting exceeds maximum depth")]
	NestingTooDeep,

	#[error("expected a command array of bulk strings")]
	NotACommand,
}
