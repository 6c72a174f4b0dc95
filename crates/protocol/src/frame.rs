// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::FrameError;

/// One self-describing RESP value, possibly nested.
///
/// Covers the RESP2 frames (`+ - : $ *`) and the RESP3 extensions
/// (`_ # , ( = % ~ |`). Null bulk (`$-1`) and null array (`*-1`) keep their
/// RESP2 encodings and are represented as `Bulk(None)` / `Array(None)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
	Simple(String),
	Error(String),
	Integer(i64),
	Bulk(Option<Vec<u8>>),
	Array(Option<Vec<Frame>>),
	Null,
	Boolean(bool),
	Double(f64),
	BigNumber(String),
	Verbatim { format: [u8; 3], text: Vec<u8> },
	Map(Vec<(Frame, Frame)>),
	Set(Vec<Frame>),
	Attribute { attrs: Vec<(Frame, Frame)>, value: Box<Frame> },
}

impl Frame {
	pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
		Frame::Bulk(Some(bytes.into()))
	}

	pub fn simple(s: impl Into<String>) -> Self {
		Frame::Simple(s.into())
	}

	pub fn error(s: impl Into<String>) -> Self {
		Frame::Error(s.into())
	}

	pub fn array(frames: Vec<Frame>) -> Self {
		Frame::Array(Some(frames))
	}

	pub const NULL_BULK: Frame = Frame::Bulk(None);
	pub const NULL_ARRAY: Frame = Frame::Array(None);

	/// Interprets this frame as a client command: a non-empty array of bulk
	/// strings. Returns the argument vector; the first element is the
	/// command name, matched case-insensitively by the dispatcher.
	pub fn into_command(self) -> crate::Result<Vec<Vec<u8>>> {
		let items = match self {
			Frame::Array(Some(items)) if !items.is_empty() => items,
			_ => return Err(FrameError::NotACommand),
		};
		let mut args = Vec::with_capacity(items.len());
		for item in items {
			match item {
				Frame::Bulk(Some(bytes)) => args.push(bytes),
				// Inline-style clients send simple strings; accept them.
				Frame::Simple(s) => args.push(s.into_bytes()),
				_ => return Err(FrameError::NotACommand),
			}
		}
		Ok(args)
	}

	/// Builds the canonical command frame for AOF/replica propagation.
	pub fn command(args: &[Vec<u8>]) -> Frame {
		Frame::Array(Some(args.iter().map(|a| Frame::Bulk(Some(a.clone()))).collect()))
	}
}
