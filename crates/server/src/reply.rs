// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Frame constructors shared by the handler modules.

use ember_core::format_f64;
use ember_protocol::Frame;

pub fn ok() -> Frame {
	Frame::simple("OK")
}

pub fn int(value: i64) -> Frame {
	Frame::Integer(value)
}

pub fn boolean(value: bool) -> Frame {
	Frame::Integer(value as i64)
}

pub fn bulk(bytes: impl Into<Vec<u8>>) -> Frame {
	Frame::Bulk(Some(bytes.into()))
}

pub fn bulk_or_null(bytes: Option<Vec<u8>>) -> Frame {
	Frame::Bulk(bytes)
}

/// Scores travel as bulk strings in RESP2 replies.
pub fn score(value: f64) -> Frame {
	bulk(format_f64(value).into_bytes())
}

pub fn score_or_null(value: Option<f64>) -> Frame {
	match value {
		None => Frame::Bulk(None),
		Some(value) => score(value),
	}
}

pub fn array(frames: Vec<Frame>) -> Frame {
	Frame::Array(Some(frames))
}

pub fn bulk_array(items: impl IntoIterator<Item = Vec<u8>>) -> Frame {
	array(items.into_iter().map(|item| Frame::Bulk(Some(item))).collect())
}

/// `(member, score)` pairs flattened, optionally with scores interleaved.
pub fn member_score_array(pairs: Vec<(Vec<u8>, f64)>, withscores: bool) -> Frame {
	let mut frames = Vec::with_capacity(pairs.len() * if withscores { 2 } else { 1 });
	for (member, value) in pairs {
		frames.push(bulk(member));
		if withscores {
			frames.push(score(value));
		}
	}
	array(frames)
}

/// Cursor reply shape shared by `SCAN`, `SSCAN`, `HSCAN`, `ZSCAN`:
/// a two-element array of the next cursor and the payload array.
pub fn scan_reply(cursor: u64, payload: Frame) -> Frame {
	array(vec![bulk(cursor.to_string().into_bytes()), payload])
}
