// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::Frame;

/// Serializes one frame into `out` using the exact framing the decoder
/// accepts, CRLF terminated throughout.
pub fn encode(frame: &Frame, out: &mut Vec<u8>) {
	match frame {
		Frame::Simple(s) => {
			out.push(b'+');
			out.extend_from_slice(s.as_bytes());
			out.extend_from_slice(b"\r\n");
		}
		Frame::Error(s) => {
			out.push(b'-');
			out.extend_from_slice(s.as_bytes());
			out.extend_from_slice(b"\r\n");
		}
		Frame::Integer(v) => {
			out.push(b':');
			out.extend_from_slice(v.to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
		}
		Frame::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
		Frame::Bulk(Some(bytes)) => {
			out.push(b'$');
			out.extend_from_slice(bytes.len().to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			out.extend_from_slice(bytes);
			out.extend_from_slice(b"\r\n");
		}
		Frame::Array(None) => out.extend_from_slice(b"*-1\r\n"),
		Frame::Array(Some(items)) => {
			out.push(b'*');
			out.extend_from_slice(items.len().to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			for item in items {
				encode(item, out);
			}
		}
		Frame::Null => out.extend_from_slice(b"_\r\n"),
		Frame::Boolean(true) => out.extend_from_slice(b"#t\r\n"),
		Frame::Boolean(false) => out.extend_from_slice(b"#f\r\n"),
		Frame::Double(v) => {
			out.push(b',');
			if *v == f64::INFINITY {
				out.extend_from_slice(b"inf");
			} else if *v == f64::NEG_INFINITY {
				out.extend_from_slice(b"-inf");
			} else {
				out.extend_from_slice(v.to_string().as_bytes());
			}
			out.extend_from_slice(b"\r\n");
		}
		Frame::BigNumber(s) => {
			out.push(b'(');
			out.extend_from_slice(s.as_bytes());
			out.extend_from_slice(b"\r\n");
		}
		Frame::Verbatim { format, text } => {
			out.push(b'=');
			out.extend_from_slice((text.len() + 4).to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			out.extend_from_slice(format);
			out.push(b':');
			out.extend_from_slice(text);
			out.extend_from_slice(b"\r\n");
		}
		Frame::Map(pairs) => {
			out.push(b'%');
			out.extend_from_slice(pairs.len().to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			for (key, value) in pairs {
				encode(key, out);
				encode(value, out);
			}
		}
		Frame::Set(items) => {
			out.push(b'~');
			out.extend_from_slice(items.len().to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			for item in items {
				encode(item, out);
			}
		}
		Frame::Attribute { attrs, value } => {
			out.push(b'|');
			out.extend_from_slice(attrs.len().to_string().as_bytes());
			out.extend_from_slice(b"\r\n");
			for (key, val) in attrs {
				encode(key, out);
				encode(val, out);
			}
			encode(value, out);
		}
	}
}

/// Convenience wrapper allocating a fresh buffer.
pub fn encode_to_vec(frame: &Frame) -> Vec<u8> {
	let mut out = Vec::new();
	encode(frame, &mut out);
	out
}
