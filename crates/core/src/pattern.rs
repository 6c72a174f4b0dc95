// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use dashmap::DashMap;
use regex::bytes::Regex;
use std::sync::Arc;

use crate::CommandError;

/// Upper bound on cached compiled patterns. Beyond this the cache is cleared
/// wholesale; key patterns repeat heavily in practice so a full rebuild is
/// cheaper than tracking recency.
const CACHE_CAPACITY: usize = 1024;

/// A compiled glob pattern.
///
/// Glob semantics: `*` matches any run of bytes, `?` exactly one byte,
/// `[...]` a character class (leading `^` negates, `-` ranges), `\x`
/// escapes the next byte. Compilation targets an anchored byte regex.
#[derive(Debug, Clone)]
pub struct GlobPattern {
	source: Vec<u8>,
	regex: Option<Regex>,
}

impl GlobPattern {
	pub fn compile(pattern: &[u8]) -> crate::Result<Self> {
		// `*` is the universal pattern; skip the regex engine entirely.
		if pattern == b"*" {
			return Ok(GlobPattern {
				source: pattern.to_vec(),
				regex: None,
			});
		}
		let regex = Regex::new(&glob_to_regex(pattern)?)
			.map_err(|e| CommandError::Other(format!("invalid pattern: {e}")))?;
		Ok(GlobPattern {
			source: pattern.to_vec(),
			regex: Some(regex),
		})
	}

	pub fn matches(&self, input: &[u8]) -> bool {
		match &self.regex {
			None => true,
			Some(re) => re.is_match(input),
		}
	}

	pub fn source(&self) -> &[u8] {
		&self.source
	}

	/// True when the pattern can only match itself.
	pub fn is_literal(&self) -> bool {
		literal_prefix(&self.source).len() == self.source.len()
	}
}

/// The literal byte prefix before the first glob metacharacter, unescaped.
/// Keyspace scans use it to skip keys that cannot match.
pub fn literal_prefix(pattern: &[u8]) -> Vec<u8> {
	let mut prefix = Vec::new();
	let mut i = 0;
	while i < pattern.len() {
		match pattern[i] {
			b'*' | b'?' | b'[' => break,
			b'\\' if i + 1 < pattern.len() => {
				prefix.push(pattern[i + 1]);
				i += 2;
			}
			b => {
				prefix.push(b);
				i += 1;
			}
		}
	}
	prefix
}

fn glob_to_regex(pattern: &[u8]) -> crate::Result<String> {
	let mut out = String::with_capacity(pattern.len() * 2 + 8);
	// (?s-u) lets `.` cross newline bytes and keeps matching byte-wise.
	out.push_str("(?s-u)\\A");
	let mut i = 0;
	while i < pattern.len() {
		match pattern[i] {
			b'*' => out.push_str(".*"),
			b'?' => out.push('.'),
			b'\\' => {
				i += 1;
				match pattern.get(i) {
					Some(&b) => push_literal(&mut out, b),
					// A trailing backslash matches itself.
					None => push_literal(&mut out, b'\\'),
				}
			}
			b'[' => {
				let end = pattern[i + 1..]
					.iter()
					.position(|&b| b == b']')
					.map(|p| i + 1 + p)
					.ok_or(CommandError::Other("unterminated character class".to_string()))?;
				out.push('[');
				let mut j = i + 1;
				if pattern.get(j) == Some(&b'^') {
					out.push('^');
					j += 1;
				}
				while j < end {
					let b = pattern[j];
					match b {
						b'-' => out.push('-'),
						b'\\' | b']' | b'^' => {
							out.push('\\');
							out.push(b as char);
						}
						_ => push_class_byte(&mut out, b),
					}
					j += 1;
				}
				out.push(']');
				i = end;
			}
			b => push_literal(&mut out, b),
		}
		i += 1;
	}
	out.push_str("\\z");
	Ok(out)
}

fn push_literal(out: &mut String, b: u8) {
	if b.is_ascii_alphanumeric() {
		out.push(b as char);
	} else {
		out.push_str(&format!("\\x{:02x}", b));
	}
}

fn push_class_byte(out: &mut String, b: u8) {
	if b.is_ascii_alphanumeric() {
		out.push(b as char);
	} else {
		out.push_str(&format!("\\x{:02x}", b));
	}
}

/// Process-wide cache of compiled patterns keyed by their source bytes.
#[derive(Debug, Default)]
pub struct PatternCache {
	compiled: DashMap<Vec<u8>, Arc<GlobPattern>>,
}

impl PatternCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, pattern: &[u8]) -> crate::Result<Arc<GlobPattern>> {
		if let Some(hit) = self.compiled.get(pattern) {
			return Ok(hit.value().clone());
		}
		let compiled = Arc::new(GlobPattern::compile(pattern)?);
		if self.compiled.len() >= CACHE_CAPACITY {
			self.compiled.clear();
		}
		self.compiled.insert(pattern.to_vec(), compiled.clone());
		Ok(compiled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn matches(pattern: &[u8], input: &[u8]) -> bool {
		GlobPattern::compile(pattern).unwrap().matches(input)
	}

	#[test]
	fn test_star_matches_everything() {
		assert!(matches(b"*", b""));
		assert!(matches(b"*", b"anything\r\nat all"));
	}

	#[test]
	fn test_question_mark_is_one_byte() {
		assert!(matches(b"h?llo", b"hello"));
		assert!(matches(b"h?llo", b"hallo"));
		assert!(!matches(b"h?llo", b"hllo"));
		assert!(!matches(b"h?llo", b"heello"));
	}

	#[test]
	fn test_character_class() {
		assert!(matches(b"h[ae]llo", b"hello"));
		assert!(matches(b"h[ae]llo", b"hallo"));
		assert!(!matches(b"h[ae]llo", b"hillo"));
		assert!(matches(b"h[a-c]llo", b"hbllo"));
		assert!(matches(b"h[^e]llo", b"hallo"));
		assert!(!matches(b"h[^e]llo", b"hello"));
	}

	#[test]
	fn test_escape_matches_literal() {
		assert!(matches(b"h\\*llo", b"h*llo"));
		assert!(!matches(b"h\\*llo", b"hxllo"));
	}

	#[test]
	fn test_anchored_both_ends() {
		assert!(!matches(b"user:*", b"xuser:1"));
		assert!(matches(b"user:*", b"user:1"));
		assert!(!matches(b"user", b"user:1"));
	}

	#[test]
	fn test_literal_prefix() {
		assert_eq!(literal_prefix(b"user:*"), b"user:".to_vec());
		assert_eq!(literal_prefix(b"*"), b"".to_vec());
		assert_eq!(literal_prefix(b"plain"), b"plain".to_vec());
		assert_eq!(literal_prefix(b"a\\*b*"), b"a*b".to_vec());
	}

	#[test]
	fn test_cache_compiles_once() {
		let cache = PatternCache::new();
		let a = cache.get(b"user:*").unwrap();
		let b = cache.get(b"user:*").unwrap();
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn test_unterminated_class_is_error() {
		assert!(GlobPattern::compile(b"h[allo").is_err());
	}
}
