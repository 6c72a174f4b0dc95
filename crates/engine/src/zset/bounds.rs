// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use ember_core::{CommandError, parse};

/// One end of a score interval: `-inf`, `+inf`, a double, or `(double`
/// for the open form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
	pub value: f64,
	pub exclusive: bool,
}

impl ScoreBound {
	pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
		let (exclusive, rest) = match raw.split_first() {
			Some((b'(', rest)) => (true, rest),
			_ => (false, raw),
		};
		let value = parse::parse_f64(rest).map_err(|_| CommandError::InvalidScoreBound)?;
		Ok(Self { value, exclusive })
	}
}

/// One end of a lexicographic interval: `-`, `+`, `[member` or `(member`.
#[derive(Debug, Clone, PartialEq)]
pub enum LexBound {
	NegInfinite,
	PosInfinite,
	Inclusive(Vec<u8>),
	Exclusive(Vec<u8>),
}

impl LexBound {
	pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
		match raw.split_first() {
			Some((b'-', rest)) if rest.is_empty() => Ok(LexBound::NegInfinite),
			Some((b'+', rest)) if rest.is_empty() => Ok(LexBound::PosInfinite),
			Some((b'[', rest)) => Ok(LexBound::Inclusive(rest.to_vec())),
			Some((b'(', rest)) => Ok(LexBound::Exclusive(rest.to_vec())),
			_ => Err(CommandError::InvalidLexBound),
		}
	}

	/// Whether `member` lies at or above this bound when used as a lower
	/// end.
	pub fn admits_from_below(&self, member: &[u8]) -> bool {
		match self {
			LexBound::NegInfinite => true,
			LexBound::PosInfinite => false,
			LexBound::Inclusive(bound) => member >= bound.as_slice(),
			LexBound::Exclusive(bound) => member > bound.as_slice(),
		}
	}

	/// Whether `member` lies at or below this bound when used as an upper
	/// end.
	pub fn admits_from_above(&self, member: &[u8]) -> bool {
		match self {
			LexBound::NegInfinite => false,
			LexBound::PosInfinite => true,
			LexBound::Inclusive(bound) => member <= bound.as_slice(),
			LexBound::Exclusive(bound) => member < bound.as_slice(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_score_bound_forms() {
		assert_eq!(
			ScoreBound::parse(b"1.5").unwrap(),
			ScoreBound { value: 1.5, exclusive: false }
		);
		assert_eq!(
			ScoreBound::parse(b"(1.5").unwrap(),
			ScoreBound { value: 1.5, exclusive: true }
		);
		assert_eq!(ScoreBound::parse(b"-inf").unwrap().value, f64::NEG_INFINITY);
		assert_eq!(ScoreBound::parse(b"+inf").unwrap().value, f64::INFINITY);
		assert!(ScoreBound::parse(b"abc").is_err());
		assert!(ScoreBound::parse(b"(").is_err());
	}

	#[test]
	fn test_lex_bound_forms() {
		assert_eq!(LexBound::parse(b"-").unwrap(), LexBound::NegInfinite);
		assert_eq!(LexBound::parse(b"+").unwrap(), LexBound::PosInfinite);
		assert_eq!(LexBound::parse(b"[abc").unwrap(), LexBound::Inclusive(b"abc".to_vec()));
		assert_eq!(LexBound::parse(b"(abc").unwrap(), LexBound::Exclusive(b"abc".to_vec()));
		assert!(LexBound::parse(b"abc").is_err());
		assert!(LexBound::parse(b"").is_err());
	}

	#[test]
	fn test_lex_admission() {
		let lower = LexBound::Inclusive(b"a".to_vec());
		let upper = LexBound::Exclusive(b"c".to_vec());
		assert!(lower.admits_from_below(b"a"));
		assert!(lower.admits_from_below(b"b"));
		assert!(!upper.admits_from_above(b"c"));
		assert!(upper.admits_from_above(b"b"));
	}
}
