// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
	#[error("password hashing failed: {reason}")]
	HashingFailed { reason: String },

	#[error("stored password hash is invalid: {reason}")]
	InvalidHash { reason: String },

	#[error("password verification failed: {reason}")]
	VerificationFailed { reason: String },

	#[error("invalid acl user '{name}': {reason}")]
	InvalidUser { name: String, reason: String },

	#[error("unknown acl category '{name}'")]
	UnknownCategory { name: String },
}
