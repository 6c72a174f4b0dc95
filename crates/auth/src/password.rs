// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use argon2::{
	Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
	password_hash::{Error as PasswordHashError, SaltString, rand_core::OsRng},
};

use crate::AuthError;

/// OWASP-recommended Argon2id parameters:
/// 19 MiB memory, 2 iterations, parallelism 1, 32-byte output.
fn argon2_instance() -> Argon2<'static> {
	let params = Params::new(19 * 1024, 2, 1, Some(32)).expect("valid Argon2 params");
	Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hashes a plaintext password into a PHC string suitable for the ACL
/// configuration.
pub fn hash_password(password: &str) -> crate::Result<String> {
	let salt = SaltString::generate(&mut OsRng);
	let phc = argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map_err(|e| AuthError::HashingFailed {
			reason: e.to_string(),
		})?
		.to_string();
	Ok(phc)
}

/// Verifies a credential against a stored PHC string. A mismatch is
/// `Ok(false)`; only malformed hashes or algorithm failures error.
pub fn verify_password(phc: &str, credential: &str) -> crate::Result<bool> {
	let parsed_hash = PasswordHash::new(phc).map_err(|e| AuthError::InvalidHash {
		reason: e.to_string(),
	})?;

	match argon2_instance().verify_password(credential.as_bytes(), &parsed_hash) {
		Ok(()) => Ok(true),
		Err(PasswordHashError::Password) => Ok(false),
		Err(e) => Err(AuthError::VerificationFailed {
			reason: e.to_string(),
		}),
	}
}
