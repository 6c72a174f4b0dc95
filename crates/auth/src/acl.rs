// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::{HashMap, HashSet};

use ember_core::{AclConfig, GlobPattern};
use tracing::debug;

use crate::crypto::constant_time_eq;
use crate::{AuthError, password};

/// Command category an ACL rule can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
	Read,
	Write,
	Admin,
}

impl Category {
	fn parse(name: &str) -> crate::Result<Option<Self>> {
		match name.to_ascii_lowercase().as_str() {
			"read" => Ok(Some(Category::Read)),
			"write" => Ok(Some(Category::Write)),
			"admin" => Ok(Some(Category::Admin)),
			// `all` is represented as every category.
			"all" => Ok(None),
			other => Err(AuthError::UnknownCategory {
				name: other.to_string(),
			}),
		}
	}
}

/// One configured user.
#[derive(Debug, Clone)]
pub struct AclUser {
	pub name: String,
	pub enabled: bool,
	pub nopass: bool,
	password_hashes: Vec<String>,
	categories: HashSet<Category>,
	key_patterns: Vec<GlobPattern>,
}

impl AclUser {
	/// Whether the user may run commands of this category at all.
	pub fn allows_category(&self, category: Category) -> bool {
		self.categories.contains(&category)
	}

	/// Whether every named key falls under the user's key patterns. An
	/// empty pattern list grants all keys.
	pub fn allows_keys<'a>(&self, keys: impl IntoIterator<Item = &'a [u8]>) -> bool {
		if self.key_patterns.is_empty() {
			return true;
		}
		keys.into_iter()
			.all(|key| self.key_patterns.iter().any(|pattern| pattern.matches(key)))
	}
}

/// The access-control list: users compiled from configuration.
///
/// An empty user list disables authentication entirely; every connection
/// then runs as an implicit superuser, which is the development default.
#[derive(Debug, Default)]
pub struct Acl {
	users: HashMap<String, AclUser>,
}

impl Acl {
	pub fn from_config(config: &AclConfig) -> crate::Result<Self> {
		let mut users = HashMap::new();
		for user in &config.users {
			if user.name.is_empty() {
				return Err(AuthError::InvalidUser {
					name: String::new(),
					reason: "empty user name".to_string(),
				});
			}
			if !user.nopass && user.password_hashes.is_empty() {
				return Err(AuthError::InvalidUser {
					name: user.name.clone(),
					reason: "neither nopass nor a password hash".to_string(),
				});
			}
			let mut categories = HashSet::new();
			for name in &user.categories {
				match Category::parse(name)? {
					Some(category) => {
						categories.insert(category);
					}
					None => {
						categories.extend([
							Category::Read,
							Category::Write,
							Category::Admin,
						]);
					}
				}
			}
			let mut key_patterns = Vec::with_capacity(user.key_patterns.len());
			for pattern in &user.key_patterns {
				key_patterns.push(
					GlobPattern::compile(pattern.as_bytes()).map_err(|e| {
						AuthError::InvalidUser {
							name: user.name.clone(),
							reason: e.to_string(),
						}
					})?,
				);
			}
			users.insert(
				user.name.clone(),
				AclUser {
					name: user.name.clone(),
					enabled: user.enabled,
					nopass: user.nopass,
					password_hashes: user.password_hashes.clone(),
					categories,
					key_patterns,
				},
			);
		}
		debug!(users = users.len(), "acl compiled");
		Ok(Self { users })
	}

	/// With no users configured, everything is permitted.
	pub fn auth_required(&self) -> bool {
		!self.users.is_empty()
	}

	/// Verifies a credential. Disabled users never authenticate; `nopass`
	/// users accept anything. User names compare in constant time.
	pub fn authenticate(&self, username: &str, credential: &str) -> crate::Result<Option<&AclUser>> {
		let user = match self
			.users
			.values()
			.find(|user| constant_time_eq(user.name.as_bytes(), username.as_bytes()))
		{
			None => return Ok(None),
			Some(user) => user,
		};
		if !user.enabled {
			return Ok(None);
		}
		if user.nopass {
			return Ok(Some(user));
		}
		for phc in &user.password_hashes {
			if password::verify_password(phc, credential)? {
				return Ok(Some(user));
			}
		}
		Ok(None)
	}

	pub fn user(&self, name: &str) -> Option<&AclUser> {
		self.users.get(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ember_core::AclUserConfig;

	fn config_with(users: Vec<AclUserConfig>) -> AclConfig {
		AclConfig { users }
	}

	fn basic_user(name: &str) -> AclUserConfig {
		AclUserConfig {
			name: name.to_string(),
			nopass: true,
			..Default::default()
		}
	}

	#[test]
	fn test_empty_acl_disables_auth() {
		let acl = Acl::from_config(&AclConfig::default()).unwrap();
		assert!(!acl.auth_required());
	}

	#[test]
	fn test_nopass_user_authenticates_with_anything() {
		let acl = Acl::from_config(&config_with(vec![basic_user("dev")])).unwrap();
		assert!(acl.authenticate("dev", "whatever").unwrap().is_some());
		assert!(acl.authenticate("ghost", "whatever").unwrap().is_none());
	}

	#[test]
	fn test_password_user() {
		let phc = password::hash_password("hunter2").unwrap();
		let user = AclUserConfig {
			name: "app".to_string(),
			password_hashes: vec![phc],
			..Default::default()
		};
		let acl = Acl::from_config(&config_with(vec![user])).unwrap();
		assert!(acl.authenticate("app", "hunter2").unwrap().is_some());
		assert!(acl.authenticate("app", "wrong").unwrap().is_none());
	}

	#[test]
	fn test_disabled_user_rejected() {
		let mut user = basic_user("off");
		user.enabled = false;
		let acl = Acl::from_config(&config_with(vec![user])).unwrap();
		assert!(acl.authenticate("off", "x").unwrap().is_none());
	}

	#[test]
	fn test_user_without_credentials_is_invalid() {
		let user = AclUserConfig {
			name: "broken".to_string(),
			nopass: false,
			password_hashes: vec![],
			..Default::default()
		};
		assert!(Acl::from_config(&config_with(vec![user])).is_err());
	}

	#[test]
	fn test_categories() {
		let user = AclUserConfig {
			name: "reader".to_string(),
			nopass: true,
			categories: vec!["read".to_string()],
			..Default::default()
		};
		let acl = Acl::from_config(&config_with(vec![user])).unwrap();
		let reader = acl.user("reader").unwrap();
		assert!(reader.allows_category(Category::Read));
		assert!(!reader.allows_category(Category::Write));

		assert!(Acl::from_config(&config_with(vec![AclUserConfig {
			name: "x".to_string(),
			nopass: true,
			categories: vec!["frobnicate".to_string()],
			..Default::default()
		}]))
		.is_err());
	}

	#[test]
	fn test_key_patterns() {
		let user = AclUserConfig {
			name: "scoped".to_string(),
			nopass: true,
			key_patterns: vec!["app:*".to_string()],
			..Default::default()
		};
		let acl = Acl::from_config(&config_with(vec![user])).unwrap();
		let scoped = acl.user("scoped").unwrap();
		assert!(scoped.allows_keys([b"app:1".as_slice()]));
		assert!(!scoped.allows_keys([b"app:1".as_slice(), b"other".as_slice()]));

		let open = Acl::from_config(&config_with(vec![basic_user("open")])).unwrap();
		assert!(open.user("open").unwrap().allows_keys([b"anything".as_slice()]));
	}
}
