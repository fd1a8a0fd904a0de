//! Router settings.
//!
//! Loaded once at startup from the environment or a TOML document.

use crate::error::SettingsError;
use crate::history::HashLocation;
use serde::Deserialize;
use std::env;

/// Environment variable holding the base path.
pub const ENV_BASE_URL: &str = "SETLIST_BASE_URL";

/// Fallback environment variable for the base path.
pub const ENV_BASE_URL_FALLBACK: &str = "BASE_URL";

/// Environment variable holding the redirect hop limit.
pub const ENV_MAX_REDIRECTS: &str = "SETLIST_MAX_REDIRECTS";

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Settings consumed by the navigator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterSettings {
	/// Prefix before the `#` in addressable hrefs.
	pub base_path: String,
	/// Longest allowed chain of guard redirects.
	pub max_redirects: usize,
	/// Location used when the history has nothing better.
	pub initial_path: String,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			base_path: "/".to_string(),
			max_redirects: DEFAULT_MAX_REDIRECTS,
			initial_path: "/".to_string(),
		}
	}
}

impl RouterSettings {
	/// Reads settings from the process environment.
	///
	/// Unset variables keep their defaults.
	///
	/// # Errors
	///
	/// [`SettingsError::InvalidEnv`] if the hop limit is not a number, or
	/// [`SettingsError::Invalid`] if it is zero.
	pub fn from_env() -> Result<Self, SettingsError> {
		let mut settings = Self::default();

		if let Some(base) = env::var(ENV_BASE_URL)
			.ok()
			.or_else(|| env::var(ENV_BASE_URL_FALLBACK).ok())
		{
			settings.base_path = base;
		}
		if let Ok(raw) = env::var(ENV_MAX_REDIRECTS) {
			settings.max_redirects = raw.trim().parse().map_err(|_| SettingsError::InvalidEnv {
				key: ENV_MAX_REDIRECTS.to_string(),
				value: raw.clone(),
			})?;
		}

		settings.validate()
	}

	/// Parses settings from TOML.
	///
	/// # Errors
	///
	/// [`SettingsError::Parse`] on malformed input or unknown keys, or
	/// [`SettingsError::Invalid`] on constraint violations.
	pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
		let settings: Self = toml::from_str(input)?;
		settings.validate()
	}

	/// Sets the base path.
	pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
		self.base_path = base_path.into();
		self
	}

	/// Sets the redirect hop limit.
	pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
		self.max_redirects = max_redirects;
		self
	}

	/// Codec for the configured base path.
	pub fn hash_location(&self) -> HashLocation {
		HashLocation::new(&self.base_path)
	}

	fn validate(self) -> Result<Self, SettingsError> {
		if self.max_redirects == 0 {
			return Err(SettingsError::Invalid {
				key: "max_redirects",
				reason: "must be at least 1".to_string(),
			});
		}
		if !self.initial_path.starts_with('/') {
			return Err(SettingsError::Invalid {
				key: "initial_path",
				reason: format!("'{}' must start with '/'", self.initial_path),
			});
		}
		Ok(self)
	}
}
