//! Error types for routing.
//!
//! Configuration problems are programming errors and surface immediately;
//! everything else is recoverable by the navigator.

use thiserror::Error;

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

/// Invalid route table or redirect chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
	/// Two routes share a name.
	#[error("duplicate route name: {0}")]
	DuplicateName(String),

	/// Two routes share a path pattern.
	#[error("duplicate route path: {0}")]
	DuplicatePath(String),

	/// Two patterns can match the same location.
	#[error("route patterns '{first}' and '{second}' overlap ambiguously")]
	AmbiguousPattern {
		/// Pattern registered first.
		first: String,
		/// Pattern registered later.
		second: String,
	},

	/// Pattern failed to compile or exceeds limits.
	#[error("invalid route pattern '{pattern}': {reason}")]
	InvalidPattern {
		/// Offending pattern.
		pattern: String,
		/// Why it was rejected.
		reason: String,
	},

	/// A guard redirect names a path no route matches.
	#[error("route '{route}' redirects to unregistered path '{target}'")]
	UnknownRedirectTarget {
		/// Route whose guard issued the redirect.
		route: String,
		/// Redirect target.
		target: String,
	},

	/// A guard redirect is not a valid location.
	#[error("route '{route}' redirects to malformed location '{target}'")]
	MalformedRedirectTarget {
		/// Route whose guard issued the redirect.
		route: String,
		/// Redirect target as returned by the guard.
		target: String,
	},

	/// Redirect chain exceeded the hop limit.
	#[error("redirect loop starting at '{origin}' exceeded {limit} hops")]
	RedirectLoop {
		/// Path of the original request.
		origin: String,
		/// Configured hop limit.
		limit: usize,
	},
}

/// A view failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ViewLoadError {
	/// No loader registered under this id.
	#[error("view not registered: {0}")]
	Missing(String),

	/// The loader ran and failed.
	#[error("view '{view}' failed to load: {message}")]
	Failed {
		/// View id.
		view: String,
		/// Loader-provided message.
		message: String,
	},
}

impl ViewLoadError {
	/// Creates a loader failure for `view`.
	pub fn failed(view: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Failed {
			view: view.into(),
			message: message.into(),
		}
	}
}

/// The history adapter rejected an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HistoryError {
	/// The location could not be parsed.
	#[error("malformed location: {0}")]
	Malformed(String),
}

/// Settings could not be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	/// An environment variable held an unusable value.
	#[error("invalid value for {key}: {value}")]
	InvalidEnv {
		/// Variable name.
		key: String,
		/// Raw value.
		value: String,
	},

	/// TOML input did not parse.
	#[error("failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	/// A parsed value violates a constraint.
	#[error("invalid setting '{key}': {reason}")]
	Invalid {
		/// Setting name.
		key: &'static str,
		/// Constraint that failed.
		reason: String,
	},
}

/// Umbrella error for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RouterError {
	/// Fatal route configuration problem.
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	/// View load failure; the navigator is left in `Failed` and can retry.
	#[error(transparent)]
	Load(#[from] ViewLoadError),

	/// History adapter failure.
	#[error(transparent)]
	History(#[from] HistoryError),

	/// Named navigation referenced an unknown route.
	#[error("invalid route name: {0}")]
	InvalidRouteName(String),

	/// Reverse lookup lacked a parameter.
	#[error("missing parameter for route '{route}'")]
	MissingParameter {
		/// Route name.
		route: String,
	},
}

impl RouterError {
	/// Returns true for errors that must stop the application.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Configuration(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_configuration_error_display() {
		assert_eq!(
			ConfigurationError::DuplicateName("Vote".to_string()).to_string(),
			"duplicate route name: Vote"
		);
		let err = ConfigurationError::RedirectLoop {
			origin: "/vote".to_string(),
			limit: 5,
		};
		assert!(err.to_string().contains("/vote"));
		assert!(err.to_string().contains("5 hops"));
	}

	#[rstest]
	fn test_router_error_is_transparent() {
		let err: RouterError = ViewLoadError::Missing("results".to_string()).into();
		assert_eq!(err.to_string(), "view not registered: results");
		assert!(!err.is_fatal());
	}

	#[rstest]
	fn test_configuration_errors_are_fatal() {
		let err: RouterError = ConfigurationError::DuplicatePath("/".to_string()).into();
		assert!(err.is_fatal());
	}
}
