//! The route table.
//!
//! Built once at startup and immutable afterwards. Every location resolves to
//! at most one route because overlapping patterns are rejected at build time.

use crate::error::{ConfigurationError, RouterError};
use crate::guard::Guard;
use crate::registry::ViewId;
use crate::route::{Route, RouteConfig, RouteMatch};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of resolving a path.
#[derive(Debug, Clone)]
pub enum Resolution {
	/// Exactly one route matched.
	Matched(RouteMatch),
	/// No route matched.
	NotFound,
}

impl Resolution {
	/// Returns the match, if any.
	pub fn into_match(self) -> Option<RouteMatch> {
		match self {
			Self::Matched(route_match) => Some(route_match),
			Self::NotFound => None,
		}
	}

	/// Whether no route matched.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound)
	}
}

/// Collects route declarations for validation.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
	routes: Vec<RouteConfig>,
}

impl RouteTableBuilder {
	/// Adds an unguarded route.
	pub fn route(self, name: &str, path: &str, view_id: impl Into<ViewId>) -> Self {
		self.add(RouteConfig::new(name, path, view_id))
	}

	/// Adds a route with a single guard.
	pub fn guarded_route<G>(self, name: &str, path: &str, view_id: impl Into<ViewId>, guard: G) -> Self
	where
		G: Guard + 'static,
	{
		self.add(RouteConfig::new(name, path, view_id).with_guard(guard))
	}

	/// Adds a route declaration.
	pub fn add(mut self, route: RouteConfig) -> Self {
		self.routes.push(route);
		self
	}

	/// Validates the declarations and freezes the table.
	///
	/// # Errors
	///
	/// Returns a [`ConfigurationError`] for invalid patterns, duplicate names
	/// or paths, and patterns that could match the same location.
	pub fn build(self) -> Result<RouteTable, ConfigurationError> {
		let mut routes: Vec<Arc<Route>> = Vec::with_capacity(self.routes.len());
		let mut by_name: HashMap<String, usize> = HashMap::with_capacity(self.routes.len());

		for config in self.routes {
			let route = config.compile()?;
			if by_name.contains_key(route.name()) {
				return Err(ConfigurationError::DuplicateName(route.name().to_string()));
			}
			for existing in &routes {
				if existing.pattern() == route.pattern() {
					return Err(ConfigurationError::DuplicatePath(
						route.pattern().to_string(),
					));
				}
				if existing.pattern().overlaps(route.pattern()) {
					return Err(ConfigurationError::AmbiguousPattern {
						first: existing.pattern().to_string(),
						second: route.pattern().to_string(),
					});
				}
			}
			by_name.insert(route.name().to_string(), routes.len());
			routes.push(Arc::new(route));
		}

		tracing::debug!(routes = routes.len(), "route table built");
		Ok(RouteTable { routes, by_name })
	}
}

/// Immutable mapping from path patterns to routes.
#[derive(Debug)]
pub struct RouteTable {
	routes: Vec<Arc<Route>>,
	by_name: HashMap<String, usize>,
}

impl RouteTable {
	/// Starts a table declaration.
	pub fn builder() -> RouteTableBuilder {
		RouteTableBuilder::default()
	}

	/// Resolves a path to its route.
	pub fn resolve(&self, path: &str) -> Resolution {
		self.routes
			.iter()
			.find_map(|route| {
				route.pattern().matches(path).map(|params| RouteMatch {
					route: Arc::clone(route),
					params,
				})
			})
			.map_or(Resolution::NotFound, Resolution::Matched)
	}

	/// Looks up a route by name.
	pub fn get(&self, name: &str) -> Option<&Arc<Route>> {
		self.by_name.get(name).map(|&index| &self.routes[index])
	}

	/// Builds the path of a named route.
	pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
		let route = self
			.get(name)
			.ok_or_else(|| RouterError::InvalidRouteName(name.to_string()))?;
		let params: HashMap<String, String> = params
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();

		route
			.pattern()
			.reverse(&params)
			.ok_or_else(|| RouterError::MissingParameter {
				route: name.to_string(),
			})
	}

	/// Route names in registration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.routes.iter().map(|route| route.name())
	}

	/// Number of routes.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Whether the table has no routes.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}
