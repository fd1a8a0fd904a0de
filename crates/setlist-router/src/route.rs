//! Route declarations and compiled routes.

use crate::error::ConfigurationError;
use crate::guard::{Guard, SharedGuard};
use crate::pattern::PathPattern;
use crate::registry::ViewId;
use std::collections::HashMap;
use std::sync::Arc;

/// A route as declared at startup, before validation.
#[derive(Clone)]
pub struct RouteConfig {
	name: String,
	path: String,
	view_id: ViewId,
	guards: Vec<SharedGuard>,
}

impl RouteConfig {
	/// Declares a route.
	pub fn new(name: impl Into<String>, path: impl Into<String>, view_id: impl Into<ViewId>) -> Self {
		Self {
			name: name.into(),
			path: path.into(),
			view_id: view_id.into(),
			guards: Vec::new(),
		}
	}

	/// Appends a guard to the chain.
	pub fn with_guard<G>(mut self, guard: G) -> Self
	where
		G: Guard + 'static,
	{
		self.guards.push(Arc::new(guard));
		self
	}

	/// Appends an already shared guard to the chain.
	pub fn with_shared_guard(mut self, guard: SharedGuard) -> Self {
		self.guards.push(guard);
		self
	}

	pub(crate) fn compile(self) -> Result<Route, ConfigurationError> {
		Ok(Route {
			pattern: PathPattern::new(&self.path)?,
			name: self.name,
			view_id: self.view_id,
			guards: self.guards,
		})
	}
}

impl std::fmt::Debug for RouteConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RouteConfig")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("view_id", &self.view_id)
			.field("guards", &self.guards.len())
			.finish()
	}
}

/// A validated route owned by a [`RouteTable`](crate::RouteTable).
pub struct Route {
	name: String,
	pattern: PathPattern,
	view_id: ViewId,
	guards: Vec<SharedGuard>,
}

impl std::fmt::Debug for Route {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Route")
			.field("name", &self.name)
			.field("pattern", &self.pattern)
			.field("view_id", &self.view_id)
			.field("guards", &self.guards.len())
			.finish()
	}
}

impl Route {
	/// Unique route name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Compiled path pattern.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// View activated for this route.
	pub fn view_id(&self) -> &ViewId {
		&self.view_id
	}

	/// Guard chain in evaluation order.
	pub fn guards(&self) -> &[SharedGuard] {
		&self.guards
	}

	/// Whether any guard is attached.
	pub fn is_guarded(&self) -> bool {
		!self.guards.is_empty()
	}
}

/// A resolved location.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	/// The matched route.
	pub route: Arc<Route>,
	/// Extracted path parameters.
	pub params: HashMap<String, String>,
}

impl RouteMatch {
	/// Name of the matched route.
	pub fn name(&self) -> &str {
		self.route.name()
	}
}
