//! The navigation state machine.
//!
//! ```text
//! Idle -> Resolving -> Guarding -> Activating -> Activated
//!            |            |             |
//!            v            v             v
//!     Failed(NotFound)  redirect   Failed(LoadError)
//!                     (back to Resolving, bounded hops)
//! ```
//!
//! Every request receives a [`NavigationToken`]. Only the newest token may
//! move the machine or touch navigation state; an older request notices at its
//! next checkpoint and ends as [`NavigationOutcome::Cancelled`] with no side
//! effects. State is written in a single critical section at the end of a
//! navigation, so a failed or cancelled navigation leaves it untouched.

use crate::error::{ConfigurationError, HistoryError, RouterError, RouterResult, ViewLoadError};
use crate::guard::{GuardOutcome, evaluate_chain};
use crate::history::{ChangeCause, HistoryAdapter, Location, LocationChange, LocationStream, Origin};
use crate::registry::{ViewHandle, ViewRegistry};
use crate::route::RouteMatch;
use crate::session::SessionProvider;
use crate::settings::RouterSettings;
use crate::table::{Resolution, RouteTable};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Route name reported while the not-found fallback is displayed.
pub const NOT_FOUND_ROUTE: &str = "NotFound";

const EVENT_CAPACITY: usize = 64;

/// Identifies one navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NavigationToken(u64);

impl fmt::Display for NavigationToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "nav#{}", self.0)
	}
}

/// Why the machine entered `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	/// No route matched.
	NotFound,
	/// The view failed to load.
	LoadError,
	/// Redirect loop or misdirected guard.
	Configuration,
	/// The history adapter rejected an operation.
	History,
}

/// Machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "failure")]
pub enum NavigationPhase {
	/// Nothing has been navigated yet.
	Idle,
	/// Looking up the route.
	Resolving,
	/// Evaluating the guard chain.
	Guarding,
	/// Loading the view.
	Activating,
	/// A route is active.
	Activated,
	/// The last navigation failed.
	Failed(FailureKind),
}

/// A committed history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
	/// Location that was activated.
	pub location: Location,
	/// Route that was activated.
	pub route: String,
}

/// Read-only copy of navigation state.
#[derive(Debug, Clone)]
pub struct NavigationSnapshot {
	/// Current phase.
	pub phase: NavigationPhase,
	/// Name of the route being shown.
	pub current_route: Option<String>,
	/// Committed entries, oldest first.
	pub history: Vec<HistoryEntry>,
	/// Request currently in flight.
	pub pending: Option<NavigationToken>,
	/// View currently displayed, including fallbacks.
	pub displayed: Option<ViewHandle>,
}

impl NavigationSnapshot {
	/// Whether a fallback view is displayed instead of a committed route.
	pub fn showing_fallback(&self) -> bool {
		matches!(self.phase, NavigationPhase::Failed(_))
	}
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
	/// The route was activated.
	Activated {
		/// Activated route name.
		route: String,
		/// Activated view.
		view: ViewHandle,
		/// Whether a guard redirected the request on the way.
		redirected: bool,
	},
	/// No route matched; the not-found view is displayed.
	NotFound {
		/// Requested location.
		location: Location,
		/// Fallback view.
		view: ViewHandle,
	},
	/// A newer request superseded this one.
	Cancelled,
	/// Nothing to do.
	Unchanged,
}

impl NavigationOutcome {
	/// Activated route name, if any.
	pub fn route(&self) -> Option<&str> {
		match self {
			Self::Activated { route, .. } => Some(route),
			_ => None,
		}
	}
}

/// Committed state change broadcast to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
	/// A route became active.
	Activated {
		/// Request that committed.
		token: NavigationToken,
		/// Activated route.
		route: String,
		/// Activated location.
		location: Location,
	},
	/// The not-found fallback is displayed.
	NotFound {
		/// Request that committed.
		token: NavigationToken,
		/// Unmatched location.
		location: Location,
	},
	/// A navigation failed.
	Failed {
		/// Request that failed.
		token: NavigationToken,
		/// Location that failed.
		location: Location,
		/// Failure description.
		error: String,
	},
}

/// How a commit edits the history stack. A guard redirect keeps the edit, so
/// the redirect target takes the slot the original request would have taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackEdit {
	Push,
	Replace,
	Back,
}

struct NavigationState {
	latest: u64,
	phase: NavigationPhase,
	current_route: Option<String>,
	history: Vec<HistoryEntry>,
	pending: Option<NavigationToken>,
	displayed: Option<ViewHandle>,
	retry: Option<(Location, StackEdit)>,
}

impl NavigationState {
	fn is_current(&self, token: NavigationToken) -> bool {
		self.latest == token.0
	}

	fn issue(&mut self) -> NavigationToken {
		self.latest += 1;
		let token = NavigationToken(self.latest);
		self.pending = Some(token);
		self.phase = NavigationPhase::Resolving;
		token
	}

	fn apply(&mut self, edit: StackEdit, entry: HistoryEntry) {
		if edit == StackEdit::Back {
			self.history.pop();
		}
		match (edit, self.history.last_mut()) {
			(StackEdit::Replace | StackEdit::Back, Some(last)) => *last = entry,
			_ => self.history.push(entry),
		}
	}
}

/// Orchestrates resolution, guards and activation.
///
/// Construct one per application and hand out references; all methods take
/// `&self`.
pub struct Navigator {
	table: Arc<RouteTable>,
	history: Arc<dyn HistoryAdapter>,
	registry: Arc<ViewRegistry>,
	session: Arc<dyn SessionProvider>,
	max_redirects: usize,
	state: Mutex<NavigationState>,
	events: broadcast::Sender<NavigationEvent>,
}

impl fmt::Debug for Navigator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Navigator")
			.field("routes", &self.table.len())
			.field("phase", &state.phase)
			.field("current_route", &state.current_route)
			.field("history", &state.history.len())
			.finish()
	}
}

impl Navigator {
	/// Creates an idle navigator.
	pub fn new(
		table: Arc<RouteTable>,
		history: Arc<dyn HistoryAdapter>,
		registry: Arc<ViewRegistry>,
		session: Arc<dyn SessionProvider>,
		settings: &RouterSettings,
	) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			table,
			history,
			registry,
			session,
			max_redirects: settings.max_redirects,
			state: Mutex::new(NavigationState {
				latest: 0,
				phase: NavigationPhase::Idle,
				current_route: None,
				history: Vec::new(),
				pending: None,
				displayed: None,
				retry: None,
			}),
			events,
		}
	}

	/// The route table.
	pub fn table(&self) -> &RouteTable {
		&self.table
	}

	/// Subscribes to committed navigation events.
	pub fn subscribe(&self) -> broadcast::Receiver<NavigationEvent> {
		self.events.subscribe()
	}

	/// Copies the current state.
	pub fn snapshot(&self) -> NavigationSnapshot {
		let state = self.state.lock();
		NavigationSnapshot {
			phase: state.phase,
			current_route: state.current_route.clone(),
			history: state.history.clone(),
			pending: state.pending,
			displayed: state.displayed.clone(),
		}
	}

	/// Current phase.
	pub fn phase(&self) -> NavigationPhase {
		self.state.lock().phase
	}

	/// Name of the route being shown.
	pub fn current_route(&self) -> Option<String> {
		self.state.lock().current_route.clone()
	}

	/// Activates the adapter's current location as the first entry.
	pub async fn start(&self) -> RouterResult<NavigationOutcome> {
		let location = self.history.current();
		let token = self.state.lock().issue();
		tracing::debug!(%token, path = %location, "starting navigator");
		self.run_pipeline(token, location, StackEdit::Push).await
	}

	/// Navigates to `path`, appending a history entry.
	pub async fn push(&self, path: &str) -> RouterResult<NavigationOutcome> {
		let location = Location::parse(path)?;
		self.history.push(&location)?;
		let token = self.state.lock().issue();
		self.run_pipeline(token, location, StackEdit::Push).await
	}

	/// Navigates to `path`, replacing the current history entry.
	pub async fn replace(&self, path: &str) -> RouterResult<NavigationOutcome> {
		let location = Location::parse(path)?;
		self.history.replace(&location)?;
		let token = self.state.lock().issue();
		self.run_pipeline(token, location, StackEdit::Replace).await
	}

	/// Navigates to a named route.
	pub async fn push_named(
		&self,
		name: &str,
		params: &[(&str, &str)],
	) -> RouterResult<NavigationOutcome> {
		let path = self.table.reverse(name, params)?;
		self.push(&path).await
	}

	/// Returns to the previous entry.
	///
	/// With a fallback on screen the top entry itself is re-activated, since
	/// the failed location was never committed. At the earliest entry this
	/// is a no-op.
	pub async fn back(&self) -> RouterResult<NavigationOutcome> {
		let (token, target, edit) = {
			let mut state = self.state.lock();
			let showing_fallback = matches!(state.phase, NavigationPhase::Failed(_));
			let (target, edit) = match state.history.len() {
				0 => return Ok(NavigationOutcome::Unchanged),
				n if showing_fallback => (state.history[n - 1].location.clone(), StackEdit::Replace),
				1 => return Ok(NavigationOutcome::Unchanged),
				n => (state.history[n - 2].location.clone(), StackEdit::Back),
			};
			(state.issue(), target, edit)
		};

		if let Err(err) = self.sync_adapter_back(&target) {
			return self.fail(token, target, FailureKind::History, err.into());
		}
		self.run_pipeline(token, target, edit).await
	}

	fn sync_adapter_back(&self, target: &Location) -> Result<(), HistoryError> {
		let moved = self.history.back()?;
		if moved.is_none_or(|change| change.location != *target) {
			self.history.replace(target)?;
		}
		Ok(())
	}

	/// Re-runs the last navigation that failed to load its view.
	pub async fn retry(&self) -> RouterResult<NavigationOutcome> {
		let (token, location, edit) = {
			let mut state = self.state.lock();
			let Some((location, edit)) = state.retry.clone() else {
				return Ok(NavigationOutcome::Unchanged);
			};
			(state.issue(), location, edit)
		};
		tracing::info!(%token, path = %location, "retrying navigation");
		self.run_pipeline(token, location, edit).await
	}

	/// Processes a notification from the history adapter.
	///
	/// Changes issued by this navigator were already processed inline and
	/// are skipped.
	pub async fn handle_location_change(
		&self,
		change: LocationChange,
	) -> RouterResult<NavigationOutcome> {
		if change.origin == Origin::Navigator {
			return Ok(NavigationOutcome::Unchanged);
		}
		let (token, edit) = {
			let mut state = self.state.lock();
			let edit = match change.cause {
				ChangeCause::Push => StackEdit::Push,
				ChangeCause::Replace => StackEdit::Replace,
				ChangeCause::Pop => {
					let n = state.history.len();
					if n >= 2 && state.history[n - 2].location == change.location {
						StackEdit::Back
					} else {
						StackEdit::Push
					}
				}
			};
			(state.issue(), edit)
		};
		tracing::debug!(%token, seq = change.seq, path = %change.location, "external location change");
		self.run_pipeline(token, change.location, edit).await
	}

	/// Drives the navigator from an adapter subscription until it closes.
	///
	/// Recoverable failures are logged and the loop continues; configuration
	/// errors stop it.
	pub async fn run(&self, mut changes: LocationStream) -> RouterResult<()> {
		while let Some(change) = changes.recv().await {
			match self.handle_location_change(change).await {
				Ok(_) => {}
				Err(err) if err.is_fatal() => return Err(err),
				Err(err) => tracing::warn!(error = %err, "navigation failed"),
			}
		}
		Ok(())
	}

	fn enter(&self, token: NavigationToken, phase: NavigationPhase) -> bool {
		let mut state = self.state.lock();
		if !state.is_current(token) {
			return false;
		}
		tracing::debug!(%token, ?phase, "navigation phase");
		state.phase = phase;
		true
	}

	fn cancelled(&self, token: NavigationToken, location: &Location) -> NavigationOutcome {
		tracing::warn!(%token, path = %location, "navigation superseded");
		NavigationOutcome::Cancelled
	}

	async fn run_pipeline(
		&self,
		token: NavigationToken,
		origin: Location,
		edit: StackEdit,
	) -> RouterResult<NavigationOutcome> {
		let mut location = origin.clone();
		let mut hops = 0usize;

		loop {
			if !self.enter(token, NavigationPhase::Resolving) {
				return Ok(self.cancelled(token, &location));
			}
			let route_match = match self.table.resolve(location.path()) {
				Resolution::Matched(route_match) => route_match,
				Resolution::NotFound => return Ok(self.show_not_found(token, location)),
			};

			if !self.enter(token, NavigationPhase::Guarding) {
				return Ok(self.cancelled(token, &location));
			}
			let session = self.session.snapshot();
			let target = match evaluate_chain(route_match.route.guards(), &session).await {
				GuardOutcome::Allow => None,
				GuardOutcome::Redirect(target) => Some(target),
			};

			if let Some(target) = target {
				if !self.state.lock().is_current(token) {
					return Ok(self.cancelled(token, &location));
				}
				hops += 1;
				if hops > self.max_redirects {
					let err = ConfigurationError::RedirectLoop {
						origin: origin.to_string(),
						limit: self.max_redirects,
					};
					return self.fail(token, location, FailureKind::Configuration, err.into());
				}
				let Ok(target) = Location::parse(&target) else {
					let err = ConfigurationError::MalformedRedirectTarget {
						route: route_match.name().to_string(),
						target,
					};
					return self.fail(token, location, FailureKind::Configuration, err.into());
				};
				if self.table.resolve(target.path()).is_not_found() {
					let err = ConfigurationError::UnknownRedirectTarget {
						route: route_match.name().to_string(),
						target: target.to_string(),
					};
					return self.fail(token, location, FailureKind::Configuration, err.into());
				}
				tracing::warn!(
					%token,
					route = route_match.name(),
					from = %location,
					to = %target,
					"guard redirected navigation"
				);
				if let Err(err) = self.history.replace(&target) {
					return self.fail(token, location, FailureKind::History, err.into());
				}
				location = target;
				continue;
			}

			if !self.enter(token, NavigationPhase::Activating) {
				return Ok(self.cancelled(token, &location));
			}
			return match self.registry.load(route_match.route.view_id()).await {
				Ok(view) => Ok(self.commit(token, route_match, location, edit, view, hops > 0)),
				Err(err) => self.fail_load(token, location, edit, err),
			};
		}
	}

	fn commit(
		&self,
		token: NavigationToken,
		route_match: RouteMatch,
		location: Location,
		edit: StackEdit,
		view: ViewHandle,
		redirected: bool,
	) -> NavigationOutcome {
		let route = route_match.name().to_string();
		{
			let mut state = self.state.lock();
			if !state.is_current(token) {
				drop(state);
				return self.cancelled(token, &location);
			}
			state.apply(
				edit,
				HistoryEntry {
					location: location.clone(),
					route: route.clone(),
				},
			);
			state.phase = NavigationPhase::Activated;
			state.current_route = Some(route.clone());
			state.pending = None;
			state.displayed = Some(view.clone());
			state.retry = None;
		}

		tracing::info!(%token, route = %route, path = %location, "route activated");
		let _ = self.events.send(NavigationEvent::Activated {
			token,
			route: route.clone(),
			location,
		});
		NavigationOutcome::Activated {
			route,
			view,
			redirected,
		}
	}

	fn show_not_found(&self, token: NavigationToken, location: Location) -> NavigationOutcome {
		let view = self.registry.not_found();
		{
			let mut state = self.state.lock();
			if !state.is_current(token) {
				drop(state);
				return self.cancelled(token, &location);
			}
			state.phase = NavigationPhase::Failed(FailureKind::NotFound);
			state.current_route = Some(NOT_FOUND_ROUTE.to_string());
			state.pending = None;
			state.displayed = Some(view.clone());
			state.retry = None;
		}

		tracing::warn!(%token, path = %location, "no route matched");
		let _ = self.events.send(NavigationEvent::NotFound {
			token,
			location: location.clone(),
		});
		NavigationOutcome::NotFound { location, view }
	}

	fn fail_load(
		&self,
		token: NavigationToken,
		location: Location,
		edit: StackEdit,
		err: ViewLoadError,
	) -> RouterResult<NavigationOutcome> {
		{
			let mut state = self.state.lock();
			if !state.is_current(token) {
				drop(state);
				return Ok(self.cancelled(token, &location));
			}
			state.retry = Some((location.clone(), edit));
		}
		self.fail(token, location, FailureKind::LoadError, err.into())
	}

	fn fail(
		&self,
		token: NavigationToken,
		location: Location,
		kind: FailureKind,
		err: RouterError,
	) -> RouterResult<NavigationOutcome> {
		{
			let mut state = self.state.lock();
			if !state.is_current(token) {
				drop(state);
				return Ok(self.cancelled(token, &location));
			}
			state.phase = NavigationPhase::Failed(kind);
			state.pending = None;
			state.displayed = Some(self.registry.error_view());
		}

		tracing::error!(%token, path = %location, error = %err, "navigation failed");
		let _ = self.events.send(NavigationEvent::Failed {
			token,
			location,
			error: err.to_string(),
		});
		Err(err)
	}
}
