//! # setlist-router
//!
//! Client-side navigation for setlist sessions: which view is reachable, when,
//! and under what precondition.
//!
//! ## Components
//!
//! - [`RouteTable`]: validated, immutable mapping from path patterns to routes
//! - [`HistoryAdapter`]: address/history primitive with ordered change notifications
//! - [`ViewRegistry`]: lazy loader and cache of views
//! - [`Navigator`]: the state machine tying them together
//!
//! ## Example
//!
//! ```
//! use setlist_router::{
//! 	MemoryHistory, Navigator, RequireAuthenticated, RouteTable, RouterSettings, SharedSession,
//! 	StaticView, ViewRegistry,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = RouteTable::builder()
//! 	.route("Login", "/", "login")
//! 	.guarded_route("Vote", "/vote", "vote", RequireAuthenticated::new("/"))
//! 	.build()?;
//! let registry = ViewRegistry::new()
//! 	.register_static("login", StaticView::new("Login"))
//! 	.register_static("vote", StaticView::new("Vote"));
//! let session = SharedSession::new();
//!
//! let navigator = Navigator::new(
//! 	Arc::new(table),
//! 	Arc::new(MemoryHistory::default()),
//! 	Arc::new(registry),
//! 	Arc::new(session.clone()),
//! 	&RouterSettings::default(),
//! );
//! navigator.start().await?;
//!
//! // Anonymous sessions are sent back to Login.
//! navigator.push("/vote").await?;
//! assert_eq!(navigator.current_route().as_deref(), Some("Login"));
//!
//! session.sign_in("dana");
//! navigator.push("/vote").await?;
//! assert_eq!(navigator.current_route().as_deref(), Some("Vote"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod guard;
pub mod history;
pub mod navigator;
pub mod pattern;
pub mod registry;
pub mod route;
pub mod session;
pub mod settings;
pub mod table;

pub use error::{
	ConfigurationError, HistoryError, RouterError, RouterResult, SettingsError, ViewLoadError,
};
pub use guard::{Guard, GuardOutcome, RequireAuthenticated, SharedGuard, evaluate_chain, guard_fn};
pub use history::{
	ChangeCause, HashLocation, HistoryAdapter, Location, LocationChange, LocationStream,
	MemoryHistory, Origin,
};
pub use navigator::{
	FailureKind, HistoryEntry, NOT_FOUND_ROUTE, NavigationEvent, NavigationOutcome,
	NavigationPhase, NavigationSnapshot, NavigationToken, Navigator,
};
pub use pattern::PathPattern;
pub use registry::{
	ERROR_VIEW, NOT_FOUND_VIEW, StaticView, View, ViewHandle, ViewId, ViewLoader, ViewRegistry,
	loader_fn,
};
pub use route::{Route, RouteConfig, RouteMatch};
pub use session::{SessionProvider, SessionState, SharedSession};
pub use settings::RouterSettings;
pub use table::{Resolution, RouteTable, RouteTableBuilder};
