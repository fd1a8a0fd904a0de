//! # setlist
//!
//! Navigation for group playlist-voting sessions. A session walks through four
//! views (sign-in, playlist curation, voting, results) and this crate decides
//! which of them is reachable, when, and under what precondition.
//!
//! The routing machinery lives in [`setlist_router`] and is re-exported here;
//! [`app`] binds it to the session flow.
//!
//! ## Quick Example
//!
//! ```rust
//! use setlist::app::bootstrap;
//! use setlist::RouterSettings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = bootstrap(RouterSettings::default(), None)?;
//! app.navigator.start().await?;
//!
//! app.session.sign_in("dana");
//! app.navigator.push("/playlist").await?;
//! app.navigator.push("/vote").await?;
//! app.navigator.back().await?;
//! assert_eq!(app.navigator.current_route().as_deref(), Some("Playlist"));
//! # Ok(())
//! # }
//! ```

pub mod app;

pub use setlist_router as router;
pub use setlist_router::{
	ConfigurationError, Guard, GuardOutcome, HashLocation, HistoryAdapter, Location,
	MemoryHistory, NavigationEvent, NavigationOutcome, NavigationPhase, NavigationSnapshot,
	Navigator, RequireAuthenticated, RouteTable, RouterError, RouterResult, RouterSettings,
	SessionProvider, SessionState, SharedSession, StaticView, View, ViewHandle, ViewRegistry,
};
