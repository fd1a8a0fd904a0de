//! The setlist session flow: sign-in, playlist curation, voting, results.
//!
//! | path | name | guard |
//! |---|---|---|
//! | `/` | Login | none |
//! | `/playlist` | Playlist | requires authenticated session |
//! | `/vote` | Vote | requires authenticated session |
//! | `/results` | Results | requires authenticated session |
//!
//! View content is supplied by the view layer; the loaders registered here
//! produce titled placeholders until real views are plugged in with
//! [`ViewRegistry::register`].

use setlist_router::{
	ConfigurationError, HistoryError, MemoryHistory, Navigator, RequireAuthenticated,
	RouteConfig, RouteTable, RouterSettings, SettingsError, SharedSession, StaticView,
	ViewRegistry,
};
use std::sync::Arc;
use thiserror::Error;

/// The four views of a session, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRoute {
	/// Sign-in.
	Login,
	/// Playlist curation.
	Playlist,
	/// Voting.
	Vote,
	/// Vote results.
	Results,
}

impl AppRoute {
	/// Every route, in flow order.
	pub const ALL: [AppRoute; 4] = [Self::Login, Self::Playlist, Self::Vote, Self::Results];

	/// Route name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Login => "Login",
			Self::Playlist => "Playlist",
			Self::Vote => "Vote",
			Self::Results => "Results",
		}
	}

	/// Path pattern.
	pub fn path(self) -> &'static str {
		match self {
			Self::Login => "/",
			Self::Playlist => "/playlist",
			Self::Vote => "/vote",
			Self::Results => "/results",
		}
	}

	/// View id the route activates.
	pub fn view_id(self) -> &'static str {
		match self {
			Self::Login => "login",
			Self::Playlist => "playlist",
			Self::Vote => "vote",
			Self::Results => "results",
		}
	}

	/// Whether the route needs a signed-in session.
	pub fn requires_auth(self) -> bool {
		!matches!(self, Self::Login)
	}

	/// Looks a route up by name.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|route| route.name() == name)
	}

	fn title(self) -> &'static str {
		match self {
			Self::Login => "Sign in",
			Self::Playlist => "Build the playlist",
			Self::Vote => "Cast your votes",
			Self::Results => "Results",
		}
	}
}

/// Startup failure.
#[derive(Debug, Error)]
pub enum AppError {
	/// The route table is invalid.
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),

	/// Settings could not be read.
	#[error(transparent)]
	Settings(#[from] SettingsError),

	/// The initial location could not be parsed.
	#[error(transparent)]
	History(#[from] HistoryError),
}

/// Builds the session route table. Guarded routes send anonymous users to Login.
pub fn route_table() -> Result<RouteTable, ConfigurationError> {
	AppRoute::ALL
		.into_iter()
		.fold(RouteTable::builder(), |builder, route| {
			let config = RouteConfig::new(route.name(), route.path(), route.view_id());
			builder.add(if route.requires_auth() {
				config.with_guard(RequireAuthenticated::new(AppRoute::Login.path()))
			} else {
				config
			})
		})
		.build()
}

/// Registry with a placeholder view per route.
pub fn view_registry() -> ViewRegistry {
	AppRoute::ALL
		.into_iter()
		.fold(ViewRegistry::new(), |registry, route| {
			registry.register_static(route.view_id(), StaticView::new(route.title()))
		})
		.with_not_found(StaticView::new("Page not found"))
}

/// A wired application.
pub struct App {
	/// The navigator; pass it by reference to whatever needs to navigate.
	pub navigator: Navigator,
	/// Session handle for the authentication layer.
	pub session: SharedSession,
	/// In-memory history backing the navigator.
	pub history: Arc<MemoryHistory>,
	/// Settings the app was built with.
	pub settings: RouterSettings,
}

impl std::fmt::Debug for App {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("App")
			.field("navigator", &self.navigator)
			.field("settings", &self.settings)
			.finish()
	}
}

/// Wires an app from settings.
///
/// `href` is the address the app was opened at (for example `/app/#/vote`);
/// without one the configured initial path is used. The navigator is idle
/// until [`Navigator::start`] is awaited.
///
/// # Errors
///
/// Fails fast on an invalid route table or an unparsable `href`.
pub fn bootstrap(settings: RouterSettings, href: Option<&str>) -> Result<App, AppError> {
	let table = route_table()?;
	let codec = settings.hash_location();
	let history = match href {
		Some(href) => MemoryHistory::from_href(codec, href)?,
		None => MemoryHistory::with_codec(
			codec,
			setlist_router::Location::parse(&settings.initial_path)?,
		),
	};
	let history = Arc::new(history);
	let session = SharedSession::new();

	let navigator = Navigator::new(
		Arc::new(table),
		history.clone(),
		Arc::new(view_registry()),
		Arc::new(session.clone()),
		&settings,
	);
	tracing::info!(base = %settings.base_path, routes = AppRoute::ALL.len(), "setlist app wired");

	Ok(App {
		navigator,
		session,
		history,
		settings,
	})
}

/// Wires an app from environment settings.
///
/// # Errors
///
/// See [`RouterSettings::from_env`] and [`bootstrap`].
pub fn bootstrap_from_env(href: Option<&str>) -> Result<App, AppError> {
	bootstrap(RouterSettings::from_env()?, href)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_route_table_matches_public_surface() {
		let table = route_table().unwrap();

		for route in AppRoute::ALL {
			let route_match = table.resolve(route.path()).into_match().unwrap();
			assert_eq!(route_match.name(), route.name());
			assert_eq!(route_match.route.is_guarded(), route.requires_auth());
			assert_eq!(route_match.route.view_id().as_str(), route.view_id());
		}
		assert_eq!(table.len(), 4);
	}

	#[rstest]
	#[case("Vote", Some(AppRoute::Vote))]
	#[case("vote", None)]
	fn test_from_name(#[case] name: &str, #[case] expected: Option<AppRoute>) {
		assert_eq!(AppRoute::from_name(name), expected);
	}

	#[rstest]
	fn test_bootstrap_uses_href() {
		let settings = RouterSettings::default().with_base_path("/party/");
		let app = bootstrap(settings, Some("/party/#/results")).unwrap();

		assert_eq!(app.history.current_href(), "/party/#/results");
	}

	#[rstest]
	fn test_bootstrap_rejects_malformed_href() {
		let err = bootstrap(RouterSettings::default(), Some("/#/vo te")).unwrap_err();
		assert!(matches!(err, AppError::History(_)));
	}
}
