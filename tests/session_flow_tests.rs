//! End-to-end navigation through the session flow.
//!
//! Each test wires a fresh app with [`bootstrap`] over an in-memory history
//! and drives it the way the view layer would.

use async_trait::async_trait;
use rstest::{fixture, rstest};
use serial_test::serial;
use setlist::app::{App, AppRoute, bootstrap, bootstrap_from_env, route_table, view_registry};
use setlist::router::{NOT_FOUND_ROUTE, NOT_FOUND_VIEW, ViewId, ViewLoadError, ViewLoader};
use setlist::{
	HistoryAdapter, Location, MemoryHistory, NavigationEvent, NavigationOutcome, NavigationPhase,
	Navigator, RouterSettings, SharedSession, StaticView, View,
};
use std::sync::Arc;
use tokio::sync::Notify;

#[fixture]
fn app() -> App {
	bootstrap(RouterSettings::default(), None).unwrap()
}

fn routes(app: &App) -> Vec<String> {
	app.navigator
		.snapshot()
		.history
		.into_iter()
		.map(|entry| entry.route)
		.collect()
}

#[rstest]
#[tokio::test]
async fn test_anonymous_vote_lands_on_login(app: App) {
	app.navigator.start().await.unwrap();

	let outcome = app.navigator.push("/vote").await.unwrap();

	assert_eq!(outcome.route(), Some("Login"));
	assert!(matches!(outcome, NavigationOutcome::Activated { redirected: true, .. }));
	assert_eq!(app.navigator.current_route().as_deref(), Some("Login"));
	assert_eq!(app.navigator.phase(), NavigationPhase::Activated);
	assert_eq!(routes(&app).last().map(String::as_str), Some("Login"));
	assert_eq!(app.history.current(), Location::root());
}

#[rstest]
#[tokio::test]
async fn test_back_after_rejected_navigation_returns_to_origin(app: App) {
	app.session.sign_in("dana");
	app.navigator.push("/playlist").await.unwrap();
	app.session.sign_out();
	app.navigator.push("/vote").await.unwrap();
	app.session.sign_in("dana");

	let outcome = app.navigator.back().await.unwrap();

	assert_eq!(outcome.route(), Some("Playlist"));
	assert_eq!(routes(&app), ["Playlist"]);
}

#[rstest]
#[tokio::test]
async fn test_authenticated_flow_records_three_entries(app: App) {
	app.session.sign_in("dana");

	for path in ["/playlist", "/vote", "/results"] {
		app.navigator.push(path).await.unwrap();
	}

	assert_eq!(routes(&app), ["Playlist", "Vote", "Results"]);
	assert_eq!(app.navigator.current_route().as_deref(), Some("Results"));
	assert_eq!(app.history.current_href(), "/#/results");
}

#[rstest]
#[tokio::test]
async fn test_unknown_path_shows_not_found_and_keeps_history(app: App) {
	app.navigator.start().await.unwrap();
	let before = routes(&app);

	let outcome = app.navigator.push("/unknown-path").await.unwrap();

	match outcome {
		NavigationOutcome::NotFound { location, view } => {
			assert_eq!(location.path(), "/unknown-path");
			assert_eq!(view.id().as_str(), NOT_FOUND_VIEW);
		}
		other => panic!("expected not found, got {other:?}"),
	}
	let snapshot = app.navigator.snapshot();
	assert_eq!(snapshot.current_route.as_deref(), Some(NOT_FOUND_ROUTE));
	assert!(snapshot.showing_fallback());
	assert_eq!(routes(&app), before);
}

#[rstest]
#[tokio::test]
async fn test_back_from_results_returns_to_vote(app: App) {
	app.session.sign_in("dana");
	for path in ["/playlist", "/vote", "/results"] {
		app.navigator.push(path).await.unwrap();
	}

	let outcome = app.navigator.back().await.unwrap();

	assert_eq!(outcome.route(), Some("Vote"));
	assert_eq!(routes(&app), ["Playlist", "Vote"]);
	assert_eq!(app.history.current().path(), "/vote");
}

#[rstest]
#[tokio::test]
async fn test_sign_out_locks_guarded_routes_again(app: App) {
	app.session.sign_in("dana");
	app.navigator.push("/vote").await.unwrap();
	app.session.sign_out();

	for route in AppRoute::ALL.into_iter().filter(|route| route.requires_auth()) {
		let outcome = app.navigator.push(route.path()).await.unwrap();
		assert_eq!(outcome.route(), Some(AppRoute::Login.name()));
	}
}

#[rstest]
#[tokio::test]
async fn test_back_after_not_found_restores_last_route(app: App) {
	app.session.sign_in("dana");
	app.navigator.push("/playlist").await.unwrap();
	app.navigator.push("/nowhere").await.unwrap();

	let outcome = app.navigator.back().await.unwrap();

	assert_eq!(outcome.route(), Some("Playlist"));
	assert!(!app.navigator.snapshot().showing_fallback());
}

/// Loader that holds the view until the gate opens.
struct GatedLoader {
	gate: Arc<Notify>,
}

#[async_trait]
impl ViewLoader for GatedLoader {
	async fn load(&self, _id: &ViewId) -> Result<Arc<dyn View>, ViewLoadError> {
		self.gate.notified().await;
		Ok(Arc::new(StaticView::new("Cast your votes")))
	}
}

#[rstest]
#[tokio::test]
async fn test_overlapping_navigation_last_request_wins() {
	let gate = Arc::new(Notify::new());
	let registry = view_registry().register(
		AppRoute::Vote.view_id(),
		Arc::new(GatedLoader {
			gate: Arc::clone(&gate),
		}),
	);
	let session = SharedSession::new();
	session.sign_in("dana");
	let navigator = Navigator::new(
		Arc::new(route_table().unwrap()),
		Arc::new(MemoryHistory::default()),
		Arc::new(registry),
		Arc::new(session),
		&RouterSettings::default(),
	);
	let mut events = navigator.subscribe();

	let (vote, results) = tokio::join!(navigator.push("/vote"), async {
		tokio::task::yield_now().await;
		let outcome = navigator.push("/results").await;
		gate.notify_one();
		outcome
	});

	assert_eq!(vote.unwrap(), NavigationOutcome::Cancelled);
	assert_eq!(results.unwrap().route(), Some("Results"));
	assert_eq!(navigator.current_route().as_deref(), Some("Results"));
	let activated: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
		.filter_map(|event| match event {
			NavigationEvent::Activated { route, .. } => Some(route),
			_ => None,
		})
		.collect();
	assert_eq!(activated, ["Results"]);
}

#[rstest]
#[tokio::test]
async fn test_deep_link_starts_on_guard_target() {
	let app = bootstrap(RouterSettings::default(), Some("/#/results")).unwrap();

	let outcome = app.navigator.start().await.unwrap();

	assert_eq!(outcome.route(), Some("Login"));
	assert_eq!(app.history.current_href(), "/#/");
}

#[rstest]
#[serial(env)]
#[tokio::test]
async fn test_bootstrap_from_env_applies_base_path() {
	// SAFETY: env access is serialized by the `env` key.
	unsafe {
		std::env::set_var("SETLIST_BASE_URL", "/party");
	}

	let app = bootstrap_from_env(None);

	unsafe {
		std::env::remove_var("SETLIST_BASE_URL");
	}
	let app = app.unwrap();
	app.navigator.start().await.unwrap();
	assert_eq!(app.settings.base_path, "/party");
	assert_eq!(app.history.current_href(), "/party/#/");
}
