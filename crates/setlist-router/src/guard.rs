//! Route guards.
//!
//! A guard is a pure decision over a [`SessionState`] snapshot. Guards attached
//! to a route form an ordered chain; the first redirect wins.

use crate::session::SessionState;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
	/// Proceed to activation.
	Allow,
	/// Abandon this route and navigate to the target path instead.
	Redirect(String),
}

impl GuardOutcome {
	/// Redirects to `target`.
	pub fn redirect(target: impl Into<String>) -> Self {
		Self::Redirect(target.into())
	}
}

/// A precondition on entering a route.
#[async_trait]
pub trait Guard: Send + Sync {
	/// Decides whether the session may enter the route.
	async fn check(&self, session: &SessionState) -> GuardOutcome;

	/// Short label used in logs.
	fn label(&self) -> &str {
		"guard"
	}
}

/// Shared guard handle.
pub type SharedGuard = Arc<dyn Guard>;

struct FnGuard<F> {
	label: String,
	check: F,
}

#[async_trait]
impl<F> Guard for FnGuard<F>
where
	F: Fn(&SessionState) -> GuardOutcome + Send + Sync,
{
	async fn check(&self, session: &SessionState) -> GuardOutcome {
		(self.check)(session)
	}

	fn label(&self) -> &str {
		&self.label
	}
}

/// Wraps a synchronous predicate as a guard.
pub fn guard_fn<F>(label: impl Into<String>, check: F) -> SharedGuard
where
	F: Fn(&SessionState) -> GuardOutcome + Send + Sync + 'static,
{
	Arc::new(FnGuard {
		label: label.into(),
		check,
	})
}

/// Redirects unauthenticated sessions.
#[derive(Clone)]
pub struct RequireAuthenticated {
	redirect_to: String,
}

impl RequireAuthenticated {
	/// Creates a guard that sends anonymous sessions to `redirect_to`.
	pub fn new(redirect_to: impl Into<String>) -> Self {
		Self {
			redirect_to: redirect_to.into(),
		}
	}

	/// Redirect target for rejected sessions.
	pub fn redirect_to(&self) -> &str {
		&self.redirect_to
	}
}

impl fmt::Debug for RequireAuthenticated {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequireAuthenticated")
			.field("redirect_to", &self.redirect_to)
			.finish()
	}
}

#[async_trait]
impl Guard for RequireAuthenticated {
	async fn check(&self, session: &SessionState) -> GuardOutcome {
		if session.is_authenticated() {
			GuardOutcome::Allow
		} else {
			GuardOutcome::redirect(self.redirect_to.clone())
		}
	}

	fn label(&self) -> &str {
		"require-authenticated"
	}
}

/// Runs a guard chain in order, stopping at the first redirect.
pub async fn evaluate_chain(guards: &[SharedGuard], session: &SessionState) -> GuardOutcome {
	for guard in guards {
		if let outcome @ GuardOutcome::Redirect(_) = guard.check(session).await {
			tracing::debug!(guard = guard.label(), "guard rejected navigation");
			return outcome;
		}
	}
	GuardOutcome::Allow
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[tokio::test]
	async fn test_require_authenticated() {
		let guard = RequireAuthenticated::new("/");

		assert_eq!(
			guard.check(&SessionState::anonymous()).await,
			GuardOutcome::redirect("/")
		);
		assert_eq!(
			guard.check(&SessionState::signed_in("dana")).await,
			GuardOutcome::Allow
		);
	}

	#[tokio::test]
	async fn test_empty_chain_allows() {
		assert_eq!(
			evaluate_chain(&[], &SessionState::anonymous()).await,
			GuardOutcome::Allow
		);
	}

	#[tokio::test]
	async fn test_chain_stops_at_first_redirect() {
		let chain = vec![
			guard_fn("allow", |_| GuardOutcome::Allow),
			guard_fn("first", |_| GuardOutcome::redirect("/first")),
			guard_fn("second", |_| GuardOutcome::redirect("/second")),
		];

		assert_eq!(
			evaluate_chain(&chain, &SessionState::anonymous()).await,
			GuardOutcome::redirect("/first")
		);
	}

	#[rstest]
	fn test_guard_fn_label() {
		let guard = guard_fn("host-only", |_| GuardOutcome::Allow);
		assert_eq!(guard.label(), "host-only");
	}
}
