//! Read-only session snapshots supplied by the authentication collaborator.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session data as seen by guards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
	/// Whether the user has signed in.
	pub authenticated: bool,
	/// Display name of the signed-in user, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
}

impl SessionState {
	/// An unauthenticated session.
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// An authenticated session for `user`.
	pub fn signed_in(user: impl Into<String>) -> Self {
		Self {
			authenticated: true,
			user: Some(user.into()),
		}
	}

	/// Whether the user has signed in.
	pub fn is_authenticated(&self) -> bool {
		self.authenticated
	}
}

/// Source of session snapshots.
///
/// The navigator takes one snapshot per guard evaluation and never writes back.
pub trait SessionProvider: Send + Sync {
	/// Returns the current session.
	fn snapshot(&self) -> SessionState;
}

impl SessionProvider for SessionState {
	fn snapshot(&self) -> SessionState {
		self.clone()
	}
}

/// A session shared between the authentication layer and the navigator.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
	inner: Arc<RwLock<SessionState>>,
}

impl SharedSession {
	/// Creates an anonymous shared session.
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks the session as signed in.
	pub fn sign_in(&self, user: impl Into<String>) {
		*self.inner.write() = SessionState::signed_in(user);
	}

	/// Clears the session.
	pub fn sign_out(&self) {
		*self.inner.write() = SessionState::anonymous();
	}
}

impl SessionProvider for SharedSession {
	fn snapshot(&self) -> SessionState {
		self.inner.read().clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_shared_session_sign_in_and_out() {
		let session = SharedSession::new();
		assert!(!session.snapshot().is_authenticated());

		session.sign_in("dana");
		let snapshot = session.snapshot();
		assert!(snapshot.is_authenticated());
		assert_eq!(snapshot.user.as_deref(), Some("dana"));

		session.sign_out();
		assert_eq!(session.snapshot(), SessionState::anonymous());
	}

	#[rstest]
	fn test_snapshot_is_detached() {
		let session = SharedSession::new();
		let before = session.snapshot();
		session.sign_in("dana");

		assert!(!before.is_authenticated());
	}

	#[rstest]
	fn test_session_serializes_without_empty_user() {
		let json = serde_json::to_string(&SessionState::anonymous()).unwrap();
		assert_eq!(json, r#"{"authenticated":false}"#);
	}
}
