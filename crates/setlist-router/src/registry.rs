//! Lazy view loading.
//!
//! Views are registered under a [`ViewId`] with a loader. The first successful
//! load is cached; a failed load is not, so the next request tries again.
//! The not-found and error fallbacks are built in and never fail.

use crate::error::ViewLoadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Identifier of the built-in not-found view.
pub const NOT_FOUND_VIEW: &str = "not-found";

/// Identifier of the built-in error view.
pub const ERROR_VIEW: &str = "error";

/// Name under which a view is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
	/// Creates a view id.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ViewId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for ViewId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl fmt::Display for ViewId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A loaded view. Rendering belongs to the view layer.
pub trait View: Send + Sync + 'static {
	/// Human-readable title.
	fn title(&self) -> &str;
}

/// A view with nothing but a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticView {
	title: String,
}

impl StaticView {
	/// Creates a titled view.
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
		}
	}
}

impl View for StaticView {
	fn title(&self) -> &str {
		&self.title
	}
}

/// A cached, shareable view.
#[derive(Clone)]
pub struct ViewHandle {
	id: ViewId,
	view: Arc<dyn View>,
}

impl ViewHandle {
	/// Wraps a loaded view.
	pub fn new(id: impl Into<ViewId>, view: Arc<dyn View>) -> Self {
		Self {
			id: id.into(),
			view,
		}
	}

	/// The id the view was loaded under.
	pub fn id(&self) -> &ViewId {
		&self.id
	}

	/// The view's title.
	pub fn title(&self) -> &str {
		self.view.title()
	}

	/// The loaded view.
	pub fn view(&self) -> &Arc<dyn View> {
		&self.view
	}

	/// Whether both handles point at the same loaded instance.
	pub fn same_instance(&self, other: &ViewHandle) -> bool {
		Arc::ptr_eq(&self.view, &other.view)
	}
}

impl fmt::Debug for ViewHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewHandle")
			.field("id", &self.id)
			.field("title", &self.view.title())
			.finish()
	}
}

impl PartialEq for ViewHandle {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

/// Produces a view on first use.
#[async_trait]
pub trait ViewLoader: Send + Sync {
	/// Loads the view registered under `id`.
	async fn load(&self, id: &ViewId) -> Result<Arc<dyn View>, ViewLoadError>;
}

struct FnLoader<F>(F);

#[async_trait]
impl<F> ViewLoader for FnLoader<F>
where
	F: Fn(&ViewId) -> Result<Arc<dyn View>, ViewLoadError> + Send + Sync,
{
	async fn load(&self, id: &ViewId) -> Result<Arc<dyn View>, ViewLoadError> {
		(self.0)(id)
	}
}

/// Wraps a synchronous closure as a loader.
pub fn loader_fn<F>(load: F) -> Arc<dyn ViewLoader>
where
	F: Fn(&ViewId) -> Result<Arc<dyn View>, ViewLoadError> + Send + Sync + 'static,
{
	Arc::new(FnLoader(load))
}

struct Slot {
	loader: Arc<dyn ViewLoader>,
	cached: OnceCell<ViewHandle>,
}

/// Loader and cache of views by id.
pub struct ViewRegistry {
	slots: HashMap<ViewId, Slot>,
	not_found: ViewHandle,
	error_view: ViewHandle,
}

impl fmt::Debug for ViewRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewRegistry")
			.field("views", &self.slots.keys().collect::<Vec<_>>())
			.field("not_found", &self.not_found)
			.field("error_view", &self.error_view)
			.finish()
	}
}

impl Default for ViewRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ViewRegistry {
	/// Creates a registry holding only the built-in fallbacks.
	pub fn new() -> Self {
		Self {
			slots: HashMap::new(),
			not_found: ViewHandle::new(NOT_FOUND_VIEW, Arc::new(StaticView::new("Not Found"))),
			error_view: ViewHandle::new(ERROR_VIEW, Arc::new(StaticView::new("Something went wrong"))),
		}
	}

	/// Registers a loader. A later registration under the same id replaces it.
	pub fn register(mut self, id: impl Into<ViewId>, loader: Arc<dyn ViewLoader>) -> Self {
		self.slots.insert(
			id.into(),
			Slot {
				loader,
				cached: OnceCell::new(),
			},
		);
		self
	}

	/// Registers a view that is already built.
	pub fn register_static(self, id: impl Into<ViewId>, view: impl View) -> Self {
		let view: Arc<dyn View> = Arc::new(view);
		self.register(id, loader_fn(move |_| Ok(Arc::clone(&view))))
	}

	/// Replaces the not-found fallback.
	pub fn with_not_found(mut self, view: impl View) -> Self {
		self.not_found = ViewHandle::new(NOT_FOUND_VIEW, Arc::new(view));
		self
	}

	/// Replaces the error fallback.
	pub fn with_error_view(mut self, view: impl View) -> Self {
		self.error_view = ViewHandle::new(ERROR_VIEW, Arc::new(view));
		self
	}

	/// Loads a view, reusing the cached handle after the first success.
	///
	/// # Errors
	///
	/// [`ViewLoadError::Missing`] if nothing is registered under `id`, or the
	/// loader's own error.
	pub async fn load(&self, id: &ViewId) -> Result<ViewHandle, ViewLoadError> {
		let slot = self
			.slots
			.get(id)
			.ok_or_else(|| ViewLoadError::Missing(id.to_string()))?;

		let handle = slot
			.cached
			.get_or_try_init(|| async {
				tracing::debug!(view = %id, "loading view");
				let view = slot.loader.load(id).await?;
				Ok::<_, ViewLoadError>(ViewHandle::new(id.clone(), view))
			})
			.await?;
		Ok(handle.clone())
	}

	/// Whether a view is registered.
	pub fn contains(&self, id: &ViewId) -> bool {
		self.slots.contains_key(id)
	}

	/// Whether a view has been loaded and cached.
	pub fn is_loaded(&self, id: &ViewId) -> bool {
		self.slots
			.get(id)
			.is_some_and(|slot| slot.cached.initialized())
	}

	/// The not-found fallback.
	pub fn not_found(&self) -> ViewHandle {
		self.not_found.clone()
	}

	/// The error fallback.
	pub fn error_view(&self) -> ViewHandle {
		self.error_view.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn counting_loader(calls: Arc<AtomicUsize>) -> Arc<dyn ViewLoader> {
		loader_fn(move |id| {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(Arc::new(StaticView::new(id.as_str().to_uppercase())) as Arc<dyn View>)
		})
	}

	#[tokio::test]
	async fn test_load_caches_after_first_success() {
		let calls = Arc::new(AtomicUsize::new(0));
		let registry = ViewRegistry::new().register("vote", counting_loader(Arc::clone(&calls)));
		let id = ViewId::from("vote");

		assert!(!registry.is_loaded(&id));
		let first = registry.load(&id).await.unwrap();
		let second = registry.load(&id).await.unwrap();

		assert_eq!(first.title(), "VOTE");
		assert!(first.same_instance(&second));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(registry.is_loaded(&id));
	}

	#[tokio::test]
	async fn test_missing_view() {
		let registry = ViewRegistry::new();
		let err = registry.load(&ViewId::from("results")).await.unwrap_err();
		assert_eq!(err, ViewLoadError::Missing("results".to_string()));
	}

	#[tokio::test]
	async fn test_failed_load_is_retried() {
		let attempts = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&attempts);
		let registry = ViewRegistry::new().register(
			"results",
			loader_fn(move |id| {
				if counter.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(ViewLoadError::failed(id.as_str(), "chunk unavailable"))
				} else {
					Ok(Arc::new(StaticView::new("Results")) as Arc<dyn View>)
				}
			}),
		);
		let id = ViewId::from("results");

		assert!(registry.load(&id).await.is_err());
		assert!(!registry.is_loaded(&id));
		assert_eq!(registry.load(&id).await.unwrap().title(), "Results");
		assert_eq!(attempts.load(Ordering::SeqCst), 2);
	}

	#[rstest]
	fn test_fallbacks_always_resolve() {
		let registry = ViewRegistry::new();
		assert_eq!(registry.not_found().id().as_str(), NOT_FOUND_VIEW);
		assert_eq!(registry.error_view().id().as_str(), ERROR_VIEW);

		let registry = registry.with_not_found(StaticView::new("Lost"));
		assert_eq!(registry.not_found().title(), "Lost");
	}

	#[tokio::test]
	async fn test_register_static() {
		let registry = ViewRegistry::new().register_static("login", StaticView::new("Sign in"));
		assert!(registry.contains(&ViewId::from("login")));
		assert_eq!(
			registry.load(&ViewId::from("login")).await.unwrap().title(),
			"Sign in"
		);
	}
}
