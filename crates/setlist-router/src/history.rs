//! Addressable locations and the history primitive.
//!
//! The adapter owns the location/history stack and nothing else; it performs
//! no routing. Every mutation is assigned a sequence number and broadcast to
//! subscribers while the adapter lock is held, so notifications arrive in the
//! order the operations were issued.

use crate::error::HistoryError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// A path with an optional query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
	path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	query: Option<String>,
}

impl Location {
	/// The root location.
	pub fn root() -> Self {
		Self {
			path: "/".to_string(),
			query: None,
		}
	}

	/// Parses `/path?query`, tolerating a leading `#` and a missing `/`.
	///
	/// # Errors
	///
	/// [`HistoryError::Malformed`] if the input contains whitespace, control
	/// characters, or a second `#`.
	pub fn parse(input: &str) -> Result<Self, HistoryError> {
		let trimmed = input.strip_prefix('#').unwrap_or(input);
		if trimmed
			.chars()
			.any(|c| c == '#' || c.is_whitespace() || c.is_control())
		{
			return Err(HistoryError::Malformed(input.to_string()));
		}

		let (path, query) = match trimmed.split_once('?') {
			Some((path, query)) => (path, (!query.is_empty()).then(|| query.to_string())),
			None => (trimmed, None),
		};
		let path = if path.starts_with('/') {
			path.to_string()
		} else {
			format!("/{}", path)
		};

		Ok(Self { path, query })
	}

	/// Path component.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Query string without the `?`.
	pub fn query(&self) -> Option<&str> {
		self.query.as_deref()
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.query {
			Some(query) => write!(f, "{}?{}", self.path, query),
			None => f.write_str(&self.path),
		}
	}
}

/// Converts between hash-addressed hrefs and locations.
///
/// With base `/app/`, the location `/vote` is addressed as `/app/#/vote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLocation {
	base: String,
}

impl Default for HashLocation {
	fn default() -> Self {
		Self::new("/")
	}
}

impl HashLocation {
	/// Creates a codec for `base`, normalized to start and end with `/`.
	pub fn new(base: &str) -> Self {
		let trimmed = base.trim_matches('/');
		let base = if trimmed.is_empty() {
			"/".to_string()
		} else {
			format!("/{}/", trimmed)
		};
		Self { base }
	}

	/// Normalized base prefix.
	pub fn base(&self) -> &str {
		&self.base
	}

	/// Renders the href for a location.
	pub fn href(&self, location: &Location) -> String {
		format!("{}#{}", self.base, location)
	}

	/// Extracts the location from an href or bare fragment.
	///
	/// An href without a fragment addresses the root location.
	///
	/// # Errors
	///
	/// [`HistoryError::Malformed`] if the fragment does not parse.
	pub fn parse_href(&self, href: &str) -> Result<Location, HistoryError> {
		match href.split_once('#') {
			Some((_, fragment)) if !fragment.is_empty() => Location::parse(fragment),
			_ => Ok(Location::root()),
		}
	}
}

/// What kind of history operation produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
	/// A new entry was appended.
	Push,
	/// The current entry was overwritten.
	Replace,
	/// The cursor moved back.
	Pop,
}

/// Who issued a history operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
	/// Issued through the [`HistoryAdapter`] API by the navigator.
	Navigator,
	/// Issued outside the application (address bar, browser buttons).
	External,
}

/// A location-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
	/// Strictly increasing per adapter.
	pub seq: u64,
	/// The new current location.
	pub location: Location,
	/// Operation that produced the change.
	pub cause: ChangeCause,
	/// Who issued the operation.
	pub origin: Origin,
}

/// Stream of location changes.
pub type LocationStream = mpsc::UnboundedReceiver<LocationChange>;

/// Address/history primitive.
pub trait HistoryAdapter: Send + Sync {
	/// Appends a location, discarding forward entries.
	fn push(&self, location: &Location) -> Result<LocationChange, HistoryError>;

	/// Overwrites the current location.
	fn replace(&self, location: &Location) -> Result<LocationChange, HistoryError>;

	/// Moves back one entry. Returns `None` at the first entry.
	fn back(&self) -> Result<Option<LocationChange>, HistoryError>;

	/// The current location.
	fn current(&self) -> Location;

	/// Subscribes to location changes issued after this call.
	fn subscribe(&self) -> LocationStream;
}

struct MemoryInner {
	entries: Vec<Location>,
	cursor: usize,
	seq: u64,
	subscribers: Vec<mpsc::UnboundedSender<LocationChange>>,
}

impl MemoryInner {
	fn emit(&mut self, cause: ChangeCause, origin: Origin) -> LocationChange {
		self.seq += 1;
		let change = LocationChange {
			seq: self.seq,
			location: self.entries[self.cursor].clone(),
			cause,
			origin,
		};
		self.subscribers
			.retain(|subscriber| subscriber.send(change.clone()).is_ok());
		change
	}

	fn push(&mut self, location: &Location, origin: Origin) -> LocationChange {
		self.entries.truncate(self.cursor + 1);
		self.entries.push(location.clone());
		self.cursor = self.entries.len() - 1;
		self.emit(ChangeCause::Push, origin)
	}

	fn replace(&mut self, location: &Location, origin: Origin) -> LocationChange {
		self.entries[self.cursor] = location.clone();
		self.emit(ChangeCause::Replace, origin)
	}

	fn back(&mut self, origin: Origin) -> Option<LocationChange> {
		if self.cursor == 0 {
			return None;
		}
		self.cursor -= 1;
		Some(self.emit(ChangeCause::Pop, origin))
	}
}

/// Deterministic in-memory history.
pub struct MemoryHistory {
	codec: HashLocation,
	inner: Mutex<MemoryInner>,
}

impl fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("MemoryHistory")
			.field("base", &self.codec.base())
			.field("entries", &inner.entries)
			.field("cursor", &inner.cursor)
			.finish()
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new(Location::root())
	}
}

impl MemoryHistory {
	/// Creates a history positioned at `initial`.
	pub fn new(initial: Location) -> Self {
		Self::with_codec(HashLocation::default(), initial)
	}

	/// Creates a history with a base prefix for hrefs.
	pub fn with_codec(codec: HashLocation, initial: Location) -> Self {
		Self {
			codec,
			inner: Mutex::new(MemoryInner {
				entries: vec![initial],
				cursor: 0,
				seq: 0,
				subscribers: Vec::new(),
			}),
		}
	}

	/// Creates a history from an addressable href such as `/app/#/vote`.
	///
	/// # Errors
	///
	/// [`HistoryError::Malformed`] if the fragment does not parse.
	pub fn from_href(codec: HashLocation, href: &str) -> Result<Self, HistoryError> {
		let initial = codec.parse_href(href)?;
		Ok(Self::with_codec(codec, initial))
	}

	/// The href of the current location.
	pub fn current_href(&self) -> String {
		self.codec.href(&self.current())
	}

	/// All entries, oldest first.
	pub fn entries(&self) -> Vec<Location> {
		self.inner.lock().entries.clone()
	}

	/// Index of the current entry.
	pub fn cursor(&self) -> usize {
		self.inner.lock().cursor
	}

	/// Simulates the user entering a new location.
	pub fn external_push(&self, location: &Location) -> LocationChange {
		self.inner.lock().push(location, Origin::External)
	}

	/// Simulates the browser back button.
	pub fn external_back(&self) -> Option<LocationChange> {
		self.inner.lock().back(Origin::External)
	}
}

impl HistoryAdapter for MemoryHistory {
	fn push(&self, location: &Location) -> Result<LocationChange, HistoryError> {
		Ok(self.inner.lock().push(location, Origin::Navigator))
	}

	fn replace(&self, location: &Location) -> Result<LocationChange, HistoryError> {
		Ok(self.inner.lock().replace(location, Origin::Navigator))
	}

	fn back(&self) -> Result<Option<LocationChange>, HistoryError> {
		Ok(self.inner.lock().back(Origin::Navigator))
	}

	fn current(&self) -> Location {
		let inner = self.inner.lock();
		inner.entries[inner.cursor].clone()
	}

	fn subscribe(&self) -> LocationStream {
		let (tx, rx) = mpsc::unbounded_channel();
		self.inner.lock().subscribers.push(tx);
		rx
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn loc(path: &str) -> Location {
		Location::parse(path).unwrap()
	}

	#[rstest]
	#[case("/vote", "/vote", None)]
	#[case("vote", "/vote", None)]
	#[case("#/vote", "/vote", None)]
	#[case("", "/", None)]
	#[case("/results?round=2", "/results", Some("round=2"))]
	#[case("/results?", "/results", None)]
	fn test_location_parse(#[case] input: &str, #[case] path: &str, #[case] query: Option<&str>) {
		let location = Location::parse(input).unwrap();
		assert_eq!(location.path(), path);
		assert_eq!(location.query(), query);
	}

	#[rstest]
	#[case("/vo te")]
	#[case("/vote#again")]
	#[case("/vote\n")]
	fn test_location_parse_malformed(#[case] input: &str) {
		assert!(matches!(
			Location::parse(input),
			Err(HistoryError::Malformed(_))
		));
	}

	#[rstest]
	fn test_location_display() {
		assert_eq!(loc("/results?round=2").to_string(), "/results?round=2");
		assert_eq!(Location::root().to_string(), "/");
	}

	#[rstest]
	#[case("", "/")]
	#[case("/", "/")]
	#[case("app", "/app/")]
	#[case("/app/", "/app/")]
	#[case("/nested/app", "/nested/app/")]
	fn test_hash_location_base(#[case] base: &str, #[case] expected: &str) {
		assert_eq!(HashLocation::new(base).base(), expected);
	}

	#[rstest]
	fn test_hash_location_round_trip() {
		let codec = HashLocation::new("/app/");
		let href = codec.href(&loc("/vote"));

		assert_eq!(href, "/app/#/vote");
		assert_eq!(codec.parse_href(&href).unwrap(), loc("/vote"));
		assert_eq!(codec.parse_href("https://example.test/app/").unwrap(), Location::root());
		assert_eq!(codec.parse_href("/app/#").unwrap(), Location::root());
	}

	#[rstest]
	fn test_memory_history_push_replace_back() {
		let history = MemoryHistory::default();
		history.push(&loc("/playlist")).unwrap();
		history.push(&loc("/vote")).unwrap();
		history.replace(&loc("/results")).unwrap();

		assert_eq!(history.entries(), vec![loc("/"), loc("/playlist"), loc("/results")]);

		let change = history.back().unwrap().unwrap();
		assert_eq!(change.location, loc("/playlist"));
		assert_eq!(change.cause, ChangeCause::Pop);
		assert_eq!(history.current(), loc("/playlist"));
	}

	#[rstest]
	fn test_memory_history_back_at_start_is_noop() {
		let history = MemoryHistory::default();
		assert!(history.back().unwrap().is_none());
		assert!(history.back().unwrap().is_none());
		assert_eq!(history.current(), Location::root());
	}

	#[rstest]
	fn test_push_discards_forward_entries() {
		let history = MemoryHistory::default();
		history.push(&loc("/playlist")).unwrap();
		history.push(&loc("/vote")).unwrap();
		history.back().unwrap();
		history.push(&loc("/results")).unwrap();

		assert_eq!(history.entries(), vec![loc("/"), loc("/playlist"), loc("/results")]);
		assert_eq!(history.cursor(), 2);
	}

	#[rstest]
	fn test_notifications_in_issue_order() {
		let history = MemoryHistory::default();
		let mut changes = history.subscribe();

		history.push(&loc("/playlist")).unwrap();
		history.external_push(&loc("/vote"));
		history.replace(&loc("/results")).unwrap();
		history.external_back();

		let received: Vec<_> = std::iter::from_fn(|| changes.try_recv().ok()).collect();
		let seqs: Vec<u64> = received.iter().map(|c| c.seq).collect();
		assert_eq!(seqs, vec![1, 2, 3, 4]);
		assert_eq!(received[1].origin, Origin::External);
		assert_eq!(received[2].cause, ChangeCause::Replace);
		assert_eq!(received[3].location, loc("/playlist"));
	}

	#[rstest]
	fn test_dropped_subscriber_is_pruned() {
		let history = MemoryHistory::default();
		drop(history.subscribe());
		let mut live = history.subscribe();

		history.push(&loc("/vote")).unwrap();

		assert_eq!(live.try_recv().unwrap().location, loc("/vote"));
		assert_eq!(history.inner.lock().subscribers.len(), 1);
	}

	#[rstest]
	fn test_from_href() {
		let history = MemoryHistory::from_href(HashLocation::new("/app"), "/app/#/results").unwrap();
		assert_eq!(history.current(), loc("/results"));
		assert_eq!(history.current_href(), "/app/#/results");
	}
}
