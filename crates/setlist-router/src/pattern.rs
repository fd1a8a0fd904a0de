//! Path pattern matching for route resolution.
//!
//! Patterns are `/`-separated segments, each one of:
//! - a literal (`playlist`)
//! - a parameter `{name}` capturing one segment
//! - a wildcard `{name:*}` capturing the rest of the path (last segment only)
//!
//! Trailing slashes are insignificant on both sides: `/vote` and `/vote/`
//! compile to the same pattern and match the same locations.

use crate::error::ConfigurationError;
use std::collections::HashMap;

/// Maximum allowed length for a pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of segments in a pattern.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled pattern regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
	Wildcard(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	/// Normalized pattern text.
	pattern: String,
	segments: Vec<Segment>,
	regex: regex::Regex,
	param_names: Vec<String>,
}

impl PathPattern {
	/// Compiles a pattern.
	///
	/// # Errors
	///
	/// Returns [`ConfigurationError::InvalidPattern`] if the pattern does not
	/// start with `/`, exceeds the length or segment limits, repeats a
	/// parameter name, mixes literal text and a parameter in one segment, or
	/// places a wildcard anywhere but last.
	pub fn new(pattern: &str) -> Result<Self, ConfigurationError> {
		let invalid = |reason: String| ConfigurationError::InvalidPattern {
			pattern: pattern.to_string(),
			reason,
		};

		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(invalid(format!(
				"length {} exceeds maximum of {} bytes",
				pattern.len(),
				MAX_PATTERN_LENGTH
			)));
		}
		if !pattern.starts_with('/') {
			return Err(invalid("must start with '/'".to_string()));
		}

		let raw: Vec<&str> = pattern
			.split('/')
			.filter(|segment| !segment.is_empty())
			.collect();
		if raw.len() > MAX_PATH_SEGMENTS {
			return Err(invalid(format!(
				"{} segments exceed maximum of {}",
				raw.len(),
				MAX_PATH_SEGMENTS
			)));
		}

		let mut segments = Vec::with_capacity(raw.len());
		let mut param_names: Vec<String> = Vec::new();
		for (index, text) in raw.iter().enumerate() {
			let segment = Self::parse_segment(text).map_err(invalid)?;
			if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
				if param_names.contains(name) {
					return Err(invalid(format!("parameter '{}' appears twice", name)));
				}
				param_names.push(name.clone());
			}
			if matches!(segment, Segment::Wildcard(_)) && index + 1 != raw.len() {
				return Err(invalid("wildcard must be the last segment".to_string()));
			}
			segments.push(segment);
		}

		let regex = regex::RegexBuilder::new(&Self::compile(&segments))
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| invalid(format!("failed to compile: {}", e)))?;

		Ok(Self {
			pattern: Self::render(&segments),
			segments,
			regex,
			param_names,
		})
	}

	fn parse_segment(text: &str) -> Result<Segment, String> {
		let Some(inner) = text.strip_prefix('{') else {
			if text.contains('{') || text.contains('}') {
				return Err(format!("segment '{}' mixes literal text and braces", text));
			}
			return Ok(Segment::Literal(text.to_string()));
		};
		let inner = inner
			.strip_suffix('}')
			.ok_or_else(|| format!("segment '{}' is not a closed parameter", text))?;
		let (name, wildcard) = match inner.strip_suffix(":*") {
			Some(name) => (name, true),
			None => (inner, false),
		};
		if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
			return Err(format!("invalid parameter name '{}'", name));
		}
		Ok(if wildcard {
			Segment::Wildcard(name.to_string())
		} else {
			Segment::Param(name.to_string())
		})
	}

	fn compile(segments: &[Segment]) -> String {
		if segments.is_empty() {
			return "^/$".to_string();
		}
		let mut regex_str = String::from("^");
		for segment in segments {
			regex_str.push('/');
			match segment {
				Segment::Literal(text) => regex_str.push_str(&regex::escape(text)),
				Segment::Param(name) => regex_str.push_str(&format!("(?P<{}>[^/]+)", name)),
				Segment::Wildcard(name) => {
					regex_str.push_str(&format!("(?P<{}>.*)$", name));
					return regex_str;
				}
			}
		}
		regex_str.push_str("/?$");
		regex_str
	}

	fn render(segments: &[Segment]) -> String {
		if segments.is_empty() {
			return "/".to_string();
		}
		segments
			.iter()
			.map(|segment| match segment {
				Segment::Literal(text) => format!("/{}", text),
				Segment::Param(name) => format!("/{{{}}}", name),
				Segment::Wildcard(name) => format!("/{{{}:*}}", name),
			})
			.collect()
	}

	/// Returns the normalized pattern string.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Returns the parameter names in pattern order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Returns whether this pattern has no parameters.
	pub fn is_exact(&self) -> bool {
		self.param_names.is_empty()
	}

	/// Matches a path, returning extracted parameters.
	pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
		self.regex.captures(path).map(|caps| {
			self.param_names
				.iter()
				.filter_map(|name| {
					caps.name(name)
						.map(|m| (name.clone(), m.as_str().to_string()))
				})
				.collect()
		})
	}

	/// Checks if this pattern matches the path.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Builds a path from parameter values.
	///
	/// Returns `None` if a parameter is missing or a single-segment value
	/// contains `/`.
	pub fn reverse(&self, params: &HashMap<String, String>) -> Option<String> {
		if self.segments.is_empty() {
			return Some("/".to_string());
		}
		let mut path = String::new();
		for segment in &self.segments {
			path.push('/');
			match segment {
				Segment::Literal(text) => path.push_str(text),
				Segment::Param(name) => {
					let value = params.get(name)?;
					if value.is_empty() || value.contains('/') {
						return None;
					}
					path.push_str(value);
				}
				Segment::Wildcard(name) => path.push_str(params.get(name)?),
			}
		}
		Some(path)
	}

	/// Returns true if some location could match both patterns.
	///
	/// Literals must agree position by position; a parameter absorbs any
	/// literal or parameter; a wildcard absorbs whatever remains.
	pub fn overlaps(&self, other: &PathPattern) -> bool {
		fn walk(a: &[Segment], b: &[Segment]) -> bool {
			match (a.first(), b.first()) {
				(None, None) => true,
				(Some(Segment::Wildcard(_)), _) | (_, Some(Segment::Wildcard(_))) => true,
				(None, Some(_)) | (Some(_), None) => false,
				(Some(Segment::Literal(x)), Some(Segment::Literal(y))) => {
					x == y && walk(&a[1..], &b[1..])
				}
				_ => walk(&a[1..], &b[1..]),
			}
		}
		walk(&self.segments, &other.segments)
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
	}
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}
