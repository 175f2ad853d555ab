//! Path matching logic.
//!
//! # Responsibilities
//! - Match a path exactly
//! - Match a path prefix and capture the trailing segment
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - The captured remainder is returned verbatim (still percent-encoded)

/// Result of a successful match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathMatch<'p> {
    /// Trailing segment after a matched prefix. `None` for exact matches.
    pub remainder: Option<&'p str>,
}

/// Trait for matching request paths against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the match if the path satisfies this condition.
    fn match_path<'p>(&self, path: &'p str) -> Option<PathMatch<'p>>;
}

/// Matches one path exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn match_path<'p>(&self, path: &'p str) -> Option<PathMatch<'p>> {
        (path == self.path).then_some(PathMatch { remainder: None })
    }
}

/// Matches the request path prefix and captures what follows it.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn match_path<'p>(&self, path: &'p str) -> Option<PathMatch<'p>> {
        path.strip_prefix(self.prefix.as_str())
            .map(|rest| PathMatch { remainder: Some(rest) })
    }
}
