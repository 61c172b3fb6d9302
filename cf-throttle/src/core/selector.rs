//! Path selectors for limiter mappings
//!
//! A [`PathSelector`] decides whether an outbound request path belongs to a
//! limiter. Selectors use the same textual form as the UAA rate limiter
//! configuration (`equals:/Users`, `startsWith:/Groups`, `contains:token`,
//! `all`).

use super::ThrottleError;
use std::fmt;
use std::str::FromStr;

/// How a selector compares its path against a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathMatchType {
    /// The request path must equal the selector path
    Equals,
    /// The request path must start with the selector path
    StartsWith,
    /// The request path must contain the selector path
    Contains,
    /// Every request path matches
    All,
}

impl PathMatchType {
    fn rank(self) -> u8 {
        match self {
            PathMatchType::Equals => 3,
            PathMatchType::StartsWith => 2,
            PathMatchType::Contains => 1,
            PathMatchType::All => 0,
        }
    }

    /// The keyword used in the textual selector form
    pub fn keyword(self) -> &'static str {
        match self {
            PathMatchType::Equals => "equals",
            PathMatchType::StartsWith => "startsWith",
            PathMatchType::Contains => "contains",
            PathMatchType::All => "all",
        }
    }
}

/// How closely a selector matched a path
///
/// Higher values win. Exact matches beat prefixes, prefixes beat substring
/// matches and catch-all selectors come last. Within one match type the
/// longer selector path wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    rank: u8,
    length: usize,
}

/// A single path selector of a limiter mapping
///
/// # Example
///
/// ```
/// use cf_throttle::PathSelector;
///
/// let selector: PathSelector = "startsWith:/Groups".parse().unwrap();
/// assert!(selector.matches("/Groups/abc"));
/// assert!(!selector.matches("/Users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSelector {
    match_type: PathMatchType,
    path: String,
}

impl PathSelector {
    /// Creates a selector of the given type
    pub fn new(match_type: PathMatchType, path: impl Into<String>) -> Self {
        let path = match match_type {
            PathMatchType::All => String::new(),
            _ => path.into(),
        };
        PathSelector { match_type, path }
    }

    pub fn equals(path: impl Into<String>) -> Self {
        Self::new(PathMatchType::Equals, path)
    }

    pub fn starts_with(path: impl Into<String>) -> Self {
        Self::new(PathMatchType::StartsWith, path)
    }

    pub fn contains(path: impl Into<String>) -> Self {
        Self::new(PathMatchType::Contains, path)
    }

    pub fn all() -> Self {
        Self::new(PathMatchType::All, "")
    }

    pub fn match_type(&self) -> PathMatchType {
        self.match_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if `path` is selected
    pub fn matches(&self, path: &str) -> bool {
        self.specificity(path).is_some()
    }

    /// Returns how specific the match is, or `None` if `path` is not selected
    pub fn specificity(&self, path: &str) -> Option<Specificity> {
        let matched = match self.match_type {
            PathMatchType::Equals => path == self.path,
            PathMatchType::StartsWith => path.starts_with(self.path.as_str()),
            PathMatchType::Contains => path.contains(self.path.as_str()),
            PathMatchType::All => true,
        };

        matched.then(|| Specificity {
            rank: self.match_type.rank(),
            length: self.path.len(),
        })
    }
}

impl fmt::Display for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.match_type {
            PathMatchType::All => f.write_str("all"),
            other => write!(f, "{}:{}", other.keyword(), self.path),
        }
    }
}

impl FromStr for PathSelector {
    type Err = ThrottleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(PathSelector::all());
        }

        let (keyword, path) = s
            .split_once(':')
            .ok_or_else(|| ThrottleError::InvalidSelector(s.to_string()))?;

        if path.is_empty() {
            return Err(ThrottleError::InvalidSelector(s.to_string()));
        }

        let match_type = match keyword.to_ascii_lowercase().as_str() {
            "equals" => PathMatchType::Equals,
            "startswith" => PathMatchType::StartsWith,
            "contains" => PathMatchType::Contains,
            _ => return Err(ThrottleError::InvalidSelector(s.to_string())),
        };

        Ok(PathSelector::new(match_type, path))
    }
}
