//! Limiter mappings
//!
//! A [`LimiterMapping`] is a named rule pairing one or more path selectors
//! with a call quota per time window.

use super::{PathSelector, ThrottleError};
use super::selector::Specificity;
use std::time::Duration;

/// Quota of a limiter mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// The selectors match but calls are never delayed (`limit = -1`)
    Unlimited,
    /// At most this many calls per time window
    Max(u32),
}

impl Quota {
    /// The wire representation used by UAA (`-1` for unlimited)
    pub fn as_limit(self) -> i64 {
        match self {
            Quota::Unlimited => -1,
            Quota::Max(n) => n as i64,
        }
    }
}

/// A named rate limit rule for a set of request paths
///
/// # Example
///
/// ```
/// use cf_throttle::{LimiterMapping, PathSelector};
///
/// let mapping = LimiterMapping::builder()
///     .name("groups")
///     .time_base(1)
///     .limit(2)
///     .path_selector(PathSelector::starts_with("/Groups"))
///     .build()
///     .unwrap();
///
/// assert_eq!(mapping.name(), "groups");
/// assert!(mapping.matches("/Groups/abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterMapping {
    name: String,
    time_base: u32,
    quota: Quota,
    path_selectors: Vec<PathSelector>,
}

/// Builder for [`LimiterMapping`]
#[derive(Debug, Default)]
pub struct LimiterMappingBuilder {
    name: Option<String>,
    time_base: Option<u32>,
    limit: Option<i64>,
    path_selectors: Vec<PathSelector>,
}

impl LimiterMapping {
    pub fn builder() -> LimiterMappingBuilder {
        LimiterMappingBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Window length in seconds
    pub fn time_base(&self) -> u32 {
        self.time_base
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.time_base as u64)
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// The configured limit, `-1` when unlimited
    pub fn limit(&self) -> i64 {
        self.quota.as_limit()
    }

    pub fn path_selectors(&self) -> &[PathSelector] {
        &self.path_selectors
    }

    pub fn matches(&self, path: &str) -> bool {
        self.specificity(path).is_some()
    }

    /// Best specificity of any selector matching `path`
    pub fn specificity(&self, path: &str) -> Option<Specificity> {
        self.path_selectors
            .iter()
            .filter_map(|selector| selector.specificity(path))
            .max()
    }
}

impl LimiterMappingBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Window length in seconds
    pub fn time_base(mut self, seconds: u32) -> Self {
        self.time_base = Some(seconds);
        self
    }

    /// Maximum calls per window; `-1` disables limiting for the selectors
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn path_selector(mut self, selector: PathSelector) -> Self {
        self.path_selectors.push(selector);
        self
    }

    pub fn path_selectors(mut self, selectors: impl IntoIterator<Item = PathSelector>) -> Self {
        self.path_selectors.extend(selectors);
        self
    }

    pub fn build(self) -> Result<LimiterMapping, ThrottleError> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ThrottleError::MissingField("name")),
        };

        let time_base = match self.time_base {
            Some(0) => return Err(ThrottleError::InvalidTimeBase(0)),
            Some(seconds) => seconds,
            None => return Err(ThrottleError::MissingField("time base")),
        };

        let quota = match self.limit {
            Some(-1) => Quota::Unlimited,
            Some(n) if n > 0 && n <= u32::MAX as i64 => Quota::Max(n as u32),
            Some(n) => return Err(ThrottleError::InvalidLimit(n)),
            None => return Err(ThrottleError::MissingField("limit")),
        };

        if self.path_selectors.is_empty() {
            return Err(ThrottleError::MissingField("path selector"));
        }

        Ok(LimiterMapping {
            name,
            time_base,
            quota,
            path_selectors: self.path_selectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> LimiterMappingBuilder {
        LimiterMapping::builder()
            .name("test")
            .time_base(1)
            .limit(2)
            .path_selector(PathSelector::starts_with("/Groups"))
    }

    #[test]
    fn test_build_valid_mapping() {
        let mapping = builder().build().unwrap();
        assert_eq!(mapping.quota(), Quota::Max(2));
        assert_eq!(mapping.window(), Duration::from_secs(1));
        assert_eq!(mapping.limit(), 2);
    }

    #[test]
    fn test_minus_one_is_unlimited() {
        let mapping = builder().limit(-1).build().unwrap();
        assert_eq!(mapping.quota(), Quota::Unlimited);
        assert_eq!(mapping.limit(), -1);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(matches!(
            builder().limit(0).build(),
            Err(ThrottleError::InvalidLimit(0))
        ));
        assert!(matches!(
            builder().limit(-5).build(),
            Err(ThrottleError::InvalidLimit(-5))
        ));
    }

    #[test]
    fn test_missing_fields_reported() {
        let err = LimiterMapping::builder()
            .time_base(1)
            .limit(1)
            .path_selector(PathSelector::all())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "name must be specified");

        let err = LimiterMapping::builder()
            .name("x")
            .time_base(1)
            .limit(1)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "path selector must be specified");

        assert!(matches!(
            builder().time_base(0).build(),
            Err(ThrottleError::InvalidTimeBase(0))
        ));
    }

    #[test]
    fn test_best_selector_specificity_wins() {
        let mapping = builder()
            .path_selector(PathSelector::equals("/Groups/External"))
            .build()
            .unwrap();

        let exact = mapping.specificity("/Groups/External").unwrap();
        let prefix = mapping.specificity("/Groups/abc").unwrap();
        assert!(exact > prefix);
        assert!(mapping.specificity("/Users").is_none());
    }
}
