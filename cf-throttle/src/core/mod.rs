//! Core components of the cf-throttle library
//!
//! This module contains the building blocks:
//! - [`selector`]: Path selectors and match specificity
//! - [`mapping`]: Named limiter mappings with a quota per time window
//! - [`throttler`]: The sliding-window throttler deciding admission

pub mod mapping;
pub mod selector;
pub mod throttler;
mod window;

pub use mapping::{LimiterMapping, LimiterMappingBuilder, Quota};
pub use selector::{PathMatchType, PathSelector, Specificity};
pub use throttler::{Admission, Delay, DelayCheck, LimiterStatus, Permit, Throttler};

use std::error::Error;
use std::fmt;

/// Errors raised while configuring the throttler
///
/// # Example
///
/// ```
/// use cf_throttle::{LimiterMapping, ThrottleError};
///
/// match LimiterMapping::builder().time_base(1).limit(5).build() {
///     Err(ThrottleError::MissingField(field)) => assert_eq!(field, "name"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleError {
    /// A required mapping field was not set
    MissingField(&'static str),
    /// The time base must be at least one second
    InvalidTimeBase(u32),
    /// The limit must be positive or -1
    InvalidLimit(i64),
    /// A selector string could not be parsed
    InvalidSelector(String),
    /// A mapping with this name is already registered
    DuplicateLimiter(String),
}

impl fmt::Display for ThrottleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrottleError::MissingField(field) => write!(f, "{field} must be specified"),
            ThrottleError::InvalidTimeBase(n) => {
                write!(f, "time base must be at least 1 second, got {n}")
            }
            ThrottleError::InvalidLimit(n) => write!(f, "limit must be positive or -1, got {n}"),
            ThrottleError::InvalidSelector(s) => write!(f, "invalid path selector: {s}"),
            ThrottleError::DuplicateLimiter(name) => {
                write!(f, "limiter {name} is already registered")
            }
        }
    }
}

impl Error for ThrottleError {}
