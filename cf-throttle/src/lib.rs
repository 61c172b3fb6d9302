//! # cf-throttle
//!
//! Client-side request throttling for Cloud Foundry UAA limiter mappings.
//!
//! ## Overview
//!
//! A UAA server can rate limit its endpoints per path. When a client knows
//! those limits it can hold back calls instead of collecting `429` replies.
//! This crate keeps the bookkeeping for that:
//! - **Limiter mappings**: a name, a window in seconds, a call limit and
//!   one or more path selectors
//! - **Sliding windows**: a call counts against its limiter from the moment
//!   it is dispatched until one time base later
//! - **Delay hints**: a delayed call learns when the next slot frees up
//!
//! ## Quick Start
//!
//! ```
//! use cf_throttle::{Admission, LimiterMapping, PathSelector, Throttler};
//! use std::time::Instant;
//!
//! let mut throttler = Throttler::new();
//! throttler.add_limiter_mapping(
//!     LimiterMapping::builder()
//!         .name("groups")
//!         .time_base(1)
//!         .limit(2)
//!         .path_selector(PathSelector::starts_with("/Groups"))
//!         .build()?,
//! )?;
//!
//! match throttler.try_acquire("/Groups/abc", Instant::now()) {
//!     Admission::Granted(permit) => {
//!         // dispatch the request, then start its window
//!         throttler.activate(permit, Instant::now());
//!     }
//!     Admission::Delayed(delay) => {
//!         println!("retry in {:?}", delay.retry_after);
//!     }
//!     Admission::Unthrottled => {}
//! }
//! # Ok::<(), cf_throttle::ThrottleError>(())
//! ```
//!
//! ## Path Selectors
//!
//! Selectors use the UAA configuration syntax:
//!
//! ```
//! use cf_throttle::{PathMatchType, PathSelector};
//!
//! let selector: PathSelector = "equals:/Users".parse()?;
//! assert_eq!(selector.match_type(), PathMatchType::Equals);
//! # Ok::<(), cf_throttle::ThrottleError>(())
//! ```
//!
//! When several mappings match a path, the most specific selector wins:
//! `equals` before `startsWith` before `contains` before `all`, longer
//! selector paths before shorter ones, earlier registrations on ties.
//!
//! ## Thread Safety
//!
//! The throttler is not thread-safe. For concurrent access, wrap it in a mutex:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use cf_throttle::Throttler;
//!
//! let throttler = Arc::new(Mutex::new(Throttler::new()));
//! ```
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for the per-limiter call windows

pub mod core;

pub use core::{
    Admission, Delay, DelayCheck, LimiterMapping, LimiterMappingBuilder, LimiterStatus,
    PathMatchType, PathSelector, Permit, Quota, Specificity, ThrottleError, Throttler,
};
