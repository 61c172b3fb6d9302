//! Async client library for Cloud Foundry
//!
//! This crate talks to the Cloud Controller (v2 and v3), the UAA and Doppler
//! over HTTP. All clients of one installation share a [`ConnectionContext`]
//! holding the connection pool and the [`UaaThrottle`], which delays UAA
//! requests so they stay within configured per-path rate limits.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> cf_client::Result<()> {
//! use cf_client::uaa::groups::ListGroupsRequest;
//! use cf_client::{ConnectionContext, LimiterMapping, PathSelector, StaticTokenProvider, UaaClient};
//! use std::sync::Arc;
//!
//! let groups_limit = LimiterMapping::builder()
//!     .name("groups")
//!     .time_base(1)
//!     .limit(10)
//!     .path_selector(PathSelector::starts_with("/Groups"))
//!     .build()?;
//! let context = ConnectionContext::builder()
//!     .api_host("api.run.example.com")
//!     .uaa_limit(groups_limit)
//!     .build()?;
//! let uaa = UaaClient::new(context, Arc::new(StaticTokenProvider::new("token")?)).await?;
//!
//! let groups = uaa.groups().list(&ListGroupsRequest::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod doppler;
pub mod error;
pub mod operations;
pub mod pagination;
pub mod throttle;
pub mod token;
pub mod uaa;
pub mod v2;
pub mod v3;

pub use client::{CloudFoundryClient, DopplerClient, UaaClient};
pub use config::ClientConfig;
pub use connection::{ConnectionContext, ConnectionContextBuilder, ProxyConfiguration};
pub use error::{ClientError, Result, V3Error};
pub use throttle::{ThrottleToken, UaaThrottle};
pub use token::{StaticTokenProvider, TokenProvider};

// Re-export the throttle core types used in configuration
pub use cf_throttle::{LimiterMapping, LimiterStatus, PathSelector, Quota};
