//! # cf-stub-server
//!
//! A stub Cloud Controller / UAA server for exercising Cloud Foundry clients
//! without a real foundation.
//!
//! ## What It Does
//!
//! - **Canned interactions**: `(method, path[?query]) → (status, headers, body, latency)`
//! - **Request recording**: every received request is kept for assertions
//! - **UAA rate limiting**: limiter mappings are enforced server side and
//!   requests over quota get `429 Too Many Requests`
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve fixtures and limit /Groups to 2 calls per second
//! cf-stub --fixtures fixtures.json --uaa-limit "groups;1;2;startsWith:/Groups"
//!
//! # List all available environment variables
//! cf-stub --list-env-vars
//! ```
//!
//! ## Architecture
//!
//! ```text
//!    HTTP request
//!         │
//!   ┌─────▼─────┐   admit   ┌─────────────┐
//!   │  Router   ├──────────►│    Actor    │
//!   │ (axum)    │◄──────────┤ (Throttler) │
//!   └─────┬─────┘  decision └─────────────┘
//!         │
//!   ┌─────▼────────┐
//!   │ Interactions │
//!   └──────────────┘
//! ```

pub mod actor;
pub mod config;
pub mod interaction;
pub mod metrics;
pub mod server;

pub use interaction::{Interaction, RecordedRequest, RequestMatcher, StubResponse};
pub use server::{RunningStub, StubServer, StubServerBuilder};
