//! Client configuration
//!
//! [`ClientConfig`] is loaded with the `config` crate from an optional file
//! and `CF_`-prefixed environment variables, environment taking precedence.
//!
//! # Example
//!
//! ```toml
//! api_host = "api.sys.example.com"
//! skip_ssl_validation = true
//! request_timeout_secs = 30
//!
//! [request_tags]
//! X-Request-Source = "nightly-sync"
//!
//! [[uaa_limits]]
//! name = "groups"
//! time_base = 1
//! limit = 2
//! path_selectors = ["startsWith:/Groups"]
//! ```
//!
//! ```bash
//! export CF_API_HOST=api.sys.example.com
//! export CF_PROXY_HOST=proxy.internal
//! export CF_PROXY_PORT=3128
//! ```

use crate::connection::{ConnectionContext, ConnectionContextBuilder, ProxyConfiguration};
use crate::error::{Result, missing};
use cf_throttle::{LimiterMapping, PathSelector};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for client settings
pub const ENV_PREFIX: &str = "CF";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_host: String,
    pub api_port: Option<u16>,
    pub secure: bool,
    pub skip_ssl_validation: bool,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Extra headers sent with every request
    ///
    /// Keys loaded through [`ClientConfig::load`] come back lowercased, which
    /// is harmless since header names are case-insensitive.
    pub request_tags: BTreeMap<String, String>,
    pub uaa_limits: Vec<LimiterConfig>,
}

/// A UAA limiter mapping in configuration form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimiterConfig {
    pub name: String,
    pub time_base: u32,
    pub limit: i64,
    /// Selectors in UAA notation, e.g. `startsWith:/Groups`
    pub path_selectors: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: String::new(),
            api_port: None,
            secure: true,
            skip_ssl_validation: false,
            proxy_host: None,
            proxy_port: None,
            proxy_username: None,
            proxy_password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            request_tags: BTreeMap::new(),
            uaa_limits: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration from `file` (if any) and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, environment())
    }

    fn load_from(file: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }

        let config = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<ClientConfig>()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_host.trim().is_empty() {
            return Err(missing("api host"));
        }
        if self.proxy_port.is_some() && self.proxy_host.is_none() {
            return Err(missing("proxy host"));
        }
        self.limiter_mappings()?;
        Ok(())
    }

    pub fn limiter_mappings(&self) -> Result<Vec<LimiterMapping>> {
        self.uaa_limits
            .iter()
            .map(LimiterConfig::to_mapping)
            .collect()
    }

    /// A context builder pre-filled from this configuration
    pub fn context_builder(&self) -> Result<ConnectionContextBuilder> {
        let mut builder = ConnectionContext::builder()
            .api_host(&self.api_host)
            .secure(self.secure)
            .skip_ssl_validation(self.skip_ssl_validation)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs));

        if let Some(port) = self.api_port {
            builder = builder.port(port);
        }

        if let Some(host) = &self.proxy_host {
            builder = builder.proxy(ProxyConfiguration {
                host: host.clone(),
                port: self.proxy_port,
                username: self.proxy_username.clone(),
                password: self.proxy_password.clone(),
            });
        }

        for (name, value) in &self.request_tags {
            builder = builder.request_tag(name, value);
        }

        for mapping in self.limiter_mappings()? {
            builder = builder.uaa_limit(mapping);
        }

        Ok(builder)
    }

    pub fn connection_context(&self) -> Result<ConnectionContext> {
        self.context_builder()?.build()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

impl LimiterConfig {
    pub fn to_mapping(&self) -> Result<LimiterMapping> {
        let selectors = self
            .path_selectors
            .iter()
            .map(|selector| selector.parse::<PathSelector>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LimiterMapping::builder()
            .name(&self.name)
            .time_base(self.time_base)
            .limit(self.limit)
            .path_selectors(selectors)
            .build()?)
    }
}
