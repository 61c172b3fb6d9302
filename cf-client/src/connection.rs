//! Connection context shared by all clients of one Cloud Foundry installation
//!
//! A [`ConnectionContext`] owns the HTTP connection pool, the API root, the
//! discovered UAA and Doppler roots and the [`UaaThrottle`]. It is cheap to
//! clone; clones share everything.

use crate::error::{ClientError, Result, missing};
use crate::throttle::UaaThrottle;
use cf_throttle::LimiterMapping;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

const USER_AGENT: &str = concat!("cf-client-rs/", env!("CARGO_PKG_VERSION"));

/// HTTP proxy used for every connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfiguration {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfiguration {
    fn url(&self) -> String {
        match self.port {
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        }
    }
}

/// Endpoints advertised by `GET /v2/info`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Info {
    pub name: Option<String>,
    pub build: Option<String>,
    pub support: Option<String>,
    pub version: Option<u32>,
    pub description: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub min_cli_version: Option<String>,
    pub min_recommended_cli_version: Option<String>,
    pub api_version: Option<String>,
    pub app_ssh_endpoint: Option<String>,
    pub app_ssh_host_key_fingerprint: Option<String>,
    pub app_ssh_oauth_client: Option<String>,
    pub doppler_logging_endpoint: Option<String>,
    pub routing_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RootLinks {
    links: std::collections::HashMap<String, Option<RootLink>>,
}

#[derive(Debug, Deserialize)]
struct RootLink {
    href: String,
}

/// Builder for [`ConnectionContext`]
#[derive(Debug)]
pub struct ConnectionContextBuilder {
    api_host: Option<String>,
    port: Option<u16>,
    secure: bool,
    skip_ssl_validation: bool,
    proxy: Option<ProxyConfiguration>,
    connect_timeout: Duration,
    request_timeout: Duration,
    request_tags: Vec<(String, String)>,
    uaa_limits: Vec<LimiterMapping>,
    token_endpoint: Option<Url>,
    doppler_endpoint: Option<Url>,
}

impl Default for ConnectionContextBuilder {
    fn default() -> Self {
        Self {
            api_host: None,
            port: None,
            secure: true,
            skip_ssl_validation: false,
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            request_tags: Vec::new(),
            uaa_limits: Vec::new(),
            token_endpoint: None,
            doppler_endpoint: None,
        }
    }
}

impl ConnectionContextBuilder {
    /// API host name, without scheme (e.g. `api.sys.example.com`)
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Use `https` (default) or plain `http`
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn skip_ssl_validation(mut self, skip: bool) -> Self {
        self.skip_ssl_validation = skip;
        self
    }

    pub fn proxy(mut self, proxy: ProxyConfiguration) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Header added to every request
    pub fn request_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_tags.push((name.into(), value.into()));
        self
    }

    /// Client-side limit for UAA requests
    pub fn uaa_limit(mut self, mapping: LimiterMapping) -> Self {
        self.uaa_limits.push(mapping);
        self
    }

    /// Skip UAA root discovery and use this endpoint
    pub fn token_endpoint(mut self, endpoint: Url) -> Self {
        self.token_endpoint = Some(endpoint);
        self
    }

    /// Skip Doppler root discovery and use this endpoint
    pub fn doppler_endpoint(mut self, endpoint: Url) -> Self {
        self.doppler_endpoint = Some(endpoint);
        self
    }

    pub fn build(self) -> Result<ConnectionContext> {
        let host = match self.api_host {
            Some(host) if !host.trim().is_empty() => host,
            _ => return Err(missing("api host")),
        };

        let scheme = if self.secure { "https" } else { "http" };
        let api_root = match self.port {
            Some(port) => Url::parse(&format!("{scheme}://{host}:{port}"))?,
            None => Url::parse(&format!("{scheme}://{host}"))?,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &self.request_tags {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Validation(format!("invalid request tag {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Validation(format!("invalid request tag value {value}: {e}")))?;
            headers.insert(name, value);
        }

        let mut http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(self.skip_ssl_validation);

        if let Some(proxy) = &self.proxy {
            let mut reqwest_proxy = reqwest::Proxy::all(proxy.url())?;
            if let (Some(username), Some(password)) = (&proxy.username, &proxy.password) {
                reqwest_proxy = reqwest_proxy.basic_auth(username, password);
            }
            http = http.proxy(reqwest_proxy);
        }

        let throttle = UaaThrottle::new();
        for mapping in self.uaa_limits {
            throttle.add_limiter_mapping(mapping)?;
        }

        if self.skip_ssl_validation {
            tracing::warn!("SSL validation is disabled for {}", api_root);
        }

        Ok(ConnectionContext {
            inner: Arc::new(ContextInner {
                api_root,
                skip_ssl_validation: self.skip_ssl_validation,
                proxy: self.proxy,
                http: http.build()?,
                info: OnceCell::new(),
                token_endpoint: OnceCell::new_with(self.token_endpoint),
                doppler_endpoint: OnceCell::new_with(self.doppler_endpoint),
                throttle: Arc::new(throttle),
            }),
        })
    }
}

struct ContextInner {
    api_root: Url,
    skip_ssl_validation: bool,
    proxy: Option<ProxyConfiguration>,
    http: reqwest::Client,
    info: OnceCell<Info>,
    token_endpoint: OnceCell<Url>,
    doppler_endpoint: OnceCell<Url>,
    throttle: Arc<UaaThrottle>,
}

/// Shared connection state for one Cloud Foundry installation
#[derive(Clone)]
pub struct ConnectionContext {
    inner: Arc<ContextInner>,
}

impl ConnectionContext {
    pub fn builder() -> ConnectionContextBuilder {
        ConnectionContextBuilder::default()
    }

    pub fn api_root(&self) -> &Url {
        &self.inner.api_root
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub fn throttle(&self) -> &Arc<UaaThrottle> {
        &self.inner.throttle
    }

    pub fn skip_ssl_validation(&self) -> bool {
        self.inner.skip_ssl_validation
    }

    pub fn proxy(&self) -> Option<&ProxyConfiguration> {
        self.inner.proxy.as_ref()
    }

    /// `GET /v2/info`, fetched once per context
    pub async fn info(&self) -> Result<&Info> {
        self.inner
            .info
            .get_or_try_init(|| async {
                let url = self.inner.api_root.join("v2/info")?;
                self.get_unauthenticated::<Info>(url).await
            })
            .await
    }

    /// Root of the UAA, discovered from the `token_endpoint` of `/v2/info`
    pub async fn token_endpoint(&self) -> Result<&Url> {
        self.inner
            .token_endpoint
            .get_or_try_init(|| async {
                let endpoint = self
                    .info()
                    .await?
                    .token_endpoint
                    .as_deref()
                    .ok_or_else(|| missing("token endpoint"))?;
                Ok::<_, ClientError>(Url::parse(endpoint)?)
            })
            .await
    }

    /// Root of Doppler, discovered from `links.logging` of `GET /`
    ///
    /// The advertised websocket scheme is mapped onto its HTTP counterpart.
    pub async fn doppler_endpoint(&self) -> Result<&Url> {
        self.inner
            .doppler_endpoint
            .get_or_try_init(|| async {
                let root = self
                    .get_unauthenticated::<RootLinks>(self.inner.api_root.clone())
                    .await?;
                let href = root
                    .links
                    .get("logging")
                    .and_then(|link| link.as_ref())
                    .map(|link| link.href.as_str())
                    .ok_or_else(|| missing("logging link"))?;
                http_root(href)
            })
            .await
    }

    async fn get_unauthenticated<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(target: "cloudfoundry_client::request", "GET {}", url);
        let response = self.inner.http.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!(target: "cloudfoundry_client::response", "{} {}", status.as_u16(), url);

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::from_payload(status.as_u16(), Vec::new(), &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("api_root", &self.inner.api_root.as_str())
            .field("skip_ssl_validation", &self.inner.skip_ssl_validation)
            .field("proxy", &self.inner.proxy)
            .finish()
    }
}

fn http_root(href: &str) -> Result<Url> {
    let mut url = Url::parse(href)?;
    let scheme = match url.scheme() {
        "wss" => "https",
        "ws" => "http",
        _ => return Ok(url),
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::Validation(format!("unsupported logging endpoint {href}")))?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_throttle::PathSelector;

    #[test]
    fn test_api_root() {
        let context = ConnectionContext::builder()
            .api_host("api.example.com")
            .build()
            .unwrap();
        assert_eq!(context.api_root().as_str(), "https://api.example.com/");

        let context = ConnectionContext::builder()
            .api_host("localhost")
            .port(8080)
            .secure(false)
            .build()
            .unwrap();
        assert_eq!(context.api_root().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_missing_host() {
        let err = ConnectionContext::builder().build().unwrap_err();
        assert_eq!(err.to_string(), "api host must be specified");
    }

    #[test]
    fn test_invalid_request_tag() {
        let err = ConnectionContext::builder()
            .api_host("api.example.com")
            .request_tag("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_duplicate_limiters_rejected() {
        let mapping = LimiterMapping::builder()
            .name("groups")
            .time_base(1)
            .limit(1)
            .path_selector(PathSelector::all())
            .build()
            .unwrap();
        let err = ConnectionContext::builder()
            .api_host("api.example.com")
            .uaa_limit(mapping.clone())
            .uaa_limit(mapping)
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Throttle(_)));
    }

    #[test]
    fn test_websocket_roots_map_to_http() {
        assert_eq!(
            http_root("wss://doppler.example.com:443").unwrap().as_str(),
            "https://doppler.example.com/"
        );
        assert_eq!(
            http_root("ws://localhost:8081").unwrap().as_str(),
            "http://localhost:8081/"
        );
        assert_eq!(
            http_root("https://doppler.example.com").unwrap().as_str(),
            "https://doppler.example.com/"
        );
    }

    #[tokio::test]
    async fn test_endpoint_overrides_skip_discovery() {
        let endpoint = Url::parse("https://uaa.example.com").unwrap();
        let context = ConnectionContext::builder()
            .api_host("api.example.com")
            .token_endpoint(endpoint.clone())
            .build()
            .unwrap();
        assert_eq!(context.token_endpoint().await.unwrap(), &endpoint);
    }
}
