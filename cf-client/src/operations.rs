//! HTTP operation layer
//!
//! [`Operations`] turns path segments, [`Params`] and a body into a request
//! against one API root, attaches credentials, logs the exchange and maps
//! non-2xx responses onto [`ClientError`].
//!
//! Network logging uses the `cloudfoundry_client::request` and
//! `cloudfoundry_client::response` targets at debug level:
//!
//! ```bash
//! RUST_LOG=cloudfoundry_client::request=debug,cloudfoundry_client::response=debug
//! ```

use crate::connection::ConnectionContext;
use crate::error::{ClientError, Result};
use crate::token::TokenProvider;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, LOCATION};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

pub const WARNINGS_HEADER: &str = "X-Cf-Warnings";
pub const IDENTITY_ZONE_ID_HEADER: &str = "X-Identity-Zone-Id";
pub const IDENTITY_ZONE_SUBDOMAIN_HEADER: &str = "X-Identity-Zone-Subdomain";

/// How a request authenticates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: bearer <token>` from the token provider
    #[default]
    Bearer,
    /// HTTP Basic with OAuth client credentials
    Basic {
        client_id: String,
        client_secret: String,
    },
    None,
}

/// Query parameters, headers and authentication of one request
#[derive(Debug, Clone, Default)]
pub struct Params {
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    auth: Auth,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: &str, value: impl Display) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Comma separated list parameter (`names=a,b`), skipped when empty
    pub fn query_list(self, name: &str, values: &[String]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.query(name, values.join(","))
        }
    }

    pub fn header(mut self, name: &str, value: impl Display) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header_opt(self, name: &str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// `X-Identity-Zone-Id` for UAA requests
    pub fn identity_zone(self, zone_id: Option<&str>) -> Self {
        self.header_opt(IDENTITY_ZONE_ID_HEADER, zone_id)
    }

    /// `If-Match` with a resource version
    pub fn version(self, version: Option<&str>) -> Self {
        self.header_opt("If-Match", version)
    }

    pub fn basic_auth(mut self, client_id: &str, client_secret: &str) -> Self {
        self.auth = Auth::Basic {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        self
    }

    pub fn no_auth(mut self) -> Self {
        self.auth = Auth::None;
        self
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Request body
pub enum Body {
    Empty,
    Json(Vec<u8>),
    Form(Vec<(String, String)>),
    Multipart(reqwest::multipart::Form),
}

impl Body {
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self> {
        Ok(Body::Json(serde_json::to_vec(body)?))
    }
}

/// A successful response before decoding
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub warnings: Vec<String>,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Job id of an asynchronous operation (`202` with a `Location` of
    /// `.../v3/jobs/{guid}`)
    pub fn job_id(&self) -> Option<String> {
        if self.status != StatusCode::ACCEPTED {
            return None;
        }
        let location = self.headers.get(LOCATION)?.to_str().ok()?;
        job_id_from_location(location)
    }
}

fn job_id_from_location(location: &str) -> Option<String> {
    let (_, rest) = location.split_once("/v3/jobs/")?;
    let guid = rest.split(['/', '?']).next()?;
    (!guid.is_empty()).then(|| guid.to_string())
}

/// Decodes a JSON body; an empty body decodes like `null`
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Decodes the URL-encoded, comma separated `X-Cf-Warnings` header
pub fn decode_warnings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(WARNINGS_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|warning| !warning.is_empty())
        .map(|warning| {
            let plus_decoded = warning.replace('+', " ");
            match urlencoding::decode(&plus_decoded) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => warning.to_string(),
            }
        })
        .collect()
}

/// Issues requests against one API root
#[derive(Clone)]
pub struct Operations {
    context: ConnectionContext,
    root: Url,
    token_provider: Arc<dyn TokenProvider>,
    throttled: bool,
}

impl Operations {
    pub fn new(context: ConnectionContext, root: Url, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            context,
            root,
            token_provider,
            throttled: false,
        }
    }

    /// Route every request through the context's [`UaaThrottle`](crate::UaaThrottle)
    pub fn throttled(mut self) -> Self {
        self.throttled = true;
        self
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    /// Builds the request URI from path segments and query parameters
    ///
    /// Segments are percent-encoded individually.
    pub fn uri(&self, segments: &[&str], params: &Params) -> Result<Url> {
        let mut url = self.root.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.pop_if_empty().extend(segments);
        }
        if !params.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&params.query);
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str], params: Params) -> Result<T> {
        self.execute(Method::GET, segments, params, Body::Empty)
            .await?
            .json()
    }

    pub async fn get_bytes(&self, segments: &[&str], params: Params) -> Result<Bytes> {
        Ok(self.get_raw(segments, params).await?.body)
    }

    pub async fn get_raw(&self, segments: &[&str], params: Params) -> Result<RawResponse> {
        self.execute(Method::GET, segments, params, Body::Empty).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], params: Params, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::POST, segments, params, Body::json(body)?)
            .await?
            .json()
    }

    /// `application/x-www-form-urlencoded` POST
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: Params,
        form: Vec<(String, String)>,
    ) -> Result<T> {
        self.execute(Method::POST, segments, params, Body::Form(form))
            .await?
            .json()
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: Params,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        self.execute(Method::POST, segments, params, Body::Multipart(form))
            .await?
            .json()
    }

    pub async fn put<B, T>(&self, segments: &[&str], params: Params, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::PUT, segments, params, Body::json(body)?)
            .await?
            .json()
    }

    pub async fn patch<B, T>(&self, segments: &[&str], params: Params, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::PATCH, segments, params, Body::json(body)?)
            .await?
            .json()
    }

    /// DELETE without decoding, so callers can read a job `Location`
    pub async fn delete(&self, segments: &[&str], params: Params) -> Result<RawResponse> {
        self.execute(Method::DELETE, segments, params, Body::Empty)
            .await
    }

    pub async fn delete_with_body<B>(
        &self,
        segments: &[&str],
        params: Params,
        body: &B,
    ) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        self.execute(Method::DELETE, segments, params, Body::json(body)?)
            .await
    }

    /// Sends one request and returns the successful response
    pub async fn execute(
        &self,
        method: Method,
        segments: &[&str],
        params: Params,
        body: Body,
    ) -> Result<RawResponse> {
        let url = self.uri(segments, &params)?;

        let mut throttle_token = if self.throttled {
            let path = format!("/{}", segments.join("/"));
            Some(self.context.throttle().acquire(&path).await)
        } else {
            None
        };

        let mut request = self.context.http().request(method.clone(), url.clone());

        request = match &params.auth {
            Auth::Bearer => {
                let token = self.token_provider.token(&self.context).await?;
                request.header(AUTHORIZATION, format!("bearer {token}"))
            }
            Auth::Basic {
                client_id,
                client_secret,
            } => request.basic_auth(client_id, Some(client_secret)),
            Auth::None => request,
        };

        for (name, value) in &params.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match body {
            Body::Empty => request,
            Body::Json(bytes) => request
                .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(bytes),
            Body::Form(pairs) => request.form(&pairs),
            Body::Multipart(form) => request.multipart(form),
        };

        tracing::debug!(target: "cloudfoundry_client::request", "{} {}", method, url);

        if let Some(token) = throttle_token.as_mut() {
            token.activate();
        }
        let start = Instant::now();
        let response = request.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(
            target: "cloudfoundry_client::response",
            "{} {} {} ({} ms)",
            status.as_u16(),
            method,
            url,
            start.elapsed().as_millis()
        );

        let warnings = decode_warnings(&headers);
        for warning in &warnings {
            tracing::warn!(target: "cloudfoundry_client::response", "{}", warning);
        }

        if status.is_success() {
            return Ok(RawResponse {
                status,
                headers,
                body,
                warnings,
            });
        }

        match status {
            StatusCode::UNAUTHORIZED => self.token_provider.invalidate(&self.context).await,
            StatusCode::TOO_MANY_REQUESTS => tracing::warn!(
                "Rate limited on {} {} (Retry-After: {})",
                method,
                url,
                headers
                    .get("Retry-After")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-")
            ),
            _ => {}
        }

        Err(ClientError::from_payload(status.as_u16(), warnings, &body))
    }
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("root", &self.root.as_str())
            .field("throttled", &self.throttled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticTokenProvider;
    use reqwest::header::HeaderValue;

    fn operations(root: &str) -> Operations {
        let context = ConnectionContext::builder()
            .api_host("api.example.com")
            .build()
            .unwrap();
        Operations::new(
            context,
            Url::parse(root).unwrap(),
            Arc::new(StaticTokenProvider::new("token").unwrap()),
        )
    }

    #[test]
    fn test_uri_encodes_segments_and_query() {
        let ops = operations("https://uaa.example.com");
        let url = ops
            .uri(
                &["Groups", "External", "displayName", "my group"],
                &Params::new().query("filter", "displayName eq \"x\""),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://uaa.example.com/Groups/External/displayName/my%20group?filter=displayName+eq+%22x%22"
        );
    }

    #[test]
    fn test_uri_keeps_root_path() {
        let ops = operations("https://login.example.com/uaa/");
        let url = ops.uri(&["oauth", "token"], &Params::new()).unwrap();
        assert_eq!(url.as_str(), "https://login.example.com/uaa/oauth/token");
    }

    #[test]
    fn test_params() {
        let params = Params::new()
            .query_opt("page", Some(2))
            .query_opt("per_page", None::<u32>)
            .query_list("names", &["a".to_string(), "b".to_string()])
            .query_list("guids", &[])
            .identity_zone(Some("zone-1"))
            .version(None);
        assert_eq!(
            params.query_pairs(),
            [
                ("page".to_string(), "2".to_string()),
                ("names".to_string(), "a,b".to_string())
            ]
        );
        assert_eq!(params.headers.len(), 1);
        assert_eq!(params.auth, Auth::Bearer);
        assert!(matches!(
            Params::new().basic_auth("id", "secret").auth,
            Auth::Basic { .. }
        ));
    }

    #[test]
    fn test_decode_warnings() {
        let mut headers = HeaderMap::new();
        headers.insert(
            WARNINGS_HEADER,
            HeaderValue::from_static("Something+went+wrong,100%25+done"),
        );
        assert_eq!(
            decode_warnings(&headers),
            ["Something went wrong", "100% done"]
        );
        assert!(decode_warnings(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn test_empty_body_decodes_to_unit() {
        let _: () = decode(b"").unwrap();
        let value: Option<u32> = decode(b"  ").unwrap();
        assert_eq!(value, None);
        let value: u32 = decode(b"7").unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_job_id_from_location() {
        assert_eq!(
            job_id_from_location("https://api.example.com/v3/jobs/abc-123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(
            job_id_from_location("/v3/jobs/abc-123?x=1").as_deref(),
            Some("abc-123")
        );
        assert_eq!(job_id_from_location("https://api.example.com/v3/apps/1"), None);
    }
}
