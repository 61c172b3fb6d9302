use crate::connection::ConnectionContext;
use crate::error::{Result, missing};
use async_trait::async_trait;

/// Source of the access token sent as `Authorization: bearer <token>`
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The current access token, without the `bearer` prefix
    async fn token(&self, context: &ConnectionContext) -> Result<String>;

    /// Called after the server rejected the token with `401 Unauthorized`
    async fn invalidate(&self, _context: &ConnectionContext) {}
}

/// A fixed, externally obtained access token
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Accepts the raw token or a full `bearer <token>` header value
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = strip_bearer(&token).trim().to_string();
        if token.is_empty() {
            return Err(missing("token"));
        }
        Ok(Self { token })
    }
}

fn strip_bearer(token: &str) -> &str {
    match token.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
        _ => token,
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _context: &ConnectionContext) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn invalidate(&self, context: &ConnectionContext) {
        tracing::warn!(
            "Static token for {} was rejected and cannot be refreshed",
            context.api_root()
        );
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}
