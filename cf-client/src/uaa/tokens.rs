use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use serde::{Deserialize, Serialize};

/// OAuth client credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        require_non_empty(&self.client_id, "client id")?;
        require_non_empty(&self.client_secret, "client secret")
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    #[default]
    Jwt,
    Opaque,
}

impl TokenFormat {
    fn as_str(self) -> &'static str {
        match self {
            TokenFormat::Jwt => "jwt",
            TokenFormat::Opaque => "opaque",
        }
    }
}

/// Response of `POST /oauth/token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    /// Space separated scopes
    pub scope: Option<String>,
    pub jti: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

impl TokenResponse {
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Claims of a token, from `POST /check_token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTokenResponse {
    #[serde(default)]
    pub aud: Vec<String>,
    pub auth_time: Option<u64>,
    pub azp: Option<String>,
    pub cid: Option<String>,
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub exp: Option<u64>,
    pub grant_type: Option<String>,
    pub iat: Option<u64>,
    pub iss: Option<String>,
    pub jti: Option<String>,
    pub origin: Option<String>,
    pub rev_sig: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    pub sub: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub zid: Option<String>,
}

/// A token verification key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKey {
    pub alg: Option<String>,
    pub e: Option<String>,
    pub kid: Option<String>,
    pub kty: Option<String>,
    pub n: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// PEM encoded public key
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKeys {
    pub keys: Vec<TokenKey>,
}

/// Form of a token grant
struct Grant {
    pairs: Vec<(String, String)>,
}

impl Grant {
    fn new(grant_type: &str, credentials: &ClientCredentials, format: TokenFormat) -> Self {
        Self {
            pairs: vec![
                ("grant_type".into(), grant_type.into()),
                ("client_id".into(), credentials.client_id.clone()),
                ("client_secret".into(), credentials.client_secret.clone()),
                ("response_type".into(), "token".into()),
                ("token_format".into(), format.as_str().into()),
            ],
        }
    }

    fn with(mut self, name: &str, value: &str) -> Self {
        self.pairs.push((name.to_string(), value.to_string()));
        self
    }

    fn with_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokens {
    ops: Operations,
}

impl Tokens {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    /// Decodes and verifies `token`, authenticated as a resource server
    pub async fn check(
        &self,
        credentials: &ClientCredentials,
        token: &str,
        scopes: &[String],
    ) -> Result<CheckTokenResponse> {
        credentials.validate()?;
        require_non_empty(token, "token")?;

        let mut form = vec![("token".to_string(), token.to_string())];
        if !scopes.is_empty() {
            form.push(("scopes".to_string(), scopes.join(",")));
        }

        self.ops
            .post_form(
                &["check_token"],
                Params::new().basic_auth(&credentials.client_id, &credentials.client_secret),
                form,
            )
            .await
    }

    pub async fn get_by_client_credentials(
        &self,
        credentials: &ClientCredentials,
        format: TokenFormat,
    ) -> Result<TokenResponse> {
        credentials.validate()?;
        self.grant(Grant::new("client_credentials", credentials, format))
            .await
    }

    pub async fn get_by_password(
        &self,
        credentials: &ClientCredentials,
        username: &str,
        password: &str,
        format: TokenFormat,
    ) -> Result<TokenResponse> {
        credentials.validate()?;
        require_non_empty(username, "username")?;
        require_non_empty(password, "password")?;
        self.grant(
            Grant::new("password", credentials, format)
                .with("username", username)
                .with("password", password),
        )
        .await
    }

    pub async fn get_by_authorization_code(
        &self,
        credentials: &ClientCredentials,
        authorization_code: &str,
        redirect_uri: Option<&str>,
        format: TokenFormat,
    ) -> Result<TokenResponse> {
        credentials.validate()?;
        require_non_empty(authorization_code, "authorization code")?;
        self.grant(
            Grant::new("authorization_code", credentials, format)
                .with("code", authorization_code)
                .with_opt("redirect_uri", redirect_uri),
        )
        .await
    }

    pub async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
        format: TokenFormat,
    ) -> Result<TokenResponse> {
        credentials.validate()?;
        require_non_empty(refresh_token, "refresh token")?;
        self.grant(
            Grant::new("refresh_token", credentials, format).with("refresh_token", refresh_token),
        )
        .await
    }

    /// The key tokens are signed with
    pub async fn get_key(&self) -> Result<TokenKey> {
        self.ops
            .get(&["token_key"], Params::new().no_auth())
            .await
    }

    pub async fn list_keys(&self) -> Result<TokenKeys> {
        self.ops
            .get(&["token_keys"], Params::new().no_auth())
            .await
    }

    async fn grant(&self, grant: Grant) -> Result<TokenResponse> {
        self.ops
            .post_form(&["oauth", "token"], Params::new().no_auth(), grant.pairs)
            .await
    }
}
