//! Entry points for the Cloud Controller, UAA and Doppler APIs

use crate::connection::ConnectionContext;
use crate::doppler::Doppler;
use crate::error::Result;
use crate::operations::Operations;
use crate::token::TokenProvider;
use crate::uaa::{Groups, RateLimit, Tokens};
use crate::v2::{Organizations, ServiceBrokers, ServiceInstances, Spaces};
use crate::v3::{Jobs, Packages, Processes, ServiceOfferings};
use std::sync::Arc;
use url::Url;

/// Cloud Controller client
///
/// # Example
///
/// ```no_run
/// # async fn example() -> cf_client::Result<()> {
/// use cf_client::{CloudFoundryClient, ConnectionContext, StaticTokenProvider};
/// use std::sync::Arc;
///
/// let context = ConnectionContext::builder()
///     .api_host("api.run.example.com")
///     .build()?;
/// let client = CloudFoundryClient::new(context, Arc::new(StaticTokenProvider::new("token")?));
///
/// let organizations = client.organizations().list_all(&Default::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CloudFoundryClient {
    ops: Operations,
}

impl CloudFoundryClient {
    pub fn new(context: ConnectionContext, token_provider: Arc<dyn TokenProvider>) -> Self {
        let root = context.api_root().clone();
        Self {
            ops: Operations::new(context, root, token_provider),
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        self.ops.context()
    }

    pub fn organizations(&self) -> Organizations {
        Organizations::new(self.ops.clone())
    }

    pub fn spaces(&self) -> Spaces {
        Spaces::new(self.ops.clone())
    }

    pub fn service_brokers(&self) -> ServiceBrokers {
        ServiceBrokers::new(self.ops.clone())
    }

    pub fn service_instances(&self) -> ServiceInstances {
        ServiceInstances::new(self.ops.clone())
    }

    pub fn packages(&self) -> Packages {
        Packages::new(self.ops.clone())
    }

    pub fn processes(&self) -> Processes {
        Processes::new(self.ops.clone())
    }

    pub fn service_offerings(&self) -> ServiceOfferings {
        ServiceOfferings::new(self.ops.clone())
    }

    pub fn jobs(&self) -> Jobs {
        Jobs::new(self.ops.clone())
    }
}

/// UAA client; every request passes the context's throttle
#[derive(Debug, Clone)]
pub struct UaaClient {
    ops: Operations,
}

impl UaaClient {
    /// Creates a client for the UAA advertised by the Cloud Controller
    pub async fn new(context: ConnectionContext, token_provider: Arc<dyn TokenProvider>) -> Result<Self> {
        let root = context.token_endpoint().await?.clone();
        tracing::debug!("Using UAA at {}", root);
        Ok(Self::with_root(context, root, token_provider))
    }

    pub fn with_root(context: ConnectionContext, root: Url, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            ops: Operations::new(context, root, token_provider).throttled(),
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        self.ops.context()
    }

    pub fn root(&self) -> &Url {
        self.ops.root()
    }

    pub fn groups(&self) -> Groups {
        Groups::new(self.ops.clone())
    }

    pub fn tokens(&self) -> Tokens {
        Tokens::new(self.ops.clone())
    }

    pub fn rate_limit(&self) -> RateLimit {
        RateLimit::new(self.ops.clone())
    }
}

#[derive(Debug, Clone)]
pub struct DopplerClient {
    ops: Operations,
}

impl DopplerClient {
    /// Creates a client for the Doppler advertised by the Cloud Controller
    pub async fn new(context: ConnectionContext, token_provider: Arc<dyn TokenProvider>) -> Result<Self> {
        let root = context.doppler_endpoint().await?.clone();
        tracing::debug!("Using Doppler at {}", root);
        Ok(Self::with_root(context, root, token_provider))
    }

    pub fn with_root(context: ConnectionContext, root: Url, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            ops: Operations::new(context, root, token_provider),
        }
    }

    pub fn root(&self) -> &Url {
        self.ops.root()
    }

    pub fn doppler(&self) -> Doppler {
        Doppler::new(self.ops.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::StaticTokenProvider;

    fn context() -> ConnectionContext {
        ConnectionContext::builder()
            .api_host("api.example.com")
            .build()
            .unwrap()
    }

    #[test]
    fn test_uaa_client_is_throttled() {
        let client = UaaClient::with_root(
            context(),
            Url::parse("https://uaa.example.com").unwrap(),
            Arc::new(StaticTokenProvider::new("token").unwrap()),
        );
        assert!(format!("{:?}", client).contains("throttled: true"));
        assert_eq!(client.root().host_str(), Some("uaa.example.com"));
    }

    #[test]
    fn test_cloud_foundry_client_uses_api_root() {
        let client = CloudFoundryClient::new(
            context(),
            Arc::new(StaticTokenProvider::new("token").unwrap()),
        );
        assert!(format!("{:?}", client).contains("throttled: false"));
        assert_eq!(client.context().api_root().host_str(), Some("api.example.com"));
    }
}
