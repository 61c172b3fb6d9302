use super::{PageRequest, V2, filter};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{PaginatedResponse, Resource};
use serde::{Deserialize, Serialize};

const SERVICE_BROKERS: &str = "service_brokers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBrokerEntity {
    pub name: String,
    pub broker_url: String,
    pub auth_username: Option<String>,
    pub space_guid: Option<String>,
}

pub type ServiceBrokerResource = Resource<ServiceBrokerEntity>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateServiceBrokerRequest {
    pub name: String,
    pub broker_url: String,
    pub auth_username: String,
    pub auth_password: String,
    /// Registers a space-scoped broker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_guid: Option<String>,
}

impl CreateServiceBrokerRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.name, "name")?;
        require_non_empty(&self.broker_url, "broker url")?;
        require_non_empty(&self.auth_username, "auth username")?;
        require_non_empty(&self.auth_password, "auth password")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateServiceBrokerRequest {
    #[serde(skip)]
    pub service_broker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_password: Option<String>,
}

impl UpdateServiceBrokerRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.service_broker_id, "service broker id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServiceBrokersRequest {
    pub names: Vec<String>,
    pub space_ids: Vec<String>,
    pub page: PageRequest,
}

impl ListServiceBrokersRequest {
    fn params(&self) -> Params {
        let params = filter(Params::new(), "name", &self.names);
        let params = filter(params, "space_guid", &self.space_ids);
        self.page.apply(params)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceBrokers {
    ops: Operations,
}

impl ServiceBrokers {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn create(&self, request: &CreateServiceBrokerRequest) -> Result<ServiceBrokerResource> {
        request.validate()?;
        self.ops
            .post(&[V2, SERVICE_BROKERS], Params::new(), request)
            .await
    }

    pub async fn get(&self, service_broker_id: &str) -> Result<ServiceBrokerResource> {
        require_non_empty(service_broker_id, "service broker id")?;
        self.ops
            .get(&[V2, SERVICE_BROKERS, service_broker_id], Params::new())
            .await
    }

    pub async fn list(
        &self,
        request: &ListServiceBrokersRequest,
    ) -> Result<PaginatedResponse<ServiceBrokerResource>> {
        self.ops.get(&[V2, SERVICE_BROKERS], request.params()).await
    }

    pub async fn update(&self, request: &UpdateServiceBrokerRequest) -> Result<ServiceBrokerResource> {
        request.validate()?;
        self.ops
            .put(
                &[V2, SERVICE_BROKERS, request.service_broker_id.as_str()],
                Params::new(),
                request,
            )
            .await
    }

    pub async fn delete(&self, service_broker_id: &str) -> Result<()> {
        require_non_empty(service_broker_id, "service broker id")?;
        self.ops
            .delete(&[V2, SERVICE_BROKERS, service_broker_id], Params::new())
            .await?;
        Ok(())
    }
}
