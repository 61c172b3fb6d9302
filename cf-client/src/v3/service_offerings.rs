use super::{Links, Metadata, PageRequest, ToOneRelationship, V3};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{ListResponse, request_all_v3};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SERVICE_OFFERINGS: &str = "service_offerings";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub plan_updateable: Option<bool>,
    pub bindable: Option<bool>,
    pub instances_retrievable: Option<bool>,
    pub bindings_retrievable: Option<bool>,
    pub allow_context_updates: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerCatalog {
    pub id: String,
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub features: Features,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOfferingRelationships {
    #[serde(default)]
    pub service_broker: ToOneRelationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub guid: String,
    pub name: String,
    pub description: Option<String>,
    pub available: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    pub shareable: Option<bool>,
    pub documentation_url: Option<String>,
    pub broker_catalog: Option<BrokerCatalog>,
    #[serde(default)]
    pub relationships: ServiceOfferingRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServiceOfferingsRequest {
    pub names: Vec<String>,
    pub available: Option<bool>,
    pub service_broker_ids: Vec<String>,
    pub service_broker_names: Vec<String>,
    pub space_ids: Vec<String>,
    pub organization_ids: Vec<String>,
    pub page: PageRequest,
}

impl ListServiceOfferingsRequest {
    fn params(&self, page: Option<u32>) -> Params {
        let params = Params::new()
            .query_list("names", &self.names)
            .query_opt("available", self.available)
            .query_list("service_broker_guids", &self.service_broker_ids)
            .query_list("service_broker_names", &self.service_broker_names)
            .query_list("space_guids", &self.space_ids)
            .query_list("organization_guids", &self.organization_ids);
        self.page.apply(params, page)
    }
}

/// Only the metadata of a service offering can be updated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateServiceOfferingRequest {
    #[serde(skip)]
    pub service_offering_id: String,
    pub metadata: Metadata,
}

impl UpdateServiceOfferingRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.service_offering_id, "service offering id")
    }
}

#[derive(Debug, Clone)]
pub struct ServiceOfferings {
    ops: Operations,
}

impl ServiceOfferings {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn get(&self, service_offering_id: &str) -> Result<ServiceOffering> {
        require_non_empty(service_offering_id, "service offering id")?;
        self.ops
            .get(&[V3, SERVICE_OFFERINGS, service_offering_id], Params::new())
            .await
    }

    pub async fn list(
        &self,
        request: &ListServiceOfferingsRequest,
    ) -> Result<ListResponse<ServiceOffering>> {
        self.ops
            .get(&[V3, SERVICE_OFFERINGS], request.params(None))
            .await
    }

    pub async fn list_all(
        &self,
        request: &ListServiceOfferingsRequest,
    ) -> Result<Vec<ServiceOffering>> {
        request_all_v3(|page| {
            self.ops
                .get(&[V3, SERVICE_OFFERINGS], request.params(Some(page)))
        })
        .await
    }

    pub async fn update(&self, request: &UpdateServiceOfferingRequest) -> Result<ServiceOffering> {
        request.validate()?;
        self.ops
            .patch(
                &[V3, SERVICE_OFFERINGS, request.service_offering_id.as_str()],
                Params::new(),
                request,
            )
            .await
    }

    /// `purge` removes the offering without contacting its broker
    pub async fn delete(&self, service_offering_id: &str, purge: bool) -> Result<()> {
        require_non_empty(service_offering_id, "service offering id")?;
        self.ops
            .delete(
                &[V3, SERVICE_OFFERINGS, service_offering_id],
                Params::new().query_opt("purge", purge.then_some(true)),
            )
            .await?;
        Ok(())
    }
}
