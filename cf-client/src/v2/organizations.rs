use super::{DeleteOptions, JobResource, PageRequest, V2, filter};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{PaginatedResponse, Resource, request_all_v2};
use serde::{Deserialize, Serialize};

const ORGANIZATIONS: &str = "organizations";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntity {
    pub name: String,
    pub billing_enabled: Option<bool>,
    pub quota_definition_guid: Option<String>,
    pub status: Option<String>,
    pub default_isolation_segment_guid: Option<String>,
    pub quota_definition_url: Option<String>,
    pub spaces_url: Option<String>,
    pub domains_url: Option<String>,
    pub private_domains_url: Option<String>,
    pub users_url: Option<String>,
    pub managers_url: Option<String>,
    pub billing_managers_url: Option<String>,
    pub auditors_url: Option<String>,
    pub app_events_url: Option<String>,
    pub space_quota_definitions_url: Option<String>,
}

pub type OrganizationResource = Resource<OrganizationEntity>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_definition_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl CreateOrganizationRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.name, "name")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOrganizationRequest {
    #[serde(skip)]
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_definition_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_isolation_segment_guid: Option<String>,
}

impl UpdateOrganizationRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.organization_id, "organization id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOrganizationsRequest {
    pub names: Vec<String>,
    pub statuses: Vec<String>,
    pub page: PageRequest,
}

impl ListOrganizationsRequest {
    fn params(&self, page: Option<u32>) -> Params {
        let params = filter(Params::new(), "name", &self.names);
        let params = filter(params, "status", &self.statuses);
        let mut paging = self.page.clone();
        if page.is_some() {
            paging.page = page;
        }
        paging.apply(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub guid: String,
    pub name: String,
    pub app_count: Option<u32>,
    pub service_count: Option<u32>,
    pub mem_dev_total: Option<u64>,
    pub mem_prod_total: Option<u64>,
}

/// `GET /v2/organizations/{guid}/summary`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub guid: String,
    pub name: String,
    pub status: Option<String>,
    #[serde(default)]
    pub spaces: Vec<SpaceSummary>,
}

#[derive(Debug, Clone)]
pub struct Organizations {
    ops: Operations,
}

impl Organizations {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn create(&self, request: &CreateOrganizationRequest) -> Result<OrganizationResource> {
        request.validate()?;
        self.ops
            .post(&[V2, ORGANIZATIONS], Params::new(), request)
            .await
    }

    pub async fn get(&self, organization_id: &str) -> Result<OrganizationResource> {
        require_non_empty(organization_id, "organization id")?;
        self.ops
            .get(&[V2, ORGANIZATIONS, organization_id], Params::new())
            .await
    }

    pub async fn list(
        &self,
        request: &ListOrganizationsRequest,
    ) -> Result<PaginatedResponse<OrganizationResource>> {
        self.ops
            .get(&[V2, ORGANIZATIONS], request.params(None))
            .await
    }

    /// Every organization matching `request`, across all pages
    pub async fn list_all(
        &self,
        request: &ListOrganizationsRequest,
    ) -> Result<Vec<OrganizationResource>> {
        request_all_v2(|page| {
            self.ops
                .get(&[V2, ORGANIZATIONS], request.params(Some(page)))
        })
        .await
    }

    pub async fn update(&self, request: &UpdateOrganizationRequest) -> Result<OrganizationResource> {
        request.validate()?;
        self.ops
            .put(
                &[V2, ORGANIZATIONS, request.organization_id.as_str()],
                Params::new(),
                request,
            )
            .await
    }

    /// Returns the background job when `options.run_async` is set
    pub async fn delete(
        &self,
        organization_id: &str,
        options: DeleteOptions,
    ) -> Result<Option<JobResource>> {
        require_non_empty(organization_id, "organization id")?;
        self.ops
            .delete(
                &[V2, ORGANIZATIONS, organization_id],
                options.apply(Params::new()),
            )
            .await?
            .json()
    }

    pub async fn summary(&self, organization_id: &str) -> Result<OrganizationSummary> {
        require_non_empty(organization_id, "organization id")?;
        self.ops
            .get(
                &[V2, ORGANIZATIONS, organization_id, "summary"],
                Params::new(),
            )
            .await
    }
}
