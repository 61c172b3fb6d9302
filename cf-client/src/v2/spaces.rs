use super::{DeleteOptions, JobResource, PageRequest, V2, filter};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{PaginatedResponse, Resource, request_all_v2};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SPACES: &str = "spaces";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceEntity {
    pub name: String,
    pub organization_guid: String,
    pub space_quota_definition_guid: Option<String>,
    pub isolation_segment_guid: Option<String>,
    pub allow_ssh: Option<bool>,
    pub organization_url: Option<String>,
    pub developers_url: Option<String>,
    pub managers_url: Option<String>,
    pub auditors_url: Option<String>,
    pub apps_url: Option<String>,
    pub routes_url: Option<String>,
    pub domains_url: Option<String>,
    pub service_instances_url: Option<String>,
    pub app_events_url: Option<String>,
    pub events_url: Option<String>,
    pub security_groups_url: Option<String>,
}

pub type SpaceResource = Resource<SpaceEntity>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateSpaceRequest {
    pub name: String,
    pub organization_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auditor_guids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub developer_guids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domain_guids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manager_guids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_group_guids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_quota_definition_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation_segment_guid: Option<String>,
}

impl CreateSpaceRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.name, "name")?;
        require_non_empty(&self.organization_guid, "organization id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSpaceRequest {
    #[serde(skip)]
    pub space_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auditor_guids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_guids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_guids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_guids: Option<Vec<String>>,
}

impl UpdateSpaceRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.space_id, "space id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSpacesRequest {
    pub names: Vec<String>,
    pub organization_ids: Vec<String>,
    pub developer_ids: Vec<String>,
    pub page: PageRequest,
}

impl ListSpacesRequest {
    fn params(&self, page: Option<u32>) -> Params {
        let params = filter(Params::new(), "name", &self.names);
        let params = filter(params, "organization_guid", &self.organization_ids);
        let params = filter(params, "developer_guid", &self.developer_ids);
        let mut paging = self.page.clone();
        if page.is_some() {
            paging.page = page;
        }
        paging.apply(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationEntity {
    pub name: String,
    pub space_guid: String,
    pub stack_guid: Option<String>,
    pub buildpack: Option<String>,
    pub detected_buildpack: Option<String>,
    pub command: Option<String>,
    pub detected_start_command: Option<String>,
    pub docker_image: Option<String>,
    pub environment_json: Option<BTreeMap<String, serde_json::Value>>,
    pub memory: Option<u32>,
    pub disk_quota: Option<u32>,
    pub instances: Option<u32>,
    pub state: Option<String>,
    pub package_state: Option<String>,
    pub package_updated_at: Option<DateTime<Utc>>,
    pub health_check_type: Option<String>,
    pub health_check_timeout: Option<u32>,
    pub staging_failed_reason: Option<String>,
    pub diego: Option<bool>,
    pub enable_ssh: Option<bool>,
    pub ports: Option<Vec<u16>>,
    pub version: Option<String>,
}

pub type ApplicationResource = Resource<ApplicationEntity>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSpaceApplicationsRequest {
    pub space_id: String,
    pub names: Vec<String>,
    pub stack_ids: Vec<String>,
    pub diego: Option<bool>,
    pub page: PageRequest,
}

impl ListSpaceApplicationsRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.space_id, "space id")
    }

    fn params(&self, page: Option<u32>) -> Params {
        let params = filter(Params::new(), "name", &self.names);
        let params = filter(params, "stack_guid", &self.stack_ids);
        let params = match self.diego {
            Some(diego) => params.query("diego", diego),
            None => params,
        };
        let mut paging = self.page.clone();
        if page.is_some() {
            paging.page = page;
        }
        paging.apply(params)
    }
}

#[derive(Debug, Clone)]
pub struct Spaces {
    ops: Operations,
}

impl Spaces {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn create(&self, request: &CreateSpaceRequest) -> Result<SpaceResource> {
        request.validate()?;
        self.ops.post(&[V2, SPACES], Params::new(), request).await
    }

    pub async fn get(&self, space_id: &str) -> Result<SpaceResource> {
        require_non_empty(space_id, "space id")?;
        self.ops.get(&[V2, SPACES, space_id], Params::new()).await
    }

    pub async fn list(&self, request: &ListSpacesRequest) -> Result<PaginatedResponse<SpaceResource>> {
        self.ops.get(&[V2, SPACES], request.params(None)).await
    }

    pub async fn list_all(&self, request: &ListSpacesRequest) -> Result<Vec<SpaceResource>> {
        request_all_v2(|page| self.ops.get(&[V2, SPACES], request.params(Some(page)))).await
    }

    pub async fn update(&self, request: &UpdateSpaceRequest) -> Result<SpaceResource> {
        request.validate()?;
        self.ops
            .put(&[V2, SPACES, request.space_id.as_str()], Params::new(), request)
            .await
    }

    pub async fn delete(&self, space_id: &str, options: DeleteOptions) -> Result<Option<JobResource>> {
        require_non_empty(space_id, "space id")?;
        self.ops
            .delete(&[V2, SPACES, space_id], options.apply(Params::new()))
            .await?
            .json()
    }

    pub async fn list_applications(
        &self,
        request: &ListSpaceApplicationsRequest,
    ) -> Result<PaginatedResponse<ApplicationResource>> {
        request.validate()?;
        self.ops
            .get(
                &[V2, SPACES, request.space_id.as_str(), "apps"],
                request.params(None),
            )
            .await
    }
}
