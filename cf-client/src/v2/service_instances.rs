use super::{JobResource, LastOperation, PageRequest, V2, filter};
use crate::error::{Result, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{PaginatedResponse, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE_INSTANCES: &str = "service_instances";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstanceEntity {
    pub name: String,
    pub service_plan_guid: Option<String>,
    pub space_guid: Option<String>,
    pub service_guid: Option<String>,
    #[serde(default)]
    pub credentials: BTreeMap<String, serde_json::Value>,
    pub dashboard_url: Option<String>,
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
    pub last_operation: Option<LastOperation>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub maintenance_info: Option<serde_json::Value>,
    pub space_url: Option<String>,
    pub service_plan_url: Option<String>,
    pub service_bindings_url: Option<String>,
    pub service_keys_url: Option<String>,
    pub routes_url: Option<String>,
}

pub type ServiceInstanceResource = Resource<ServiceInstanceEntity>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateServiceInstanceRequest {
    pub name: String,
    pub service_plan_guid: String,
    pub space_guid: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Allow the broker to provision asynchronously
    #[serde(skip)]
    pub accepts_incomplete: bool,
}

impl CreateServiceInstanceRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.name, "name")?;
        require_non_empty(&self.service_plan_guid, "service plan id")?;
        require_non_empty(&self.space_guid, "space id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateServiceInstanceRequest {
    #[serde(skip)]
    pub service_instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_plan_guid: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip)]
    pub accepts_incomplete: bool,
}

impl UpdateServiceInstanceRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.service_instance_id, "service instance id")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteServiceInstanceRequest {
    pub service_instance_id: String,
    pub accepts_incomplete: bool,
    pub run_async: bool,
    /// Remove the instance without contacting the broker
    pub purge: bool,
    pub recursive: bool,
}

impl DeleteServiceInstanceRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.service_instance_id, "service instance id")
    }

    fn params(&self) -> Params {
        [
            ("accepts_incomplete", self.accepts_incomplete),
            ("async", self.run_async),
            ("purge", self.purge),
            ("recursive", self.recursive),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .fold(Params::new(), |params, (name, _)| params.query(name, true))
    }
}

/// Body of a `202 Accepted` service instance delete
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DeleteServiceInstanceResponse {
    /// `async=true`: a background job
    Job(JobResource),
    /// `accepts_incomplete=true`: the instance with its in-progress last operation
    Instance(ServiceInstanceResource),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListServiceInstancesRequest {
    pub names: Vec<String>,
    pub space_ids: Vec<String>,
    pub service_plan_ids: Vec<String>,
    pub organization_ids: Vec<String>,
    pub page: PageRequest,
}

impl ListServiceInstancesRequest {
    fn params(&self) -> Params {
        let params = filter(Params::new(), "name", &self.names);
        let params = filter(params, "space_guid", &self.space_ids);
        let params = filter(params, "service_plan_guid", &self.service_plan_ids);
        let params = filter(params, "organization_guid", &self.organization_ids);
        self.page.apply(params)
    }
}

fn accepts_incomplete(accepts: bool) -> Params {
    Params::new().query_opt("accepts_incomplete", accepts.then_some(true))
}

#[derive(Debug, Clone)]
pub struct ServiceInstances {
    ops: Operations,
}

impl ServiceInstances {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn create(
        &self,
        request: &CreateServiceInstanceRequest,
    ) -> Result<ServiceInstanceResource> {
        request.validate()?;
        self.ops
            .post(
                &[V2, SERVICE_INSTANCES],
                accepts_incomplete(request.accepts_incomplete),
                request,
            )
            .await
    }

    pub async fn get(&self, service_instance_id: &str) -> Result<ServiceInstanceResource> {
        require_non_empty(service_instance_id, "service instance id")?;
        self.ops
            .get(&[V2, SERVICE_INSTANCES, service_instance_id], Params::new())
            .await
    }

    pub async fn list(
        &self,
        request: &ListServiceInstancesRequest,
    ) -> Result<PaginatedResponse<ServiceInstanceResource>> {
        self.ops
            .get(&[V2, SERVICE_INSTANCES], request.params())
            .await
    }

    pub async fn update(
        &self,
        request: &UpdateServiceInstanceRequest,
    ) -> Result<ServiceInstanceResource> {
        request.validate()?;
        self.ops
            .put(
                &[V2, SERVICE_INSTANCES, request.service_instance_id.as_str()],
                accepts_incomplete(request.accepts_incomplete),
                request,
            )
            .await
    }

    /// `None` when the instance was deleted synchronously
    pub async fn delete(
        &self,
        request: &DeleteServiceInstanceRequest,
    ) -> Result<Option<DeleteServiceInstanceResponse>> {
        request.validate()?;
        self.ops
            .delete(
                &[V2, SERVICE_INSTANCES, request.service_instance_id.as_str()],
                request.params(),
            )
            .await?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v2::JobStatus;

    #[test]
    fn test_create_instance_body() {
        let mut parameters = BTreeMap::new();
        parameters.insert("size".to_string(), serde_json::json!("small"));
        let request = CreateServiceInstanceRequest {
            name: "db".into(),
            service_plan_guid: "plan".into(),
            space_guid: "space".into(),
            parameters,
            accepts_incomplete: true,
            ..Default::default()
        };
        assert!(request.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "name": "db",
                "service_plan_guid": "plan",
                "space_guid": "space",
                "parameters": { "size": "small" }
            })
        );
    }

    #[test]
    fn test_delete_params() {
        let request = DeleteServiceInstanceRequest {
            service_instance_id: "si".into(),
            accepts_incomplete: true,
            purge: true,
            ..Default::default()
        };
        assert_eq!(
            request.params().query_pairs(),
            [
                ("accepts_incomplete".to_string(), "true".to_string()),
                ("purge".to_string(), "true".to_string())
            ]
        );
    }

    #[test]
    fn test_delete_response_shapes() {
        let job: DeleteServiceInstanceResponse = serde_json::from_str(
            r#"{"metadata":{"guid":"j"},"entity":{"guid":"j","status":"queued"}}"#,
        )
        .unwrap();
        assert!(matches!(
            job,
            DeleteServiceInstanceResponse::Job(job) if job.entity.status == JobStatus::Queued
        ));

        let instance: DeleteServiceInstanceResponse = serde_json::from_str(
            r#"{"metadata":{"guid":"si"},"entity":{"name":"db",
                "last_operation":{"type":"delete","state":"in progress"}}}"#,
        )
        .unwrap();
        assert!(matches!(instance, DeleteServiceInstanceResponse::Instance(_)));
    }
}
