use super::{Links, Metadata, PageRequest, ToOneRelationship, V3};
use crate::error::{Result, missing, require_non_empty};
use crate::operations::{Operations, Params};
use crate::pagination::{ListResponse, request_all_v3};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PROCESSES: &str = "processes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckType {
    Http,
    Port,
    Process,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(rename = "type")]
    pub check_type: HealthCheckType,
    #[serde(default)]
    pub data: HealthCheckData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRelationships {
    #[serde(default)]
    pub app: ToOneRelationship,
    #[serde(default)]
    pub revision: ToOneRelationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub guid: String,
    #[serde(rename = "type")]
    pub process_type: String,
    pub command: Option<String>,
    pub instances: u32,
    pub memory_in_mb: u32,
    pub disk_in_mb: u32,
    pub log_rate_limit_in_bytes_per_second: Option<i64>,
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub relationships: ProcessRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProcessesRequest {
    pub process_ids: Vec<String>,
    pub types: Vec<String>,
    pub application_ids: Vec<String>,
    pub space_ids: Vec<String>,
    pub organization_ids: Vec<String>,
    pub page: PageRequest,
}

impl ListProcessesRequest {
    fn params(&self, page: Option<u32>) -> Params {
        let params = Params::new()
            .query_list("guids", &self.process_ids)
            .query_list("types", &self.types)
            .query_list("app_guids", &self.application_ids)
            .query_list("space_guids", &self.space_ids)
            .query_list("organization_guids", &self.organization_ids);
        self.page.apply(params, page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScaleProcessRequest {
    #[serde(skip)]
    pub process_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_in_mb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_rate_limit_in_bytes_per_second: Option<i64>,
}

impl ScaleProcessRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.process_id, "process id")?;
        if self.instances.is_none()
            && self.memory_in_mb.is_none()
            && self.disk_in_mb.is_none()
            && self.log_rate_limit_in_bytes_per_second.is_none()
        {
            return Err(missing("instances, memory or disk"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateProcessRequest {
    #[serde(skip)]
    pub process_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl UpdateProcessRequest {
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.process_id, "process id")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessUsage {
    pub time: Option<DateTime<Utc>>,
    pub cpu: Option<f64>,
    pub mem: Option<u64>,
    pub disk: Option<u64>,
    pub log_rate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub external: Option<u16>,
    pub internal: Option<u16>,
    pub external_tls_proxy_port: Option<u16>,
    pub internal_tls_proxy_port: Option<u16>,
}

/// Runtime statistics of one process instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatistics {
    #[serde(rename = "type")]
    pub process_type: String,
    pub index: u32,
    pub state: String,
    pub usage: Option<ProcessUsage>,
    pub host: Option<String>,
    #[serde(default)]
    pub instance_ports: Vec<PortMapping>,
    pub uptime: Option<u64>,
    pub mem_quota: Option<u64>,
    pub disk_quota: Option<u64>,
    pub fds_quota: Option<u64>,
    pub isolation_segment: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStatisticsList {
    pub resources: Vec<ProcessStatistics>,
}

#[derive(Debug, Clone)]
pub struct Processes {
    ops: Operations,
}

impl Processes {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn get(&self, process_id: &str) -> Result<Process> {
        require_non_empty(process_id, "process id")?;
        self.ops.get(&[V3, PROCESSES, process_id], Params::new()).await
    }

    pub async fn list(&self, request: &ListProcessesRequest) -> Result<ListResponse<Process>> {
        self.ops.get(&[V3, PROCESSES], request.params(None)).await
    }

    pub async fn list_all(&self, request: &ListProcessesRequest) -> Result<Vec<Process>> {
        request_all_v3(|page| self.ops.get(&[V3, PROCESSES], request.params(Some(page)))).await
    }

    pub async fn scale(&self, request: &ScaleProcessRequest) -> Result<Process> {
        request.validate()?;
        self.ops
            .post(
                &[V3, PROCESSES, request.process_id.as_str(), "actions", "scale"],
                Params::new(),
                request,
            )
            .await
    }

    pub async fn update(&self, request: &UpdateProcessRequest) -> Result<Process> {
        request.validate()?;
        self.ops
            .patch(
                &[V3, PROCESSES, request.process_id.as_str()],
                Params::new(),
                request,
            )
            .await
    }

    pub async fn get_statistics(&self, process_id: &str) -> Result<ProcessStatisticsList> {
        require_non_empty(process_id, "process id")?;
        self.ops
            .get(&[V3, PROCESSES, process_id, "stats"], Params::new())
            .await
    }

    /// Stops one instance; Cloud Foundry restarts it
    pub async fn terminate_instance(&self, process_id: &str, index: u32) -> Result<()> {
        require_non_empty(process_id, "process id")?;
        let index = index.to_string();
        self.ops
            .delete(
                &[V3, PROCESSES, process_id, "instances", index.as_str()],
                Params::new(),
            )
            .await?;
        Ok(())
    }
}
