//! Cloud Controller v2 API

pub mod organizations;
pub mod service_brokers;
pub mod service_instances;
pub mod spaces;

use crate::operations::Params;
use crate::pagination::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use organizations::Organizations;
pub use service_brokers::ServiceBrokers;
pub use service_instances::ServiceInstances;
pub use spaces::Spaces;

const V2: &str = "v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => f.write_str("asc"),
            OrderDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Paging parameters common to every v2 list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub results_per_page: Option<u32>,
    pub order_direction: Option<OrderDirection>,
}

impl PageRequest {
    fn apply(&self, params: Params) -> Params {
        params
            .query_opt("page", self.page)
            .query_opt("results-per-page", self.results_per_page)
            .query_opt("order-direction", self.order_direction)
    }
}

/// Adds a `q` filter: `name:value` for one value, `name IN a,b` for several
fn filter(params: Params, name: &str, values: &[String]) -> Params {
    match values {
        [] => params,
        [value] => params.query("q", format!("{name}:{value}")),
        values => params.query("q", format!("{name} IN {}", values.join(","))),
    }
}

/// Status of a v2 background job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: Option<i64>,
    pub description: Option<String>,
    pub error_code: Option<String>,
}

/// A v2 background job, returned by asynchronous deletes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntity {
    pub guid: Option<String>,
    pub status: JobStatus,
    pub error: Option<String>,
    pub error_details: Option<ErrorDetails>,
}

pub type JobResource = Resource<JobEntity>;

/// Options of a v2 DELETE
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Run as a background job; the response carries the job
    pub run_async: bool,
    /// Delete contained resources as well
    pub recursive: bool,
}

impl DeleteOptions {
    fn apply(&self, params: Params) -> Params {
        let params = if self.run_async {
            params.query("async", true)
        } else {
            params
        };
        if self.recursive {
            params.query("recursive", true)
        } else {
            params
        }
    }
}

/// Last operation of an asynchronously provisioned service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation_type: String,
    pub state: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(params: &Params) -> Vec<(&str, &str)> {
        params
            .query_pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_filters() {
        let params = filter(Params::new(), "name", &["a".into()]);
        assert_eq!(query(&params), [("q", "name:a")]);

        let params = filter(Params::new(), "name", &["a".into(), "b".into()]);
        assert_eq!(query(&params), [("q", "name IN a,b")]);

        assert!(filter(Params::new(), "name", &[]).query_pairs().is_empty());
    }

    #[test]
    fn test_page_and_delete_options() {
        let page = PageRequest {
            page: Some(2),
            results_per_page: Some(50),
            order_direction: Some(OrderDirection::Desc),
        };
        let params = DeleteOptions {
            run_async: true,
            recursive: true,
        }
        .apply(page.apply(Params::new()));
        assert_eq!(
            query(&params),
            [
                ("page", "2"),
                ("results-per-page", "50"),
                ("order-direction", "desc"),
                ("async", "true"),
                ("recursive", "true")
            ]
        );
    }

    #[test]
    fn test_job_entity() {
        let job: JobResource = serde_json::from_str(
            r#"{"metadata":{"guid":"j1","created_at":"2016-02-02T17:16:31Z","url":"/v2/jobs/j1"},
                "entity":{"guid":"j1","status":"queued"}}"#,
        )
        .unwrap();
        assert_eq!(job.entity.status, JobStatus::Queued);
    }
}
