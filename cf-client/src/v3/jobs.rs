//! Asynchronous v3 jobs
//!
//! Operations that the Cloud Controller runs in the background answer with
//! `202 Accepted` and a `Location` of `/v3/jobs/{guid}`. [`Jobs::wait_for_completion`]
//! polls that job until it reaches a terminal state.

use super::{Links, V3};
use crate::error::{ClientError, Result, V3Error, require_non_empty};
use crate::operations::{Operations, Params};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const JOBS: &str = "jobs";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Processing,
    Polling,
    Complete,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWarning {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub guid: String,
    pub operation: Option<String>,
    pub state: JobState,
    #[serde(default)]
    pub errors: Vec<V3Error>,
    #[serde(default)]
    pub warnings: Vec<JobWarning>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone)]
pub struct Jobs {
    ops: Operations,
}

impl Jobs {
    pub(crate) fn new(ops: Operations) -> Self {
        Self { ops }
    }

    pub async fn get(&self, job_id: &str) -> Result<Job> {
        require_non_empty(job_id, "job id")?;
        self.ops.get(&[V3, JOBS, job_id], Params::new()).await
    }

    /// Polls the job every `interval` until it completes
    ///
    /// # Errors
    ///
    /// [`ClientError::JobFailed`] when the job fails and
    /// [`ClientError::Timeout`] when it is still running after `timeout`.
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Job> {
        tokio::time::timeout(timeout, self.poll(job_id, interval))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    async fn poll(&self, job_id: &str, interval: Duration) -> Result<Job> {
        loop {
            let job = self.get(job_id).await?;
            match job.state {
                JobState::Complete => return Ok(job),
                JobState::Failed => {
                    tracing::warn!("Job {} ({:?}) failed", job.guid, job.operation);
                    return Err(ClientError::JobFailed {
                        job_id: job.guid,
                        errors: job.errors,
                    });
                }
                JobState::Processing | JobState::Polling => {
                    tracing::debug!("Job {} is {:?}", job.guid, job.state);
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}
