// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Async job coordinator.
//!
//! CF reports long-running operations as jobs at `/v3/jobs/{guid}`. A job is
//! polled at the client's poll interval until it reaches `COMPLETE` or `FAILED`.
//! The loop has no deadline of its own: it is bounded by the per-reconcile
//! timeout, after which the next reconcile observes the resource's
//! `last_operation` instead of re-issuing the mutating call.

use super::client::CfClient;
use super::errors::{CfApiError, CfError};
use super::types::Accepted;
use crate::constants::CF_API_PREFIX;
use serde::Deserialize;
use tracing::debug;

pub const JOB_STATE_PROCESSING: &str = "PROCESSING";
pub const JOB_STATE_POLLING: &str = "POLLING";
pub const JOB_STATE_COMPLETE: &str = "COMPLETE";
pub const JOB_STATE_FAILED: &str = "FAILED";

/// A CF job as returned by `GET /v3/jobs/{guid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub guid: String,
    #[serde(default)]
    pub operation: String,
    pub state: String,
    #[serde(default)]
    pub errors: Vec<CfApiError>,
    #[serde(default)]
    pub warnings: Vec<serde_json::Value>,
}

impl CfClient {
    pub async fn get_job(&self, guid: &str) -> Result<Job, CfError> {
        self.get(&format!("{CF_API_PREFIX}/jobs/{guid}"), &format!("job {guid}"))
            .await
    }

    /// Polls a job until it is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`CfError::JobFailed`] (or [`CfError::ResourceNotFoundDuringDelete`]
    /// when the failure is a not-found) for `FAILED` jobs, and any error of the
    /// poll request itself.
    pub async fn wait_for_job(&self, guid: &str) -> Result<(), CfError> {
        loop {
            let job = self.get_job(guid).await?;
            match job.state.as_str() {
                JOB_STATE_COMPLETE => {
                    debug!(job = %guid, operation = %job.operation, "CF job complete");
                    return Ok(());
                }
                JOB_STATE_FAILED => return Err(CfError::from_failed_job(guid, job.errors)),
                state => {
                    debug!(job = %guid, operation = %job.operation, state = %state, "waiting for CF job");
                    tokio::time::sleep(self.poll_interval()).await;
                }
            }
        }
    }

    /// Waits for the job of an accepted request, if there is one.
    pub async fn wait_accepted<T>(&self, accepted: &Accepted<T>) -> Result<(), CfError> {
        match accepted.job.as_deref() {
            Some(job) => self.wait_for_job(job).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod jobs_tests;
