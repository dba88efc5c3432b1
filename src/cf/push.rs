// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Docker app push orchestration.
//!
//! A push is a fixed sequence of CF calls:
//!
//! 1. create the app record (first push only)
//! 2. create a `docker` package referencing the image
//! 3. build a droplet from the package and poll the build until `STAGED`
//! 4. make the droplet the app's current droplet
//! 5. apply the process configuration
//! 6. start (first push) or restart (re-push) the app
//!
//! Only the docker lifecycle is supported.

use super::apps::{App, HealthCheckData, Process, ProcessHealthCheck, ProcessScale, ProcessUpdate};
use super::client::CfClient;
use super::errors::{CfApiError, CfError};
use super::types::{GuidRef, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::{HealthCheck, ProcessConfig};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::{debug, info};

pub const BUILD_STATE_STAGING: &str = "STAGING";
pub const BUILD_STATE_STAGED: &str = "STAGED";
pub const BUILD_STATE_FAILED: &str = "FAILED";

/// Registry credentials for a private docker image.
#[derive(Clone, PartialEq, Eq)]
pub struct DockerCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DockerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// The image to push and its optional registry credentials.
#[derive(Debug, Clone, Copy)]
pub struct DockerImage<'a> {
    pub image: &'a str,
    pub credentials: Option<&'a DockerCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub guid: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    pub guid: String,
    pub state: String,
    #[serde(default)]
    pub droplet: Option<GuidRef>,
    #[serde(default)]
    pub error: Option<String>,
}

fn health_check(hc: &HealthCheck, timeout: Option<i32>) -> ProcessHealthCheck {
    ProcessHealthCheck {
        r#type: hc.r#type.as_str().to_string(),
        data: HealthCheckData {
            timeout,
            invocation_timeout: hc.invocation_timeout,
            interval: hc.interval,
            endpoint: hc.endpoint.clone(),
        },
    }
}

/// The process update needed to move `observed` to `desired`. Unset desired
/// fields are left alone; a bare `timeout` keeps the observed check type.
#[must_use]
pub fn process_update(desired: &ProcessConfig, observed: &Process) -> ProcessUpdate {
    let liveness = match (&desired.health_check, desired.timeout) {
        (Some(hc), timeout) => Some(health_check(hc, timeout)),
        (None, Some(timeout)) => observed.health_check.as_ref().map(|current| ProcessHealthCheck {
            r#type: current.r#type.clone(),
            data: HealthCheckData {
                timeout: Some(timeout),
                ..current.data.clone()
            },
        }),
        (None, None) => None,
    };
    ProcessUpdate {
        command: desired.command.clone(),
        health_check: liveness,
        readiness_health_check: desired
            .readiness_health_check
            .as_ref()
            .map(|hc| health_check(hc, None)),
    }
}

#[must_use]
pub fn process_scale(desired: &ProcessConfig) -> ProcessScale {
    ProcessScale {
        instances: desired.instances,
        memory_in_mb: desired.memory_in_mb,
        disk_in_mb: desired.disk_in_mb,
    }
}

impl CfClient {
    pub async fn create_docker_package(
        &self,
        app_guid: &str,
        docker: &DockerImage<'_>,
    ) -> Result<Package, CfError> {
        let mut data = json!({ "image": docker.image });
        if let Some(creds) = docker.credentials {
            data["username"] = json!(creds.username);
            data["password"] = json!(creds.password);
        }
        let body = json!({
            "type": "docker",
            "data": data,
            "relationships": { "app": ToOne::to(app_guid) }
        });
        let what = format!("package of app {app_guid}");
        self.post(&format!("{CF_API_PREFIX}/packages"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn create_build(&self, package_guid: &str) -> Result<Build, CfError> {
        let what = format!("build of package {package_guid}");
        self.post(
            &format!("{CF_API_PREFIX}/builds"),
            &json!({ "package": { "guid": package_guid } }),
            &what,
        )
        .await?
        .resource
        .ok_or_else(|| CfError::not_found(what))
    }

    /// Polls a build until it is `STAGED` and returns its droplet GUID.
    pub async fn wait_for_build(&self, build_guid: &str) -> Result<String, CfError> {
        loop {
            let build: Build = self
                .get(
                    &format!("{CF_API_PREFIX}/builds/{build_guid}"),
                    &format!("build {build_guid}"),
                )
                .await?;
            match build.state.as_str() {
                BUILD_STATE_STAGED => {
                    return build
                        .droplet
                        .map(|d| d.guid)
                        .ok_or_else(|| CfError::not_found(format!("droplet of build {build_guid}")));
                }
                BUILD_STATE_FAILED => {
                    return Err(CfError::JobFailed {
                        guid: build_guid.to_string(),
                        errors: vec![CfApiError {
                            code: 0,
                            title: "StagingError".to_string(),
                            detail: build.error.unwrap_or_default(),
                        }],
                    });
                }
                state => {
                    debug!(build = %build_guid, state = %state, "waiting for build");
                    tokio::time::sleep(self.poll_interval()).await;
                }
            }
        }
    }

    /// Applies command, health checks and scale of the app's process.
    pub async fn apply_process(&self, app_guid: &str, desired: &ProcessConfig) -> Result<(), CfError> {
        let apps = self.apps();
        let process = apps.process(app_guid, desired.r#type.as_deref()).await?;
        apps.update_process(&process.guid, &process_update(desired, &process))
            .await?;
        apps.scale_process(&process.guid, &process_scale(desired)).await
    }

    /// Stages `docker` onto an existing app and applies the process configuration.
    /// Returns the new droplet GUID.
    pub async fn push_docker(
        &self,
        app_guid: &str,
        docker: &DockerImage<'_>,
        process: Option<&ProcessConfig>,
    ) -> Result<String, CfError> {
        let package = self.create_docker_package(app_guid, docker).await?;
        let build = self.create_build(&package.guid).await?;
        let droplet = self.wait_for_build(&build.guid).await?;
        self.apps().set_current_droplet(app_guid, &droplet).await?;
        if let Some(process) = process {
            self.apply_process(app_guid, process).await?;
        }
        info!(app = %app_guid, image = %docker.image, droplet = %droplet, "pushed docker image");
        Ok(droplet)
    }

    /// Creates the app and pushes the image. `on_created` receives the new app
    /// GUID before any push step runs, so the caller can record it even when a
    /// later step fails.
    pub async fn create_and_push<F>(
        &self,
        name: &str,
        space_guid: &str,
        docker: &DockerImage<'_>,
        process: Option<&ProcessConfig>,
        stopped: bool,
        on_created: F,
    ) -> Result<App, CfError>
    where
        F: FnOnce(&App) + Send,
    {
        let app = self.apps().create_docker(name, space_guid).await?;
        on_created(&app);

        self.push_docker(&app.guid, docker, process).await?;
        if stopped {
            Ok(app)
        } else {
            self.apps().start(&app.guid).await
        }
    }

    /// Re-stages the image onto an existing app and restarts it.
    pub async fn update_and_push(
        &self,
        app_guid: &str,
        docker: &DockerImage<'_>,
        process: Option<&ProcessConfig>,
        stopped: bool,
    ) -> Result<App, CfError> {
        self.push_docker(app_guid, docker, process).await?;
        if stopped {
            self.apps().stop(app_guid).await
        } else {
            self.apps().restart(app_guid).await
        }
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod push_tests;
