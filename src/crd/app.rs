// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `App`: a CF application, pushed from a Docker image.

use super::common::{ResourceSpec, ResourceStatus, SecretReference};
use super::references::{ScopeReference, SpaceScope};
use super::validation::ValidationError;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `App` manages a CF application.
///
/// Only the `docker` lifecycle is supported end to end: the controller creates
/// the app, stages the image into a droplet, applies the process settings and
/// starts it.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: App
/// metadata:
///   name: web
///   namespace: platform
/// spec:
///   forProvider:
///     name: web
///     lifecycle: docker
///     spaceRef: { name: dev }
///     docker:
///       image: nginx:1.25
///       credentialsSecretRef:
///         name: registry-pull
///     process:
///       instances: 2
///       memoryInMb: 256
///       healthCheck:
///         type: http
///         endpoint: /healthz
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "App",
    namespaced,
    doc = "App is a managed Cloud Foundry application."
)]
#[kube(status = "AppStatus")]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    pub for_provider: AppParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.space) || has(self.spaceRef) || has(self.spaceSelector) || has(self.spaceName)",
        "message": "one of space, spaceRef, spaceSelector or spaceName must be set"
    },
    {
        "rule": "self.lifecycle == oldSelf.lifecycle",
        "message": "lifecycle is immutable"
    },
    {
        "rule": "self.lifecycle != 'docker' || has(self.docker)",
        "message": "docker is required when lifecycle is docker"
    }
]))]
pub struct AppParameters {
    /// Name of the app in CF.
    pub name: String,

    #[serde(flatten)]
    pub space: SpaceScope,

    /// Immutable after creation.
    #[serde(default)]
    pub lifecycle: AppLifecycle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerConfig>,

    /// Settings of the app's `web` process (or the type named here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessConfig>,

    /// Keep the app stopped after staging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped: Option<bool>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Buildpack,
    Cnb,
    #[default]
    Docker,
}

impl AppLifecycle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buildpack => "buildpack",
            Self::Cnb => "cnb",
            Self::Docker => "docker",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    /// Image reference, e.g. `registry.example.com/team/web:1.4`.
    pub image: String,

    /// A `kubernetes.io/dockerconfigjson` secret with registry credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<SecretReference>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessConfig {
    /// Process type, `web` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub instances: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub memory_in_mb: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub disk_in_mb: Option<i64>,

    /// Seconds an instance may take to become healthy after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub timeout: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_health_check: Option<HealthCheck>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    /// `port`, `process` or `http`.
    pub r#type: HealthCheckType,

    /// HTTP endpoint for `http` checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub invocation_timeout: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub interval: Option<i32>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckType {
    #[default]
    Port,
    Process,
    Http,
}

impl HealthCheckType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::Process => "process",
            Self::Http => "http",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_in_mb: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_in_mb: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_health_check: Option<HealthCheck>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `STARTED` or `STOPPED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,

    /// Image of the current droplet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub droplet: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessObservation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: AppObservation,
}

impl_managed!(App, AppStatus, AppObservation);

impl App {
    /// # Errors
    ///
    /// Returns an error for an empty name, an invalid space scope or a docker
    /// app without an image.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        params.space.validate_required()?;
        if params.lifecycle == AppLifecycle::Docker
            && params.docker.as_ref().is_none_or(|d| d.image.is_empty())
        {
            return Err(ValidationError::required(
                "forProvider.docker.image",
                " when lifecycle is docker",
            ));
        }
        Ok(())
    }
}
