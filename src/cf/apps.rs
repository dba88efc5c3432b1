// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/apps`, their droplets and their processes.

use super::client::CfClient;
use super::errors::CfError;
use super::types::{Metadata, ToOne};
use crate::constants::{CF_API_PREFIX, DEFAULT_PROCESS_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const APP_STATE_STARTED: &str = "STARTED";
pub const APP_STATE_STOPPED: &str = "STOPPED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lifecycle {
    pub r#type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppRelationships {
    #[serde(default)]
    pub space: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct App {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub relationships: AppRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Droplet {
    pub guid: String,
    #[serde(default)]
    pub state: String,
    /// Docker image reference for droplets of docker apps.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_timeout: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessHealthCheck {
    pub r#type: String,
    #[serde(default)]
    pub data: HealthCheckData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Process {
    pub guid: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub instances: i32,
    #[serde(default)]
    pub memory_in_mb: i64,
    #[serde(default)]
    pub disk_in_mb: i64,
    #[serde(default)]
    pub health_check: Option<ProcessHealthCheck>,
    #[serde(default)]
    pub readiness_health_check: Option<ProcessHealthCheck>,
}

/// Fields of `PATCH /v3/processes/{guid}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<ProcessHealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_health_check: Option<ProcessHealthCheck>,
}

impl ProcessUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.command.is_none() && self.health_check.is_none() && self.readiness_health_check.is_none()
    }
}

/// Fields of `POST /v3/processes/{guid}/actions/scale`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_in_mb: Option<i64>,
}

impl ProcessScale {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_none() && self.memory_in_mb.is_none() && self.disk_in_mb.is_none()
    }
}

pub struct Apps<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn apps(&self) -> Apps<'_> {
        Apps { cf: self }
    }
}

impl Apps<'_> {
    pub async fn get(&self, guid: &str) -> Result<App, CfError> {
        self.cf
            .get(&format!("{CF_API_PREFIX}/apps/{guid}"), &format!("app {guid}"))
            .await
    }

    /// Finds the one app named `name`, within `space_guid` when given.
    pub async fn single_by_name(&self, name: &str, space_guid: Option<&str>) -> Result<App, CfError> {
        let mut query = vec![("names", name.to_string())];
        if let Some(space) = space_guid {
            query.push(("space_guids", space.to_string()));
        }
        self.cf
            .single(&format!("{CF_API_PREFIX}/apps"), &query, &format!("app {name}"))
            .await
    }

    /// Creates a docker-lifecycle app record. The app starts out `STOPPED`.
    pub async fn create_docker(&self, name: &str, space_guid: &str) -> Result<App, CfError> {
        let body = json!({
            "name": name,
            "lifecycle": { "type": "docker", "data": {} },
            "relationships": { "space": ToOne::to(space_guid) }
        });
        let what = format!("app {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/apps"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn rename(&self, guid: &str, name: &str) -> Result<App, CfError> {
        let what = format!("app {guid}");
        self.cf
            .patch(&format!("{CF_API_PREFIX}/apps/{guid}"), &json!({ "name": name }), &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(&format!("{CF_API_PREFIX}/apps/{guid}"), &format!("app {guid}"))
            .await
    }

    async fn action(&self, guid: &str, action: &str) -> Result<App, CfError> {
        let what = format!("app {guid}");
        self.cf
            .post(
                &format!("{CF_API_PREFIX}/apps/{guid}/actions/{action}"),
                &json!({}),
                &what,
            )
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn start(&self, guid: &str) -> Result<App, CfError> {
        self.action(guid, "start").await
    }

    pub async fn stop(&self, guid: &str) -> Result<App, CfError> {
        self.action(guid, "stop").await
    }

    pub async fn restart(&self, guid: &str) -> Result<App, CfError> {
        self.action(guid, "restart").await
    }

    /// The current droplet, or `None` when the app has never been staged.
    pub async fn current_droplet(&self, guid: &str) -> Result<Option<Droplet>, CfError> {
        match self
            .cf
            .get(
                &format!("{CF_API_PREFIX}/apps/{guid}/droplets/current"),
                &format!("current droplet of app {guid}"),
            )
            .await
        {
            Ok(droplet) => Ok(Some(droplet)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_current_droplet(&self, guid: &str, droplet_guid: &str) -> Result<(), CfError> {
        self.cf
            .patch::<_, Value>(
                &format!("{CF_API_PREFIX}/apps/{guid}/relationships/current_droplet"),
                &ToOne::to(droplet_guid),
                &format!("current droplet of app {guid}"),
            )
            .await?;
        Ok(())
    }

    /// The app's process of the given type, `web` when `None`.
    pub async fn process(&self, guid: &str, process_type: Option<&str>) -> Result<Process, CfError> {
        let process_type = process_type.unwrap_or(DEFAULT_PROCESS_TYPE);
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/apps/{guid}/processes/{process_type}"),
                &format!("{process_type} process of app {guid}"),
            )
            .await
    }

    pub async fn update_process(&self, process_guid: &str, update: &ProcessUpdate) -> Result<(), CfError> {
        if update.is_empty() {
            return Ok(());
        }
        self.cf
            .patch::<_, Value>(
                &format!("{CF_API_PREFIX}/processes/{process_guid}"),
                update,
                &format!("process {process_guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn scale_process(&self, process_guid: &str, scale: &ProcessScale) -> Result<(), CfError> {
        if scale.is_empty() {
            return Ok(());
        }
        self.cf
            .post::<_, Value>(
                &format!("{CF_API_PREFIX}/processes/{process_guid}/actions/scale"),
                scale,
                &format!("process {process_guid}"),
            )
            .await?;
        Ok(())
    }
}
