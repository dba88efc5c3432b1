// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `App` external client.
//!
//! Creating an app runs the whole docker push: app record, package, build,
//! current droplet, process settings and start. The new GUID is recorded as
//! soon as the app record exists, so a push that fails half way is resumed by
//! the next reconcile instead of creating a second app.
//!
//! Drift is checked on four things: the name, the image of the current
//! droplet, the process settings that are set in the spec and the desired
//! started/stopped state. A new image re-stages and restarts the app; other
//! drift is fixed in place.

use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use super::status;
use crate::cf::apps::{Process, ProcessHealthCheck, APP_STATE_STARTED, APP_STATE_STOPPED};
use crate::cf::push::{DockerCredentials, DockerImage};
use crate::cf::CfClient;
use crate::constants::KIND_APP;
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, App, AppLifecycle, AppObservation, DockerConfig,
    HealthCheck, HealthCheckType, ProcessConfig, ProcessObservation, ScopeReference,
    ValidationError,
};
use crate::secrets::{docker_credentials, read_secret_key, DOCKER_CONFIG_JSON_KEY};
use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AppExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl AppExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    /// Registry credentials from the app's `credentialsSecretRef`, if any.
    async fn credentials(&self, cr: &App, docker: &DockerConfig) -> Result<Option<DockerCredentials>> {
        let Some(secret) = &docker.credentials_secret_ref else {
            return Ok(None);
        };
        let namespace = match &secret.namespace {
            Some(namespace) => namespace.clone(),
            None => namespace_of(cr)?,
        };
        let config = read_secret_key(
            &self.ctx.client,
            &namespace,
            &secret.name,
            DOCKER_CONFIG_JSON_KEY,
        )
        .await
        .with_context(|| format!("cannot read docker credentials of app {}", cr.name_any()))?;
        Ok(Some(docker_credentials(&config, &docker.image)?))
    }
}

fn docker_config(cr: &App) -> Result<DockerConfig> {
    let params = &cr.spec.for_provider;
    if params.lifecycle != AppLifecycle::Docker {
        bail!(
            "app {} uses the {} lifecycle; only docker apps can be pushed",
            cr.name_any(),
            params.lifecycle.as_str()
        );
    }
    params
        .docker
        .clone()
        .ok_or_else(|| anyhow!("app {} has no docker image", cr.name_any()))
}

fn desired_state(stopped: Option<bool>) -> &'static str {
    if stopped.unwrap_or(false) {
        APP_STATE_STOPPED
    } else {
        APP_STATE_STARTED
    }
}

fn health_check(observed: &ProcessHealthCheck) -> HealthCheck {
    HealthCheck {
        r#type: match observed.r#type.as_str() {
            "http" => HealthCheckType::Http,
            "process" => HealthCheckType::Process,
            _ => HealthCheckType::Port,
        },
        endpoint: observed.data.endpoint.clone(),
        invocation_timeout: observed.data.invocation_timeout,
        interval: observed.data.interval,
    }
}

fn process_observation(process: Process) -> ProcessObservation {
    ProcessObservation {
        timeout: process.health_check.as_ref().and_then(|hc| hc.data.timeout),
        health_check: process.health_check.as_ref().map(health_check),
        readiness_health_check: process.readiness_health_check.as_ref().map(health_check),
        guid: Some(process.guid),
        r#type: non_empty(process.r#type),
        command: process.command,
        instances: Some(process.instances),
        memory_in_mb: Some(process.memory_in_mb),
        disk_in_mb: Some(process.disk_in_mb),
    }
}

fn unset_or<T: PartialEq>(desired: Option<T>, observed: Option<T>) -> bool {
    desired.is_none_or(|d| observed == Some(d))
}

fn health_check_matches(desired: Option<&HealthCheck>, observed: Option<&HealthCheck>) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    observed.is_some_and(|o| {
        o.r#type == desired.r#type
            && unset_or(desired.endpoint.as_ref(), o.endpoint.as_ref())
            && unset_or(desired.invocation_timeout, o.invocation_timeout)
            && unset_or(desired.interval, o.interval)
    })
}

/// True when every process setting present in `desired` matches `observed`.
/// Settings left unset are not managed.
#[must_use]
pub fn process_up_to_date(desired: Option<&ProcessConfig>, observed: Option<&ProcessObservation>) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    let Some(observed) = observed else {
        return false;
    };
    unset_or(desired.command.as_ref(), observed.command.as_ref())
        && unset_or(desired.instances, observed.instances)
        && unset_or(desired.memory_in_mb, observed.memory_in_mb)
        && unset_or(desired.disk_in_mb, observed.disk_in_mb)
        && unset_or(desired.timeout, observed.timeout)
        && health_check_matches(desired.health_check.as_ref(), observed.health_check.as_ref())
        && health_check_matches(
            desired.readiness_health_check.as_ref(),
            observed.readiness_health_check.as_ref(),
        )
}

impl ManagedKind for App {
    const KIND: &'static str = KIND_APP;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(AppExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<App> for AppExternal {
    async fn resolve_references(&self, cr: &mut App) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .space(&mut cr.spec.for_provider.space)
            .await
    }

    async fn observe(&self, cr: &mut App) -> Result<ExternalObservation> {
        let apps = self.cf.apps();
        let lookup = match external_guid(cr) {
            Some(guid) => apps.get(guid).await,
            None => {
                let params = &cr.spec.for_provider;
                apps.single_by_name(&params.name, params.space.guid()).await
            }
        };
        let Some(app) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let params = &cr.spec.for_provider;
        let process_type = params.process.as_ref().and_then(|p| p.r#type.clone());
        let droplet = apps.current_droplet(&app.guid).await?;
        let process = found(apps.process(&app.guid, process_type.as_deref()).await)?
            .map(process_observation);

        let docker_image = droplet.as_ref().and_then(|d| d.image.clone());
        let image_current = params
            .docker
            .as_ref()
            .is_none_or(|d| docker_image.as_deref() == Some(d.image.as_str()));
        let wanted_state = desired_state(params.stopped);
        let up_to_date = params.name == app.name
            && image_current
            && process_up_to_date(params.process.as_ref(), process.as_ref())
            && app.state == wanted_state;

        let adopted = adopt(cr, &app.guid);
        let state = app.state.clone();
        *cr.at_provider_mut() = AppObservation {
            id: Some(app.guid),
            name: Some(app.name),
            state: non_empty(app.state),
            lifecycle: non_empty(app.lifecycle.r#type),
            space: app.relationships.space.guid().map(str::to_string),
            docker_image,
            droplet: droplet.map(|d| d.guid),
            process,
            created_at: non_empty(app.created_at),
        };

        if state == wanted_state {
            status::available(cr);
        } else {
            status::unavailable(cr, &format!("app is {state}, want {wanted_state}"));
        }
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut App) -> Result<()> {
        let docker = docker_config(cr)?;
        let params = cr.spec.for_provider.clone();
        let space = params
            .space
            .guid()
            .ok_or_else(|| anyhow!("space of app {} is not resolved", cr.name_any()))?;
        let credentials = self.credentials(cr, &docker).await?;
        let image = DockerImage {
            image: &docker.image,
            credentials: credentials.as_ref(),
        };

        let mut created: Option<String> = None;
        let result = self
            .cf
            .create_and_push(
                &params.name,
                space,
                &image,
                params.process.as_ref(),
                params.stopped.unwrap_or(false),
                |app| created = Some(app.guid.clone()),
            )
            .await;
        if let Some(guid) = &created {
            set_external_name(cr, guid);
            cr.at_provider_mut().id = Some(guid.clone());
        }

        let app = match result {
            Ok(app) => app,
            Err(err) if created.is_none() && err.is_already_exists() => {
                debug!(name = %params.name, space = %space, "app exists, adopting");
                let app = self.cf.apps().single_by_name(&params.name, Some(space)).await?;
                set_external_name(cr, &app.guid);
                cr.at_provider_mut().id = Some(app.guid.clone());
                app
            }
            Err(err) => return Err(err.into()),
        };
        info!(name = %params.name, guid = %app.guid, state = %app.state, "Pushed app");
        cr.at_provider_mut().state = non_empty(app.state);
        Ok(())
    }

    async fn update(&self, cr: &mut App) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let observed = cr.at_provider().cloned().unwrap_or_default();
        let docker = docker_config(cr)?;
        let params = cr.spec.for_provider.clone();
        let apps = self.cf.apps();

        if observed.name.as_deref() != Some(params.name.as_str()) {
            apps.rename(&id, &params.name).await?;
            info!(guid = %id, name = %params.name, "Renamed app");
        }

        if observed.docker_image.as_deref() != Some(docker.image.as_str()) {
            let credentials = self.credentials(cr, &docker).await?;
            let image = DockerImage {
                image: &docker.image,
                credentials: credentials.as_ref(),
            };
            let app = self
                .cf
                .update_and_push(
                    &id,
                    &image,
                    params.process.as_ref(),
                    params.stopped.unwrap_or(false),
                )
                .await?;
            info!(guid = %id, image = %docker.image, "Re-pushed app");
            cr.at_provider_mut().state = non_empty(app.state);
            return Ok(());
        }

        if let Some(process) = &params.process {
            if !process_up_to_date(Some(process), observed.process.as_ref()) {
                self.cf.apply_process(&id, process).await?;
                debug!(guid = %id, "applied process settings");
            }
        }

        let wanted_state = desired_state(params.stopped);
        if observed.state.as_deref() != Some(wanted_state) {
            let app = if wanted_state == APP_STATE_STOPPED {
                apps.stop(&id).await?
            } else {
                apps.start(&id).await?
            };
            info!(guid = %id, state = %app.state, "Changed app state");
            cr.at_provider_mut().state = non_empty(app.state);
        }
        Ok(())
    }

    async fn delete(&self, cr: &mut App) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(&format!("app {id}"), self.cf.apps().delete(&id).await)
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod app_tests;
