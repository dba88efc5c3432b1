// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceInstance` external client.
//!
//! Managed instances are provisioned asynchronously by their broker, so every
//! observe goes through the `last_operation` table in
//! [`last_operation`](super::last_operation). A create that the broker failed
//! is reported as absent; the following create deletes the failed instance
//! before submitting a new one.
//!
//! Parameters and credentials never land in the status. Only the SHA-256 of
//! the last payload sent to CF is kept, and a different hash is drift.

use super::last_operation::{self, is_delete_in_progress, is_failed_create};
use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use crate::cf::service_instances::{InstancePayload, ServiceInstance as CfServiceInstance};
use crate::cf::CfClient;
use crate::constants::KIND_SERVICE_INSTANCE;
use crate::context::{Context, Settings};
use crate::crd::{
    external_guid, set_external_name, ScopeReference, ServiceInstance,
    ServiceInstanceObservation, ServiceInstanceParameters, ServiceInstanceType, ValidationError,
};
use crate::secrets::json_source;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Hex SHA-256 of the JSON encoding of `data`.
#[must_use]
pub fn payload_hash<T: Serialize>(data: &T) -> String {
    let json = serde_json::to_string(data).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct ServiceInstanceExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl ServiceInstanceExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    async fn plan_guid(&self, params: &ServiceInstanceParameters) -> Result<Option<String>> {
        let Some(plan) = &params.service_plan else {
            return Ok(None);
        };
        if let Some(id) = &plan.id {
            return Ok(Some(id.clone()));
        }
        match (&plan.offering, &plan.plan) {
            (Some(offering), Some(name)) => Ok(Some(
                self.cf.service_instances().plan_guid(offering, name).await?,
            )),
            _ => Ok(None),
        }
    }

    /// The desired state as sent to CF, and the hash of its parameters or
    /// credentials.
    async fn payload(&self, cr: &ServiceInstance) -> Result<(InstancePayload, Option<String>)> {
        let namespace = namespace_of(cr)?;
        let params = &cr.spec.for_provider;
        let (parameters, credentials) = match params.r#type {
            ServiceInstanceType::Managed => {
                let parameters = json_source(
                    &self.ctx.client,
                    &namespace,
                    params.parameters.as_ref(),
                    params.json_params.as_deref(),
                    params.params_secret_ref.as_ref(),
                )
                .await?;
                (parameters, None)
            }
            ServiceInstanceType::UserProvided => {
                let credentials = json_source(
                    &self.ctx.client,
                    &namespace,
                    params.credentials.as_ref(),
                    params.json_credentials.as_deref(),
                    params.credentials_secret_ref.as_ref(),
                )
                .await?;
                (None, credentials)
            }
        };
        let hash = parameters.as_ref().or(credentials.as_ref()).map(payload_hash);
        let payload = InstancePayload {
            name: params.name.clone(),
            plan: self.plan_guid(params).await?,
            parameters,
            credentials,
            tags: params.tags.clone(),
            syslog_drain_url: params.syslog_drain_url.clone(),
            route_service_url: params.route_service_url.clone(),
            metadata: params.metadata.clone(),
        };
        Ok((payload, hash))
    }

    /// Deletes the instance a failed create left behind and waits for it to
    /// be gone.
    async fn delete_failed(&self, guid: &str) -> Result<()> {
        info!(guid = %guid, "Deleting service instance left by a failed create");
        match self.cf.service_instances().delete(guid).await {
            Ok(Some(job)) => match self.cf.wait_for_job(&job).await {
                Err(err) if !err.is_not_found() => Err(err.into()),
                _ => Ok(()),
            },
            Ok(None) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn tags_match(desired: Option<&Vec<String>>, observed: &[String]) -> bool {
    desired.is_none_or(|tags| {
        tags.iter().collect::<BTreeSet<_>>() == observed.iter().collect::<BTreeSet<_>>()
    })
}

fn up_to_date(
    params: &ServiceInstanceParameters,
    plan: Option<&str>,
    hash: Option<&String>,
    recorded_hash: Option<&String>,
    si: &CfServiceInstance,
) -> bool {
    let user_provided = params.r#type == ServiceInstanceType::UserProvided;
    params.name == si.name
        && plan.is_none_or(|p| si.relationships.service_plan.guid() == Some(p))
        && hash.is_none_or(|h| recorded_hash == Some(h))
        && tags_match(params.tags.as_ref(), &si.tags)
        && (!user_provided
            || (params
                .syslog_drain_url
                .as_ref()
                .is_none_or(|u| si.syslog_drain_url.as_ref() == Some(u))
                && params
                    .route_service_url
                    .as_ref()
                    .is_none_or(|u| si.route_service_url.as_ref() == Some(u))))
        && si.metadata.satisfies(&params.metadata)
}

impl ManagedKind for ServiceInstance {
    const KIND: &'static str = KIND_SERVICE_INSTANCE;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn reconcile_timeout(settings: &Settings) -> Duration {
        settings.service_instance_timeout
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(ServiceInstanceExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<ServiceInstance> for ServiceInstanceExternal {
    async fn resolve_references(&self, cr: &mut ServiceInstance) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .space(&mut cr.spec.for_provider.space)
            .await
    }

    async fn observe(&self, cr: &mut ServiceInstance) -> Result<ExternalObservation> {
        let instances = self.cf.service_instances();
        let lookup = match external_guid(cr) {
            Some(guid) => instances.get(guid).await,
            None => {
                let params = &cr.spec.for_provider;
                instances.single_by_name(&params.name, params.space.guid()).await
            }
        };
        let Some(si) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let (payload, hash) = self.payload(cr).await?;
        let recorded_hash = cr.at_provider().and_then(|o| o.credentials.clone());
        let current = up_to_date(
            &cr.spec.for_provider,
            payload.plan.as_deref(),
            hash.as_ref(),
            recorded_hash.as_ref(),
            &si,
        );

        let adopted = adopt(cr, &si.guid);
        let last_op = si.last_operation.clone();
        *cr.at_provider_mut() = ServiceInstanceObservation {
            id: Some(si.guid),
            name: Some(si.name),
            r#type: non_empty(si.r#type),
            space: si.relationships.space.guid().map(str::to_string),
            service_plan: si.relationships.service_plan.guid().map(str::to_string),
            credentials: recorded_hash,
            last_operation: si.last_operation,
            tags: si.tags,
            maintenance_info: si.maintenance_info,
            dashboard_url: si.dashboard_url,
            created_at: non_empty(si.created_at),
        };

        let observation = last_operation::observe(cr, last_op.as_ref(), current)?;
        Ok(observation.late_initialized(adopted))
    }

    async fn create(&self, cr: &mut ServiceInstance) -> Result<()> {
        let observed = cr.at_provider().cloned().unwrap_or_default();
        if is_failed_create(observed.last_operation.as_ref()) {
            if let Some(id) = &observed.id {
                self.delete_failed(id).await?;
            }
            cr.at_provider_mut().last_operation = None;
        }

        let (payload, hash) = self.payload(cr).await?;
        let params = &cr.spec.for_provider;
        let kind = params.r#type;
        let space = params
            .space
            .guid()
            .ok_or_else(|| anyhow!("space of service instance {} is not resolved", cr.name_any()))?
            .to_string();
        let instances = self.cf.service_instances();

        let accepted = match instances.create(kind, &space, &payload).await {
            Ok(accepted) => accepted,
            Err(err) if err.is_already_exists() => {
                debug!(name = %payload.name, space = %space, "service instance exists, adopting");
                let si = instances.single_by_name(&payload.name, Some(&space)).await?;
                set_external_name(cr, &si.guid);
                cr.at_provider_mut().id = Some(si.guid);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        // Managed creates answer with a job only; the instance is already listed.
        let guid = match &accepted.resource {
            Some(si) => si.guid.clone(),
            None => instances.single_by_name(&payload.name, Some(&space)).await?.guid,
        };
        set_external_name(cr, &guid);
        let at_provider = cr.at_provider_mut();
        at_provider.id = Some(guid.clone());
        at_provider.credentials = hash;

        self.cf.wait_accepted(&accepted).await?;
        info!(name = %payload.name, guid = %guid, kind = kind.as_str(), "Created service instance");
        Ok(())
    }

    async fn update(&self, cr: &mut ServiceInstance) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let (payload, hash) = self.payload(cr).await?;
        let accepted = self
            .cf
            .service_instances()
            .update(&id, cr.spec.for_provider.r#type, &payload)
            .await?;
        cr.at_provider_mut().credentials = hash;
        self.cf.wait_accepted(&accepted).await?;
        Ok(())
    }

    async fn delete(&self, cr: &mut ServiceInstance) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        if is_delete_in_progress(cr.at_provider().and_then(|o| o.last_operation.as_ref())) {
            debug!(guid = %id, "service instance delete already in progress");
            return Ok(());
        }
        delete_accepted(
            &format!("service instance {id}"),
            self.cf.service_instances().delete(&id).await,
        )
    }
}

#[cfg(test)]
#[path = "service_instance_tests.rs"]
mod service_instance_tests;
