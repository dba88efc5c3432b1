// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceRouteBinding` external client. A binding is identified by its
//! route and service instance, neither of which can change.

use super::last_operation::{self, is_delete_in_progress};
use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use crate::cf::{CfClient, CfError};
use crate::constants::KIND_SERVICE_ROUTE_BINDING;
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, ScopeReference, ServiceRouteBinding,
    ServiceRouteBindingObservation, ValidationError,
};
use crate::secrets::json_source;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ServiceRouteBindingExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl ServiceRouteBindingExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    fn key(cr: &ServiceRouteBinding) -> Result<(String, String)> {
        let params = &cr.spec.for_provider;
        let route = params
            .route
            .guid()
            .ok_or_else(|| anyhow!("route of binding {} is not resolved", cr.name_any()))?;
        let service_instance = params.service_instance.guid().ok_or_else(|| {
            anyhow!("service instance of binding {} is not resolved", cr.name_any())
        })?;
        Ok((route.to_string(), service_instance.to_string()))
    }
}

fn immutable(field: &str, desired: &str, observed: Option<&str>) -> Result<()> {
    match observed {
        Some(observed) if observed != desired => Err(CfError::Immutable {
            field: field.to_string(),
            desired: desired.to_string(),
            observed: observed.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

impl ManagedKind for ServiceRouteBinding {
    const KIND: &'static str = KIND_SERVICE_ROUTE_BINDING;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(ServiceRouteBindingExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<ServiceRouteBinding> for ServiceRouteBindingExternal {
    async fn resolve_references(&self, cr: &mut ServiceRouteBinding) -> Result<()> {
        let namespace = namespace_of(cr)?;
        let resolver = Resolver::new(&self.ctx, &self.cf, &namespace);
        resolver.route(&mut cr.spec.for_provider.route).await?;
        resolver
            .service_instance(&mut cr.spec.for_provider.service_instance)
            .await
    }

    async fn observe(&self, cr: &mut ServiceRouteBinding) -> Result<ExternalObservation> {
        let bindings = self.cf.service_route_bindings();
        let lookup = match external_guid(cr) {
            Some(guid) => bindings.get(guid).await,
            None => {
                let (route, service_instance) = Self::key(cr)?;
                bindings.single(&route, &service_instance).await
            }
        };
        let Some(binding) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        // Unresolved references are only possible under observe-only policies.
        if let Ok((route, service_instance)) = Self::key(cr) {
            immutable("route", &route, binding.relationships.route.guid())?;
            immutable(
                "serviceInstance",
                &service_instance,
                binding.relationships.service_instance.guid(),
            )?;
        }

        let adopted = adopt(cr, &binding.guid);
        let up_to_date = binding.metadata.satisfies(&cr.spec.for_provider.metadata);
        let last_op = binding.last_operation.clone();
        *cr.at_provider_mut() = ServiceRouteBindingObservation {
            id: Some(binding.guid),
            route: binding.relationships.route.guid().map(str::to_string),
            service_instance: binding
                .relationships
                .service_instance
                .guid()
                .map(str::to_string),
            route_service_url: binding.route_service_url,
            last_operation: binding.last_operation,
            created_at: non_empty(binding.created_at),
        };

        let observation = last_operation::observe(cr, last_op.as_ref(), up_to_date)?;
        Ok(observation.late_initialized(adopted))
    }

    async fn create(&self, cr: &mut ServiceRouteBinding) -> Result<()> {
        let (route, service_instance) = Self::key(cr)?;
        let namespace = namespace_of(cr)?;
        let params = &cr.spec.for_provider;
        let parameters = json_source(
            &self.ctx.client,
            &namespace,
            params.parameters.as_ref(),
            None,
            params.params_secret_ref.as_ref(),
        )
        .await?;
        let bindings = self.cf.service_route_bindings();

        let accepted = match bindings
            .create(&route, &service_instance, parameters.as_ref(), &params.metadata)
            .await
        {
            Ok(accepted) => accepted,
            Err(err) if err.is_already_exists() => {
                debug!(route = %route, service_instance = %service_instance, "route binding exists, adopting");
                let existing = bindings.single(&route, &service_instance).await?;
                set_external_name(cr, &existing.guid);
                cr.at_provider_mut().id = Some(existing.guid);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let guid = match &accepted.resource {
            Some(binding) => binding.guid.clone(),
            None => bindings.single(&route, &service_instance).await?.guid,
        };
        set_external_name(cr, &guid);
        cr.at_provider_mut().id = Some(guid.clone());

        self.cf.wait_accepted(&accepted).await?;
        info!(route = %route, service_instance = %service_instance, guid = %guid, "Bound route to service instance");
        Ok(())
    }

    async fn update(&self, cr: &mut ServiceRouteBinding) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        self.cf
            .service_route_bindings()
            .update_metadata(&id, &cr.spec.for_provider.metadata)
            .await?;
        Ok(())
    }

    async fn delete(&self, cr: &mut ServiceRouteBinding) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        if is_delete_in_progress(cr.at_provider().and_then(|o| o.last_operation.as_ref())) {
            debug!(guid = %id, "service route binding delete already in progress");
            return Ok(());
        }
        delete_accepted(
            &format!("service route binding {id}"),
            self.cf.service_route_bindings().delete(&id).await,
        )
    }
}

#[cfg(test)]
#[path = "service_route_binding_tests.rs"]
mod service_route_binding_tests;
