// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Domain` and `Route` external clients.
//!
//! Only CF labels and annotations can change after either is created. A
//! route that still has destinations is never deleted.

use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use super::status;
use crate::cf::routes::{Destination, RouteKey};
use crate::cf::CfClient;
use crate::constants::{KIND_DOMAIN, KIND_ROUTE};
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, Domain, DomainObservation, Route, RouteDestination,
    RouteObservation, ScopeReference, ValidationError,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

pub struct DomainExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl DomainExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }
}

impl ManagedKind for Domain {
    const KIND: &'static str = KIND_DOMAIN;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(DomainExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<Domain> for DomainExternal {
    async fn resolve_references(&self, cr: &mut Domain) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .org(&mut cr.spec.for_provider.org)
            .await
    }

    async fn observe(&self, cr: &mut Domain) -> Result<ExternalObservation> {
        let domains = self.cf.domains();
        let lookup = match external_guid(cr) {
            Some(guid) => domains.get(guid).await,
            None => domains.single_by_name(&cr.spec.for_provider.name).await,
        };
        let Some(domain) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &domain.guid);
        let params = &mut cr.spec.for_provider;
        let late_init = params.internal.is_none();
        if late_init {
            params.internal = Some(domain.internal);
        }
        let up_to_date = domain.metadata.satisfies(&params.metadata);

        *cr.at_provider_mut() = DomainObservation {
            id: Some(domain.guid.clone()),
            name: Some(domain.name.clone()),
            internal: Some(domain.internal),
            org: domain.relationships.organization.guid().map(str::to_string),
            supported_protocols: domain.supported_protocols,
            created_at: non_empty(domain.created_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted || late_init))
    }

    async fn create(&self, cr: &mut Domain) -> Result<()> {
        let domains = self.cf.domains();
        let params = &cr.spec.for_provider;
        let domain = match domains
            .create(&params.name, params.internal, params.org.guid(), &params.metadata)
            .await
        {
            Ok(domain) => domain,
            Err(err) if err.is_already_exists() => {
                debug!(name = %params.name, "domain exists, adopting");
                domains.single_by_name(&params.name).await?
            }
            Err(err) => return Err(err.into()),
        };
        set_external_name(cr, &domain.guid);
        cr.at_provider_mut().id = Some(domain.guid);
        Ok(())
    }

    async fn update(&self, cr: &mut Domain) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        self.cf
            .domains()
            .update_metadata(&id, &cr.spec.for_provider.metadata)
            .await?;
        Ok(())
    }

    async fn delete(&self, cr: &mut Domain) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(&format!("domain {id}"), self.cf.domains().delete(&id).await)
    }
}

pub struct RouteExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl RouteExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    fn key(cr: &Route) -> Result<RouteKey> {
        let params = &cr.spec.for_provider;
        let space = params
            .space
            .guid()
            .ok_or_else(|| anyhow!("space of route {} is not resolved", cr.name_any()))?;
        let domain = params
            .domain
            .guid()
            .ok_or_else(|| anyhow!("domain of route {} is not resolved", cr.name_any()))?;
        Ok(RouteKey {
            space: space.to_string(),
            domain: domain.to_string(),
            host: params.host.clone().unwrap_or_default(),
            path: params.path.clone().unwrap_or_default(),
            port: params.port,
        })
    }
}

fn destination(d: Destination) -> RouteDestination {
    RouteDestination {
        guid: non_empty(d.guid),
        app: d.app.guid,
        port: d.port,
        process: d.app.process.map(|p| p.r#type),
    }
}

impl ManagedKind for Route {
    const KIND: &'static str = KIND_ROUTE;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(RouteExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<Route> for RouteExternal {
    async fn resolve_references(&self, cr: &mut Route) -> Result<()> {
        let namespace = namespace_of(cr)?;
        let resolver = Resolver::new(&self.ctx, &self.cf, &namespace);
        resolver.space(&mut cr.spec.for_provider.space).await?;
        resolver.domain(&mut cr.spec.for_provider.domain).await
    }

    async fn observe(&self, cr: &mut Route) -> Result<ExternalObservation> {
        let routes = self.cf.routes();
        let lookup = match external_guid(cr) {
            Some(guid) => routes.get(guid).await,
            None => routes.single(&Self::key(cr)?).await,
        };
        let Some(route) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &route.guid);
        let up_to_date = route.metadata.satisfies(&cr.spec.for_provider.metadata);

        *cr.at_provider_mut() = RouteObservation {
            id: Some(route.guid),
            host: non_empty(route.host),
            path: non_empty(route.path),
            port: route.port,
            url: non_empty(route.url),
            protocol: non_empty(route.protocol),
            destinations: route.destinations.into_iter().map(destination).collect(),
            created_at: non_empty(route.created_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut Route) -> Result<()> {
        let routes = self.cf.routes();
        let key = Self::key(cr)?;
        let route = match routes.create(&key, &cr.spec.for_provider.metadata).await {
            Ok(route) => route,
            Err(err) if err.is_already_exists() => {
                debug!(host = %key.host, path = %key.path, "route exists, adopting");
                routes.single(&key).await?
            }
            Err(err) => return Err(err.into()),
        };
        set_external_name(cr, &route.guid);
        cr.at_provider_mut().id = Some(route.guid);
        Ok(())
    }

    async fn update(&self, cr: &mut Route) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        self.cf
            .routes()
            .update_metadata(&id, &cr.spec.for_provider.metadata)
            .await?;
        Ok(())
    }

    async fn delete(&self, cr: &mut Route) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let apps: Vec<&str> = cr
            .at_provider()
            .map(|o| o.destinations.iter().map(|d| d.app.as_str()).collect())
            .unwrap_or_default();
        if !apps.is_empty() {
            bail!(
                "cannot delete route {id}: it has active bindings to apps {}",
                apps.join(", ")
            );
        }
        delete_accepted(&format!("route {id}"), self.cf.routes().delete(&id).await)
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod domain_tests;
