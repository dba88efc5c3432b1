// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Organization` and `Space` external clients.
//!
//! Both kinds are matched by GUID once the external-name holds one, and by
//! name (within the parent organization for spaces) before that. `suspended`
//! and `allowSsh` are late-initialized from CF when left unset.

use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use super::status;
use crate::cf::CfClient;
use crate::constants::{KIND_ORGANIZATION, KIND_SPACE};
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, Organization, OrganizationObservation, ScopeReference, Space,
    SpaceObservation, ValidationError,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct OrganizationExternal {
    cf: CfClient,
}

impl ManagedKind for Organization {
    const KIND: &'static str = KIND_ORGANIZATION;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(_ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrganizationExternal { cf })
    }
}

impl OrganizationExternal {
    #[must_use]
    pub fn new(cf: CfClient) -> Self {
        Self { cf }
    }
}

#[async_trait]
impl ExternalClient<Organization> for OrganizationExternal {
    async fn observe(&self, cr: &mut Organization) -> Result<ExternalObservation> {
        let orgs = self.cf.organizations();
        let lookup = match external_guid(cr) {
            Some(guid) => orgs.get(guid).await,
            None => orgs.single_by_name(&cr.spec.for_provider.name).await,
        };
        let Some(org) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &org.guid);
        let params = &mut cr.spec.for_provider;
        let late_init = params.suspended.is_none();
        if late_init {
            params.suspended = Some(org.suspended);
        }
        let up_to_date = params.name == org.name && params.suspended == Some(org.suspended);

        *cr.at_provider_mut() = OrganizationObservation {
            id: Some(org.guid),
            name: Some(org.name),
            suspended: Some(org.suspended),
            created_at: non_empty(org.created_at),
            updated_at: non_empty(org.updated_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted || late_init))
    }

    async fn create(&self, cr: &mut Organization) -> Result<()> {
        let orgs = self.cf.organizations();
        let params = &cr.spec.for_provider;
        let org = match orgs.create(&params.name, params.suspended).await {
            Ok(org) => org,
            Err(err) if err.is_already_exists() => {
                debug!(name = %params.name, "organization exists, adopting");
                orgs.single_by_name(&params.name).await?
            }
            Err(err) => return Err(err.into()),
        };
        set_external_name(cr, &org.guid);
        cr.at_provider_mut().id = Some(org.guid);
        Ok(())
    }

    async fn update(&self, cr: &mut Organization) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let params = &cr.spec.for_provider;
        self.cf
            .organizations()
            .update(&id, &params.name, params.suspended)
            .await?;
        Ok(())
    }

    async fn delete(&self, cr: &mut Organization) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(
            &format!("organization {id}"),
            self.cf.organizations().delete(&id).await,
        )
    }
}

pub struct SpaceExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl ManagedKind for Space {
    const KIND: &'static str = KIND_SPACE;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceExternal { ctx, cf })
    }
}

impl SpaceExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }
}

#[async_trait]
impl ExternalClient<Space> for SpaceExternal {
    async fn resolve_references(&self, cr: &mut Space) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .org(&mut cr.spec.for_provider.org)
            .await
    }

    async fn observe(&self, cr: &mut Space) -> Result<ExternalObservation> {
        let spaces = self.cf.spaces();
        let lookup = match external_guid(cr) {
            Some(guid) => spaces.get(guid).await,
            None => {
                let params = &cr.spec.for_provider;
                spaces.single_by_name(&params.name, params.org.guid()).await
            }
        };
        let Some(space) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };
        let ssh = spaces.ssh_enabled(&space.guid).await?;

        let adopted = adopt(cr, &space.guid);
        let params = &mut cr.spec.for_provider;
        let late_init = params.allow_ssh.is_none();
        if late_init {
            params.allow_ssh = Some(ssh);
        }
        let up_to_date = params.name == space.name && params.allow_ssh == Some(ssh);

        let org = space.org_guid().map(str::to_string);
        *cr.at_provider_mut() = SpaceObservation {
            id: Some(space.guid),
            name: Some(space.name),
            org,
            allow_ssh: Some(ssh),
            created_at: non_empty(space.created_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted || late_init))
    }

    async fn create(&self, cr: &mut Space) -> Result<()> {
        let spaces = self.cf.spaces();
        let params = &cr.spec.for_provider;
        let org = params
            .org
            .guid()
            .ok_or_else(|| anyhow!("org of space {} is not resolved", cr.name_any()))?;
        let space = match spaces.create(&params.name, org).await {
            Ok(space) => space,
            Err(err) if err.is_already_exists() => {
                debug!(name = %params.name, org = %org, "space exists, adopting");
                spaces.single_by_name(&params.name, Some(org)).await?
            }
            Err(err) => return Err(err.into()),
        };
        let allow_ssh = params.allow_ssh;

        set_external_name(cr, &space.guid);
        cr.at_provider_mut().id = Some(space.guid.clone());
        if let Some(enabled) = allow_ssh {
            spaces.set_ssh_enabled(&space.guid, enabled).await?;
        }
        Ok(())
    }

    async fn update(&self, cr: &mut Space) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let observed = cr.at_provider().cloned().unwrap_or_default();
        let params = &cr.spec.for_provider;
        let spaces = self.cf.spaces();

        if observed.name.as_deref() != Some(params.name.as_str()) {
            spaces.rename(&id, &params.name).await?;
            info!(guid = %id, name = %params.name, "Renamed space");
        }
        if let Some(enabled) = params.allow_ssh {
            if observed.allow_ssh != Some(enabled) {
                spaces.set_ssh_enabled(&id, enabled).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, cr: &mut Space) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(&format!("space {id}"), self.cf.spaces().delete(&id).await)
    }
}

#[cfg(test)]
#[path = "organization_tests.rs"]
mod organization_tests;
