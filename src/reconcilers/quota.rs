// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OrgQuota` and `SpaceQuota` external clients.
//!
//! Limits are compared exactly: an absent limit is unlimited in CF, so a
//! quota with a limit the spec leaves out is drifted. `allowPaidServicePlans`
//! is the exception, CF always reports it.
//!
//! An organization always has exactly one quota, so `OrgQuota` only ever
//! applies itself to more organizations. `SpaceQuota` keeps the space list
//! exact when `spaces` is set.

use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use super::status;
use crate::cf::quotas::observed_limits;
use crate::cf::{CfClient, CfError};
use crate::constants::{KIND_ORG_QUOTA, KIND_SPACE_QUOTA};
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, OrgQuota, OrgQuotaObservation, Organization, QuotaLimits,
    Reference, ScopeReference, Space, SpaceQuota, SpaceQuotaObservation, ValidationError,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Whether the observed limits satisfy the desired ones.
#[must_use]
pub fn limits_up_to_date(desired: &QuotaLimits, observed: &QuotaLimits) -> bool {
    let paid_plans = desired.allow_paid_service_plans.is_none()
        || desired.allow_paid_service_plans == observed.allow_paid_service_plans;
    paid_plans
        && QuotaLimits {
            allow_paid_service_plans: None,
            ..desired.clone()
        } == QuotaLimits {
            allow_paid_service_plans: None,
            ..observed.clone()
        }
}

/// Desired GUIDs not yet in `observed`, in spec order.
fn missing(desired: &[String], observed: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for guid in desired {
        if !observed.contains(guid) && !out.contains(guid) {
            out.push(guid.clone());
        }
    }
    out
}

/// Appends `resolved` to `guids` without duplicates.
fn merge(guids: &mut Option<Vec<String>>, resolved: Vec<String>) {
    if resolved.is_empty() {
        return;
    }
    let list = guids.get_or_insert_with(Vec::new);
    for guid in resolved {
        if !list.contains(&guid) {
            list.push(guid);
        }
    }
}

fn reference_names(refs: Option<&Vec<Reference>>) -> Vec<String> {
    refs.map(|refs| refs.iter().map(|r| r.name.clone()).collect())
        .unwrap_or_default()
}

pub struct OrgQuotaExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl OrgQuotaExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }
}

impl ManagedKind for OrgQuota {
    const KIND: &'static str = KIND_ORG_QUOTA;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrgQuotaExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<OrgQuota> for OrgQuotaExternal {
    async fn resolve_references(&self, cr: &mut OrgQuota) -> Result<()> {
        let names = reference_names(cr.spec.for_provider.org_refs.as_ref());
        if names.is_empty() {
            return Ok(());
        }
        let namespace = namespace_of(cr)?;
        let guids = Resolver::new(&self.ctx, &self.cf, &namespace)
            .external_names::<Organization>(names.iter().map(String::as_str))
            .await?;
        merge(&mut cr.spec.for_provider.orgs, guids);
        Ok(())
    }

    async fn observe(&self, cr: &mut OrgQuota) -> Result<ExternalObservation> {
        let quotas = self.cf.organization_quotas();
        let lookup = match external_guid(cr) {
            Some(guid) => quotas.get(guid).await,
            None => quotas.single_by_name(&cr.spec.for_provider.name).await,
        };
        let Some(quota) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &quota.guid);
        let limits = observed_limits(&quota.apps, &quota.services, &quota.routes);
        let orgs = quota.relationships.organizations.guids();
        let params = &cr.spec.for_provider;
        let up_to_date = params.name == quota.name
            && limits_up_to_date(&params.limits, &limits)
            && params.total_private_domains == quota.domains.total_domains
            && missing(params.orgs.as_deref().unwrap_or_default(), &orgs).is_empty();

        *cr.at_provider_mut() = OrgQuotaObservation {
            id: Some(quota.guid),
            name: Some(quota.name),
            limits,
            total_private_domains: quota.domains.total_domains,
            orgs,
            created_at: non_empty(quota.created_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut OrgQuota) -> Result<()> {
        let quotas = self.cf.organization_quotas();
        let params = &cr.spec.for_provider;
        let orgs = params.orgs.clone().unwrap_or_default();
        let quota = match quotas
            .create(&params.name, &params.limits, params.total_private_domains, &orgs)
            .await
        {
            Ok(quota) => quota,
            Err(err) if err.is_already_exists() => {
                debug!(name = %params.name, "organization quota exists, adopting");
                quotas.single_by_name(&params.name).await?
            }
            Err(err) => return Err(err.into()),
        };
        set_external_name(cr, &quota.guid);
        cr.at_provider_mut().id = Some(quota.guid);
        Ok(())
    }

    async fn update(&self, cr: &mut OrgQuota) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let observed = cr.at_provider().map(|o| o.orgs.clone()).unwrap_or_default();
        let params = &cr.spec.for_provider;
        let quotas = self.cf.organization_quotas();

        quotas
            .update(&id, &params.name, &params.limits, params.total_private_domains)
            .await?;
        let to_apply = missing(params.orgs.as_deref().unwrap_or_default(), &observed);
        if !to_apply.is_empty() {
            quotas.apply(&id, &to_apply).await?;
            info!(guid = %id, orgs = ?to_apply, "Applied organization quota");
        }
        Ok(())
    }

    async fn delete(&self, cr: &mut OrgQuota) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(
            &format!("organization quota {id}"),
            self.cf.organization_quotas().delete(&id).await,
        )
    }
}

pub struct SpaceQuotaExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl SpaceQuotaExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    fn org<'a>(cr: &'a SpaceQuota) -> Result<&'a str> {
        cr.spec
            .for_provider
            .org
            .guid()
            .ok_or_else(|| anyhow!("org of space quota {} is not resolved", cr.name_any()))
    }
}

impl ManagedKind for SpaceQuota {
    const KIND: &'static str = KIND_SPACE_QUOTA;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceQuotaExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<SpaceQuota> for SpaceQuotaExternal {
    async fn resolve_references(&self, cr: &mut SpaceQuota) -> Result<()> {
        let namespace = namespace_of(cr)?;
        let resolver = Resolver::new(&self.ctx, &self.cf, &namespace);
        resolver.org(&mut cr.spec.for_provider.org).await?;

        let names = reference_names(cr.spec.for_provider.space_refs.as_ref());
        let guids = resolver
            .external_names::<Space>(names.iter().map(String::as_str))
            .await?;
        merge(&mut cr.spec.for_provider.spaces, guids);
        Ok(())
    }

    async fn observe(&self, cr: &mut SpaceQuota) -> Result<ExternalObservation> {
        let quotas = self.cf.space_quotas();
        let lookup = match external_guid(cr) {
            Some(guid) => quotas.get(guid).await,
            None => {
                quotas
                    .single_by_name(&cr.spec.for_provider.name, Self::org(cr)?)
                    .await
            }
        };
        let Some(quota) = found(lookup)? else {
            return Ok(ExternalObservation::absent());
        };

        let observed_org = quota.relationships.organization.guid().map(str::to_string);
        if let (Some(desired), Some(observed)) =
            (cr.spec.for_provider.org.guid(), observed_org.as_deref())
        {
            if desired != observed {
                return Err(CfError::Immutable {
                    field: "org".to_string(),
                    desired: desired.to_string(),
                    observed: observed.to_string(),
                }
                .into());
            }
        }

        let adopted = adopt(cr, &quota.guid);
        let limits = observed_limits(&quota.apps, &quota.services, &quota.routes);
        let spaces = quota.relationships.spaces.guids();
        let params = &cr.spec.for_provider;
        let spaces_up_to_date = params.spaces.as_ref().is_none_or(|desired| {
            missing(desired, &spaces).is_empty() && missing(&spaces, desired).is_empty()
        });
        let up_to_date = params.name == quota.name
            && limits_up_to_date(&params.limits, &limits)
            && spaces_up_to_date;

        *cr.at_provider_mut() = SpaceQuotaObservation {
            id: Some(quota.guid),
            name: Some(quota.name),
            org: observed_org,
            limits,
            spaces,
            created_at: non_empty(quota.created_at),
        };
        status::available(cr);
        Ok(ExternalObservation::present(up_to_date).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut SpaceQuota) -> Result<()> {
        let quotas = self.cf.space_quotas();
        let org = Self::org(cr)?;
        let params = &cr.spec.for_provider;
        let spaces = params.spaces.clone().unwrap_or_default();
        let quota = match quotas.create(&params.name, org, &params.limits, &spaces).await {
            Ok(quota) => quota,
            Err(err) if err.is_already_exists() => {
                debug!(name = %params.name, org = %org, "space quota exists, adopting");
                quotas.single_by_name(&params.name, org).await?
            }
            Err(err) => return Err(err.into()),
        };
        set_external_name(cr, &quota.guid);
        cr.at_provider_mut().id = Some(quota.guid);
        Ok(())
    }

    async fn update(&self, cr: &mut SpaceQuota) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        let observed = cr.at_provider().map(|o| o.spaces.clone()).unwrap_or_default();
        let params = &cr.spec.for_provider;
        let quotas = self.cf.space_quotas();

        quotas.update(&id, &params.name, &params.limits).await?;

        if let Some(desired) = params.spaces.as_ref() {
            let to_apply = missing(desired, &observed);
            if !to_apply.is_empty() {
                quotas.apply(&id, &to_apply).await?;
                info!(guid = %id, spaces = ?to_apply, "Applied space quota");
            }
            for space in missing(&observed, desired) {
                quotas.remove(&id, &space).await?;
                info!(guid = %id, space = %space, "Removed space quota");
            }
        }
        Ok(())
    }

    async fn delete(&self, cr: &mut SpaceQuota) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(
            &format!("space quota {id}"),
            self.cf.space_quotas().delete(&id).await,
        )
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod quota_tests;
