// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scope reference resolution.
//!
//! Turns each `{GUID | ref | selector | name}` scope of a spec into a CF GUID
//! and writes it back into the GUID field:
//!
//! - GUID: kept as is
//! - `*Ref`: external-name of the named resource in the same namespace
//! - `*Selector`: external-name of the first matching resource, by name
//! - `*Name`: unique CF match of a `names=` list query
//!
//! A referenced resource that has no external-name yet is an error, so the
//! dependent resource requeues until its parent has been reconciled.

use crate::cf::CfClient;
use crate::context::Context;
use crate::crd::{
    external_name, App, AppScope, Domain, DomainScope, OrgScope, Organization, Route,
    RouteScope, ScopeReference, ServiceInstance, ServiceInstanceScope, Space, SpaceScope,
};
use crate::selector::matches_selector;
use anyhow::{anyhow, Context as _, Result};
use kube::api::ListParams;
use kube::core::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use tracing::debug;

/// Resolves scope references of one resource.
pub struct Resolver<'a> {
    ctx: &'a Context,
    cf: &'a CfClient,
    namespace: &'a str,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(ctx: &'a Context, cf: &'a CfClient, namespace: &'a str) -> Self {
        Self { ctx, cf, namespace }
    }

    /// Resolves an organization scope.
    ///
    /// # Errors
    ///
    /// Returns an error when the referenced resource or CF organization
    /// cannot be found.
    pub async fn org(&self, scope: &mut OrgScope) -> Result<()> {
        self.resolve::<_, Organization, _, _>(scope, |name| async move {
            Ok::<_, anyhow::Error>(self.cf.organizations().single_by_name(&name).await?.guid)
        })
        .await
    }

    /// Resolves a space scope. A `spaceName` is looked up within `orgName`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error when the referenced resource or CF space cannot be
    /// found.
    pub async fn space(&self, scope: &mut SpaceScope) -> Result<()> {
        let org_name = scope.org_name.clone();
        self.resolve::<_, Space, _, _>(scope, |name| async move {
            let org = match org_name.as_deref() {
                Some(org_name) => Some(self.cf.organizations().single_by_name(org_name).await?.guid),
                None => None,
            };
            Ok::<_, anyhow::Error>(self.cf.spaces().single_by_name(&name, org.as_deref()).await?.guid)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error when the referenced resource or CF domain cannot be
    /// found.
    pub async fn domain(&self, scope: &mut DomainScope) -> Result<()> {
        self.resolve::<_, Domain, _, _>(scope, |name| async move {
            Ok::<_, anyhow::Error>(self.cf.domains().single_by_name(&name).await?.guid)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error when the referenced resource cannot be found, or when
    /// the name matches zero or several service instances.
    pub async fn service_instance(&self, scope: &mut ServiceInstanceScope) -> Result<()> {
        self.resolve::<_, ServiceInstance, _, _>(scope, |name| async move {
            Ok::<_, anyhow::Error>(self
                .cf
                .service_instances()
                .single_by_name(&name, None)
                .await?
                .guid)
        })
        .await
    }

    /// Resolves an app scope. An `appName` is looked up in `space_guid`, or
    /// across every visible space when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when the referenced resource or CF app cannot be
    /// found.
    pub async fn app(&self, scope: &mut AppScope, space_guid: Option<&str>) -> Result<()> {
        self.resolve::<_, App, _, _>(scope, |name| async move {
            Ok::<_, anyhow::Error>(self.cf.apps().single_by_name(&name, space_guid).await?.guid)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns an error when the referenced `Route` resource has no
    /// external-name yet.
    pub async fn route(&self, scope: &mut RouteScope) -> Result<()> {
        self.resolve::<_, Route, _, _>(scope, |name| async move {
            Err::<String, _>(anyhow!("routes cannot be looked up by name ({name})"))
        })
        .await
    }

    /// Resolves every reference of a list (quota `orgRefs` / `spaceRefs`).
    ///
    /// # Errors
    ///
    /// Returns an error when one of the referenced resources has no
    /// external-name yet.
    pub async fn external_names<K>(&self, names: impl IntoIterator<Item = &str>) -> Result<Vec<String>>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let mut guids = Vec::new();
        for name in names {
            guids.push(self.by_reference::<K>(name).await?);
        }
        Ok(guids)
    }

    async fn resolve<S, K, F, Fut>(&self, scope: &mut S, by_name: F) -> Result<()>
    where
        S: ScopeReference,
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if scope.guid().is_some() {
            return Ok(());
        }

        let guid = if let Some(reference) = scope.reference() {
            let name = reference.name.clone();
            self.by_reference::<K>(&name).await?
        } else if let Some(selector) = scope.selector() {
            let selector = selector.clone();
            self.by_selector::<K>(&selector).await?
        } else if let Some(name) = scope.lookup_name() {
            let name = name.to_string();
            by_name(name.clone())
                .await
                .with_context(|| format!("cannot resolve {} by name {name}", S::FIELD))?
        } else {
            return Ok(());
        };

        debug!(field = S::FIELD, guid = %guid, "resolved reference");
        scope.set_guid(guid);
        Ok(())
    }

    async fn by_reference<K>(&self, name: &str) -> Result<String>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let kind = K::kind(&());
        let target = self
            .ctx
            .api::<K>(self.namespace)
            .get(name)
            .await
            .with_context(|| format!("cannot get referenced {kind} {}/{name}", self.namespace))?;
        external_name(&target)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("referenced {kind} {}/{name} is not resolved yet", self.namespace))
    }

    async fn by_selector<K>(&self, selector: &crate::crd::LabelSelector) -> Result<String>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let kind = K::kind(&());
        let mut candidates: Vec<K> = self
            .ctx
            .api::<K>(self.namespace)
            .list(&ListParams::default())
            .await
            .with_context(|| format!("cannot list {kind} in {}", self.namespace))?
            .items
            .into_iter()
            .filter(|item| matches_selector(selector, item.labels()))
            .collect();
        candidates.sort_by_key(|item| item.name_any());

        candidates
            .iter()
            .find_map(|item| external_name(item).map(str::to_string))
            .ok_or_else(|| anyhow!("no resolved {kind} in {} matches the selector", self.namespace))
    }
}

#[cfg(test)]
#[path = "references_tests.rs"]
mod references_tests;
