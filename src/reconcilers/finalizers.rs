// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for managed resources.
//!
//! The managed reconciler adds [`MANAGED_FINALIZER`](crate::labels::MANAGED_FINALIZER)
//! before it first touches CF and removes it once the CF resource is gone
//! (or must be left alone), so a custom resource is never deleted while its
//! CF counterpart still needs cleanup.

use anyhow::{Context as _, Result};
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Bound shared by every managed kind.
pub trait Finalizable:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + std::fmt::Debug
    + serde::Serialize
    + for<'de> serde::Deserialize<'de>
{
}

impl<T> Finalizable for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>
{
}

/// Merge-patches `metadata.finalizers` to exactly `finalizers`.
async fn patch_finalizers<T: Finalizable>(
    client: &Client,
    resource: &T,
    finalizers: &[String],
) -> Result<()> {
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("failed to patch finalizers of {} {namespace}/{name}", T::kind(&())))?;
    Ok(())
}

/// Adds `finalizer` unless present. The in-memory copy is updated too, so the
/// caller sees the finalizer without re-reading the object.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T: Finalizable>(
    client: &Client,
    resource: &mut T,
    finalizer: &str,
) -> Result<()> {
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    info!(
        kind = %T::kind(&()),
        namespace = resource.namespace().as_deref().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer,
        "Adding finalizer"
    );
    patch_finalizers(client, resource, &finalizers).await?;

    resource.meta_mut().finalizers = Some(finalizers);
    Ok(())
}

/// Removes `finalizer`. A resource without it is left untouched.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T: Finalizable>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<()> {
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != finalizer)
        .cloned()
        .collect();
    info!(
        kind = %T::kind(&()),
        namespace = resource.namespace().as_deref().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer,
        "Removing finalizer"
    );
    patch_finalizers(client, resource, &finalizers).await
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
