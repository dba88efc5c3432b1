// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic managed-resource controller.
//!
//! Every CF kind is reconciled by the same loop. A kind contributes an
//! [`ExternalClient`] with four operations against CF (observe, create,
//! update, delete) and the loop decides which ones to call:
//!
//! 1. deleted resource: observe, then delete while the CF resource exists,
//!    then release the finalizer
//! 2. validate the spec, connect to CF, add the finalizer
//! 3. resolve scope references (skipped for observe-only resources)
//! 4. observe, publish connection details, then create or update
//! 5. set `Synced`, persist annotations, spec and status
//!
//! The working copy of the resource is mutated in place by every step and
//! persisted afterwards, on the error and timeout paths as well, so partial
//! progress such as a freshly written external-name or a retired binding
//! survives a failed reconcile.

use super::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use super::patch::merge_diff;
use super::status;
use crate::cf::{CfClient, CfError};
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, REQUEUE_WHEN_NOT_READY_SECS};
use crate::context::{Context, Settings};
use crate::crd::{external_name, set_external_name, Managed, ManagementPolicy, ValidationError};
use crate::labels::MANAGED_FINALIZER;
use crate::metrics;
use crate::provider::connect;
use crate::secrets::{publish_connection_secret, ConnectionDetails};
use anyhow::{anyhow, bail, Context as _, Result};
use async_trait::async_trait;
use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// What an observation found out about the CF resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalObservation {
    /// The CF resource exists. When false the loop calls `create`.
    pub resource_exists: bool,

    /// The CF resource matches the spec. When false the loop calls `update`.
    pub resource_up_to_date: bool,

    /// The observation filled in spec fields or the external-name.
    pub resource_late_initialized: bool,

    /// Connection details to publish to `writeConnectionSecretToRef`.
    pub connection_details: Option<ConnectionDetails>,
}

impl ExternalObservation {
    /// The CF resource does not exist.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: true,
            ..Self::default()
        }
    }

    /// The CF resource exists; `up_to_date` tells whether an update is due.
    #[must_use]
    pub fn present(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn late_initialized(mut self, late_initialized: bool) -> Self {
        self.resource_late_initialized |= late_initialized;
        self
    }

    #[must_use]
    pub fn with_connection_details(mut self, details: ConnectionDetails) -> Self {
        self.connection_details = Some(details);
        self
    }
}

/// Maps a `NotFound` lookup to `None`.
///
/// # Errors
///
/// Returns every other CF error unchanged.
pub fn found<T>(result: Result<T, CfError>) -> Result<Option<T>, CfError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Records `guid` as the external-name. Returns true when the annotation
/// changed, which callers report as a late initialization.
pub fn adopt<K: Resource>(cr: &mut K, guid: &str) -> bool {
    if external_name(cr) == Some(guid) {
        return false;
    }
    set_external_name(cr, guid);
    true
}

/// The observed CF GUID, required before update and delete.
///
/// # Errors
///
/// Returns an error when the resource has not been observed yet.
pub fn observed_id<K: Resource<DynamicType = ()>>(cr: &K, id: Option<&String>) -> Result<String> {
    id.cloned()
        .ok_or_else(|| anyhow!("{} {} has no observed CF id", K::kind(&()), cr.name_any()))
}

/// Accepts the outcome of a CF delete call. An async delete is not awaited:
/// the next observation sees the resource gone. `NotFound` counts as deleted.
///
/// # Errors
///
/// Returns every other CF error.
pub fn delete_accepted(what: &str, result: Result<Option<String>, CfError>) -> Result<()> {
    match result {
        Ok(Some(job)) => {
            debug!(what = %what, job = %job, "delete accepted");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) if err.is_not_found() => {
            debug!(what = %what, "already deleted");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// CF reports unset timestamps as empty strings.
#[must_use]
pub fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

/// Namespace of a namespaced resource.
///
/// # Errors
///
/// Returns an error when the resource carries no namespace.
pub fn namespace_of<K: Resource<DynamicType = ()>>(cr: &K) -> Result<String> {
    cr.namespace()
        .ok_or_else(|| anyhow!("{} {} has no namespace", K::kind(&()), cr.name_any()))
}

/// The CF side of one managed kind.
///
/// Implementations hold an authenticated [`CfClient`] and read and write the
/// resource passed in: the external-name annotation, resolved GUIDs in the
/// spec, `status.atProvider` and the `Ready` condition.
#[async_trait]
pub trait ExternalClient<K>: Send + Sync {
    /// Turns every scope reference into a GUID written back into the spec.
    async fn resolve_references(&self, _cr: &mut K) -> Result<()> {
        Ok(())
    }

    async fn observe(&self, cr: &mut K) -> Result<ExternalObservation>;

    async fn create(&self, cr: &mut K) -> Result<()>;

    async fn update(&self, cr: &mut K) -> Result<()>;

    async fn delete(&self, cr: &mut K) -> Result<()>;
}

/// A custom resource kind reconciled by [`run_controller`].
pub trait ManagedKind:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Managed
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: &'static str;

    /// Runtime mirror of the admission rules of the kind.
    fn validate_spec(&self) -> Result<(), ValidationError>;

    /// Upper bound of one reconcile.
    fn reconcile_timeout(settings: &Settings) -> Duration {
        settings.timeout
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>>;
}

/// Result of one pass over a live resource.
#[derive(Debug, Default)]
pub struct Synced {
    /// `create` was called.
    pub created: bool,

    /// `update` was called.
    pub updated: bool,

    pub connection_details: Option<ConnectionDetails>,
}

enum Outcome {
    Requeue(Action),
    Released,
}

/// Error policy for managed controllers.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<K: ManagedKind>(resource: Arc<K>, err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    error!(
        kind = K::KIND,
        name = %resource.name_any(),
        namespace = ?resource.namespace(),
        error = %err,
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    metrics::record_reconciliation_requeue(K::KIND, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the controller for `K` until shutdown.
///
/// # Errors
///
/// Returns an error if the controller cannot be started.
pub async fn run_controller<K: ManagedKind>(ctx: Arc<Context>) -> Result<()> {
    info!("Starting {} controller", K::KIND);

    let api = ctx.watched_api::<K>();
    let config = controller::Config::default().concurrency(ctx.settings.max_reconcile_rate);

    Controller::new(api, watcher::Config::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(kind = K::KIND, error = %e, "controller event failed");
            }
            futures::future::ready(())
        })
        .await;

    info!("{} controller stopped", K::KIND);
    Ok(())
}

/// Reconcile one managed resource.
///
/// # Errors
///
/// Returns the reconcile error after it has been recorded in `Synced`.
pub async fn reconcile<K: ManagedKind>(
    resource: Arc<K>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let result = reconcile_managed(resource.as_ref(), &ctx).await;
    let duration = start.elapsed();

    match &result {
        Ok(_) => {
            debug!(kind = K::KIND, name = %resource.name_any(), "Successfully reconciled");
            metrics::record_reconciliation_success(K::KIND, duration);
        }
        Err(err) => {
            metrics::record_reconciliation_error(K::KIND, duration);
            metrics::record_error(K::KIND, status::error_type(err));
        }
    }
    result.map_err(ReconcileError::from)
}

async fn reconcile_managed<K: ManagedKind>(resource: &K, ctx: &Arc<Context>) -> Result<Action> {
    let name = resource.name_any();
    let namespace = resource
        .namespace()
        .ok_or_else(|| anyhow!("{} {} has no namespace", K::KIND, name))?;
    let limit = K::reconcile_timeout(&ctx.settings);

    let mut cr = resource.clone();
    let deleting = resource.meta().deletion_timestamp.is_some();

    let outcome = {
        let run = async {
            if deleting {
                reconcile_deletion(&mut cr, ctx, &namespace).await
            } else {
                reconcile_live(&mut cr, ctx, &namespace).await
            }
        };
        match tokio::time::timeout(limit, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow!(
                "reconcile of {} {}/{} timed out after {:?}",
                K::KIND,
                namespace,
                name,
                limit
            )),
        }
    };

    match outcome {
        Ok(Outcome::Released) => Ok(Action::await_change()),
        Ok(Outcome::Requeue(action)) => {
            status::reconcile_success(&mut cr);
            cr.resource_status_mut().observed_generation = cr.meta().generation;
            persist(resource, &cr, ctx, &namespace).await?;
            Ok(action)
        }
        Err(err) => {
            warn!(kind = K::KIND, name = %name, namespace = %namespace, error = %format!("{err:#}"), "reconcile failed");
            status::reconcile_error(&mut cr, &err);
            if let Err(persist_err) = persist(resource, &cr, ctx, &namespace).await {
                warn!(
                    kind = K::KIND,
                    name = %name,
                    namespace = %namespace,
                    error = %format!("{persist_err:#}"),
                    "failed to persist status after reconcile error"
                );
            }
            Err(err)
        }
    }
}

async fn reconcile_live<K: ManagedKind>(cr: &mut K, ctx: &Arc<Context>, namespace: &str) -> Result<Outcome> {
    cr.validate_spec()?;

    let spec = cr.resource_spec().clone();
    let cf = connect(ctx, &spec.provider_config_ref.name, namespace).await?;
    ensure_finalizer(&ctx.client, cr, MANAGED_FINALIZER).await?;

    let external = K::external(ctx.clone(), cf);
    if !spec.is_observe_only() {
        external
            .resolve_references(cr)
            .await
            .context("cannot resolve references")?;
    }

    let synced = sync_external(cr, external.as_ref()).await?;

    if let (Some(details), Some(secret_ref)) = (
        synced.connection_details.as_ref(),
        spec.write_connection_secret_to_ref.as_ref(),
    ) {
        let secret_namespace = secret_ref.namespace.as_deref().unwrap_or(namespace);
        let owner = (secret_namespace == namespace)
            .then(|| cr.controller_owner_ref(&()))
            .flatten();
        publish_connection_secret(&ctx.client, secret_namespace, &secret_ref.name, owner, details)
            .await?;
    }

    let action = if synced.created || synced.updated {
        Action::requeue(ctx.settings.poll_interval)
    } else if status::is_ready(cr) {
        Action::requeue(ctx.settings.sync_interval)
    } else {
        metrics::record_reconciliation_requeue(K::KIND, "not_ready");
        Action::requeue(Duration::from_secs(REQUEUE_WHEN_NOT_READY_SECS))
    };
    Ok(Outcome::Requeue(action))
}

/// Observe the CF resource and create or update it as the management
/// policies allow.
///
/// Spec changes made by the observation are reverted unless
/// `LateInitialize` is allowed; the external-name annotation is kept.
///
/// # Errors
///
/// Returns the first failing CF operation, or an error when an
/// observe-only resource does not exist in CF.
pub async fn sync_external<K: ManagedKind>(cr: &mut K, external: &dyn ExternalClient<K>) -> Result<Synced> {
    let spec = cr.resource_spec().clone();
    let before_observe = spec_value(cr)?;

    let observation = external
        .observe(cr)
        .await
        .context("cannot observe external resource")?;

    if observation.resource_late_initialized && !spec.allows(ManagementPolicy::LateInitialize) {
        restore_spec(cr, before_observe)?;
    }

    let mut synced = Synced {
        connection_details: observation.connection_details,
        ..Synced::default()
    };

    if !observation.resource_exists {
        if spec.is_observe_only() {
            bail!(
                "{} {} does not exist in CF and management policies only allow Observe",
                K::KIND,
                cr.name_any()
            );
        }
        if !spec.allows(ManagementPolicy::Create) {
            debug!(kind = K::KIND, name = %cr.name_any(), "create not allowed by management policies");
            return Ok(synced);
        }

        status::creating(cr);
        external
            .create(cr)
            .await
            .context("cannot create external resource")?;
        info!(kind = K::KIND, name = %cr.name_any(), "Created external resource");
        metrics::record_resource_created(K::KIND);
        synced.created = true;
        return Ok(synced);
    }

    if !observation.resource_up_to_date {
        if spec.allows(ManagementPolicy::Update) {
            external
                .update(cr)
                .await
                .context("cannot update external resource")?;
            info!(kind = K::KIND, name = %cr.name_any(), "Updated external resource");
            metrics::record_resource_updated(K::KIND);
            synced.updated = true;
        } else {
            debug!(kind = K::KIND, name = %cr.name_any(), "update not allowed by management policies");
        }
    }
    Ok(synced)
}

async fn reconcile_deletion<K: ManagedKind>(
    cr: &mut K,
    ctx: &Arc<Context>,
    namespace: &str,
) -> Result<Outcome> {
    if !has_finalizer(cr, MANAGED_FINALIZER) {
        return Ok(Outcome::Released);
    }

    let spec = cr.resource_spec().clone();
    if !spec.should_delete_external() {
        info!(kind = K::KIND, name = %cr.name_any(), "Orphaning external resource");
        remove_finalizer(&ctx.client, cr, MANAGED_FINALIZER).await?;
        return Ok(Outcome::Released);
    }

    let cf = connect(ctx, &spec.provider_config_ref.name, namespace).await?;
    let external = K::external(ctx.clone(), cf);

    if delete_external(cr, external.as_ref()).await? {
        remove_finalizer(&ctx.client, cr, MANAGED_FINALIZER).await?;
        info!(kind = K::KIND, name = %cr.name_any(), "Successfully deleted external resource");
        metrics::record_resource_deleted(K::KIND);
        return Ok(Outcome::Released);
    }
    Ok(Outcome::Requeue(Action::requeue(ctx.settings.poll_interval)))
}

/// One deletion step. Returns true once the CF resource is gone.
///
/// # Errors
///
/// Returns an error if observing or deleting fails.
pub async fn delete_external<K: ManagedKind>(cr: &mut K, external: &dyn ExternalClient<K>) -> Result<bool> {
    let observation = external
        .observe(cr)
        .await
        .context("cannot observe external resource")?;
    if !observation.resource_exists {
        return Ok(true);
    }

    status::deleting(cr, "");
    external
        .delete(cr)
        .await
        .context("cannot delete external resource")?;
    Ok(false)
}

fn spec_value<K: Serialize>(cr: &K) -> Result<Value> {
    let mut value = serde_json::to_value(cr)?;
    Ok(value
        .get_mut("spec")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

fn restore_spec<K: Serialize + DeserializeOwned>(cr: &mut K, spec: Value) -> Result<()> {
    let mut value = serde_json::to_value(&*cr)?;
    value["spec"] = spec;
    *cr = serde_json::from_value(value)?;
    Ok(())
}

fn persisted_metadata(value: &Value) -> Value {
    json!({
        "metadata": { "annotations": value["metadata"]["annotations"].clone() },
        "spec": value["spec"].clone(),
    })
}

async fn persist<K: ManagedKind>(original: &K, cr: &K, ctx: &Context, namespace: &str) -> Result<()> {
    let name = cr.name_any();
    let api = ctx.api::<K>(namespace);
    let before = serde_json::to_value(original)?;
    let after = serde_json::to_value(cr)?;

    if let Some(diff) = merge_diff(&persisted_metadata(&before), &persisted_metadata(&after)) {
        debug!(kind = K::KIND, name = %name, patch = %diff, "patching resource");
        api.patch(&name, &PatchParams::default(), &Patch::Merge(&diff))
            .await
            .with_context(|| format!("cannot update {} {namespace}/{name}", K::KIND))?;
    }

    if let Some(diff) = merge_diff(&before["status"], &after["status"]) {
        api.patch_status(
            &name,
            &PatchParams::default(),
            &Patch::Merge(&json!({ "status": diff })),
        )
        .await
        .with_context(|| format!("cannot update status of {} {namespace}/{name}", K::KIND))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "managed_tests.rs"]
mod managed_tests;
