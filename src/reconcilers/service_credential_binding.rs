// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceCredentialBinding` external client.
//!
//! Service keys that rotate get a CF name of `<name>-<suffix>` with a fresh
//! random suffix per binding, so the new key never collides with the retired
//! ones still alive in CF. Without a GUID external-name, the active binding
//! is the newest non-retired binding of the service instance whose name
//! matches.
//!
//! Rotation bookkeeping lives in [`rotation`](super::rotation); this module
//! wires it into observe (retire), update (expire) and delete (drain).

use super::last_operation::{self, is_delete_in_progress, STATE_SUCCEEDED};
use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::references::Resolver;
use super::rotation::{delete_retired_keys, Rotator};
use crate::cf::service_credential_bindings::{
    BindingFilter, ServiceCredentialBinding as CfBinding,
};
use crate::cf::CfClient;
use crate::constants::{BINDING_NAME_SUFFIX_LEN, KIND_SERVICE_CREDENTIAL_BINDING};
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, BindingType, ScopeReference, ServiceCredentialBinding,
    ValidationError,
};
use crate::labels::FORCE_ROTATION_ANNOTATION;
use crate::secrets::{connection_details, json_source};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::DateTime;
use kube::{Resource, ResourceExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// A lowercase alphanumeric suffix for a new rotating binding name.
#[must_use]
pub fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(BINDING_NAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// CF name for a new binding of `cr`.
#[must_use]
pub fn binding_name(cr: &ServiceCredentialBinding) -> Option<String> {
    let base = cr.spec.for_provider.name.as_deref()?;
    if cr.spec.rotation.is_some() {
        Some(format!("{base}-{}", random_suffix()))
    } else {
        Some(base.to_string())
    }
}

/// Drops the force-rotation annotation once it has been acted upon, or when
/// the binding does not rotate at all.
fn clear_force_rotation(cr: &mut ServiceCredentialBinding) {
    if cr.annotations_mut().remove(FORCE_ROTATION_ANNOTATION).is_some() {
        debug!(name = %cr.name_any(), "cleared force-rotation annotation");
    }
}

/// Records `guid` as the active binding.
fn activate(cr: &mut ServiceCredentialBinding, guid: &str, name: Option<String>) {
    set_external_name(cr, guid);
    let at_provider = cr.at_provider_mut();
    at_provider.id = Some(guid.to_string());
    at_provider.name = name;
    clear_force_rotation(cr);
}

/// Whether `candidate` is a name `binding_name` could have produced.
#[must_use]
pub fn name_matches(base: Option<&str>, rotating: bool, candidate: Option<&str>) -> bool {
    let Some(base) = base else {
        return true;
    };
    let Some(candidate) = candidate else {
        return false;
    };
    candidate == base
        || (rotating
            && candidate
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|suffix| {
                    suffix.len() == BINDING_NAME_SUFFIX_LEN
                        && suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                }))
}

pub struct ServiceCredentialBindingExternal {
    ctx: Arc<Context>,
    cf: CfClient,
    rotator: Option<Rotator>,
}

impl ServiceCredentialBindingExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self {
            ctx,
            cf,
            rotator: None,
        }
    }

    /// Pins the rotation clock.
    #[must_use]
    pub fn with_rotator(mut self, rotator: Rotator) -> Self {
        self.rotator = Some(rotator);
        self
    }

    fn rotator(&self) -> Rotator {
        self.rotator.unwrap_or_default()
    }

    fn filter(cr: &ServiceCredentialBinding) -> Result<BindingFilter> {
        let params = &cr.spec.for_provider;
        let service_instance = params.service_instance.guid().ok_or_else(|| {
            anyhow!("service instance of binding {} is not resolved", cr.name_any())
        })?;
        let app = match params.r#type {
            BindingType::Key => None,
            BindingType::App => Some(
                params
                    .app
                    .guid()
                    .ok_or_else(|| anyhow!("app of binding {} is not resolved", cr.name_any()))?
                    .to_string(),
            ),
        };
        Ok(BindingFilter {
            r#type: Some(params.r#type),
            names: Vec::new(),
            service_instance: Some(service_instance.to_string()),
            app,
        })
    }

    /// The newest non-retired binding matching the spec.
    async fn find(&self, cr: &ServiceCredentialBinding) -> Result<Option<CfBinding>> {
        let filter = Self::filter(cr)?;
        let base = cr.spec.for_provider.name.as_deref();
        let rotating = cr.spec.rotation.is_some();
        let retired = cr.retired_keys();
        let newest = self
            .cf
            .service_credential_bindings()
            .list(&filter)
            .await?
            .into_iter()
            .filter(|b| !retired.iter().any(|k| k.guid == b.guid))
            .filter(|b| name_matches(base, rotating, b.name.as_deref()))
            .max_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(newest)
    }

    /// A binding created after the one just retired. It exists when a
    /// previous create succeeded but its status write was lost.
    async fn replacement(
        &self,
        cr: &ServiceCredentialBinding,
        retired_created_at: &str,
    ) -> Result<Option<CfBinding>> {
        let retired_at = DateTime::parse_from_rfc3339(retired_created_at)?;
        Ok(self.find(cr).await?.filter(|b| {
            DateTime::parse_from_rfc3339(&b.created_at).is_ok_and(|created| created > retired_at)
        }))
    }

    /// The binding just created under `name`.
    async fn find_created(&self, cr: &ServiceCredentialBinding, name: Option<&str>) -> Result<CfBinding> {
        let mut filter = Self::filter(cr)?;
        filter.names = name.map(|n| vec![n.to_string()]).unwrap_or_default();
        self.cf
            .service_credential_bindings()
            .list(&filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                anyhow!(
                    "service credential binding {} not found after create",
                    name.unwrap_or_default()
                )
            })
    }
}

impl ManagedKind for ServiceCredentialBinding {
    const KIND: &'static str = KIND_SERVICE_CREDENTIAL_BINDING;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(ServiceCredentialBindingExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<ServiceCredentialBinding> for ServiceCredentialBindingExternal {
    async fn resolve_references(&self, cr: &mut ServiceCredentialBinding) -> Result<()> {
        let namespace = namespace_of(cr)?;
        let resolver = Resolver::new(&self.ctx, &self.cf, &namespace);
        let params = &mut cr.spec.for_provider;
        resolver.service_instance(&mut params.service_instance).await?;
        if params.app.is_specified() {
            resolver.app(&mut params.app, None).await?;
        }
        Ok(())
    }

    async fn observe(&self, cr: &mut ServiceCredentialBinding) -> Result<ExternalObservation> {
        let bindings = self.cf.service_credential_bindings();
        let lookup = match external_guid(cr) {
            Some(guid) => found(bindings.get(guid).await)?,
            None => self.find(cr).await?,
        };
        let Some(mut binding) = lookup else {
            return Ok(ExternalObservation::absent());
        };

        if cr.spec.rotation.is_none() {
            clear_force_rotation(cr);
        }

        let rotator = self.rotator();
        if cr.meta().deletion_timestamp.is_none()
            && rotator.retire_binding(cr, &binding.guid, &binding.created_at)?
        {
            let Some(replacement) = self.replacement(cr, &binding.created_at).await? else {
                return Ok(ExternalObservation::absent());
            };
            info!(
                name = %cr.name_any(),
                guid = %replacement.guid,
                "Adopting replacement service credential binding"
            );
            clear_force_rotation(cr);
            binding = replacement;
        }

        let adopted = adopt(cr, &binding.guid);
        let up_to_date = binding.metadata.satisfies(&cr.spec.for_provider.metadata)
            && !rotator.has_expired_keys(cr)?;

        let at_provider = cr.at_provider_mut();
        at_provider.id = Some(binding.guid.clone());
        at_provider.name = binding.name.clone();
        at_provider.r#type = non_empty(binding.r#type.clone());
        at_provider.service_instance = binding
            .relationships
            .service_instance
            .guid()
            .map(str::to_string);
        at_provider.app = binding.relationships.app.guid().map(str::to_string);
        at_provider.created_at = non_empty(binding.created_at.clone());
        at_provider.last_operation = binding.last_operation.clone();

        let mut observation =
            last_operation::observe(cr, binding.last_operation.as_ref(), up_to_date)?;

        let settled = binding
            .last_operation
            .as_ref()
            .is_none_or(|op| op.state == STATE_SUCCEEDED);
        if observation.resource_exists
            && settled
            && cr.spec.resource.write_connection_secret_to_ref.is_some()
        {
            let details = bindings.details(&binding.guid).await?;
            let as_json = cr.spec.connection_details_as_json.unwrap_or(false);
            observation =
                observation.with_connection_details(connection_details(&details.credentials, as_json));
        }
        Ok(observation.late_initialized(adopted))
    }

    async fn create(&self, cr: &mut ServiceCredentialBinding) -> Result<()> {
        let filter = Self::filter(cr)?;
        let namespace = namespace_of(cr)?;
        let params = cr.spec.for_provider.clone();
        let parameters = json_source(
            &self.ctx.client,
            &namespace,
            params.parameters.as_ref(),
            params.json_params.as_deref(),
            params.params_secret_ref.as_ref(),
        )
        .await?;
        let name = binding_name(cr);
        let service_instance = filter.service_instance.unwrap_or_default();
        let bindings = self.cf.service_credential_bindings();

        let accepted = match bindings
            .create(
                params.r#type,
                name.as_deref(),
                &service_instance,
                filter.app.as_deref(),
                parameters.as_ref(),
                &params.metadata,
            )
            .await
        {
            Ok(accepted) => accepted,
            Err(err) if err.is_already_exists() => {
                debug!(name = ?name, "service credential binding exists, adopting");
                let existing = self.find_created(cr, name.as_deref()).await?;
                if cr.retired_keys().iter().any(|k| k.guid == existing.guid) {
                    return Err(anyhow!(
                        "service credential binding name {} is held by retired binding {}",
                        name.unwrap_or_default(),
                        existing.guid
                    ));
                }
                activate(cr, &existing.guid, existing.name);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let guid = match &accepted.resource {
            Some(binding) => binding.guid.clone(),
            None => self.find_created(cr, name.as_deref()).await?.guid,
        };
        activate(cr, &guid, name);

        self.cf.wait_accepted(&accepted).await?;
        info!(
            name = %cr.name_any(),
            guid = %guid,
            kind = params.r#type.as_str(),
            "Created service credential binding"
        );
        Ok(())
    }

    async fn update(&self, cr: &mut ServiceCredentialBinding) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        self.cf
            .service_credential_bindings()
            .update_metadata(&id, &cr.spec.for_provider.metadata)
            .await?;
        self.rotator().delete_expired_keys(cr, &self.cf).await
    }

    async fn delete(&self, cr: &mut ServiceCredentialBinding) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        if is_delete_in_progress(cr.at_provider().and_then(|o| o.last_operation.as_ref())) {
            debug!(guid = %id, "service credential binding delete already in progress");
            return Ok(());
        }
        delete_retired_keys(cr, &self.cf).await?;
        delete_accepted(
            &format!("service credential binding {id}"),
            self.cf.service_credential_bindings().delete(&id).await,
        )
    }
}

#[cfg(test)]
#[path = "service_credential_binding_tests.rs"]
mod service_credential_binding_tests;
