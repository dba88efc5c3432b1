// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceCredentialBinding`: service keys and app bindings, with optional
//! time-driven key rotation.

use super::common::{CfMetadata, LastOperation, ResourceSpec, ResourceStatus, SecretKeySelector};
use super::references::{AppScope, ScopeReference, ServiceInstanceScope};
use super::validation::ValidationError;
use crate::duration::parse_duration;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ServiceCredentialBinding` manages a CF service credential binding.
///
/// A `key` binding is a service key; an `app` binding binds the instance to an
/// app. Key bindings can rotate: after `rotation.frequency` the active key is
/// retired and a new one created, and retired keys are deleted from CF once
/// older than `rotation.ttl`.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: ServiceCredentialBinding
/// metadata:
///   name: orders-db-key
///   namespace: platform
/// spec:
///   forProvider:
///     type: key
///     name: orders-db-key
///     serviceInstanceRef: { name: orders-db }
///   rotation:
///     frequency: 720h
///     ttl: 1440h
///   writeConnectionSecretToRef:
///     name: orders-db-credentials
///     namespace: apps
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceCredentialBinding",
    namespaced,
    doc = "ServiceCredentialBinding is a managed Cloud Foundry service key or app binding."
)]
#[kube(status = "ServiceCredentialBindingStatus")]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "self.forProvider.type != 'app' || !has(self.rotation)",
        "message": "rotation is not allowed when type is app"
    }
]))]
pub struct ServiceCredentialBindingSpec {
    pub for_provider: ServiceCredentialBindingParameters,

    /// Rotation of `key` bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,

    /// Publish the credentials as a single `credentials` JSON key instead of
    /// one key per (flattened) credential field.
    #[serde(
        default,
        rename = "connectionDetailsAsJSON",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_details_as_json: Option<bool>,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.serviceInstance) || has(self.serviceInstanceRef) || has(self.serviceInstanceSelector) || has(self.serviceInstanceName)",
        "message": "one of serviceInstance, serviceInstanceRef, serviceInstanceSelector or serviceInstanceName must be set"
    },
    {
        "rule": "self.type != 'key' || has(self.name)",
        "message": "name is required when type is key"
    },
    {
        "rule": "self.type != 'app' || has(self.app) || has(self.appRef) || has(self.appSelector) || has(self.appName)",
        "message": "an app reference is required when type is app"
    }
]))]
pub struct ServiceCredentialBindingParameters {
    pub r#type: BindingType,

    /// Binding name. Required for `key` bindings. With rotation, each key
    /// gets a random suffix appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub service_instance: ServiceInstanceScope,

    /// Bound app, for `app` bindings.
    #[serde(flatten)]
    pub app: AppScope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("x-kubernetes-preserve-unknown-fields" = true))]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_params: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_secret_ref: Option<SecretKeySelector>,

    #[serde(flatten)]
    pub metadata: CfMetadata,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    #[default]
    Key,
    App,
}

impl BindingType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::App => "app",
        }
    }
}

/// Rotation schedule, as Go-style durations (`720h`, `30d`).
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "!has(self.ttl) || !has(self.frequency) || duration(self.ttl) >= duration(self.frequency)",
        "message": "ttl must be greater than or equal to frequency"
    }
]))]
pub struct Rotation {
    /// Age after which the active binding is retired and replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,

    /// Age after which a retired binding is deleted from CF. Retired bindings
    /// are kept until the resource is deleted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// A binding that was active once and is kept alive until its TTL elapses.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetiredKey {
    pub guid: String,

    /// Creation time of the binding in CF (RFC3339).
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCredentialBindingObservation {
    /// GUID of the active binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    /// Creation time of the active binding (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired_keys: Vec<RetiredKey>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCredentialBindingStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: ServiceCredentialBindingObservation,
}

impl_managed!(
    ServiceCredentialBinding,
    ServiceCredentialBindingStatus,
    ServiceCredentialBindingObservation
);

impl ServiceCredentialBinding {
    /// Retired keys recorded in status.
    #[must_use]
    pub fn retired_keys(&self) -> &[RetiredKey] {
        self.at_provider().map_or(&[], |o| o.retired_keys.as_slice())
    }

    /// # Errors
    ///
    /// Returns an error when the binding type and its fields disagree, a
    /// duration does not parse, or `ttl` is shorter than `frequency`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        params.service_instance.validate_required()?;
        params.app.validate_exclusive()?;

        match params.r#type {
            BindingType::Key => {
                if params.name.as_deref().is_none_or(str::is_empty) {
                    return Err(ValidationError::required(
                        "forProvider.name",
                        " when type is key",
                    ));
                }
            }
            BindingType::App => {
                if !params.app.is_specified() {
                    return Err(ValidationError::required(
                        "forProvider.app",
                        " when type is app",
                    ));
                }
                if self.spec.rotation.is_some() {
                    return Err(ValidationError::forbidden("rotation", " when type is app"));
                }
            }
        }

        let sources = [
            params.parameters.is_some(),
            params.json_params.is_some(),
            params.params_secret_ref.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return Err(ValidationError::invalid(
                "forProvider",
                "only one of parameters, jsonParams or paramsSecretRef may be set",
            ));
        }

        if let Some(rotation) = &self.spec.rotation {
            let parse = |field: &str, value: &Option<String>| {
                value
                    .as_deref()
                    .map(|v| {
                        parse_duration(v)
                            .map_err(|e| ValidationError::invalid(field, e.to_string()))
                    })
                    .transpose()
            };
            let frequency = parse("rotation.frequency", &rotation.frequency)?;
            let ttl = parse("rotation.ttl", &rotation.ttl)?;
            if let (Some(frequency), Some(ttl)) = (frequency, ttl) {
                if ttl < frequency {
                    return Err(ValidationError::invalid(
                        "rotation.ttl",
                        "must be greater than or equal to rotation.frequency",
                    ));
                }
            }
        }
        Ok(())
    }
}
