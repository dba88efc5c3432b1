// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceInstance`: managed (brokered) and user-provided service instances.

use super::common::{CfMetadata, LastOperation, ResourceSpec, ResourceStatus, SecretKeySelector};
use super::references::{ScopeReference, SpaceScope};
use super::validation::ValidationError;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ServiceInstance` manages a CF service instance.
///
/// Parameters (managed) or credentials (user-provided) come from exactly one
/// source: an inline object, a JSON string, or a secret key holding JSON.
/// The status never holds the payload itself, only its SHA-256.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: ServiceInstance
/// metadata:
///   name: orders-db
///   namespace: platform
/// spec:
///   forProvider:
///     name: orders-db
///     type: managed
///     spaceRef: { name: dev }
///     servicePlan:
///       offering: postgresql
///       plan: small
///     parameters:
///       storage_gb: 20
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceInstance",
    namespaced,
    doc = "ServiceInstance is a managed Cloud Foundry service instance."
)]
#[kube(status = "ServiceInstanceStatus")]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    pub for_provider: ServiceInstanceParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.space) || has(self.spaceRef) || has(self.spaceSelector) || has(self.spaceName)",
        "message": "one of space, spaceRef, spaceSelector or spaceName must be set"
    },
    {
        "rule": "[has(self.parameters), has(self.jsonParams), has(self.paramsSecretRef), has(self.credentials), has(self.jsonCredentials), has(self.credentialsSecretRef)].filter(x, x).size() <= 1",
        "message": "only one parameters or credentials source may be set"
    },
    {
        "rule": "self.type != 'managed' || has(self.servicePlan)",
        "message": "servicePlan is required for managed service instances"
    },
    {
        "rule": "self.type != 'user-provided' || !has(self.servicePlan)",
        "message": "servicePlan is not allowed for user-provided service instances"
    }
]))]
pub struct ServiceInstanceParameters {
    /// Name of the instance in CF.
    pub name: String,

    #[serde(default)]
    pub r#type: ServiceInstanceType,

    #[serde(flatten)]
    pub space: SpaceScope,

    /// Plan of a managed instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan: Option<ServicePlanParameters>,

    /// Broker parameters as an object (managed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("x-kubernetes-preserve-unknown-fields" = true))]
    pub parameters: Option<serde_json::Value>,

    /// Broker parameters as a JSON string (managed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_params: Option<String>,

    /// Secret key holding broker parameters as JSON (managed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_secret_ref: Option<SecretKeySelector>,

    /// Credentials as an object (user-provided).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("x-kubernetes-preserve-unknown-fields" = true))]
    pub credentials: Option<serde_json::Value>,

    /// Credentials as a JSON string (user-provided).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_credentials: Option<String>,

    /// Secret key holding credentials as JSON (user-provided).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<SecretKeySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Syslog drain of a user-provided instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,

    /// Route service URL of a user-provided instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,

    #[serde(flatten)]
    pub metadata: CfMetadata,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub enum ServiceInstanceType {
    #[default]
    #[serde(rename = "managed")]
    Managed,
    #[serde(rename = "user-provided")]
    UserProvided,
}

impl ServiceInstanceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::UserProvided => "user-provided",
        }
    }
}

/// A service plan, by GUID or by offering and plan name.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanParameters {
    /// GUID of the plan. Resolved from `offering` and `plan` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Name of the service offering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offering: Option<String>,

    /// Name of the plan within the offering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_plan: Option<String>,

    /// SHA-256 of the parameters or credentials last sent to CF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_info: Option<MaintenanceInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: ServiceInstanceObservation,
}

impl_managed!(ServiceInstance, ServiceInstanceStatus, ServiceInstanceObservation);

impl ServiceInstance {
    /// # Errors
    ///
    /// Returns an error for an empty name, an invalid space scope, more than one
    /// payload source, or a plan that does not match the instance type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        params.space.validate_required()?;

        let sources = [
            params.parameters.is_some(),
            params.json_params.is_some(),
            params.params_secret_ref.is_some(),
            params.credentials.is_some(),
            params.json_credentials.is_some(),
            params.credentials_secret_ref.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return Err(ValidationError::invalid(
                "forProvider",
                "only one parameters or credentials source may be set",
            ));
        }

        match params.r#type {
            ServiceInstanceType::Managed => {
                let plan = params.service_plan.as_ref().ok_or_else(|| {
                    ValidationError::required("forProvider.servicePlan", " for managed instances")
                })?;
                let by_name = plan.offering.is_some() && plan.plan.is_some();
                if plan.id.is_none() && !by_name {
                    return Err(ValidationError::required(
                        "forProvider.servicePlan.id",
                        " unless offering and plan are set",
                    ));
                }
                if params.credentials.is_some()
                    || params.json_credentials.is_some()
                    || params.credentials_secret_ref.is_some()
                {
                    return Err(ValidationError::forbidden(
                        "forProvider.credentials",
                        " for managed instances",
                    ));
                }
            }
            ServiceInstanceType::UserProvided => {
                if params.service_plan.is_some() {
                    return Err(ValidationError::forbidden(
                        "forProvider.servicePlan",
                        " for user-provided instances",
                    ));
                }
                if params.parameters.is_some()
                    || params.json_params.is_some()
                    || params.params_secret_ref.is_some()
                {
                    return Err(ValidationError::forbidden(
                        "forProvider.parameters",
                        " for user-provided instances",
                    ));
                }
            }
        }
        Ok(())
    }
}
