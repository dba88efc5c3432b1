// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ServiceRouteBinding`: routes traffic for a route through a route service.

use super::common::{CfMetadata, LastOperation, ResourceSpec, ResourceStatus, SecretKeySelector};
use super::references::{RouteScope, ScopeReference, ServiceInstanceScope};
use super::validation::ValidationError;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ServiceRouteBinding` binds a route-service instance to a route.
///
/// Only `labels` and `annotations` can change after creation.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: ServiceRouteBinding
/// metadata:
///   name: web-rate-limit
///   namespace: platform
/// spec:
///   forProvider:
///     routeRef: { name: web }
///     serviceInstanceRef: { name: rate-limiter }
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "ServiceRouteBinding",
    namespaced,
    doc = "ServiceRouteBinding is a managed binding between a Cloud Foundry route and a route service."
)]
#[kube(status = "ServiceRouteBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct ServiceRouteBindingSpec {
    pub for_provider: ServiceRouteBindingParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.route) || has(self.routeRef) || has(self.routeSelector)",
        "message": "one of route, routeRef or routeSelector must be set"
    },
    {
        "rule": "has(self.serviceInstance) || has(self.serviceInstanceRef) || has(self.serviceInstanceSelector) || has(self.serviceInstanceName)",
        "message": "one of serviceInstance, serviceInstanceRef, serviceInstanceSelector or serviceInstanceName must be set"
    },
    {
        "rule": "!has(oldSelf.route) || (has(self.route) && self.route == oldSelf.route)",
        "message": "route is immutable"
    },
    {
        "rule": "!has(oldSelf.serviceInstance) || (has(self.serviceInstance) && self.serviceInstance == oldSelf.serviceInstance)",
        "message": "serviceInstance is immutable"
    },
    {
        "rule": "has(self.parameters) == has(oldSelf.parameters) && (!has(self.parameters) || self.parameters == oldSelf.parameters)",
        "message": "parameters is immutable"
    },
    {
        "rule": "has(self.paramsSecretRef) == has(oldSelf.paramsSecretRef) && (!has(self.paramsSecretRef) || self.paramsSecretRef == oldSelf.paramsSecretRef)",
        "message": "paramsSecretRef is immutable"
    }
]))]
pub struct ServiceRouteBindingParameters {
    #[serde(flatten)]
    pub route: RouteScope,

    #[serde(flatten)]
    pub service_instance: ServiceInstanceScope,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("x-kubernetes-preserve-unknown-fields" = true))]
    pub parameters: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_secret_ref: Option<SecretKeySelector>,

    #[serde(flatten)]
    pub metadata: CfMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRouteBindingObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRouteBindingStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: ServiceRouteBindingObservation,
}

impl_managed!(
    ServiceRouteBinding,
    ServiceRouteBindingStatus,
    ServiceRouteBindingObservation
);

impl ServiceRouteBinding {
    /// # Errors
    ///
    /// Returns an error when a scope is invalid or both parameter sources are set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        params.route.validate_required()?;
        params.service_instance.validate_required()?;
        if params.parameters.is_some() && params.params_secret_ref.is_some() {
            return Err(ValidationError::invalid(
                "forProvider",
                "only one of parameters or paramsSecretRef may be set",
            ));
        }
        Ok(())
    }
}
