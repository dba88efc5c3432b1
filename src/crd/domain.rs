// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Domain` and `Route`.

use super::common::{CfMetadata, ResourceSpec, ResourceStatus};
use super::references::{DomainScope, OrgScope, ScopeReference, SpaceScope};
use super::validation::{is_rfc1035_domain, ValidationError};
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `Domain` manages a CF domain. A domain with an owning organization is
/// private to it; without one it is shared.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Domain
/// metadata:
///   name: apps-acme
///   namespace: platform
/// spec:
///   forProvider:
///     name: apps.acme.example.com
///     orgRef: { name: acme }
///     labels:
///       team: platform
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "Domain",
    namespaced,
    doc = "Domain is a managed Cloud Foundry domain."
)]
#[kube(status = "DomainStatus")]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    pub for_provider: DomainParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "[has(self.orgRef), has(self.orgSelector), has(self.orgName)].filter(x, x).size() <= 1",
        "message": "only one of orgRef, orgSelector or orgName may be set"
    },
    {
        "rule": "self.name == oldSelf.name",
        "message": "name is immutable"
    }
]))]
pub struct DomainParameters {
    /// Fully qualified domain name.
    #[schemars(length(min = 3, max = 253))]
    #[schemars(regex(
        pattern = r"^([a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$"
    ))]
    pub name: String,

    /// Whether the domain is only reachable from inside the platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,

    /// Owning organization of a private domain.
    #[serde(flatten)]
    pub org: OrgScope,

    #[serde(flatten)]
    pub metadata: CfMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_protocols: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: DomainObservation,
}

impl_managed!(Domain, DomainStatus, DomainObservation);

impl Domain {
    /// # Errors
    ///
    /// Returns an error when the name is not an RFC 1035 domain or the org
    /// scope names more than one mode.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if !is_rfc1035_domain(&params.name) {
            return Err(ValidationError::invalid(
                "forProvider.name",
                format!("'{}' is not a valid RFC 1035 domain name (3-253 characters)", params.name),
            ));
        }
        params.org.validate_exclusive()
    }
}

/// `Route` manages a CF route in a space on a domain.
///
/// A route that still has destinations is never deleted.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Route
/// metadata:
///   name: web
///   namespace: platform
/// spec:
///   forProvider:
///     host: web
///     path: /api
///     spaceRef: { name: dev }
///     domainName: apps.acme.example.com
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "Route",
    namespaced,
    doc = "Route is a managed Cloud Foundry route."
)]
#[kube(status = "RouteStatus")]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub for_provider: RouteParameters,

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
        "rule": "has(self.domain) || has(self.domainRef) || has(self.domainSelector) || has(self.domainName)",
        "message": "one of domain, domainRef, domainSelector or domainName must be set"
    }
]))]
pub struct RouteParameters {
    #[serde(flatten)]
    pub space: SpaceScope,

    #[serde(flatten)]
    pub domain: DomainScope,

    /// Hostname prefix; empty for a route on the bare domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path, starting with `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Port for TCP routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<i32>,

    #[serde(flatten)]
    pub metadata: CfMetadata,
}

/// An app process receiving traffic from a route.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// GUID of the destination app.
    pub app: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<RouteDestination>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: RouteObservation,
}

impl_managed!(Route, RouteStatus, RouteObservation);

impl Route {
    /// # Errors
    ///
    /// Returns an error when the space or domain scope is invalid or the path
    /// does not start with `/`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        params.space.validate_required()?;
        params.domain.validate_required()?;
        if let Some(path) = params.path.as_deref() {
            if !path.is_empty() && !path.starts_with('/') {
                return Err(ValidationError::invalid("forProvider.path", "must start with '/'"));
            }
        }
        Ok(())
    }
}
