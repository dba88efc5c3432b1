// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Organization` and `Space`: the two CF scoping levels.

use super::common::{ResourceSpec, ResourceStatus};
use super::references::{OrgScope, ScopeReference};
use super::validation::ValidationError;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `Organization` manages a CF organization.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Organization
/// metadata:
///   name: acme
///   namespace: platform
/// spec:
///   forProvider:
///     name: acme
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "Organization",
    namespaced,
    doc = "Organization is a managed Cloud Foundry organization."
)]
#[kube(status = "OrganizationStatus")]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSpec {
    pub for_provider: OrganizationParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationParameters {
    /// Name of the organization in CF.
    pub name: String,

    /// Whether the organization is suspended. Late-initialized from CF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: OrganizationObservation,
}

impl_managed!(Organization, OrganizationStatus, OrganizationObservation);

impl Organization {
    /// # Errors
    ///
    /// Returns an error when the organization name is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.spec.for_provider.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        Ok(())
    }
}

/// `Space` manages a CF space inside an organization.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Space
/// metadata:
///   name: dev
///   namespace: platform
/// spec:
///   forProvider:
///     name: dev
///     orgRef:
///       name: acme
///     allowSsh: false
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "Space",
    namespaced,
    doc = "Space is a managed Cloud Foundry space."
)]
#[kube(status = "SpaceStatus")]
#[serde(rename_all = "camelCase")]
pub struct SpaceSpec {
    pub for_provider: SpaceParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.org) || has(self.orgRef) || has(self.orgSelector) || has(self.orgName)",
        "message": "one of org, orgRef, orgSelector or orgName must be set"
    },
    {
        "rule": "[has(self.orgRef), has(self.orgSelector), has(self.orgName)].filter(x, x).size() <= 1",
        "message": "only one of orgRef, orgSelector or orgName may be set"
    }
]))]
pub struct SpaceParameters {
    /// Name of the space in CF.
    pub name: String,

    #[serde(flatten)]
    pub org: OrgScope,

    /// Whether SSH access to app instances is allowed. Late-initialized from CF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: SpaceObservation,
}

impl_managed!(Space, SpaceStatus, SpaceObservation);

impl Space {
    /// # Errors
    ///
    /// Returns an error when the name is empty or the org scope is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.spec.for_provider.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        self.spec.for_provider.org.validate_required()
    }
}
