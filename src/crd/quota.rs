// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `OrgQuota` and `SpaceQuota`: resource limits applied to organizations and spaces.
//!
//! An absent limit means unlimited. Zero is a real limit.

use super::common::{ResourceSpec, ResourceStatus};
use super::references::{OrgScope, Reference, ScopeReference};
use super::validation::{non_negative, ValidationError};
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Limits shared by organization and space quotas.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaLimits {
    /// Total memory of all started app instances, in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_memory: Option<i64>,

    /// Memory per app instance, in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub instance_memory: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_app_instances: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_app_tasks: Option<i64>,

    /// Log rate limit per app instance, in bytes per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub log_rate_limit: Option<i64>,

    /// Whether instances of paid service plans may be created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_paid_service_plans: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_service_instances: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_service_keys: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_routes: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_reserved_ports: Option<i64>,
}

impl QuotaLimits {
    fn validate(&self) -> Result<(), ValidationError> {
        non_negative(&[
            ("totalMemory", self.total_memory),
            ("instanceMemory", self.instance_memory),
            ("totalAppInstances", self.total_app_instances),
            ("totalAppTasks", self.total_app_tasks),
            ("logRateLimit", self.log_rate_limit),
            ("totalServiceInstances", self.total_service_instances),
            ("totalServiceKeys", self.total_service_keys),
            ("totalRoutes", self.total_routes),
            ("totalReservedPorts", self.total_reserved_ports),
        ])
    }
}

/// `OrgQuota` manages a CF organization quota and the organizations it applies to.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: OrgQuota
/// metadata:
///   name: small
///   namespace: platform
/// spec:
///   forProvider:
///     name: small
///     totalMemory: 10240
///     totalRoutes: 50
///     allowPaidServicePlans: false
///     orgs: ["4d1f2a6e-..."]
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "OrgQuota",
    namespaced,
    doc = "OrgQuota is a managed Cloud Foundry organization quota."
)]
#[kube(status = "OrgQuotaStatus")]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaSpec {
    pub for_provider: OrgQuotaParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaParameters {
    pub name: String,

    #[serde(flatten)]
    pub limits: QuotaLimits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub total_private_domains: Option<i64>,

    /// GUIDs of organizations the quota is applied to. CF always keeps an
    /// organization on some quota, so organizations are never removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orgs: Option<Vec<String>>,

    /// `Organization` resources whose GUIDs are added to `orgs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_refs: Option<Vec<Reference>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub limits: QuotaLimits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_private_domains: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: OrgQuotaObservation,
}

impl_managed!(OrgQuota, OrgQuotaStatus, OrgQuotaObservation);

impl OrgQuota {
    /// # Errors
    ///
    /// Returns an error for an empty name or a negative limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        params.limits.validate()?;
        non_negative(&[("totalPrivateDomains", params.total_private_domains)])
    }
}

/// `SpaceQuota` manages a CF space quota and the spaces it applies to.
///
/// The owning organization cannot change after creation.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: SpaceQuota
/// metadata:
///   name: dev-quota
///   namespace: platform
/// spec:
///   forProvider:
///     name: dev-quota
///     orgRef: { name: acme }
///     totalMemory: 2048
///     spaceRefs:
///       - name: dev
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "SpaceQuota",
    namespaced,
    doc = "SpaceQuota is a managed Cloud Foundry space quota."
)]
#[kube(status = "SpaceQuotaStatus")]
#[serde(rename_all = "camelCase")]
pub struct SpaceQuotaSpec {
    pub for_provider: SpaceQuotaParameters,

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
    },
    {
        "rule": "!has(oldSelf.org) || (has(self.org) && self.org == oldSelf.org)",
        "message": "org is immutable"
    }
]))]
pub struct SpaceQuotaParameters {
    pub name: String,

    #[serde(flatten)]
    pub org: OrgScope,

    #[serde(flatten)]
    pub limits: QuotaLimits,

    /// GUIDs of spaces the quota is applied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces: Option<Vec<String>>,

    /// `Space` resources whose GUIDs are added to `spaces`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_refs: Option<Vec<Reference>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceQuotaObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    #[serde(default)]
    pub limits: QuotaLimits,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceQuotaStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: SpaceQuotaObservation,
}

impl_managed!(SpaceQuota, SpaceQuotaStatus, SpaceQuotaObservation);

impl SpaceQuota {
    /// # Errors
    ///
    /// Returns an error for an empty name, an invalid org scope or a negative limit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.name.is_empty() {
            return Err(ValidationError::required("forProvider.name", ""));
        }
        params.org.validate_required()?;
        params.limits.validate()
    }
}
