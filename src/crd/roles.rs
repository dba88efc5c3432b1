// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Role assignments: singular `OrgRole`/`SpaceRole` and the set-based
//! `OrgMembers`/`SpaceMembers`.
//!
//! A role assignment is keyed by `(scope GUID, role type, username@origin)`.

use super::common::{ResourceSpec, ResourceStatus};
use super::references::{OrgScope, ScopeReference, SpaceScope};
use super::validation::ValidationError;
use crate::constants::DEFAULT_USER_ORIGIN;
use crate::impl_managed;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Organization role types, as named by the CF API.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrgRoleType {
    #[default]
    OrganizationUser,
    OrganizationAuditor,
    OrganizationManager,
    OrganizationBillingManager,
}

impl OrgRoleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrganizationUser => "organization_user",
            Self::OrganizationAuditor => "organization_auditor",
            Self::OrganizationManager => "organization_manager",
            Self::OrganizationBillingManager => "organization_billing_manager",
        }
    }
}

/// Space role types, as named by the CF API.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpaceRoleType {
    #[default]
    SpaceDeveloper,
    SpaceAuditor,
    SpaceManager,
    SpaceSupporter,
}

impl SpaceRoleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SpaceDeveloper => "space_developer",
            Self::SpaceAuditor => "space_auditor",
            Self::SpaceManager => "space_manager",
            Self::SpaceSupporter => "space_supporter",
        }
    }
}

/// A user, identified by username and identity provider origin.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub username: String,

    /// Identity provider origin; `uaa` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Member {
    /// Origin, defaulting to `uaa`.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.origin
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_USER_ORIGIN)
    }

    /// `username@origin`.
    #[must_use]
    pub fn key(&self) -> String {
        user_key(&self.username, self.origin())
    }
}

/// Builds the `username@origin` key identifying a user across origins.
#[must_use]
pub fn user_key(username: &str, origin: &str) -> String {
    format!("{username}@{origin}")
}

/// How `OrgMembers`/`SpaceMembers` treat assignments they did not create.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub enum EnforcePolicy {
    /// Manage only the assignments this resource created.
    #[default]
    Lax,
    /// Remove every assignment of the role type that is not listed.
    Strict,
}

/// A role assignment created by a members resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRole {
    pub username: String,
    pub origin: String,
    /// GUID of the CF role.
    pub guid: String,
}

impl AssignedRole {
    #[must_use]
    pub fn key(&self) -> String {
        user_key(&self.username, &self.origin)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: RoleObservation,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembersObservation {
    /// Assignments currently held, keyed by user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_roles: Vec<AssignedRole>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembersStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,

    #[serde(default)]
    pub at_provider: MembersObservation,
}

/// `OrgRole` assigns one organization role to one user.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: OrgRole
/// metadata:
///   name: alice-manager
///   namespace: platform
/// spec:
///   forProvider:
///     orgRef: { name: acme }
///     type: organization_manager
///     username: alice@example.com
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "OrgRole",
    namespaced,
    doc = "OrgRole is a managed Cloud Foundry organization role assignment."
)]
#[kube(status = "RoleStatus")]
#[serde(rename_all = "camelCase")]
pub struct OrgRoleSpec {
    pub for_provider: OrgRoleParameters,

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
        "rule": "self.type == oldSelf.type && self.username == oldSelf.username",
        "message": "type and username are immutable"
    }
]))]
pub struct OrgRoleParameters {
    #[serde(flatten)]
    pub org: OrgScope,

    pub r#type: OrgRoleType,

    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl_managed!(OrgRole, RoleStatus, RoleObservation);

impl OrgRole {
    /// # Errors
    ///
    /// Returns an error for an empty username or an invalid org scope.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.username.is_empty() {
            return Err(ValidationError::required("forProvider.username", ""));
        }
        params.org.validate_required()
    }

    #[must_use]
    pub fn member(&self) -> Member {
        Member {
            username: self.spec.for_provider.username.clone(),
            origin: self.spec.for_provider.origin.clone(),
        }
    }
}

/// `SpaceRole` assigns one space role to one user. The user is given the
/// `organization_user` role in the parent organization first.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "SpaceRole",
    namespaced,
    doc = "SpaceRole is a managed Cloud Foundry space role assignment."
)]
#[kube(status = "RoleStatus")]
#[serde(rename_all = "camelCase")]
pub struct SpaceRoleSpec {
    pub for_provider: SpaceRoleParameters,

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
        "rule": "self.type == oldSelf.type && self.username == oldSelf.username",
        "message": "type and username are immutable"
    }
]))]
pub struct SpaceRoleParameters {
    #[serde(flatten)]
    pub space: SpaceScope,

    pub r#type: SpaceRoleType,

    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl_managed!(SpaceRole, RoleStatus, RoleObservation);

impl SpaceRole {
    /// # Errors
    ///
    /// Returns an error for an empty username or an invalid space scope.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        if params.username.is_empty() {
            return Err(ValidationError::required("forProvider.username", ""));
        }
        params.space.validate_required()
    }

    #[must_use]
    pub fn member(&self) -> Member {
        Member {
            username: self.spec.for_provider.username.clone(),
            origin: self.spec.for_provider.origin.clone(),
        }
    }
}

/// `OrgMembers` manages the set of users holding one organization role.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: OrgMembers
/// metadata:
///   name: acme-managers
///   namespace: platform
/// spec:
///   forProvider:
///     orgRef: { name: acme }
///     roleType: organization_manager
///     enforcePolicy: Strict
///     members:
///       - username: alice@example.com
///       - username: bob
///         origin: ldap
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "OrgMembers",
    namespaced,
    doc = "OrgMembers is a managed set of Cloud Foundry organization role assignments."
)]
#[kube(status = "MembersStatus")]
#[serde(rename_all = "camelCase")]
pub struct OrgMembersSpec {
    pub for_provider: OrgMembersParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.org) || has(self.orgRef) || has(self.orgSelector) || has(self.orgName)",
        "message": "one of org, orgRef, orgSelector or orgName must be set"
    }
]))]
pub struct OrgMembersParameters {
    #[serde(flatten)]
    pub org: OrgScope,

    pub role_type: OrgRoleType,

    #[serde(default)]
    pub members: Vec<Member>,

    #[serde(default)]
    pub enforce_policy: EnforcePolicy,
}

impl_managed!(OrgMembers, MembersStatus, MembersObservation);

impl OrgMembers {
    /// # Errors
    ///
    /// Returns an error for an invalid org scope or a member without username.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        params.org.validate_required()?;
        validate_members(&params.members)
    }
}

/// `SpaceMembers` manages the set of users holding one space role.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "SpaceMembers",
    namespaced,
    doc = "SpaceMembers is a managed set of Cloud Foundry space role assignments."
)]
#[kube(status = "MembersStatus")]
#[serde(rename_all = "camelCase")]
pub struct SpaceMembersSpec {
    pub for_provider: SpaceMembersParameters,

    #[serde(flatten)]
    pub resource: ResourceSpec,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.space) || has(self.spaceRef) || has(self.spaceSelector) || has(self.spaceName)",
        "message": "one of space, spaceRef, spaceSelector or spaceName must be set"
    }
]))]
pub struct SpaceMembersParameters {
    #[serde(flatten)]
    pub space: SpaceScope,

    pub role_type: SpaceRoleType,

    #[serde(default)]
    pub members: Vec<Member>,

    #[serde(default)]
    pub enforce_policy: EnforcePolicy,
}

impl_managed!(SpaceMembers, MembersStatus, MembersObservation);

impl SpaceMembers {
    /// # Errors
    ///
    /// Returns an error for an invalid space scope or a member without username.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.spec.for_provider;
        params.space.validate_required()?;
        validate_members(&params.members)
    }
}

fn validate_members(members: &[Member]) -> Result<(), ValidationError> {
    if members.iter().any(|m| m.username.is_empty()) {
        return Err(ValidationError::required("forProvider.members[].username", ""));
    }
    Ok(())
}
