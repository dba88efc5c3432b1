// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scope references: the `{GUID | ref | selector | name}` pattern used to point
//! at a parent CF resource.
//!
//! ```yaml
//! forProvider:
//!   space: 5f0c5e5a-...          # direct GUID
//!   spaceRef: { name: dev }      # another Space resource in this namespace
//!   spaceSelector:               # first matching Space resource
//!     matchLabels: { team: a }
//!   spaceName: dev               # CF name lookup (with orgName)
//!   orgName: acme
//! ```
//!
//! The resolver writes the resolved GUID back into the GUID field, so a
//! reconciled resource carries both the GUID and the mode it was resolved from.

use super::common::LabelSelector;
use super::validation::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to another managed resource in the same namespace.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Reference {
    pub name: String,
}

/// Uniform access to one scope reference, whatever its field names.
pub trait ScopeReference {
    /// camelCase name of the GUID field, used in messages.
    const FIELD: &'static str;

    fn guid(&self) -> Option<&str>;
    fn set_guid(&mut self, guid: String);
    fn reference(&self) -> Option<&Reference>;
    fn selector(&self) -> Option<&LabelSelector>;
    fn lookup_name(&self) -> Option<&str>;

    /// Whether any of the reference modes is set.
    fn is_specified(&self) -> bool {
        self.guid().is_some_and(|g| !g.is_empty())
            || self.reference().is_some()
            || self.selector().is_some()
            || self.lookup_name().is_some_and(|n| !n.is_empty())
    }

    /// Rejects more than one of `{ref, selector, name}`. The GUID is not
    /// counted, as it holds the resolved value of the other mode.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousReference`] when two or more modes are set.
    fn validate_exclusive(&self) -> Result<(), ValidationError> {
        let modes = [
            self.reference().is_some(),
            self.selector().is_some(),
            self.lookup_name().is_some_and(|n| !n.is_empty()),
        ];
        if modes.iter().filter(|set| **set).count() > 1 {
            return Err(ValidationError::AmbiguousReference {
                field: Self::FIELD.to_string(),
            });
        }
        Ok(())
    }

    /// Requires at least one mode and at most one of `{ref, selector, name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingReference`] or
    /// [`ValidationError::AmbiguousReference`].
    fn validate_required(&self) -> Result<(), ValidationError> {
        if !self.is_specified() {
            return Err(ValidationError::MissingReference {
                field: Self::FIELD.to_string(),
            });
        }
        self.validate_exclusive()
    }
}

macro_rules! impl_scope_reference {
    (@base $scope:ty, $field:literal, $guid:ident, $reference:ident, $selector:ident) => {
        impl ScopeReference for $scope {
            const FIELD: &'static str = $field;

            fn guid(&self) -> Option<&str> {
                self.$guid.as_deref().filter(|g| !g.is_empty())
            }

            fn set_guid(&mut self, guid: String) {
                self.$guid = Some(guid);
            }

            fn reference(&self) -> Option<&Reference> {
                self.$reference.as_ref()
            }

            fn selector(&self) -> Option<&LabelSelector> {
                self.$selector.as_ref()
            }

            fn lookup_name(&self) -> Option<&str> {
                self.lookup()
            }
        }
    };
    ($scope:ty, $field:literal, $guid:ident, $reference:ident, $selector:ident, $name:ident) => {
        impl_scope_reference!(@base $scope, $field, $guid, $reference, $selector);
        impl $scope {
            fn lookup(&self) -> Option<&str> {
                self.$name.as_deref()
            }
        }
    };
    ($scope:ty, $field:literal, $guid:ident, $reference:ident, $selector:ident) => {
        impl_scope_reference!(@base $scope, $field, $guid, $reference, $selector);
        impl $scope {
            #[allow(clippy::unused_self)]
            fn lookup(&self) -> Option<&str> {
                None
            }
        }
    };
}

/// Reference to a CF organization.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgScope {
    /// GUID of the organization.
    ///
    /// May be set next to one other mode, since resolved references are
    /// written back here. A set GUID wins, so clear it when changing the
    /// reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,

    /// `Organization` resource to take the GUID from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_ref: Option<Reference>,

    /// Selects an `Organization` resource by label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_selector: Option<LabelSelector>,

    /// Name of the organization in CF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
}

impl_scope_reference!(OrgScope, "org", org, org_ref, org_selector, org_name);

/// Reference to a CF space.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceScope {
    /// GUID of the space.
    ///
    /// May be set next to one other mode, since resolved references are
    /// written back here. A set GUID wins, so clear it when changing the
    /// reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,

    /// `Space` resource to take the GUID from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_ref: Option<Reference>,

    /// Selects a `Space` resource by label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_selector: Option<LabelSelector>,

    /// Name of the space in CF. Requires `orgName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,

    /// Organization name disambiguating `spaceName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
}

impl_scope_reference!(SpaceScope, "space", space, space_ref, space_selector, space_name);

/// Reference to a CF domain.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainScope {
    /// GUID of the domain. Same precedence as `org` in [`OrgScope`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_selector: Option<LabelSelector>,

    /// Fully qualified domain name in CF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
}

impl_scope_reference!(DomainScope, "domain", domain, domain_ref, domain_selector, domain_name);

/// Reference to a CF service instance.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceScope {
    /// GUID of the service instance. Same precedence as `org` in [`OrgScope`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_selector: Option<LabelSelector>,

    /// Name of the service instance. Must be unique among the instances
    /// visible to the provider credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_name: Option<String>,
}

impl_scope_reference!(
    ServiceInstanceScope,
    "serviceInstance",
    service_instance,
    service_instance_ref,
    service_instance_selector,
    service_instance_name
);

/// Reference to a CF app.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppScope {
    /// GUID of the app. Same precedence as `org` in [`OrgScope`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl_scope_reference!(AppScope, "app", app, app_ref, app_selector, app_name);

/// Reference to a CF route. Routes have no name, so there is no name lookup.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteScope {
    /// GUID of the route. Same precedence as `org` in [`OrgScope`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_ref: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_selector: Option<LabelSelector>,
}

impl_scope_reference!(RouteScope, "route", route, route_ref, route_selector);

#[cfg(test)]
#[path = "references_tests.rs"]
mod references_tests;
