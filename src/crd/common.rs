// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Types shared by every managed resource kind.
//!
//! Each kind follows the same shape:
//!
//! ```yaml
//! spec:
//!   forProvider: { ... }          # desired CF state
//!   providerConfigRef: { name: default }
//!   managementPolicies: ["*"]
//!   deletionPolicy: Delete
//!   writeConnectionSecretToRef: { name: creds, namespace: apps }
//! status:
//!   atProvider: { ... }           # observed CF state
//!   conditions: [ ... ]
//! ```

use crate::constants::DEFAULT_PROVIDER_CONFIG;
use crate::labels::EXTERNAL_NAME_ANNOTATION;
use kube::Resource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label selector to match Kubernetes resources.
///
/// The result of matchLabels and matchExpressions are `ANDed`. An empty label
/// selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. All pairs must be present on the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// Values for In and `NotIn`. Must be empty for Exists and `DoesNotExist`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: `Ready` or `Synced`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Which lifecycle actions the controller may take on the external resource.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ManagementPolicy {
    Observe,
    Create,
    Update,
    Delete,
    LateInitialize,
    #[serde(rename = "*")]
    All,
}

/// What happens to the CF resource when the custom resource is deleted.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Orphan,
}

/// Reference to a cluster-scoped `ProviderConfig`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProviderConfigReference {
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER_CONFIG.to_string(),
        }
    }
}

/// Where to publish connection details.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretReference {
    pub name: String,

    /// Defaults to the namespace of the managed resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A single key of a Kubernetes secret.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SecretKeySelector {
    pub name: String,

    /// Defaults to the namespace of the managed resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub key: String,
}

/// Lifecycle fields common to every managed resource spec.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// `ProviderConfig` naming the CF deployment and credentials to use.
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,

    /// Actions the controller may take. `["*"]` allows everything,
    /// `["Observe"]` only reads the CF resource into status.
    #[serde(default = "default_management_policies")]
    pub management_policies: Vec<ManagementPolicy>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Secret to write connection details to, if the kind produces any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

fn default_management_policies() -> Vec<ManagementPolicy> {
    vec![ManagementPolicy::All]
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            provider_config_ref: ProviderConfigReference::default(),
            management_policies: default_management_policies(),
            deletion_policy: DeletionPolicy::Delete,
            write_connection_secret_to_ref: None,
        }
    }
}

impl ResourceSpec {
    /// Whether the given action is permitted by the management policies.
    #[must_use]
    pub fn allows(&self, policy: ManagementPolicy) -> bool {
        self.management_policies
            .iter()
            .any(|p| *p == ManagementPolicy::All || *p == policy)
    }

    /// True when the only permitted action is `Observe`.
    #[must_use]
    pub fn is_observe_only(&self) -> bool {
        !self.management_policies.is_empty()
            && self
                .management_policies
                .iter()
                .all(|p| *p == ManagementPolicy::Observe)
    }

    /// Whether deleting the custom resource should delete the CF resource.
    #[must_use]
    pub fn should_delete_external(&self) -> bool {
        self.deletion_policy == DeletionPolicy::Delete && self.allows(ManagementPolicy::Delete)
    }
}

/// Status fields common to every managed resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// CF labels and annotations attached to a resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
pub struct CfMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// CF `last_operation` as reported on service instances and bindings.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    /// `create`, `update` or `delete`.
    #[serde(default)]
    pub r#type: String,

    /// `initial`, `in progress`, `succeeded` or `failed`.
    #[serde(default)]
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "updated_at")]
    pub updated_at: Option<String>,
}

/// Access to the lifecycle fields shared by every managed resource.
///
/// Implemented for each kind with [`impl_managed!`](crate::impl_managed).
pub trait Managed {
    fn resource_spec(&self) -> &ResourceSpec;
    fn resource_status(&self) -> Option<&ResourceStatus>;
    fn resource_status_mut(&mut self) -> &mut ResourceStatus;
}

/// Implements [`Managed`] and the `at_provider` accessors for a kind whose
/// spec flattens a [`ResourceSpec`] into `resource` and whose status flattens a
/// [`ResourceStatus`] into `resource` next to an `at_provider` observation.
#[macro_export]
macro_rules! impl_managed {
    ($kind:ty, $status:ty, $observation:ty) => {
        impl $crate::crd::Managed for $kind {
            fn resource_spec(&self) -> &$crate::crd::ResourceSpec {
                &self.spec.resource
            }

            fn resource_status(&self) -> Option<&$crate::crd::ResourceStatus> {
                self.status.as_ref().map(|s| &s.resource)
            }

            fn resource_status_mut(&mut self) -> &mut $crate::crd::ResourceStatus {
                &mut self.status.get_or_insert_with(<$status>::default).resource
            }
        }

        impl $kind {
            /// Observed CF state, if any has been recorded.
            #[must_use]
            pub fn at_provider(&self) -> Option<&$observation> {
                self.status.as_ref().map(|s| &s.at_provider)
            }

            /// Mutable observed CF state, creating an empty status when absent.
            pub fn at_provider_mut(&mut self) -> &mut $observation {
                &mut self.status.get_or_insert_with(<$status>::default).at_provider
            }
        }
    };
}

/// Returns the external-name annotation when it is set and non-empty.
#[must_use]
pub fn external_name<K: Resource>(obj: &K) -> Option<&str> {
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION))
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

/// Sets the external-name annotation.
pub fn set_external_name<K: Resource>(obj: &mut K, name: &str) {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
}

/// Returns the external-name only when it has the shape of a CF GUID.
#[must_use]
pub fn external_guid<K: Resource>(obj: &K) -> Option<&str> {
    external_name(obj).filter(|name| is_guid(name))
}

/// Whether `value` is a canonical 8-4-4-4-12 hexadecimal GUID.
#[must_use]
pub fn is_guid(value: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let parts: Vec<&str> = value.split('-').collect();
    parts.len() == GROUPS.len()
        && parts
            .iter()
            .zip(GROUPS)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}
