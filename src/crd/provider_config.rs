// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ProviderConfig`: which CF deployment to talk to, and as whom.

use super::common::{Condition, SecretKeySelector};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ProviderConfig` names a CF API endpoint and the secret holding the
/// credentials used to authenticate against it.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   apiEndpoint: https://api.cf.example.com
///   credentials:
///     source: Secret
///     secretRef:
///       name: cf-credentials
///       namespace: crossplane-system
///       key: credentials
/// ```
///
/// The secret value is a JSON document:
/// `{"email": "...", "username": "...", "password": "...", "origin": "ldap"}`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    kind = "ProviderConfig",
    doc = "ProviderConfig configures how the controllers connect to a Cloud Foundry API endpoint."
)]
#[kube(status = "ProviderConfigStatus")]
#[serde(rename_all = "camelCase")]
#[schemars(extend("x-kubernetes-validations" = [
    {
        "rule": "has(self.apiEndpoint) || has(self.endpoint)",
        "message": "one of apiEndpoint or endpoint must be set"
    }
]))]
pub struct ProviderConfigSpec {
    /// URL of the CF API, e.g. `https://api.cf.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    /// Secret holding the API URL, used when `apiEndpoint` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointSource>,

    pub credentials: ProviderCredentials,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSource {
    pub secret_ref: SecretKeySelector,
}

/// Where the CF credentials come from.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    pub source: CredentialsSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum CredentialsSource {
    Secret,
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
