// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/service_credential_bindings`: service keys and app bindings.

use super::client::CfClient;
use super::errors::CfError;
use super::types::{metadata_body, Accepted, Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::{BindingType, CfMetadata, LastOperation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingRelationships {
    #[serde(default)]
    pub service_instance: ToOne,
    #[serde(default)]
    pub app: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceCredentialBinding {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
    #[serde(default)]
    pub relationships: BindingRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

/// `GET /v3/service_credential_bindings/{guid}/details`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingDetails {
    #[serde(default)]
    pub credentials: serde_json::Map<String, Value>,
    #[serde(default)]
    pub syslog_drain_url: Option<String>,
}

/// Filters for listing bindings. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct BindingFilter {
    pub r#type: Option<BindingType>,
    pub names: Vec<String>,
    pub service_instance: Option<String>,
    pub app: Option<String>,
}

impl BindingFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(kind) = self.r#type {
            query.push(("type", kind.as_str().to_string()));
        }
        if !self.names.is_empty() {
            query.push(("names", self.names.join(",")));
        }
        if let Some(si) = &self.service_instance {
            query.push(("service_instance_guids", si.clone()));
        }
        if let Some(app) = &self.app {
            query.push(("app_guids", app.clone()));
        }
        query
    }
}

pub struct ServiceCredentialBindings<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn service_credential_bindings(&self) -> ServiceCredentialBindings<'_> {
        ServiceCredentialBindings { cf: self }
    }
}

impl ServiceCredentialBindings<'_> {
    pub async fn get(&self, guid: &str) -> Result<ServiceCredentialBinding, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/service_credential_bindings/{guid}"),
                &format!("service credential binding {guid}"),
            )
            .await
    }

    pub async fn list(&self, filter: &BindingFilter) -> Result<Vec<ServiceCredentialBinding>, CfError> {
        self.cf
            .list(
                &format!("{CF_API_PREFIX}/service_credential_bindings"),
                &filter.query(),
                "service credential bindings",
            )
            .await
    }

    pub async fn details(&self, guid: &str) -> Result<BindingDetails, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/service_credential_bindings/{guid}/details"),
                &format!("details of service credential binding {guid}"),
            )
            .await
    }

    /// Creates a key (`app_guid` unset) or an app binding. Bindings to
    /// managed instances are asynchronous.
    pub async fn create(
        &self,
        kind: BindingType,
        name: Option<&str>,
        service_instance_guid: &str,
        app_guid: Option<&str>,
        parameters: Option<&Value>,
        metadata: &CfMetadata,
    ) -> Result<Accepted<ServiceCredentialBinding>, CfError> {
        let mut body = metadata_body(metadata);
        body["type"] = json!(kind.as_str());
        if let Some(name) = name {
            body["name"] = json!(name);
        }
        let mut relationships = json!({ "service_instance": ToOne::to(service_instance_guid) });
        if let Some(app) = app_guid {
            relationships["app"] = json!(ToOne::to(app));
        }
        body["relationships"] = relationships;
        if let Some(parameters) = parameters {
            body["parameters"] = parameters.clone();
        }

        self.cf
            .post(
                &format!("{CF_API_PREFIX}/service_credential_bindings"),
                &body,
                &format!(
                    "service credential binding {} of {service_instance_guid}",
                    name.unwrap_or_default()
                ),
            )
            .await
    }

    /// Only labels and annotations of a binding can be updated.
    pub async fn update_metadata(&self, guid: &str, metadata: &CfMetadata) -> Result<(), CfError> {
        self.cf
            .patch::<_, Value>(
                &format!("{CF_API_PREFIX}/service_credential_bindings/{guid}"),
                &metadata_body(metadata),
                &format!("service credential binding {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/service_credential_bindings/{guid}"),
                &format!("service credential binding {guid}"),
            )
            .await
    }
}

#[cfg(test)]
#[path = "service_credential_bindings_tests.rs"]
mod service_credential_bindings_tests;
