// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/service_route_bindings`

use super::client::CfClient;
use super::errors::CfError;
use super::types::{metadata_body, Accepted, Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::{CfMetadata, LastOperation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteBindingRelationships {
    #[serde(default)]
    pub route: ToOne,
    #[serde(default)]
    pub service_instance: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRouteBinding {
    pub guid: String,
    #[serde(default)]
    pub route_service_url: Option<String>,
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
    #[serde(default)]
    pub relationships: RouteBindingRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

pub struct ServiceRouteBindings<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn service_route_bindings(&self) -> ServiceRouteBindings<'_> {
        ServiceRouteBindings { cf: self }
    }
}

impl ServiceRouteBindings<'_> {
    pub async fn get(&self, guid: &str) -> Result<ServiceRouteBinding, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/service_route_bindings/{guid}"),
                &format!("service route binding {guid}"),
            )
            .await
    }

    /// A route can be bound to at most one service instance.
    pub async fn single(&self, route_guid: &str, service_instance_guid: &str) -> Result<ServiceRouteBinding, CfError> {
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/service_route_bindings"),
                &[
                    ("route_guids", route_guid.to_string()),
                    ("service_instance_guids", service_instance_guid.to_string()),
                ],
                &format!("binding of route {route_guid} to {service_instance_guid}"),
            )
            .await
    }

    pub async fn create(
        &self,
        route_guid: &str,
        service_instance_guid: &str,
        parameters: Option<&Value>,
        metadata: &CfMetadata,
    ) -> Result<Accepted<ServiceRouteBinding>, CfError> {
        let mut body = metadata_body(metadata);
        body["relationships"] = json!({
            "route": ToOne::to(route_guid),
            "service_instance": ToOne::to(service_instance_guid),
        });
        if let Some(parameters) = parameters {
            body["parameters"] = parameters.clone();
        }
        self.cf
            .post(
                &format!("{CF_API_PREFIX}/service_route_bindings"),
                &body,
                &format!("binding of route {route_guid} to {service_instance_guid}"),
            )
            .await
    }

    pub async fn update_metadata(&self, guid: &str, metadata: &CfMetadata) -> Result<(), CfError> {
        self.cf
            .patch::<_, Value>(
                &format!("{CF_API_PREFIX}/service_route_bindings/{guid}"),
                &metadata_body(metadata),
                &format!("service route binding {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/service_route_bindings/{guid}"),
                &format!("service route binding {guid}"),
            )
            .await
    }
}
