// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/service_instances` and service plan lookup.
//!
//! Managed instances are provisioned by a broker: create, update and delete
//! answer `202 Accepted` with a job and the instance reports progress through
//! `last_operation`. User-provided instances are synchronous.

use super::client::CfClient;
use super::errors::CfError;
use super::types::{Accepted, Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::{CfMetadata, LastOperation, MaintenanceInfo, ServiceInstanceType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInstanceRelationships {
    #[serde(default)]
    pub space: ToOne,
    #[serde(default)]
    pub service_plan: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub syslog_drain_url: Option<String>,
    #[serde(default)]
    pub route_service_url: Option<String>,
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
    #[serde(default)]
    pub relationships: ServiceInstanceRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePlan {
    pub guid: String,
    pub name: String,
}

/// Desired state of a service instance as sent to CF.
///
/// `parameters` only applies to managed instances; `credentials`, the syslog
/// drain and the route service URL only to user-provided ones.
#[derive(Debug, Clone, Default)]
pub struct InstancePayload {
    pub name: String,
    pub plan: Option<String>,
    pub parameters: Option<Value>,
    pub credentials: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub syslog_drain_url: Option<String>,
    pub route_service_url: Option<String>,
    pub metadata: CfMetadata,
}

impl InstancePayload {
    fn body(&self, kind: ServiceInstanceType) -> Value {
        let mut body = json!({
            "name": self.name,
            "metadata": {
                "labels": self.metadata.labels.clone().unwrap_or_default(),
                "annotations": self.metadata.annotations.clone().unwrap_or_default(),
            }
        });
        if let Some(tags) = &self.tags {
            body["tags"] = json!(tags);
        }
        match kind {
            ServiceInstanceType::Managed => {
                if let Some(parameters) = &self.parameters {
                    body["parameters"] = parameters.clone();
                }
            }
            ServiceInstanceType::UserProvided => {
                if let Some(credentials) = &self.credentials {
                    body["credentials"] = credentials.clone();
                }
                if let Some(url) = &self.syslog_drain_url {
                    body["syslog_drain_url"] = json!(url);
                }
                if let Some(url) = &self.route_service_url {
                    body["route_service_url"] = json!(url);
                }
            }
        }
        body
    }
}

pub struct ServiceInstances<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn service_instances(&self) -> ServiceInstances<'_> {
        ServiceInstances { cf: self }
    }
}

impl ServiceInstances<'_> {
    pub async fn get(&self, guid: &str) -> Result<ServiceInstance, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/service_instances/{guid}"),
                &format!("service instance {guid}"),
            )
            .await
    }

    /// Finds the one instance named `name`, within `space_guid` when given.
    pub async fn single_by_name(
        &self,
        name: &str,
        space_guid: Option<&str>,
    ) -> Result<ServiceInstance, CfError> {
        let mut query = vec![("names", name.to_string())];
        if let Some(space) = space_guid {
            query.push(("space_guids", space.to_string()));
        }
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/service_instances"),
                &query,
                &format!("service instance {name}"),
            )
            .await
    }

    /// Resolves a plan GUID from offering and plan names.
    pub async fn plan_guid(&self, offering: &str, plan: &str) -> Result<String, CfError> {
        let found: ServicePlan = self
            .cf
            .single(
                &format!("{CF_API_PREFIX}/service_plans"),
                &[
                    ("names", plan.to_string()),
                    ("service_offering_names", offering.to_string()),
                ],
                &format!("service plan {plan} of offering {offering}"),
            )
            .await?;
        Ok(found.guid)
    }

    /// Submits a create. Managed instances return a job and no resource.
    pub async fn create(
        &self,
        kind: ServiceInstanceType,
        space_guid: &str,
        payload: &InstancePayload,
    ) -> Result<Accepted<ServiceInstance>, CfError> {
        let mut body = payload.body(kind);
        body["type"] = json!(kind.as_str());
        let mut relationships = json!({ "space": ToOne::to(space_guid) });
        if let Some(plan) = &payload.plan {
            relationships["service_plan"] = json!(ToOne::to(plan));
        }
        body["relationships"] = relationships;

        self.cf
            .post(
                &format!("{CF_API_PREFIX}/service_instances"),
                &body,
                &format!("service instance {}", payload.name),
            )
            .await
    }

    pub async fn update(
        &self,
        guid: &str,
        kind: ServiceInstanceType,
        payload: &InstancePayload,
    ) -> Result<Accepted<ServiceInstance>, CfError> {
        let mut body = payload.body(kind);
        if let Some(plan) = &payload.plan {
            body["relationships"] = json!({ "service_plan": ToOne::to(plan) });
        }
        self.cf
            .patch(
                &format!("{CF_API_PREFIX}/service_instances/{guid}"),
                &body,
                &format!("service instance {guid}"),
            )
            .await
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/service_instances/{guid}"),
                &format!("service instance {guid}"),
            )
            .await
    }
}

#[cfg(test)]
#[path = "service_instances_tests.rs"]
mod service_instances_tests;
