// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/routes`

use super::client::CfClient;
use super::errors::CfError;
use super::types::{metadata_body, Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::CfMetadata;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRelationships {
    #[serde(default)]
    pub space: ToOne,
    #[serde(default)]
    pub domain: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationProcess {
    #[serde(default)]
    pub r#type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinationApp {
    pub guid: String,
    #[serde(default)]
    pub process: Option<DestinationProcess>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub guid: String,
    pub app: DestinationApp,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Route {
    pub guid: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub relationships: RouteRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

/// Identifying fields of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteKey {
    pub space: String,
    pub domain: String,
    pub host: String,
    pub path: String,
    pub port: Option<i32>,
}

impl Route {
    /// Whether this route is exactly the one described by `key`. The CF list
    /// filters match prefixes and treat empty values loosely.
    #[must_use]
    pub fn matches(&self, key: &RouteKey) -> bool {
        self.relationships.space.guid() == Some(key.space.as_str())
            && self.relationships.domain.guid() == Some(key.domain.as_str())
            && self.host == key.host
            && self.path == key.path
            && (key.port.is_none() || self.port == key.port)
    }
}

pub struct Routes<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn routes(&self) -> Routes<'_> {
        Routes { cf: self }
    }
}

impl Routes<'_> {
    pub async fn get(&self, guid: &str) -> Result<Route, CfError> {
        self.cf
            .get(&format!("{CF_API_PREFIX}/routes/{guid}"), &format!("route {guid}"))
            .await
    }

    pub async fn single(&self, key: &RouteKey) -> Result<Route, CfError> {
        let mut query = vec![
            ("space_guids", key.space.clone()),
            ("domain_guids", key.domain.clone()),
            ("hosts", key.host.clone()),
            ("paths", key.path.clone()),
        ];
        if let Some(port) = key.port {
            query.push(("ports", port.to_string()));
        }
        let what = format!("route {}{} in space {}", key.host, key.path, key.space);
        let mut routes: Vec<Route> = self
            .cf
            .list(&format!("{CF_API_PREFIX}/routes"), &query, &what)
            .await?
            .into_iter()
            .filter(|r: &Route| r.matches(key))
            .collect();
        match routes.len() {
            0 => Err(CfError::not_found(what)),
            1 => Ok(routes.remove(0)),
            count => Err(CfError::Ambiguous { what, count }),
        }
    }

    pub async fn create(&self, key: &RouteKey, metadata: &CfMetadata) -> Result<Route, CfError> {
        let mut body = metadata_body(metadata);
        body["relationships"] = json!({
            "space": ToOne::to(&key.space),
            "domain": ToOne::to(&key.domain),
        });
        if !key.host.is_empty() {
            body["host"] = json!(key.host);
        }
        if !key.path.is_empty() {
            body["path"] = json!(key.path);
        }
        if let Some(port) = key.port {
            body["port"] = json!(port);
        }
        let what = format!("route {}{}", key.host, key.path);
        self.cf
            .post(&format!("{CF_API_PREFIX}/routes"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn update_metadata(&self, guid: &str, metadata: &CfMetadata) -> Result<(), CfError> {
        self.cf
            .patch::<_, serde_json::Value>(
                &format!("{CF_API_PREFIX}/routes/{guid}"),
                &metadata_body(metadata),
                &format!("route {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(&format!("{CF_API_PREFIX}/routes/{guid}"), &format!("route {guid}"))
            .await
    }
}
