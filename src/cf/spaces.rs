// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/spaces` and the space SSH feature.

use super::client::CfClient;
use super::errors::CfError;
use super::types::{Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceRelationships {
    #[serde(default)]
    pub organization: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Space {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub relationships: SpaceRelationships,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Space {
    #[must_use]
    pub fn org_guid(&self) -> Option<&str> {
        self.relationships.organization.guid()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SpaceFeature {
    enabled: bool,
}

pub struct Spaces<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn spaces(&self) -> Spaces<'_> {
        Spaces { cf: self }
    }
}

impl Spaces<'_> {
    pub async fn get(&self, guid: &str) -> Result<Space, CfError> {
        self.cf
            .get(&format!("{CF_API_PREFIX}/spaces/{guid}"), &format!("space {guid}"))
            .await
    }

    /// Finds a space by name, optionally within one organization.
    pub async fn single_by_name(&self, name: &str, org_guid: Option<&str>) -> Result<Space, CfError> {
        let mut query = vec![("names", name.to_string())];
        if let Some(org) = org_guid {
            query.push(("organization_guids", org.to_string()));
        }
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/spaces"),
                &query,
                &format!("space {name}"),
            )
            .await
    }

    pub async fn create(&self, name: &str, org_guid: &str) -> Result<Space, CfError> {
        let body = json!({
            "name": name,
            "relationships": { "organization": ToOne::to(org_guid) }
        });
        let what = format!("space {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/spaces"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn rename(&self, guid: &str, name: &str) -> Result<Space, CfError> {
        let what = format!("space {guid}");
        self.cf
            .patch(
                &format!("{CF_API_PREFIX}/spaces/{guid}"),
                &json!({ "name": name }),
                &what,
            )
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(&format!("{CF_API_PREFIX}/spaces/{guid}"), &format!("space {guid}"))
            .await
    }

    pub async fn ssh_enabled(&self, guid: &str) -> Result<bool, CfError> {
        let feature: SpaceFeature = self
            .cf
            .get(
                &format!("{CF_API_PREFIX}/spaces/{guid}/features/ssh"),
                &format!("ssh feature of space {guid}"),
            )
            .await?;
        Ok(feature.enabled)
    }

    pub async fn set_ssh_enabled(&self, guid: &str, enabled: bool) -> Result<(), CfError> {
        self.cf
            .patch::<_, serde_json::Value>(
                &format!("{CF_API_PREFIX}/spaces/{guid}/features/ssh"),
                &json!({ "enabled": enabled }),
                &format!("ssh feature of space {guid}"),
            )
            .await?;
        Ok(())
    }
}
