// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/organizations`

use super::client::CfClient;
use super::errors::CfError;
use super::types::Metadata;
use crate::constants::CF_API_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub metadata: Metadata,
}

pub struct Organizations<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn organizations(&self) -> Organizations<'_> {
        Organizations { cf: self }
    }
}

impl Organizations<'_> {
    pub async fn get(&self, guid: &str) -> Result<Organization, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/organizations/{guid}"),
                &format!("organization {guid}"),
            )
            .await
    }

    pub async fn single_by_name(&self, name: &str) -> Result<Organization, CfError> {
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/organizations"),
                &[("names", name.to_string())],
                &format!("organization {name}"),
            )
            .await
    }

    pub async fn create(&self, name: &str, suspended: Option<bool>) -> Result<Organization, CfError> {
        let mut body = json!({ "name": name });
        if let Some(suspended) = suspended {
            body["suspended"] = json!(suspended);
        }
        let what = format!("organization {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/organizations"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn update(
        &self,
        guid: &str,
        name: &str,
        suspended: Option<bool>,
    ) -> Result<Organization, CfError> {
        let mut body = json!({ "name": name });
        if let Some(suspended) = suspended {
            body["suspended"] = json!(suspended);
        }
        let what = format!("organization {guid}");
        self.cf
            .patch(&format!("{CF_API_PREFIX}/organizations/{guid}"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    /// Organization deletes are always asynchronous.
    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/organizations/{guid}"),
                &format!("organization {guid}"),
            )
            .await
    }
}
