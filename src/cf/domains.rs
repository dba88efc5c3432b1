// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/domains`

use super::client::CfClient;
use super::errors::CfError;
use super::types::{metadata_body, Metadata, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::CfMetadata;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainRelationships {
    #[serde(default)]
    pub organization: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Domain {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub supported_protocols: Vec<String>,
    #[serde(default)]
    pub relationships: DomainRelationships,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub created_at: String,
}

pub struct Domains<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn domains(&self) -> Domains<'_> {
        Domains { cf: self }
    }
}

impl Domains<'_> {
    pub async fn get(&self, guid: &str) -> Result<Domain, CfError> {
        self.cf
            .get(&format!("{CF_API_PREFIX}/domains/{guid}"), &format!("domain {guid}"))
            .await
    }

    pub async fn single_by_name(&self, name: &str) -> Result<Domain, CfError> {
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/domains"),
                &[("names", name.to_string())],
                &format!("domain {name}"),
            )
            .await
    }

    /// Creates a shared domain, or a private domain when `org_guid` is set.
    pub async fn create(
        &self,
        name: &str,
        internal: Option<bool>,
        org_guid: Option<&str>,
        metadata: &CfMetadata,
    ) -> Result<Domain, CfError> {
        let mut body = metadata_body(metadata);
        body["name"] = json!(name);
        if let Some(internal) = internal {
            body["internal"] = json!(internal);
        }
        if let Some(org) = org_guid {
            body["relationships"] = json!({ "organization": ToOne::to(org) });
        }
        let what = format!("domain {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/domains"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    /// Only labels and annotations of a domain can be updated.
    pub async fn update_metadata(&self, guid: &str, metadata: &CfMetadata) -> Result<(), CfError> {
        self.cf
            .patch::<_, serde_json::Value>(
                &format!("{CF_API_PREFIX}/domains/{guid}"),
                &metadata_body(metadata),
                &format!("domain {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(&format!("{CF_API_PREFIX}/domains/{guid}"), &format!("domain {guid}"))
            .await
    }
}
