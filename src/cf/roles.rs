// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/roles`
//!
//! Roles are created by username and origin so that users never have to be
//! looked up by GUID first. Listing asks CF to side-load the users
//! (`include=user`) so assignments can be matched by `username@origin`.

use super::client::CfClient;
use super::errors::CfError;
use super::types::{Page, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::user_key;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// Message fragment CF uses when a role is requested for an unknown user.
const NO_SUCH_USER: &str = "No user exists";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleRelationships {
    #[serde(default)]
    pub user: ToOne,
    #[serde(default)]
    pub organization: ToOne,
    #[serde(default)]
    pub space: ToOne,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    pub guid: String,
    pub r#type: String,
    #[serde(default)]
    pub relationships: RoleRelationships,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub guid: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IncludedUsers {
    #[serde(default)]
    users: Vec<User>,
}

/// A role joined with the user holding it.
#[derive(Debug, Clone, Default)]
pub struct UserRole {
    pub guid: String,
    pub r#type: String,
    pub user_guid: String,
    pub username: String,
    pub origin: String,
    pub created_at: String,
}

impl UserRole {
    #[must_use]
    pub fn key(&self) -> String {
        user_key(&self.username, &self.origin)
    }
}

/// The organization or space a role applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScope<'a> {
    Organization(&'a str),
    Space(&'a str),
}

impl RoleScope<'_> {
    fn relationship(&self) -> (&'static str, &str) {
        match self {
            Self::Organization(guid) => ("organization", *guid),
            Self::Space(guid) => ("space", *guid),
        }
    }

    fn filter(&self) -> (&'static str, String) {
        match self {
            Self::Organization(guid) => ("organization_guids", (*guid).to_string()),
            Self::Space(guid) => ("space_guids", (*guid).to_string()),
        }
    }
}

/// Whether a role create failed because the user does not exist.
#[must_use]
pub fn is_no_such_user(err: &CfError) -> bool {
    err.to_string().contains(NO_SUCH_USER)
}

fn join_users(pages: Vec<Page<Role>>) -> Vec<UserRole> {
    let mut users: HashMap<String, User> = HashMap::new();
    let mut roles = Vec::new();
    for page in pages {
        if let Some(included) = page.included {
            if let Ok(included) = serde_json::from_value::<IncludedUsers>(included) {
                users.extend(included.users.into_iter().map(|u| (u.guid.clone(), u)));
            }
        }
        roles.extend(page.resources);
    }

    roles
        .into_iter()
        .map(|role| {
            let user_guid = role.relationships.user.guid().unwrap_or_default().to_string();
            let user = users.get(&user_guid);
            UserRole {
                username: user.and_then(|u| u.username.clone()).unwrap_or_default(),
                origin: user.and_then(|u| u.origin.clone()).unwrap_or_default(),
                guid: role.guid,
                r#type: role.r#type,
                user_guid,
                created_at: role.created_at,
            }
        })
        .collect()
}

pub struct Roles<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn roles(&self) -> Roles<'_> {
        Roles { cf: self }
    }
}

impl Roles<'_> {
    pub async fn get(&self, guid: &str) -> Result<UserRole, CfError> {
        let what = format!("role {guid}");
        let pages = self
            .cf
            .pages(
                &format!("{CF_API_PREFIX}/roles"),
                &[("guids", guid.to_string()), ("include", "user".to_string())],
                &what,
            )
            .await?;
        join_users(pages)
            .into_iter()
            .next()
            .ok_or_else(|| CfError::not_found(what))
    }

    /// Every role of `role_type` in `scope`, with the users holding them.
    pub async fn list(&self, scope: RoleScope<'_>, role_type: &str) -> Result<Vec<UserRole>, CfError> {
        let pages = self
            .cf
            .pages(
                &format!("{CF_API_PREFIX}/roles"),
                &[
                    ("types", role_type.to_string()),
                    scope.filter(),
                    ("include", "user".to_string()),
                ],
                &format!("{role_type} roles"),
            )
            .await?;
        Ok(join_users(pages))
    }

    /// The role of `role_type` held by `username@origin` in `scope`.
    pub async fn find(
        &self,
        scope: RoleScope<'_>,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> Result<UserRole, CfError> {
        let key = user_key(username, origin);
        self.list(scope, role_type)
            .await?
            .into_iter()
            .find(|r| r.key() == key)
            .ok_or_else(|| CfError::not_found(format!("{role_type} role of {key}")))
    }

    pub async fn create(
        &self,
        scope: RoleScope<'_>,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> Result<Role, CfError> {
        let (relation, guid) = scope.relationship();
        let mut body = json!({
            "type": role_type,
            "relationships": {
                "user": { "data": { "username": username, "origin": origin } },
            }
        });
        body["relationships"][relation] = json!(ToOne::to(guid));
        let what = format!("{role_type} role of {}", user_key(username, origin));
        self.cf
            .post(&format!("{CF_API_PREFIX}/roles"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    /// Creates the role, or returns the existing one when the user already
    /// holds it.
    pub async fn ensure(
        &self,
        scope: RoleScope<'_>,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> Result<UserRole, CfError> {
        match self.create(scope, role_type, username, origin).await {
            Ok(role) => Ok(UserRole {
                user_guid: role.relationships.user.guid().unwrap_or_default().to_string(),
                guid: role.guid,
                r#type: role.r#type,
                username: username.to_string(),
                origin: origin.to_string(),
                created_at: role.created_at,
            }),
            Err(e) if e.is_role_already_assigned() || e.is_already_exists() => {
                self.find(scope, role_type, username, origin).await
            }
            Err(e) => Err(e),
        }
    }

    /// Role deletes are asynchronous; returns the job GUID.
    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(&format!("{CF_API_PREFIX}/roles/{guid}"), &format!("role {guid}"))
            .await
    }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod roles_tests;
