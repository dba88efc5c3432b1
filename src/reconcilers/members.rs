// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Role set reconciliation for `OrgMembers` and `SpaceMembers`.
//!
//! Desired state is a set of users for one role type in one organization or
//! space. Observed state depends on the enforce policy:
//!
//! - `Lax`: the assignments recorded in `status.atProvider.assignedRoles`
//!   that still exist in CF
//! - `Strict`: every CF assignment of the role type in the scope
//!
//! Missing users are assigned first, then extra assignments removed. One
//! failing user does not stop the others; all errors are reported together
//! and the status list always reflects what CF holds.

use crate::cf::roles::{is_no_such_user, RoleScope, UserRole};
use crate::cf::{CfClient, CfError};
use crate::crd::{AssignedRole, EnforcePolicy, Member, OrgRoleType};
use anyhow::{anyhow, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Users to assign and assignments to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembersDiff {
    pub to_add: Vec<Member>,
    pub to_remove: Vec<AssignedRole>,
}

impl MembersDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Set difference by `username@origin`. Duplicate desired users count once.
#[must_use]
pub fn diff(desired: &[Member], observed: &[AssignedRole]) -> MembersDiff {
    let observed_keys: HashSet<String> = observed.iter().map(AssignedRole::key).collect();
    let desired_keys: HashSet<String> = desired.iter().map(Member::key).collect();

    let mut seen = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|m| !observed_keys.contains(&m.key()) && seen.insert(m.key()))
        .cloned()
        .collect();
    let to_remove = observed
        .iter()
        .filter(|r| !desired_keys.contains(&r.key()))
        .cloned()
        .collect();
    MembersDiff { to_add, to_remove }
}

fn assigned(role: &UserRole) -> AssignedRole {
    AssignedRole {
        username: role.username.clone(),
        origin: role.origin.clone(),
        guid: role.guid.clone(),
    }
}

/// Gives `member` the `organization_user` role in `org_guid`, which CF
/// requires before any space role.
///
/// # Errors
///
/// Returns an error only when the user does not exist; other failures are
/// logged and left to the space role assignment to report.
pub async fn ensure_org_user(cf: &CfClient, org_guid: &str, member: &Member) -> Result<()> {
    match cf
        .roles()
        .ensure(
            RoleScope::Organization(org_guid),
            OrgRoleType::OrganizationUser.as_str(),
            &member.username,
            member.origin(),
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(err) if is_no_such_user(&err) => Err(err.into()),
        Err(err) => {
            warn!(
                user = %member.key(),
                org = %org_guid,
                error = %err,
                "Cannot ensure organization_user role"
            );
            Ok(())
        }
    }
}

/// Reconciles one role type in one scope.
pub struct Members<'a> {
    cf: &'a CfClient,
    scope: RoleScope<'a>,
    role_type: &'a str,
    parent_org: Option<&'a str>,
}

impl<'a> Members<'a> {
    #[must_use]
    pub fn new(cf: &'a CfClient, scope: RoleScope<'a>, role_type: &'a str) -> Self {
        Self {
            cf,
            scope,
            role_type,
            parent_org: None,
        }
    }

    /// Bootstrap `organization_user` in `org_guid` before each assignment.
    #[must_use]
    pub fn with_parent_org(mut self, org_guid: &'a str) -> Self {
        self.parent_org = Some(org_guid);
        self
    }

    /// Current assignments under `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CF roles cannot be listed.
    pub async fn observe(
        &self,
        policy: EnforcePolicy,
        recorded: &[AssignedRole],
    ) -> Result<Vec<AssignedRole>, CfError> {
        let roles = self.cf.roles().list(self.scope, self.role_type).await?;
        let observed = match policy {
            EnforcePolicy::Strict => roles.iter().map(assigned).collect(),
            EnforcePolicy::Lax => {
                let recorded: HashSet<&str> = recorded.iter().map(|r| r.guid.as_str()).collect();
                roles
                    .iter()
                    .filter(|r| recorded.contains(r.guid.as_str()))
                    .map(assigned)
                    .collect()
            }
        };
        Ok(observed)
    }

    /// Assigns missing users, then removes extra assignments. `assignments`
    /// is updated with every role that was created or removed.
    ///
    /// # Errors
    ///
    /// Returns every failed assignment or removal, joined.
    pub async fn sync(&self, desired: &[Member], assignments: &mut Vec<AssignedRole>) -> Result<()> {
        let MembersDiff { to_add, to_remove } = diff(desired, assignments);
        let mut errors = Vec::new();

        for member in &to_add {
            match self.assign(member).await {
                Ok(role) => assignments.push(role),
                Err(err) => errors.push(format!("{}: {err:#}", member.key())),
            }
        }

        for role in &to_remove {
            match self.remove(role).await {
                Ok(()) => assignments.retain(|r| r.guid != role.guid),
                Err(err) => errors.push(format!("{}: {err}", role.key())),
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        Err(anyhow!(
            "cannot reconcile {} members: {}",
            self.role_type,
            errors.join("; ")
        ))
    }

    /// Removes every assignment in `assignments`.
    ///
    /// # Errors
    ///
    /// Returns every failed removal, joined. Already removed roles are not
    /// errors.
    pub async fn delete_all(&self, assignments: &mut Vec<AssignedRole>) -> Result<()> {
        self.sync(&[], assignments).await
    }

    async fn assign(&self, member: &Member) -> Result<AssignedRole> {
        if let Some(org) = self.parent_org {
            ensure_org_user(self.cf, org, member).await?;
        }
        let role = self
            .cf
            .roles()
            .ensure(self.scope, self.role_type, &member.username, member.origin())
            .await?;
        info!(user = %member.key(), role = %self.role_type, guid = %role.guid, "Assigned role");
        Ok(assigned(&role))
    }

    async fn remove(&self, role: &AssignedRole) -> Result<(), CfError> {
        match self.cf.roles().delete(&role.guid).await {
            Ok(_) => {
                info!(user = %role.key(), role = %self.role_type, guid = %role.guid, "Removed role");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(guid = %role.guid, "role already removed");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[path = "members_tests.rs"]
mod members_tests;
