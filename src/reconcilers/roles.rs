// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Role assignment external clients.
//!
//! `OrgRole` and `SpaceRole` manage a single CF role found by
//! `(scope, type, username@origin)`. CF roles have no updatable fields, so
//! an existing role is always up to date.
//!
//! `OrgMembers` and `SpaceMembers` delegate to [`Members`]; the assignments
//! they hold are kept in `status.atProvider.assignedRoles`.

use super::managed::{
    adopt, delete_accepted, found, namespace_of, non_empty, observed_id, ExternalClient,
    ExternalObservation, ManagedKind,
};
use super::members::{diff, ensure_org_user, Members};
use super::references::Resolver;
use super::status;
use crate::cf::roles::{RoleScope, UserRole};
use crate::cf::{CfClient, CfError};
use crate::constants::{KIND_ORG_MEMBERS, KIND_ORG_ROLE, KIND_SPACE_MEMBERS, KIND_SPACE_ROLE};
use crate::context::Context;
use crate::crd::{
    external_guid, set_external_name, AssignedRole, Member, MembersObservation, OrgMembers,
    OrgRole, RoleObservation, ScopeReference, SpaceMembers, SpaceRole, ValidationError,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

fn role_observation(role: UserRole) -> RoleObservation {
    RoleObservation {
        id: Some(role.guid),
        r#type: Some(role.r#type),
        username: non_empty(role.username),
        origin: non_empty(role.origin),
        user: non_empty(role.user_guid),
        created_at: non_empty(role.created_at),
    }
}

/// Errors when the role behind a GUID external-name is not the one described.
fn check_role(role: &UserRole, role_type: &str, member: &Member) -> Result<()> {
    if role.r#type != role_type {
        return Err(CfError::Immutable {
            field: "type".to_string(),
            desired: role_type.to_string(),
            observed: role.r#type.clone(),
        }
        .into());
    }
    if !role.username.is_empty() && role.key() != member.key() {
        return Err(CfError::Immutable {
            field: "username".to_string(),
            desired: member.key(),
            observed: role.key(),
        }
        .into());
    }
    Ok(())
}

/// Shared observe of a single role assignment.
async fn observe_role(
    cf: &CfClient,
    guid: Option<&str>,
    scope: Option<RoleScope<'_>>,
    role_type: &str,
    member: &Member,
) -> Result<Option<UserRole>> {
    let roles = cf.roles();
    let lookup = match (guid, scope) {
        (Some(guid), _) => roles.get(guid).await,
        (None, Some(scope)) => {
            roles
                .find(scope, role_type, &member.username, member.origin())
                .await
        }
        (None, None) => return Err(anyhow!("role scope is not resolved")),
    };
    let Some(role) = found(lookup)? else {
        return Ok(None);
    };
    check_role(&role, role_type, member)?;
    Ok(Some(role))
}

pub struct OrgRoleExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl OrgRoleExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }
}

impl ManagedKind for OrgRole {
    const KIND: &'static str = KIND_ORG_ROLE;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrgRoleExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<OrgRole> for OrgRoleExternal {
    async fn resolve_references(&self, cr: &mut OrgRole) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .org(&mut cr.spec.for_provider.org)
            .await
    }

    async fn observe(&self, cr: &mut OrgRole) -> Result<ExternalObservation> {
        let params = &cr.spec.for_provider;
        let role = observe_role(
            &self.cf,
            external_guid(cr),
            params.org.guid().map(RoleScope::Organization),
            params.r#type.as_str(),
            &cr.member(),
        )
        .await?;
        let Some(role) = role else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &role.guid);
        *cr.at_provider_mut() = role_observation(role);
        status::available(cr);
        Ok(ExternalObservation::present(true).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut OrgRole) -> Result<()> {
        let params = &cr.spec.for_provider;
        let org = params
            .org
            .guid()
            .ok_or_else(|| anyhow!("organization of role {} is not resolved", cr.name_any()))?;
        let member = cr.member();
        let role = self
            .cf
            .roles()
            .ensure(
                RoleScope::Organization(org),
                params.r#type.as_str(),
                &member.username,
                member.origin(),
            )
            .await?;
        info!(user = %member.key(), role = %role.r#type, guid = %role.guid, "Assigned organization role");
        set_external_name(cr, &role.guid);
        cr.at_provider_mut().id = Some(role.guid);
        Ok(())
    }

    async fn update(&self, _cr: &mut OrgRole) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, cr: &mut OrgRole) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(&format!("role {id}"), self.cf.roles().delete(&id).await)
    }
}

pub struct SpaceRoleExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl SpaceRoleExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }
}

impl ManagedKind for SpaceRole {
    const KIND: &'static str = KIND_SPACE_ROLE;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceRoleExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<SpaceRole> for SpaceRoleExternal {
    async fn resolve_references(&self, cr: &mut SpaceRole) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .space(&mut cr.spec.for_provider.space)
            .await
    }

    async fn observe(&self, cr: &mut SpaceRole) -> Result<ExternalObservation> {
        let params = &cr.spec.for_provider;
        let role = observe_role(
            &self.cf,
            external_guid(cr),
            params.space.guid().map(RoleScope::Space),
            params.r#type.as_str(),
            &cr.member(),
        )
        .await?;
        let Some(role) = role else {
            return Ok(ExternalObservation::absent());
        };

        let adopted = adopt(cr, &role.guid);
        *cr.at_provider_mut() = role_observation(role);
        status::available(cr);
        Ok(ExternalObservation::present(true).late_initialized(adopted))
    }

    async fn create(&self, cr: &mut SpaceRole) -> Result<()> {
        let params = &cr.spec.for_provider;
        let space = params
            .space
            .guid()
            .ok_or_else(|| anyhow!("space of role {} is not resolved", cr.name_any()))?;
        let member = cr.member();

        let parent = self.cf.spaces().get(space).await?;
        if let Some(org) = parent.org_guid() {
            ensure_org_user(&self.cf, org, &member).await?;
        }

        let role = self
            .cf
            .roles()
            .ensure(
                RoleScope::Space(space),
                params.r#type.as_str(),
                &member.username,
                member.origin(),
            )
            .await?;
        info!(user = %member.key(), role = %role.r#type, guid = %role.guid, "Assigned space role");
        set_external_name(cr, &role.guid);
        cr.at_provider_mut().id = Some(role.guid);
        Ok(())
    }

    async fn update(&self, _cr: &mut SpaceRole) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, cr: &mut SpaceRole) -> Result<()> {
        let id = observed_id(cr, cr.at_provider().and_then(|o| o.id.as_ref()))?;
        delete_accepted(&format!("role {id}"), self.cf.roles().delete(&id).await)
    }
}

/// Observe step shared by both members kinds. The resource exists once it
/// holds at least one assignment, or when no members are wanted at all.
fn members_observation(
    desired: &[Member],
    observed: Vec<AssignedRole>,
    at_provider: &mut MembersObservation,
) -> ExternalObservation {
    let up_to_date = diff(desired, &observed).is_empty();
    let exists = !observed.is_empty() || desired.is_empty();
    at_provider.assigned_roles = observed;
    if exists {
        ExternalObservation::present(up_to_date)
    } else {
        ExternalObservation::absent()
    }
}

/// Runs `sync` and records the assignments it leaves behind, also when some
/// of them failed.
async fn sync_members(
    members: &Members<'_>,
    desired: &[Member],
    at_provider: &mut MembersObservation,
) -> Result<()> {
    let mut assignments = std::mem::take(&mut at_provider.assigned_roles);
    let result = members.sync(desired, &mut assignments).await;
    at_provider.assigned_roles = assignments;
    result
}

async fn delete_members(members: &Members<'_>, at_provider: &mut MembersObservation) -> Result<()> {
    let mut assignments = std::mem::take(&mut at_provider.assigned_roles);
    let result = members.delete_all(&mut assignments).await;
    at_provider.assigned_roles = assignments;
    result
}

pub struct OrgMembersExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl OrgMembersExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    fn org(cr: &OrgMembers) -> Result<String> {
        cr.spec
            .for_provider
            .org
            .guid()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("organization of {} is not resolved", cr.name_any()))
    }
}

impl ManagedKind for OrgMembers {
    const KIND: &'static str = KIND_ORG_MEMBERS;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrgMembersExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<OrgMembers> for OrgMembersExternal {
    async fn resolve_references(&self, cr: &mut OrgMembers) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .org(&mut cr.spec.for_provider.org)
            .await
    }

    async fn observe(&self, cr: &mut OrgMembers) -> Result<ExternalObservation> {
        let org = Self::org(cr)?;
        let params = cr.spec.for_provider.clone();
        let recorded = cr.at_provider().map(|o| o.assigned_roles.clone()).unwrap_or_default();
        let observed = Members::new(&self.cf, RoleScope::Organization(&org), params.role_type.as_str())
            .observe(params.enforce_policy, &recorded)
            .await?;

        let observation = members_observation(&params.members, observed, cr.at_provider_mut());
        if observation.resource_exists {
            status::available(cr);
        }
        Ok(observation)
    }

    async fn create(&self, cr: &mut OrgMembers) -> Result<()> {
        self.update(cr).await
    }

    async fn update(&self, cr: &mut OrgMembers) -> Result<()> {
        let org = Self::org(cr)?;
        let params = cr.spec.for_provider.clone();
        let members = Members::new(&self.cf, RoleScope::Organization(&org), params.role_type.as_str());
        sync_members(&members, &params.members, cr.at_provider_mut()).await
    }

    async fn delete(&self, cr: &mut OrgMembers) -> Result<()> {
        let org = Self::org(cr)?;
        let role_type = cr.spec.for_provider.role_type;
        let members = Members::new(&self.cf, RoleScope::Organization(&org), role_type.as_str());
        delete_members(&members, cr.at_provider_mut()).await
    }
}

pub struct SpaceMembersExternal {
    ctx: Arc<Context>,
    cf: CfClient,
}

impl SpaceMembersExternal {
    #[must_use]
    pub fn new(ctx: Arc<Context>, cf: CfClient) -> Self {
        Self { ctx, cf }
    }

    fn space(cr: &SpaceMembers) -> Result<String> {
        cr.spec
            .for_provider
            .space
            .guid()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("space of {} is not resolved", cr.name_any()))
    }
}

impl ManagedKind for SpaceMembers {
    const KIND: &'static str = KIND_SPACE_MEMBERS;

    fn validate_spec(&self) -> Result<(), ValidationError> {
        self.validate()
    }

    fn external(ctx: Arc<Context>, cf: CfClient) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceMembersExternal::new(ctx, cf))
    }
}

#[async_trait]
impl ExternalClient<SpaceMembers> for SpaceMembersExternal {
    async fn resolve_references(&self, cr: &mut SpaceMembers) -> Result<()> {
        let namespace = namespace_of(cr)?;
        Resolver::new(&self.ctx, &self.cf, &namespace)
            .space(&mut cr.spec.for_provider.space)
            .await
    }

    async fn observe(&self, cr: &mut SpaceMembers) -> Result<ExternalObservation> {
        let space = Self::space(cr)?;
        let params = cr.spec.for_provider.clone();
        let recorded = cr.at_provider().map(|o| o.assigned_roles.clone()).unwrap_or_default();
        let observed = Members::new(&self.cf, RoleScope::Space(&space), params.role_type.as_str())
            .observe(params.enforce_policy, &recorded)
            .await?;

        let observation = members_observation(&params.members, observed, cr.at_provider_mut());
        if observation.resource_exists {
            status::available(cr);
        }
        Ok(observation)
    }

    async fn create(&self, cr: &mut SpaceMembers) -> Result<()> {
        self.update(cr).await
    }

    async fn update(&self, cr: &mut SpaceMembers) -> Result<()> {
        let space = Self::space(cr)?;
        let params = cr.spec.for_provider.clone();
        let parent = self.cf.spaces().get(&space).await?;
        let mut members = Members::new(&self.cf, RoleScope::Space(&space), params.role_type.as_str());
        if let Some(org) = parent.org_guid() {
            members = members.with_parent_org(org);
        }
        sync_members(&members, &params.members, cr.at_provider_mut()).await
    }

    async fn delete(&self, cr: &mut SpaceMembers) -> Result<()> {
        let space = Self::space(cr)?;
        let role_type = cr.spec.for_provider.role_type;
        let members = Members::new(&self.cf, RoleScope::Space(&space), role_type.as_str());
        delete_members(&members, cr.at_provider_mut()).await
    }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod roles_tests;
