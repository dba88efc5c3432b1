// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `/v3/organization_quotas` and `/v3/space_quotas`.
//!
//! A CF quota limit of `null` means unlimited. The CR fields map one-to-one:
//!
//! | CR field | CF field |
//! |---|---|
//! | `totalMemory` | `apps.total_memory_in_mb` |
//! | `instanceMemory` | `apps.per_process_memory_in_mb` |
//! | `totalAppInstances` | `apps.total_instances` |
//! | `totalAppTasks` | `apps.per_app_tasks` |
//! | `logRateLimit` | `apps.log_rate_limit_in_bytes_per_second` |
//! | `allowPaidServicePlans` | `services.paid_services_allowed` |
//! | `totalServiceInstances` | `services.total_service_instances` |
//! | `totalServiceKeys` | `services.total_service_keys` |
//! | `totalRoutes` | `routes.total_routes` |
//! | `totalReservedPorts` | `routes.total_reserved_ports` |
//! | `totalPrivateDomains` | `domains.total_domains` |

use super::client::CfClient;
use super::errors::CfError;
use super::types::{ToMany, ToOne};
use crate::constants::CF_API_PREFIX;
use crate::crd::QuotaLimits;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppLimits {
    #[serde(default)]
    pub total_memory_in_mb: Option<i64>,
    #[serde(default)]
    pub per_process_memory_in_mb: Option<i64>,
    #[serde(default)]
    pub total_instances: Option<i64>,
    #[serde(default)]
    pub per_app_tasks: Option<i64>,
    #[serde(default)]
    pub log_rate_limit_in_bytes_per_second: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceLimits {
    #[serde(default)]
    pub paid_services_allowed: Option<bool>,
    #[serde(default)]
    pub total_service_instances: Option<i64>,
    #[serde(default)]
    pub total_service_keys: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLimits {
    #[serde(default)]
    pub total_routes: Option<i64>,
    #[serde(default)]
    pub total_reserved_ports: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainLimits {
    #[serde(default)]
    pub total_domains: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgQuotaRelationships {
    #[serde(default)]
    pub organizations: ToMany,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationQuota {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub apps: AppLimits,
    #[serde(default)]
    pub services: ServiceLimits,
    #[serde(default)]
    pub routes: RouteLimits,
    #[serde(default)]
    pub domains: DomainLimits,
    #[serde(default)]
    pub relationships: OrgQuotaRelationships,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceQuotaRelationships {
    #[serde(default)]
    pub organization: ToOne,
    #[serde(default)]
    pub spaces: ToMany,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceQuota {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub apps: AppLimits,
    #[serde(default)]
    pub services: ServiceLimits,
    #[serde(default)]
    pub routes: RouteLimits,
    #[serde(default)]
    pub relationships: SpaceQuotaRelationships,
    #[serde(default)]
    pub created_at: String,
}

/// Converts CR limits into the CF `apps`/`services`/`routes` sections.
#[must_use]
pub fn limits_body(limits: &QuotaLimits) -> Value {
    json!({
        "apps": AppLimits {
            total_memory_in_mb: limits.total_memory,
            per_process_memory_in_mb: limits.instance_memory,
            total_instances: limits.total_app_instances,
            per_app_tasks: limits.total_app_tasks,
            log_rate_limit_in_bytes_per_second: limits.log_rate_limit,
        },
        "services": ServiceLimits {
            paid_services_allowed: limits.allow_paid_service_plans,
            total_service_instances: limits.total_service_instances,
            total_service_keys: limits.total_service_keys,
        },
        "routes": RouteLimits {
            total_routes: limits.total_routes,
            total_reserved_ports: limits.total_reserved_ports,
        },
    })
}

/// Converts the CF sections back into CR limits.
#[must_use]
pub fn observed_limits(apps: &AppLimits, services: &ServiceLimits, routes: &RouteLimits) -> QuotaLimits {
    QuotaLimits {
        total_memory: apps.total_memory_in_mb,
        instance_memory: apps.per_process_memory_in_mb,
        total_app_instances: apps.total_instances,
        total_app_tasks: apps.per_app_tasks,
        log_rate_limit: apps.log_rate_limit_in_bytes_per_second,
        allow_paid_service_plans: services.paid_services_allowed,
        total_service_instances: services.total_service_instances,
        total_service_keys: services.total_service_keys,
        total_routes: routes.total_routes,
        total_reserved_ports: routes.total_reserved_ports,
    }
}

pub struct OrganizationQuotas<'a> {
    cf: &'a CfClient,
}

pub struct SpaceQuotas<'a> {
    cf: &'a CfClient,
}

impl CfClient {
    #[must_use]
    pub fn organization_quotas(&self) -> OrganizationQuotas<'_> {
        OrganizationQuotas { cf: self }
    }

    #[must_use]
    pub fn space_quotas(&self) -> SpaceQuotas<'_> {
        SpaceQuotas { cf: self }
    }
}

impl OrganizationQuotas<'_> {
    pub async fn get(&self, guid: &str) -> Result<OrganizationQuota, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/organization_quotas/{guid}"),
                &format!("organization quota {guid}"),
            )
            .await
    }

    pub async fn single_by_name(&self, name: &str) -> Result<OrganizationQuota, CfError> {
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/organization_quotas"),
                &[("names", name.to_string())],
                &format!("organization quota {name}"),
            )
            .await
    }

    fn body(name: &str, limits: &QuotaLimits, total_domains: Option<i64>) -> Value {
        let mut body = limits_body(limits);
        body["name"] = json!(name);
        body["domains"] = json!(DomainLimits { total_domains });
        body
    }

    pub async fn create(
        &self,
        name: &str,
        limits: &QuotaLimits,
        total_domains: Option<i64>,
        orgs: &[String],
    ) -> Result<OrganizationQuota, CfError> {
        let mut body = Self::body(name, limits, total_domains);
        if !orgs.is_empty() {
            body["relationships"] = json!({ "organizations": ToMany::of(orgs) });
        }
        let what = format!("organization quota {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/organization_quotas"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn update(
        &self,
        guid: &str,
        name: &str,
        limits: &QuotaLimits,
        total_domains: Option<i64>,
    ) -> Result<OrganizationQuota, CfError> {
        let what = format!("organization quota {guid}");
        self.cf
            .patch(
                &format!("{CF_API_PREFIX}/organization_quotas/{guid}"),
                &Self::body(name, limits, total_domains),
                &what,
            )
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    /// Applies the quota to organizations. CF only supports adding; an
    /// organization always has exactly one quota.
    pub async fn apply(&self, guid: &str, orgs: &[String]) -> Result<(), CfError> {
        if orgs.is_empty() {
            return Ok(());
        }
        self.cf
            .post::<_, Value>(
                &format!("{CF_API_PREFIX}/organization_quotas/{guid}/relationships/organizations"),
                &ToMany::of(orgs),
                &format!("organization quota {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/organization_quotas/{guid}"),
                &format!("organization quota {guid}"),
            )
            .await
    }
}

impl SpaceQuotas<'_> {
    pub async fn get(&self, guid: &str) -> Result<SpaceQuota, CfError> {
        self.cf
            .get(
                &format!("{CF_API_PREFIX}/space_quotas/{guid}"),
                &format!("space quota {guid}"),
            )
            .await
    }

    pub async fn single_by_name(&self, name: &str, org_guid: &str) -> Result<SpaceQuota, CfError> {
        self.cf
            .single(
                &format!("{CF_API_PREFIX}/space_quotas"),
                &[
                    ("names", name.to_string()),
                    ("organization_guids", org_guid.to_string()),
                ],
                &format!("space quota {name}"),
            )
            .await
    }

    pub async fn create(
        &self,
        name: &str,
        org_guid: &str,
        limits: &QuotaLimits,
        spaces: &[String],
    ) -> Result<SpaceQuota, CfError> {
        let mut body = limits_body(limits);
        body["name"] = json!(name);
        let mut relationships = json!({ "organization": ToOne::to(org_guid) });
        if !spaces.is_empty() {
            relationships["spaces"] = json!(ToMany::of(spaces));
        }
        body["relationships"] = relationships;

        let what = format!("space quota {name}");
        self.cf
            .post(&format!("{CF_API_PREFIX}/space_quotas"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn update(
        &self,
        guid: &str,
        name: &str,
        limits: &QuotaLimits,
    ) -> Result<SpaceQuota, CfError> {
        let mut body = limits_body(limits);
        body["name"] = json!(name);
        let what = format!("space quota {guid}");
        self.cf
            .patch(&format!("{CF_API_PREFIX}/space_quotas/{guid}"), &body, &what)
            .await?
            .resource
            .ok_or_else(|| CfError::not_found(what))
    }

    pub async fn apply(&self, guid: &str, spaces: &[String]) -> Result<(), CfError> {
        if spaces.is_empty() {
            return Ok(());
        }
        self.cf
            .post::<_, Value>(
                &format!("{CF_API_PREFIX}/space_quotas/{guid}/relationships/spaces"),
                &ToMany::of(spaces),
                &format!("space quota {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn remove(&self, guid: &str, space_guid: &str) -> Result<(), CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/space_quotas/{guid}/relationships/spaces/{space_guid}"),
                &format!("space {space_guid} of space quota {guid}"),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, guid: &str) -> Result<Option<String>, CfError> {
        self.cf
            .delete(
                &format!("{CF_API_PREFIX}/space_quotas/{guid}"),
                &format!("space quota {guid}"),
            )
            .await
    }
}
