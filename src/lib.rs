// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # cf-operator - Cloud Foundry Operator for Kubernetes
//!
//! cf-operator reconciles Cloud Foundry resources declared as namespaced
//! Kubernetes custom resources against a live CF deployment, through the CF
//! v3 HTTP API. It follows the Crossplane managed-resource conventions:
//! external-name annotation, management and deletion policies, `Ready` and
//! `Synced` conditions, and connection secrets.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types for every CF kind
//! - [`reconcilers`] - the generic managed loop and one external client per kind
//! - [`cf`] - typed CF v3 API client, UAA login, async jobs and docker push
//! - [`provider`] - `ProviderConfig` resolution and CF authentication
//! - [`secrets`] - credential secrets and connection-detail publishing
//! - [`context`] - shared controller context and operator settings
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use cf_operator::crd::{OrganizationParameters, OrganizationSpec, ResourceSpec};
//!
//! let spec = OrganizationSpec {
//!     for_provider: OrganizationParameters {
//!         name: "acme".to_string(),
//!         ..OrganizationParameters::default()
//!     },
//!     resource: ResourceSpec::default(),
//! };
//! ```
//!
//! ## Supported Kinds
//!
//! - **Foundation** - `Organization`, `Space`, `OrgQuota`, `SpaceQuota`, `Domain`, `Route`
//! - **Workloads** - `App` (docker lifecycle)
//! - **Services** - `ServiceInstance`, `ServiceCredentialBinding`, `ServiceRouteBinding`
//! - **Access** - `OrgRole`, `SpaceRole`, `OrgMembers`, `SpaceMembers`
//! - **Provider** - `ProviderConfig` (cluster-scoped)

pub mod cf;
pub mod constants;
pub mod context;
pub mod crd;
pub mod duration;
pub mod labels;
pub mod metrics;
pub mod provider;
pub mod reconcilers;
pub mod secrets;
pub mod selector;
pub mod status_reasons;

#[cfg(test)]
mod status_reasons_tests;
