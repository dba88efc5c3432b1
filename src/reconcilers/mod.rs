// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for Cloud Foundry resources.
//!
//! Every kind runs through the same generic loop in [`managed`]: validate,
//! connect to CF, resolve scope references, observe, then create, update or
//! delete. What differs per kind lives in its external client.
//!
//! # Reconciliation Architecture
//!
//! 1. **Watch** - one [`kube::runtime::Controller`] per kind ([`run_controller`])
//! 2. **Observe** - look the CF resource up by external-name GUID or by spec
//! 3. **Act** - create, update or delete as the management policies allow
//! 4. **Status** - persist `atProvider`, `Ready`/`Synced` and the external-name
//!
//! # External Clients
//!
//! ## Foundation
//!
//! - [`organization`] - `Organization`, `Space`
//! - [`quota`] - `OrgQuota`, `SpaceQuota`
//! - [`domain`] - `Domain`, `Route`
//!
//! ## Workloads and Services
//!
//! - [`app`] - `App` (docker push)
//! - [`service_instance`] - `ServiceInstance`
//! - [`service_credential_binding`] - `ServiceCredentialBinding` (with rotation)
//! - [`service_route_binding`] - `ServiceRouteBinding`
//!
//! ## Access
//!
//! - [`roles`] - `OrgRole`, `SpaceRole`, `OrgMembers`, `SpaceMembers`
//!
//! # Example: Running a Controller
//!
//! ```rust,no_run
//! use cf_operator::context::{build_http_client, Context, Settings};
//! use cf_operator::crd::Organization;
//! use cf_operator::reconcilers::run_controller;
//! use std::sync::Arc;
//!
//! async fn run(client: kube::Client) -> anyhow::Result<()> {
//!     let settings = Settings::default();
//!     let http = build_http_client(settings.timeout)?;
//!     run_controller::<Organization>(Arc::new(Context::new(client, http, settings))).await
//! }
//! ```

pub mod app;
pub mod domain;
pub mod finalizers;
pub mod last_operation;
pub mod managed;
pub mod members;
pub mod organization;
pub mod patch;
pub mod quota;
pub mod references;
pub mod roles;
pub mod rotation;
pub mod service_credential_binding;
pub mod service_instance;
pub mod service_route_binding;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use managed::{run_controller, ExternalClient, ExternalObservation, ManagedKind};
