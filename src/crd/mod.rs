// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions for Cloud Foundry resources.
//!
//! All kinds live in the `cloudfoundry.crossplane.io/v1alpha1` API group.
//! Every managed kind is namespaced; `ProviderConfig` is cluster-scoped.
//!
//! ## Scopes
//!
//! - [`Organization`] / [`Space`] - the CF scoping hierarchy
//! - [`OrgQuota`] / [`SpaceQuota`] - resource limits
//!
//! ## Networking
//!
//! - [`Domain`] / [`Route`]
//!
//! ## Workloads and services
//!
//! - [`App`] - Docker-lifecycle applications
//! - [`ServiceInstance`] - managed and user-provided instances
//! - [`ServiceCredentialBinding`] - service keys and app bindings, with rotation
//! - [`ServiceRouteBinding`] - route services
//!
//! ## Access
//!
//! - [`OrgRole`] / [`SpaceRole`] - single role assignments
//! - [`OrgMembers`] / [`SpaceMembers`] - sets of role assignments

pub mod app;
pub mod common;
pub mod domain;
pub mod organization;
pub mod provider_config;
pub mod quota;
pub mod references;
pub mod roles;
pub mod service_credential_binding;
pub mod service_instance;
pub mod service_route_binding;
pub mod validation;

pub use app::*;
pub use common::*;
pub use domain::*;
pub use organization::*;
pub use provider_config::*;
pub use quota::*;
pub use references::*;
pub use roles::*;
pub use service_credential_binding::*;
pub use service_instance::*;
pub use service_route_binding::*;
pub use validation::ValidationError;
