// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Cloud Foundry operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all Cloud Foundry CRDs
pub const API_GROUP: &str = "cloudfoundry.crossplane.io";

/// Kind name for `Organization` resource
pub const KIND_ORGANIZATION: &str = "Organization";

/// Kind name for `Space` resource
pub const KIND_SPACE: &str = "Space";

/// Kind name for `OrgQuota` resource
pub const KIND_ORG_QUOTA: &str = "OrgQuota";

/// Kind name for `SpaceQuota` resource
pub const KIND_SPACE_QUOTA: &str = "SpaceQuota";

/// Kind name for `Domain` resource
pub const KIND_DOMAIN: &str = "Domain";

/// Kind name for `Route` resource
pub const KIND_ROUTE: &str = "Route";

/// Kind name for `App` resource
pub const KIND_APP: &str = "App";

/// Kind name for `ServiceInstance` resource
pub const KIND_SERVICE_INSTANCE: &str = "ServiceInstance";

/// Kind name for `ServiceCredentialBinding` resource
pub const KIND_SERVICE_CREDENTIAL_BINDING: &str = "ServiceCredentialBinding";

/// Kind name for `ServiceRouteBinding` resource
pub const KIND_SERVICE_ROUTE_BINDING: &str = "ServiceRouteBinding";

/// Kind name for `OrgRole` resource
pub const KIND_ORG_ROLE: &str = "OrgRole";

/// Kind name for `SpaceRole` resource
pub const KIND_SPACE_ROLE: &str = "SpaceRole";

/// Kind name for `OrgMembers` resource
pub const KIND_ORG_MEMBERS: &str = "OrgMembers";

/// Kind name for `SpaceMembers` resource
pub const KIND_SPACE_MEMBERS: &str = "SpaceMembers";

/// Name of the `ProviderConfig` used when a resource does not reference one
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

// ============================================================================
// Cloud Foundry API Constants
// ============================================================================

/// Path prefix of the CF v3 API
pub const CF_API_PREFIX: &str = "/v3";

/// Page size requested for CF list calls
pub const CF_LIST_PAGE_SIZE: u32 = 200;

/// OAuth client id used for the UAA password grant (the cf CLI client)
pub const CF_OAUTH_CLIENT_ID: &str = "cf";

/// Identity provider origin used when a user reference does not name one
pub const DEFAULT_USER_ORIGIN: &str = "uaa";

/// Process type whose configuration the App controller manages
pub const DEFAULT_PROCESS_TYPE: &str = "web";

/// Length of the random suffix appended to rotated binding names
pub const BINDING_NAME_SUFFIX_LEN: usize = 5;

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval for resources that are not ready yet (30 seconds)
pub const REQUEUE_WHEN_NOT_READY_SECS: u64 = 30;

/// Default requeue interval for ready resources (10 minutes)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 600;

/// Default interval between two polls of a CF job or build (2 seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default per-reconcile timeout (1 minute)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Default per-reconcile timeout for service instances (5 minutes)
pub const DEFAULT_SERVICE_INSTANCE_TIMEOUT_SECS: u64 = 300;

/// Default number of concurrent reconciles per kind
pub const DEFAULT_MAX_RECONCILE_RATE: u16 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name prefix for Tokio worker threads
pub const TOKIO_THREAD_NAME: &str = "cf-operator";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
