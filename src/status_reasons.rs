// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition types and reasons for managed resources.
//!
//! Every managed resource carries two conditions, following the Crossplane
//! convention:
//!
//! - **`Ready`** - whether the external CF resource is usable
//!   (`Available`, `Unavailable`, `Creating`, `Deleting`)
//! - **`Synced`** - whether the last reconcile succeeded
//!   (`ReconcileSuccess`, `ReconcileError`)
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: Available
//!     - type: Synced
//!       status: "False"
//!       reason: ReconcileError
//!       message: "cannot delete external resource: route has active bindings"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Condition type reporting availability of the external resource.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition type reporting the outcome of the last reconcile.
pub const CONDITION_TYPE_SYNCED: &str = "Synced";

/// Condition status values.
pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Ready Reasons
// ============================================================================

/// The external resource exists and is usable.
pub const REASON_AVAILABLE: &str = "Available";

/// The external resource exists but cannot be used (in progress or failed).
pub const REASON_UNAVAILABLE: &str = "Unavailable";

/// The external resource is being created.
pub const REASON_CREATING: &str = "Creating";

/// The external resource is being deleted.
pub const REASON_DELETING: &str = "Deleting";

// ============================================================================
// Synced Reasons
// ============================================================================

/// The last reconcile completed without error.
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";

/// The last reconcile returned an error.
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

// ============================================================================
// CF API error reasons (metrics labels and log fields)
// ============================================================================

/// CF returned 404 or an empty result set.
pub const REASON_CF_NOT_FOUND: &str = "CFNotFound";

/// CF rejected a create because the resource already exists.
pub const REASON_CF_ALREADY_EXISTS: &str = "CFAlreadyExists";

/// CF rejected a role create because the user already holds the role.
pub const REASON_CF_ROLE_ALREADY_ASSIGNED: &str = "CFRoleAlreadyAssigned";

/// A spec field CF forbids mutating was changed.
pub const REASON_CF_IMMUTABLE: &str = "CFImmutableField";

/// CF rejected the credentials or token (401/403).
pub const REASON_CF_UNAUTHORIZED: &str = "CFUnauthorized";

/// Network error, rate limit or CF 5xx.
pub const REASON_CF_TRANSIENT: &str = "CFTransient";

/// A CF asynchronous job finished in state FAILED.
pub const REASON_CF_JOB_FAILED: &str = "CFJobFailed";

/// Any other CF error.
pub const REASON_CF_UNKNOWN: &str = "CFUnknown";
