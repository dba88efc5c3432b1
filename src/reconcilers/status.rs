// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for managed resources.
//!
//! Every managed resource carries two conditions:
//!
//! - `Ready`: whether the CF resource is usable (`Available`, `Unavailable`,
//!   `Creating`, `Deleting`)
//! - `Synced`: whether the last reconcile succeeded (`ReconcileSuccess`,
//!   `ReconcileError`)
//!
//! Conditions are only changed in memory here. The managed reconciler persists
//! the status once per reconcile, on the error path as well.
//!
//! # Example
//!
//! ```rust,no_run
//! use cf_operator::crd::Organization;
//! use cf_operator::reconcilers::status::{available, is_ready};
//!
//! fn mark(org: &mut Organization) {
//!     available(org);
//!     assert!(is_ready(org));
//! }
//! ```

use crate::cf::cf_error;
use crate::crd::{Condition, Managed, ValidationError};
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY, CONDITION_TYPE_SYNCED,
    REASON_AVAILABLE, REASON_CREATING, REASON_DELETING, REASON_RECONCILE_ERROR,
    REASON_RECONCILE_SUCCESS, REASON_UNAVAILABLE,
};
use chrono::Utc;

/// Error category used for the `errors_total` metric.
pub const ERROR_TYPE_VALIDATION: &str = "Validation";
pub const ERROR_TYPE_KUBERNETES: &str = "Kubernetes";
pub const ERROR_TYPE_OTHER: &str = "Other";

/// Create a new condition with the current timestamp.
///
/// # Example
///
/// ```rust,no_run
/// # use cf_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "Available", "");
/// assert_eq!(condition.r#type, "Ready");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: (!message.is_empty()).then(|| message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status does not change, so
/// an unchanged condition produces no status diff.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    let message = (!message.is_empty()).then(|| message.to_string());

    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = message;
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            reason: Some(reason.to_string()),
            message,
            last_transition_time: Some(Utc::now().to_rfc3339()),
        });
    }
}

fn set<K: Managed>(cr: &mut K, condition_type: &str, status: &str, reason: &str, message: &str) {
    update_condition_in_memory(
        &mut cr.resource_status_mut().conditions,
        condition_type,
        status,
        reason,
        message,
    );
}

/// `Ready=True`, reason `Available`.
pub fn available<K: Managed>(cr: &mut K) {
    set(cr, CONDITION_TYPE_READY, CONDITION_STATUS_TRUE, REASON_AVAILABLE, "");
}

/// `Ready=False`, reason `Unavailable`.
pub fn unavailable<K: Managed>(cr: &mut K, message: &str) {
    set(cr, CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, REASON_UNAVAILABLE, message);
}

/// `Ready=False`, reason `Creating`.
pub fn creating<K: Managed>(cr: &mut K) {
    set(cr, CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, REASON_CREATING, "");
}

/// `Ready=False`, reason `Deleting`.
pub fn deleting<K: Managed>(cr: &mut K, message: &str) {
    set(cr, CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, REASON_DELETING, message);
}

/// `Synced=True`, reason `ReconcileSuccess`.
pub fn reconcile_success<K: Managed>(cr: &mut K) {
    set(cr, CONDITION_TYPE_SYNCED, CONDITION_STATUS_TRUE, REASON_RECONCILE_SUCCESS, "");
}

/// `Synced=False`, reason `ReconcileError`, with the whole error chain as message.
pub fn reconcile_error<K: Managed>(cr: &mut K, err: &anyhow::Error) {
    set(
        cr,
        CONDITION_TYPE_SYNCED,
        CONDITION_STATUS_FALSE,
        REASON_RECONCILE_ERROR,
        &format!("{err:#}"),
    );
}

/// Whether `Ready=True`.
#[must_use]
pub fn is_ready<K: Managed>(cr: &K) -> bool {
    cr.resource_status()
        .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_READY))
        .is_some_and(|c| c.status == CONDITION_STATUS_TRUE)
}

/// Reason of the `Ready` condition, if any.
#[must_use]
pub fn ready_reason<K: Managed>(cr: &K) -> Option<&str> {
    cr.resource_status()
        .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_READY))
        .and_then(|c| c.reason.as_deref())
}

/// Category of a reconcile error, for metrics.
#[must_use]
pub fn error_type(err: &anyhow::Error) -> &'static str {
    if let Some(cf) = cf_error(err) {
        return cf.reason();
    }
    if err.chain().any(|e| e.downcast_ref::<ValidationError>().is_some()) {
        return ERROR_TYPE_VALIDATION;
    }
    if err.chain().any(|e| e.downcast_ref::<kube::Error>().is_some()) {
        return ERROR_TYPE_KUBERNETES;
    }
    ERROR_TYPE_OTHER
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
