// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module
//!
//! These tests pin the condition vocabulary shared with Crossplane tooling
//! and the mapping of CF errors onto reason strings.

#[cfg(test)]
mod tests {
    use crate::cf::CfError;
    use crate::status_reasons::*;
    use std::collections::HashSet;

    // ============================================================================
    // Condition Vocabulary
    // ============================================================================

    #[test]
    fn test_condition_types() {
        assert_eq!(CONDITION_TYPE_READY, "Ready");
        assert_eq!(CONDITION_TYPE_SYNCED, "Synced");
    }

    #[test]
    fn test_ready_reasons() {
        assert_eq!(REASON_AVAILABLE, "Available");
        assert_eq!(REASON_UNAVAILABLE, "Unavailable");
        assert_eq!(REASON_CREATING, "Creating");
        assert_eq!(REASON_DELETING, "Deleting");
    }

    #[test]
    fn test_synced_reasons() {
        assert_eq!(REASON_RECONCILE_SUCCESS, "ReconcileSuccess");
        assert_eq!(REASON_RECONCILE_ERROR, "ReconcileError");
    }

    // ============================================================================
    // CF Error Reasons
    // ============================================================================

    #[test]
    fn test_cf_reasons_are_distinct() {
        let reasons = [
            REASON_CF_NOT_FOUND,
            REASON_CF_ALREADY_EXISTS,
            REASON_CF_ROLE_ALREADY_ASSIGNED,
            REASON_CF_IMMUTABLE,
            REASON_CF_UNAUTHORIZED,
            REASON_CF_TRANSIENT,
            REASON_CF_JOB_FAILED,
            REASON_CF_UNKNOWN,
        ];
        let unique: HashSet<_> = reasons.iter().collect();
        assert_eq!(unique.len(), reasons.len());
        assert!(reasons.iter().all(|r| r.starts_with("CF")));
    }

    #[test]
    fn test_cf_error_reason_mapping() {
        assert_eq!(CfError::not_found("org acme").reason(), REASON_CF_NOT_FOUND);
        assert_eq!(
            CfError::from_response(409, "", "org acme").reason(),
            REASON_CF_ALREADY_EXISTS
        );
        assert_eq!(
            CfError::from_response(403, "", "org acme").reason(),
            REASON_CF_UNAUTHORIZED
        );
        assert_eq!(
            CfError::from_response(503, "", "org acme").reason(),
            REASON_CF_TRANSIENT
        );
        assert_eq!(
            CfError::from_response(418, "", "org acme").reason(),
            REASON_CF_UNKNOWN
        );
    }
}
