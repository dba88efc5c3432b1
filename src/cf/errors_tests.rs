// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::cf::errors::{cf_error, is_not_found, CfApiError, CfError};
    use crate::status_reasons::{REASON_CF_NOT_FOUND, REASON_CF_TRANSIENT};
    use anyhow::Context;

    fn body(code: i64, title: &str, detail: &str) -> String {
        serde_json::json!({ "errors": [{ "code": code, "title": title, "detail": detail }] })
            .to_string()
    }

    #[test]
    fn test_404_is_not_found() {
        let err = CfError::from_response(404, "", "organization acme");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "organization acme not found");
        assert_eq!(err.reason(), REASON_CF_NOT_FOUND);
    }

    #[test]
    fn test_not_found_by_code_and_message() {
        let err = CfError::from_response(
            400,
            &body(10010, "CF-ResourceNotFound", "App not found"),
            "app",
        );
        assert!(err.is_not_found());

        let err = CfError::from_response(
            422,
            &body(10008, "CF-UnprocessableEntity", "Service binding not found"),
            "binding",
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_uniqueness_is_already_exists() {
        let err = CfError::from_response(
            422,
            &body(10008, "CF-UnprocessableEntity", "Organization 'acme' already exists."),
            "organization acme",
        );
        assert!(err.is_already_exists());

        let err = CfError::from_response(
            422,
            &body(10016, "CF-UniquenessError", "Name must be unique"),
            "space dev",
        );
        assert!(err.is_already_exists());

        assert!(CfError::from_response(409, "", "x").is_already_exists());
    }

    #[test]
    fn test_role_already_assigned() {
        let err = CfError::from_response(
            422,
            &body(
                10008,
                "CF-UnprocessableEntity",
                "User 'alice' already has 'organization_manager' role in organization 'acme'.",
            ),
            "role",
        );
        assert!(err.is_role_already_assigned());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_auth_and_transient() {
        assert!(CfError::from_response(401, "", "x").is_unauthorized());
        assert!(CfError::from_response(403, "", "x").is_unauthorized());

        let err = CfError::from_response(503, "upstream down", "x");
        assert!(err.is_transient());
        assert_eq!(err.reason(), REASON_CF_TRANSIENT);
        assert!(CfError::from_response(429, "", "x").is_transient());
    }

    #[test]
    fn test_unknown_keeps_detail_verbatim() {
        let err = CfError::from_response(
            400,
            &body(1001, "CF-MessageParseError", "Request invalid due to parse error"),
            "x",
        );
        assert!(matches!(err, CfError::Unknown { status: 400, .. }));
        assert!(err.to_string().contains("Request invalid due to parse error"));
    }

    #[test]
    fn test_failed_job() {
        let errors = vec![CfApiError {
            code: 10008,
            title: "CF-UnprocessableEntity".to_string(),
            detail: "broker returned 500".to_string(),
        }];
        let err = CfError::from_failed_job("job-1", errors);
        assert!(matches!(err, CfError::JobFailed { .. }));
        assert!(err.to_string().contains("broker returned 500"));

        let gone = vec![CfApiError {
            code: 10010,
            title: "CF-ResourceNotFound".to_string(),
            detail: "Service binding not found".to_string(),
        }];
        let err = CfError::from_failed_job("job-2", gone);
        assert!(matches!(err, CfError::ResourceNotFoundDuringDelete { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_anyhow_chain_helpers() {
        let result: anyhow::Result<()> =
            Err(CfError::not_found("space dev")).context("failed to observe space");
        let err = result.unwrap_err();
        assert!(is_not_found(&err));
        assert!(cf_error(&err).is_some());

        let other = anyhow::anyhow!("plain error");
        assert!(!is_not_found(&other));
    }
}
