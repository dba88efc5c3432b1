// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for CF API calls.
//!
//! Every CF error response is translated into a [`CfError`] so that callers can
//! make policy decisions (swallow, adopt, retry, surface) without parsing
//! response bodies themselves.
//!
//! | Variant | Meaning | Policy |
//! |---|---|---|
//! | `NotFound` | 404 or no results | Observe: does not exist; Delete: swallow |
//! | `AlreadyExists` | create conflicted | look up and adopt |
//! | `RoleAlreadyAssigned` | role create on an existing role | look up the role |
//! | `ResourceNotFoundDuringDelete` | delete job could not find the resource | swallow |
//! | `Immutable` | forbidden spec change | surface |
//! | `Unauthorized` | 401/403 | surface |
//! | `Transient` | network error, 429, 5xx | requeue |
//! | `JobFailed` | async job ended in `FAILED` | surface |
//! | `Unknown` | anything else | requeue, logged verbatim |
//! | `Ambiguous` | a lookup matched more than one resource | surface |
//! | `Decode` | response body did not match the expected shape | requeue |

use crate::status_reasons::{
    REASON_CF_ALREADY_EXISTS, REASON_CF_IMMUTABLE, REASON_CF_JOB_FAILED, REASON_CF_NOT_FOUND,
    REASON_CF_ROLE_ALREADY_ASSIGNED, REASON_CF_TRANSIENT, REASON_CF_UNAUTHORIZED,
    REASON_CF_UNKNOWN,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CF error code for "resource not found".
const CF_RESOURCE_NOT_FOUND_CODE: i64 = 10010;

/// CF error code for uniqueness violations.
const CF_UNIQUENESS_ERROR_CODE: i64 = 10016;

/// One entry of a CF `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl std::fmt::Display for CfApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.title, self.code, self.detail)
    }
}

/// The `{"errors": [...]}` body CF returns for failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CfErrorBody {
    #[serde(default)]
    pub errors: Vec<CfApiError>,
}

/// Errors produced by the CF adapter.
#[derive(Error, Debug)]
pub enum CfError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{what} already exists: {detail}")]
    AlreadyExists { what: String, detail: String },

    #[error("role already assigned: {detail}")]
    RoleAlreadyAssigned { detail: String },

    #[error("{what} not found while deleting")]
    ResourceNotFoundDuringDelete { what: String },

    #[error("{field} cannot be changed after creation (desired {desired}, observed {observed})")]
    Immutable {
        field: String,
        desired: String,
        observed: String,
    },

    #[error("unauthorized ({status}): {detail}")]
    Unauthorized { status: u16, detail: String },

    #[error("transient CF API error: {detail}")]
    Transient { detail: String },

    #[error("job {guid} failed: {}", join_errors(.errors))]
    JobFailed { guid: String, errors: Vec<CfApiError> },

    #[error("CF API error ({status}): {detail}")]
    Unknown { status: u16, detail: String },

    #[error("{count} {what} match, expected exactly one")]
    Ambiguous { what: String, count: usize },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

fn join_errors(errors: &[CfApiError]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn looks_not_found(e: &CfApiError) -> bool {
    let detail = e.detail.to_lowercase();
    e.code == CF_RESOURCE_NOT_FOUND_CODE
        || e.title == "CF-ResourceNotFound"
        || detail.contains("service binding not found")
        || detail.contains("could not be found")
}

fn looks_already_exists(e: &CfApiError) -> bool {
    let detail = e.detail.to_lowercase();
    e.code == CF_UNIQUENESS_ERROR_CODE
        || e.title == "CF-UniquenessError"
        || detail.contains("already exists")
        || detail.contains("already taken")
        || detail.contains("must be unique")
}

fn looks_role_already_assigned(e: &CfApiError) -> bool {
    let detail = e.detail.to_lowercase();
    detail.contains("already has") && detail.contains("role")
}

impl CfError {
    /// Translates a non-success CF response into the taxonomy.
    ///
    /// `what` names the resource for messages, e.g. `"organization acme"`.
    #[must_use]
    pub fn from_response(status: u16, body: &str, what: &str) -> Self {
        let parsed: CfErrorBody = serde_json::from_str(body).unwrap_or_default();
        let detail = if parsed.errors.is_empty() {
            body.trim().to_string()
        } else {
            join_errors(&parsed.errors)
        };

        if status == 404 || parsed.errors.iter().any(looks_not_found) {
            return Self::NotFound {
                what: what.to_string(),
            };
        }
        if status == 401 || status == 403 {
            return Self::Unauthorized { status, detail };
        }
        if status == 422 && parsed.errors.iter().any(looks_role_already_assigned) {
            return Self::RoleAlreadyAssigned { detail };
        }
        if status == 409 || (status == 422 && parsed.errors.iter().any(looks_already_exists)) {
            return Self::AlreadyExists {
                what: what.to_string(),
                detail,
            };
        }
        if status == 429 || status >= 500 {
            return Self::Transient { detail };
        }
        Self::Unknown { status, detail }
    }

    /// Translates the errors of a `FAILED` job. A delete job that failed because
    /// the resource is already gone becomes [`CfError::ResourceNotFoundDuringDelete`].
    #[must_use]
    pub fn from_failed_job(guid: &str, errors: Vec<CfApiError>) -> Self {
        if !errors.is_empty() && errors.iter().all(looks_not_found) {
            return Self::ResourceNotFoundDuringDelete {
                what: format!("job {guid}"),
            };
        }
        Self::JobFailed {
            guid: guid.to_string(),
            errors,
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// True for `NotFound` and `ResourceNotFoundDuringDelete`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::ResourceNotFoundDuringDelete { .. }
        )
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_role_already_assigned(&self) -> bool {
        matches!(self, Self::RoleAlreadyAssigned { .. })
    }

    /// Transient and unknown errors are both worth a retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transient { .. } | Self::Unknown { .. } | Self::Decode { .. }
        )
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Condition reason / metrics label for this error.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::ResourceNotFoundDuringDelete { .. } => {
                REASON_CF_NOT_FOUND
            }
            Self::AlreadyExists { .. } => REASON_CF_ALREADY_EXISTS,
            Self::RoleAlreadyAssigned { .. } => REASON_CF_ROLE_ALREADY_ASSIGNED,
            Self::Immutable { .. } => REASON_CF_IMMUTABLE,
            Self::Unauthorized { .. } => REASON_CF_UNAUTHORIZED,
            Self::Transient { .. } => REASON_CF_TRANSIENT,
            Self::JobFailed { .. } => REASON_CF_JOB_FAILED,
            Self::Unknown { .. } | Self::Ambiguous { .. } | Self::Decode { .. } => {
                REASON_CF_UNKNOWN
            }
        }
    }
}

impl From<reqwest::Error> for CfError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient {
            detail: err.to_string(),
        }
    }
}

/// Finds the [`CfError`] in an `anyhow` error chain.
#[must_use]
pub fn cf_error(err: &anyhow::Error) -> Option<&CfError> {
    err.chain().find_map(|e| e.downcast_ref::<CfError>())
}

/// Whether an `anyhow` error chain carries a not-found [`CfError`].
#[must_use]
pub fn is_not_found(err: &anyhow::Error) -> bool {
    cf_error(err).is_some_and(CfError::is_not_found)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
