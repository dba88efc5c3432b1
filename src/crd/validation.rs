// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission rules checked at the start of every reconcile.
//!
//! The same rules are attached to the CRD schemas as CEL
//! `x-kubernetes-validations`; checking them here as well keeps a cluster
//! without CEL support from driving invalid state into CF.

use thiserror::Error;

/// Errors raised when a managed resource violates an admission rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// None of `{GUID, ref, selector, name}` is set for a required scope.
    #[error("one of {field}, {field}Ref, {field}Selector or {field}Name must be set")]
    MissingReference { field: String },

    /// More than one of `{ref, selector, name}` is set for a scope.
    #[error("only one of {field}Ref, {field}Selector or {field}Name may be set")]
    AmbiguousReference { field: String },

    /// A required field is missing.
    #[error("{field} is required{context}")]
    Required { field: String, context: String },

    /// A field is set where it is not allowed.
    #[error("{field} is not allowed{context}")]
    Forbidden { field: String, context: String },

    /// A field has an invalid value.
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str, context: &str) -> Self {
        Self::Required {
            field: field.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn forbidden(field: &str, context: &str) -> Self {
        Self::Forbidden {
            field: field.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rejects negative values in a set of optional quota limits.
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] naming the first negative field.
pub fn non_negative(fields: &[(&str, Option<i64>)]) -> Result<(), ValidationError> {
    for (field, value) in fields {
        if let Some(v) = value {
            if *v < 0 {
                return Err(ValidationError::invalid(field, "must be greater than or equal to 0"));
            }
        }
    }
    Ok(())
}

/// Checks a DNS name against RFC 1035: 3-253 characters, dot-separated labels
/// of letters, digits and hyphens that neither start nor end with a hyphen.
#[must_use]
pub fn is_rfc1035_domain(name: &str) -> bool {
    if name.len() < 3 || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
