// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector matching for `*Selector` scope references.
//!
//! A scope selector picks the first managed resource of the target kind, in
//! the same namespace, whose labels match and whose CF GUID is already known.
//!
//! # Example
//!
//! ```rust
//! use cf_operator::crd::LabelSelector;
//! use cf_operator::selector::matches_selector;
//! use std::collections::BTreeMap;
//!
//! let selector = LabelSelector {
//!     match_labels: Some(BTreeMap::from([("team".to_string(), "payments".to_string())])),
//!     match_expressions: None,
//! };
//! let labels = BTreeMap::from([("team".to_string(), "payments".to_string())]);
//! assert!(matches_selector(&selector, &labels));
//! ```

use crate::crd::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

/// Whether `labels` satisfy every `matchLabels` pair and every `matchExpressions`
/// requirement of `selector`. An empty selector matches everything.
#[must_use]
pub fn matches_selector(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let labels_match = selector
        .match_labels
        .as_ref()
        .is_none_or(|wanted| wanted.iter().all(|(k, v)| labels.get(k) == Some(v)));

    labels_match
        && selector
            .match_expressions
            .as_ref()
            .is_none_or(|exprs| exprs.iter().all(|expr| matches_requirement(expr, labels)))
}

/// Evaluates one `matchExpressions` requirement. Unknown operators never match.
#[must_use]
pub fn matches_requirement(
    requirement: &LabelSelectorRequirement,
    labels: &BTreeMap<String, String>,
) -> bool {
    let value = labels.get(&requirement.key);
    let values = requirement.values.as_deref().unwrap_or_default();

    match requirement.operator.as_str() {
        "In" => value.is_some_and(|v| values.contains(v)),
        "NotIn" => value.is_none_or(|v| !values.contains(v)),
        "Exists" => value.is_some(),
        "DoesNotExist" => value.is_none(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
