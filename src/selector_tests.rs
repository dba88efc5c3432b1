// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `selector.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{LabelSelector, LabelSelectorRequirement};
    use crate::selector::{matches_requirement, matches_selector};
    use std::collections::BTreeMap;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn requirement(key: &str, operator: &str, values: &[&str]) -> LabelSelectorRequirement {
        LabelSelectorRequirement {
            key: key.to_string(),
            operator: operator.to_string(),
            values: if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|v| (*v).to_string()).collect())
            },
        }
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = LabelSelector::default();
        assert!(matches_selector(&selector, &labels(&[])));
        assert!(matches_selector(&selector, &labels(&[("app", "web")])));
    }

    #[test]
    fn test_match_labels() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("team", "payments"), ("env", "prod")])),
            match_expressions: None,
        };
        assert!(matches_selector(
            &selector,
            &labels(&[("team", "payments"), ("env", "prod"), ("extra", "x")])
        ));
        assert!(!matches_selector(&selector, &labels(&[("team", "payments")])));
        assert!(!matches_selector(
            &selector,
            &labels(&[("team", "payments"), ("env", "dev")])
        ));
    }

    #[test]
    fn test_operators() {
        let l = labels(&[("env", "prod")]);
        assert!(matches_requirement(&requirement("env", "In", &["prod", "staging"]), &l));
        assert!(!matches_requirement(&requirement("env", "In", &["dev"]), &l));
        assert!(!matches_requirement(&requirement("team", "In", &["a"]), &l));

        assert!(matches_requirement(&requirement("env", "NotIn", &["dev"]), &l));
        assert!(!matches_requirement(&requirement("env", "NotIn", &["prod"]), &l));
        assert!(matches_requirement(&requirement("team", "NotIn", &["a"]), &l));

        assert!(matches_requirement(&requirement("env", "Exists", &[]), &l));
        assert!(!matches_requirement(&requirement("team", "Exists", &[]), &l));
        assert!(matches_requirement(&requirement("team", "DoesNotExist", &[]), &l));
        assert!(!matches_requirement(&requirement("env", "DoesNotExist", &[]), &l));

        assert!(!matches_requirement(&requirement("env", "Gt", &["1"]), &l));
    }

    #[test]
    fn test_labels_and_expressions_are_anded() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("team", "payments")])),
            match_expressions: Some(vec![requirement("env", "In", &["prod"])]),
        };
        assert!(matches_selector(
            &selector,
            &labels(&[("team", "payments"), ("env", "prod")])
        ));
        assert!(!matches_selector(
            &selector,
            &labels(&[("team", "payments"), ("env", "dev")])
        ));
    }
}
