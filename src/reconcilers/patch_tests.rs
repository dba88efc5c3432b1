// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `patch.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::patch::merge_diff;
    use serde_json::json;

    #[test]
    fn test_equal_values_produce_no_patch() {
        let value = json!({ "spec": { "forProvider": { "name": "acme" } } });
        assert!(merge_diff(&value, &value).is_none());
    }

    #[test]
    fn test_changed_and_added_keys() {
        let old = json!({ "forProvider": { "name": "acme", "org": null } });
        let new = json!({ "forProvider": { "name": "acme", "org": "org-1", "orgName": "x" } });
        assert_eq!(
            merge_diff(&old, &new),
            Some(json!({ "forProvider": { "org": "org-1", "orgName": "x" } }))
        );
    }

    #[test]
    fn test_removed_keys_become_null() {
        let old = json!({
            "annotations": {
                "crossplane.io/external-name": "scb-1",
                "servicecredentialbinding.cloudfoundry.crossplane.io/force-rotation": ""
            }
        });
        let new = json!({ "annotations": { "crossplane.io/external-name": "scb-2" } });
        assert_eq!(
            merge_diff(&old, &new),
            Some(json!({
                "annotations": {
                    "crossplane.io/external-name": "scb-2",
                    "servicecredentialbinding.cloudfoundry.crossplane.io/force-rotation": null
                }
            }))
        );
    }

    #[test]
    fn test_arrays_are_replaced() {
        let old = json!({ "retiredKeys": [{ "guid": "a" }] });
        let new = json!({ "retiredKeys": [{ "guid": "a" }, { "guid": "b" }] });
        assert_eq!(
            merge_diff(&old, &new),
            Some(json!({ "retiredKeys": [{ "guid": "a" }, { "guid": "b" }] }))
        );
    }

    #[test]
    fn test_object_replacing_scalar() {
        let old = json!({ "annotations": null });
        let new = json!({ "annotations": { "a": "b" } });
        assert_eq!(
            merge_diff(&old, &new),
            Some(json!({ "annotations": { "a": "b" } }))
        );
    }
}
