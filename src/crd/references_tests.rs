// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `references.rs`

#[cfg(test)]
mod tests {
    use crate::crd::references::{OrgScope, Reference, RouteScope, ScopeReference, SpaceScope};
    use crate::crd::validation::ValidationError;
    use crate::crd::LabelSelector;

    #[test]
    fn test_guid_only_is_valid() {
        let scope = OrgScope {
            org: Some("4d1f2a6e-0000-4000-8000-000000000001".to_string()),
            ..Default::default()
        };
        assert!(scope.validate_required().is_ok());
    }

    #[test]
    fn test_missing_reference_is_rejected() {
        let scope = SpaceScope::default();
        assert_eq!(
            scope.validate_required(),
            Err(ValidationError::MissingReference {
                field: "space".to_string()
            })
        );
        // Optional scopes accept nothing at all
        assert!(scope.validate_exclusive().is_ok());
    }

    #[test]
    fn test_empty_strings_do_not_count() {
        let scope = OrgScope {
            org: Some(String::new()),
            org_name: Some(String::new()),
            ..Default::default()
        };
        assert!(!scope.is_specified());
    }

    #[test]
    fn test_two_modes_are_rejected() {
        let scope = OrgScope {
            org_ref: Some(Reference {
                name: "acme".to_string(),
            }),
            org_name: Some("acme".to_string()),
            ..Default::default()
        };
        assert_eq!(
            scope.validate_required(),
            Err(ValidationError::AmbiguousReference {
                field: "org".to_string()
            })
        );
    }

    #[test]
    fn test_resolved_guid_may_coexist_with_one_mode() {
        let mut scope = SpaceScope {
            space_selector: Some(LabelSelector::default()),
            ..Default::default()
        };
        scope.set_guid("9a3c1d2e-0000-4000-8000-000000000002".to_string());
        assert!(scope.validate_required().is_ok());
        assert_eq!(scope.guid(), Some("9a3c1d2e-0000-4000-8000-000000000002"));
    }

    #[test]
    fn test_resolved_guid_does_not_excuse_two_modes() {
        let scope = OrgScope {
            org: Some("4d1f2a6e-0000-4000-8000-000000000001".to_string()),
            org_ref: Some(Reference {
                name: "acme".to_string(),
            }),
            org_selector: Some(LabelSelector::default()),
            ..Default::default()
        };
        assert_eq!(
            scope.validate_exclusive(),
            Err(ValidationError::AmbiguousReference {
                field: "org".to_string()
            })
        );
    }

    #[test]
    fn test_route_scope_has_no_name_lookup() {
        let scope = RouteScope {
            route_ref: Some(Reference {
                name: "web".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(scope.lookup_name(), None);
        assert!(scope.validate_required().is_ok());
    }
}
