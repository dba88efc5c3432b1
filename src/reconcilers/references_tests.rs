// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `references.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        set_external_name, LabelSelector, OrgScope, Organization, OrganizationParameters,
        OrganizationSpec, Reference, ResourceSpec, ServiceInstanceScope, SpaceScope,
    };
    use crate::reconcilers::references::Resolver;
    use crate::reconcilers::testing::{cf_client, context, TEST_NAMESPACE};
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ORGS_PATH: &str =
        "/apis/cloudfoundry.crossplane.io/v1alpha1/namespaces/platform/organizations";

    fn org(name: &str, external_name: Option<&str>, team: &str) -> Organization {
        let mut org = Organization::new(
            name,
            OrganizationSpec {
                for_provider: OrganizationParameters {
                    name: name.to_string(),
                    suspended: None,
                },
                resource: ResourceSpec::default(),
            },
        );
        org.metadata.namespace = Some(TEST_NAMESPACE.to_string());
        org.metadata.labels = Some(BTreeMap::from([("team".to_string(), team.to_string())]));
        if let Some(guid) = external_name {
            set_external_name(&mut org, guid);
        }
        org
    }

    fn page(resources: serde_json::Value) -> serde_json::Value {
        json!({
            "pagination": { "total_results": resources.as_array().map_or(0, Vec::len), "next": null },
            "resources": resources
        })
    }

    fn team_selector(team: &str) -> LabelSelector {
        LabelSelector {
            match_labels: Some(BTreeMap::from([("team".to_string(), team.to_string())])),
            match_expressions: None,
        }
    }

    #[tokio::test]
    async fn test_guid_is_kept_without_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope {
            org: Some("org-1".to_string()),
            org_name: Some("ignored".to_string()),
            ..OrgScope::default()
        };
        Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .unwrap();
        assert_eq!(scope.org.as_deref(), Some("org-1"));
    }

    #[tokio::test]
    async fn test_reference_uses_external_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{ORGS_PATH}/acme")))
            .respond_with(ResponseTemplate::new(200).set_body_json(org("acme", Some("org-7"), "a")))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope {
            org_ref: Some(Reference {
                name: "acme".to_string(),
            }),
            ..OrgScope::default()
        };
        Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .unwrap();
        assert_eq!(scope.org.as_deref(), Some("org-7"));
    }

    #[tokio::test]
    async fn test_reference_without_external_name_is_not_resolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{ORGS_PATH}/acme")))
            .respond_with(ResponseTemplate::new(200).set_body_json(org("acme", None, "a")))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope {
            org_ref: Some(Reference {
                name: "acme".to_string(),
            }),
            ..OrgScope::default()
        };
        let err = Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not resolved yet"));
        assert!(scope.org.is_none());
    }

    #[tokio::test]
    async fn test_selector_picks_first_resolved_match_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ORGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "cloudfoundry.crossplane.io/v1alpha1",
                "kind": "OrganizationList",
                "metadata": {},
                "items": [
                    org("zeta", Some("org-z"), "payments"),
                    org("alpha", None, "payments"),
                    org("beta", Some("org-b"), "payments"),
                    org("aaa", Some("org-other"), "search"),
                ]
            })))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope {
            org_selector: Some(team_selector("payments")),
            ..OrgScope::default()
        };
        Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .unwrap();
        assert_eq!(scope.org.as_deref(), Some("org-b"));
    }

    #[tokio::test]
    async fn test_selector_without_match_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ORGS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "cloudfoundry.crossplane.io/v1alpha1",
                "kind": "OrganizationList",
                "metadata": {},
                "items": [org("acme", Some("org-1"), "search")]
            })))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope {
            org_selector: Some(team_selector("payments")),
            ..OrgScope::default()
        };
        assert!(Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_space_name_is_scoped_by_org_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/organizations"))
            .and(query_param("names", "acme"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page(json!([{ "guid": "org-1", "name": "acme" }]))),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/spaces"))
            .and(query_param("names", "dev"))
            .and(query_param("organization_guids", "org-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{
                "guid": "space-1",
                "name": "dev",
                "relationships": { "organization": { "data": { "guid": "org-1" } } }
            }]))))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = SpaceScope {
            space_name: Some("dev".to_string()),
            org_name: Some("acme".to_string()),
            ..SpaceScope::default()
        };
        Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .space(&mut scope)
            .await
            .unwrap();
        assert_eq!(scope.space.as_deref(), Some("space-1"));
    }

    #[tokio::test]
    async fn test_ambiguous_service_instance_name_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_instances"))
            .and(query_param("names", "db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
                { "guid": "si-1", "name": "db" },
                { "guid": "si-2", "name": "db" }
            ]))))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = ServiceInstanceScope {
            service_instance_name: Some("db".to_string()),
            ..ServiceInstanceScope::default()
        };
        let err = Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .service_instance(&mut scope)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("serviceInstance"));
        assert!(scope.service_instance.is_none());
    }

    #[tokio::test]
    async fn test_unspecified_scope_is_left_alone() {
        let server = MockServer::start().await;
        let ctx = context(&server);
        let cf = cf_client(&server);
        let mut scope = OrgScope::default();
        Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .org(&mut scope)
            .await
            .unwrap();
        assert!(scope.org.is_none());
    }

    #[tokio::test]
    async fn test_external_names_of_reference_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{ORGS_PATH}/acme")))
            .respond_with(ResponseTemplate::new(200).set_body_json(org("acme", Some("org-1"), "a")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ORGS_PATH}/globex")))
            .respond_with(ResponseTemplate::new(200).set_body_json(org("globex", Some("org-2"), "a")))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let cf = cf_client(&server);
        let guids = Resolver::new(&ctx, &cf, TEST_NAMESPACE)
            .external_names::<Organization>(["acme", "globex"])
            .await
            .unwrap();
        assert_eq!(guids, vec!["org-1".to_string(), "org-2".to_string()]);
    }
}
