// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `service_instances.rs`

#[cfg(test)]
mod tests {
    use crate::cf::client::CfClient;
    use crate::cf::service_instances::InstancePayload;
    use crate::crd::{CfMetadata, ServiceInstanceType};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CfClient {
        CfClient::new(
            crate::reconcilers::testing::http_client(),
            &server.uri(),
            None,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn test_get_reads_last_operation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_instances/si-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "guid": "si-1",
                "name": "db",
                "type": "managed",
                "tags": ["sql"],
                "last_operation": {
                    "type": "create",
                    "state": "in progress",
                    "description": "provisioning",
                    "updated_at": "2025-01-01T00:00:00Z"
                },
                "relationships": {
                    "space": { "data": { "guid": "space-1" } },
                    "service_plan": { "data": { "guid": "plan-1" } }
                }
            })))
            .mount(&server)
            .await;

        let si = client(&server).service_instances().get("si-1").await.unwrap();
        let op = si.last_operation.unwrap();
        assert_eq!(op.r#type, "create");
        assert_eq!(op.state, "in progress");
        assert_eq!(op.description.as_deref(), Some("provisioning"));
        assert_eq!(op.updated_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(si.relationships.service_plan.guid(), Some("plan-1"));
        assert_eq!(si.tags, vec!["sql".to_string()]);
    }

    #[tokio::test]
    async fn test_plan_guid_filters_by_offering() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_plans"))
            .and(query_param("names", "small"))
            .and(query_param("service_offering_names", "postgres"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": 1, "next": null },
                "resources": [{ "guid": "plan-9", "name": "small" }]
            })))
            .mount(&server)
            .await;

        let guid = client(&server)
            .service_instances()
            .plan_guid("postgres", "small")
            .await
            .unwrap();
        assert_eq!(guid, "plan-9");
    }

    #[tokio::test]
    async fn test_create_managed_is_async() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/service_instances"))
            .and(body_json(json!({
                "type": "managed",
                "name": "db",
                "parameters": { "size": "s" },
                "metadata": { "labels": {}, "annotations": {} },
                "relationships": {
                    "space": { "data": { "guid": "space-1" } },
                    "service_plan": { "data": { "guid": "plan-1" } }
                }
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", format!("{}/v3/jobs/job-7", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let payload = InstancePayload {
            name: "db".to_string(),
            plan: Some("plan-1".to_string()),
            parameters: Some(json!({ "size": "s" })),
            credentials: Some(json!({ "ignored": true })),
            ..Default::default()
        };
        let accepted = client(&server)
            .service_instances()
            .create(ServiceInstanceType::Managed, "space-1", &payload)
            .await
            .unwrap();
        assert_eq!(accepted.job.as_deref(), Some("job-7"));
        assert!(accepted.resource.is_none());
    }

    #[tokio::test]
    async fn test_create_user_provided_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/service_instances"))
            .and(body_json(json!({
                "type": "user-provided",
                "name": "ups",
                "credentials": { "user": "admin" },
                "syslog_drain_url": "syslog://logs.example.com",
                "tags": ["a"],
                "metadata": { "labels": { "team": "x" }, "annotations": {} },
                "relationships": { "space": { "data": { "guid": "space-1" } } }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "guid": "ups-1", "name": "ups", "type": "user-provided"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = InstancePayload {
            name: "ups".to_string(),
            credentials: Some(json!({ "user": "admin" })),
            parameters: Some(json!({ "ignored": true })),
            tags: Some(vec!["a".to_string()]),
            syslog_drain_url: Some("syslog://logs.example.com".to_string()),
            metadata: CfMetadata {
                labels: Some(BTreeMap::from([("team".to_string(), "x".to_string())])),
                annotations: None,
            },
            ..Default::default()
        };
        let accepted = client(&server)
            .service_instances()
            .create(ServiceInstanceType::UserProvided, "space-1", &payload)
            .await
            .unwrap();
        assert!(!accepted.is_async());
        assert_eq!(accepted.resource.unwrap().guid, "ups-1");
    }

    #[tokio::test]
    async fn test_delete_managed_returns_job() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v3/service_instances/si-1"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", format!("{}/v3/jobs/job-8", server.uri())),
            )
            .mount(&server)
            .await;

        let job = client(&server)
            .service_instances()
            .delete("si-1")
            .await
            .unwrap();
        assert_eq!(job.as_deref(), Some("job-8"));
    }
}
