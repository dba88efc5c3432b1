// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `service_credential_bindings.rs`

#[cfg(test)]
mod tests {
    use crate::cf::client::CfClient;
    use crate::cf::service_credential_bindings::BindingFilter;
    use crate::crd::{BindingType, CfMetadata};
    use serde_json::json;
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
    async fn test_list_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_credential_bindings"))
            .and(query_param("type", "key"))
            .and(query_param("service_instance_guids", "si-1"))
            .and(query_param("names", "db-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": 1, "next": null },
                "resources": [{
                    "guid": "scb-1",
                    "name": "db-key",
                    "type": "key",
                    "created_at": "2025-01-01T00:00:00Z",
                    "last_operation": { "type": "create", "state": "succeeded" },
                    "relationships": { "service_instance": { "data": { "guid": "si-1" } } }
                }]
            })))
            .mount(&server)
            .await;

        let filter = BindingFilter {
            r#type: Some(BindingType::Key),
            names: vec!["db-key".to_string()],
            service_instance: Some("si-1".to_string()),
            app: None,
        };
        let bindings = client(&server)
            .service_credential_bindings()
            .list(&filter)
            .await
            .unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name.as_deref(), Some("db-key"));
        assert_eq!(bindings[0].relationships.service_instance.guid(), Some("si-1"));
        assert_eq!(bindings[0].relationships.app.guid(), None);
    }

    #[tokio::test]
    async fn test_details_returns_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_credential_bindings/scb-1/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "credentials": { "uri": "postgres://db", "port": 5432 }
            })))
            .mount(&server)
            .await;

        let details = client(&server)
            .service_credential_bindings()
            .details("scb-1")
            .await
            .unwrap();
        assert_eq!(details.credentials["uri"], "postgres://db");
        assert_eq!(details.credentials["port"], 5432);
    }

    #[tokio::test]
    async fn test_create_key_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .and(body_json(json!({
                "type": "key",
                "name": "db-key-ab12c",
                "parameters": { "role": "ro" },
                "metadata": { "labels": {}, "annotations": {} },
                "relationships": { "service_instance": { "data": { "guid": "si-1" } } }
            })))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", format!("{}/v3/jobs/job-1", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let accepted = client(&server)
            .service_credential_bindings()
            .create(
                BindingType::Key,
                Some("db-key-ab12c"),
                "si-1",
                None,
                Some(&json!({ "role": "ro" })),
                &CfMetadata::default(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.job.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn test_create_app_binding_sets_app_relationship() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .and(body_json(json!({
                "type": "app",
                "metadata": { "labels": {}, "annotations": {} },
                "relationships": {
                    "service_instance": { "data": { "guid": "si-1" } },
                    "app": { "data": { "guid": "app-1" } }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "guid": "scb-2", "type": "app"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let accepted = client(&server)
            .service_credential_bindings()
            .create(
                BindingType::App,
                None,
                "si-1",
                Some("app-1"),
                None,
                &CfMetadata::default(),
            )
            .await
            .unwrap();
        assert_eq!(accepted.resource.unwrap().guid, "scb-2");
    }
}
