// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `service_instance.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        external_name, set_external_name, LastOperation, ResourceSpec, ServiceInstance,
        ServiceInstanceParameters, ServiceInstanceSpec, ServiceInstanceType, ServicePlanParameters,
        SpaceScope,
    };
    use crate::reconcilers::managed::{delete_external, sync_external, ExternalClient};
    use crate::reconcilers::service_instance::{payload_hash, ServiceInstanceExternal};
    use crate::reconcilers::status::{find_condition, ready_reason};
    use crate::reconcilers::testing::{
        accepted, cf_client, context, mount_complete_job, TEST_NAMESPACE,
    };
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OLD_GUID: &str = "4d5e6f70-8192-4a3b-9c4d-5e6f70819203";
    const NEW_GUID: &str = "6f708192-a3b4-4c5d-8e6f-708192a3b4c5";
    const SPACE_GUID: &str = "5f0c5e5a-1b2c-4d3e-8f4a-5b6c7d8e9f00";

    fn instance() -> ServiceInstance {
        let mut cr = ServiceInstance::new(
            "orders-db",
            ServiceInstanceSpec {
                for_provider: ServiceInstanceParameters {
                    name: "orders-db".to_string(),
                    r#type: ServiceInstanceType::Managed,
                    space: SpaceScope {
                        space: Some(SPACE_GUID.to_string()),
                        ..SpaceScope::default()
                    },
                    service_plan: Some(ServicePlanParameters {
                        id: Some("plan-1".to_string()),
                        ..ServicePlanParameters::default()
                    }),
                    parameters: Some(json!({ "storage_gb": 20 })),
                    ..ServiceInstanceParameters::default()
                },
                resource: ResourceSpec::default(),
            },
        );
        cr.metadata.namespace = Some(TEST_NAMESPACE.to_string());
        cr
    }

    fn si_json(guid: &str, op_type: &str, op_state: &str) -> serde_json::Value {
        json!({
            "guid": guid,
            "name": "orders-db",
            "type": "managed",
            "tags": [],
            "last_operation": {
                "type": op_type,
                "state": op_state,
                "description": format!("{op_type} {op_state}")
            },
            "relationships": {
                "space": { "data": { "guid": SPACE_GUID } },
                "service_plan": { "data": { "guid": "plan-1" } }
            }
        })
    }

    #[test]
    fn test_payload_hash_is_stable_hex() {
        let a = payload_hash(&json!({ "a": 1, "b": [1, 2] }));
        let b = payload_hash(&json!({ "a": 1, "b": [1, 2] }));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, payload_hash(&json!({ "a": 2 })));
    }

    #[tokio::test]
    async fn test_failed_create_is_deleted_then_recreated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(si_json(OLD_GUID, "create", "failed")),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(accepted(&server, "job-delete"))
            .expect(1)
            .mount(&server)
            .await;
        mount_complete_job(&server, "job-delete").await;
        Mock::given(method("POST"))
            .and(path("/v3/service_instances"))
            .and(body_partial_json(json!({
                "type": "managed",
                "name": "orders-db",
                "parameters": { "storage_gb": 20 },
                "relationships": {
                    "space": { "data": { "guid": SPACE_GUID } },
                    "service_plan": { "data": { "guid": "plan-1" } }
                }
            })))
            .respond_with(accepted(&server, "job-create"))
            .expect(1)
            .mount(&server)
            .await;
        mount_complete_job(&server, "job-create").await;
        Mock::given(method("GET"))
            .and(path("/v3/service_instances"))
            .and(query_param("names", "orders-db"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": 1, "next": null },
                "resources": [si_json(NEW_GUID, "create", "in progress")]
            })))
            .mount(&server)
            .await;

        let external = ServiceInstanceExternal::new(context(&server), cf_client(&server));
        let mut cr = instance();
        set_external_name(&mut cr, OLD_GUID);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(synced.created);
        assert_eq!(external_name(&cr), Some(NEW_GUID));
        let at_provider = cr.at_provider().unwrap();
        assert_eq!(at_provider.id.as_deref(), Some(NEW_GUID));
        assert!(at_provider.last_operation.is_none());
        assert_eq!(
            at_provider.credentials,
            Some(payload_hash(&json!({ "storage_gb": 20 })))
        );
    }

    #[tokio::test]
    async fn test_in_progress_create_is_unavailable_and_not_updated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(si_json(OLD_GUID, "create", "in progress")),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(accepted(&server, "job-update"))
            .expect(0)
            .mount(&server)
            .await;

        let external = ServiceInstanceExternal::new(context(&server), cf_client(&server));
        let mut cr = instance();
        set_external_name(&mut cr, OLD_GUID);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(!synced.updated);
        assert_eq!(ready_reason(&cr), Some("Unavailable"));
        let conditions = &cr.status.as_ref().unwrap().resource.conditions;
        assert_eq!(
            find_condition(conditions, "Ready").unwrap().message.as_deref(),
            Some("create in progress")
        );
    }

    #[tokio::test]
    async fn test_parameter_change_updates_instance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(si_json(OLD_GUID, "create", "succeeded")),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .and(body_partial_json(json!({ "parameters": { "storage_gb": 20 } })))
            .respond_with(accepted(&server, "job-update"))
            .expect(1)
            .mount(&server)
            .await;
        mount_complete_job(&server, "job-update").await;

        let external = ServiceInstanceExternal::new(context(&server), cf_client(&server));
        let mut cr = instance();
        set_external_name(&mut cr, OLD_GUID);
        cr.at_provider_mut().credentials = Some(payload_hash(&json!({ "storage_gb": 10 })));

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(synced.updated);
        assert_eq!(
            cr.at_provider().unwrap().credentials,
            Some(payload_hash(&json!({ "storage_gb": 20 })))
        );
    }

    #[tokio::test]
    async fn test_user_provided_credentials_from_json_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/service_instances"))
            .and(body_partial_json(json!({
                "type": "user-provided",
                "credentials": { "uri": "postgres://db" }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({
                    "guid": NEW_GUID,
                    "name": "orders-db",
                    "type": "user-provided"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let external = ServiceInstanceExternal::new(context(&server), cf_client(&server));
        let mut cr = instance();
        let params = &mut cr.spec.for_provider;
        params.r#type = ServiceInstanceType::UserProvided;
        params.service_plan = None;
        params.parameters = None;
        params.json_credentials = Some(r#"{"uri":"postgres://db"}"#.to_string());

        external.create(&mut cr).await.unwrap();
        assert_eq!(external_name(&cr), Some(NEW_GUID));
    }

    #[tokio::test]
    async fn test_delete_in_progress_is_not_reissued() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(si_json(OLD_GUID, "delete", "in progress")),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v3/service_instances/{OLD_GUID}")))
            .respond_with(accepted(&server, "job-delete"))
            .expect(0)
            .mount(&server)
            .await;

        let external = ServiceInstanceExternal::new(context(&server), cf_client(&server));
        let mut cr = instance();
        set_external_name(&mut cr, OLD_GUID);
        cr.at_provider_mut().last_operation = Some(LastOperation {
            r#type: "delete".to_string(),
            state: "in progress".to_string(),
            ..LastOperation::default()
        });

        assert!(!delete_external(&mut cr, &external).await.unwrap());
        assert_eq!(ready_reason(&cr), Some("Deleting"));
    }
}
