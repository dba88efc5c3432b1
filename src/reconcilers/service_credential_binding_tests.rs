// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `service_credential_binding.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        external_name, set_external_name, AppScope, BindingType, ResourceSpec, RetiredKey,
        Rotation, SecretReference, ServiceCredentialBinding, ServiceCredentialBindingParameters,
        ServiceCredentialBindingSpec, ServiceInstanceScope,
    };
    use crate::labels::FORCE_ROTATION_ANNOTATION;
    use crate::reconcilers::managed::{delete_external, sync_external, ExternalClient};
    use crate::reconcilers::rotation::Rotator;
    use crate::reconcilers::service_credential_binding::{
        binding_name, name_matches, random_suffix, ServiceCredentialBindingExternal,
    };
    use crate::reconcilers::testing::{cf_client, context, TEST_NAMESPACE};
    use chrono::{DateTime, Duration, Utc};
    use kube::ResourceExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OLD_GUID: &str = "8b9c0d1e-2f3a-4b5c-8d6e-7f8a9b0c1d2e";
    const NEW_GUID: &str = "9c0d1e2f-3a4b-4c5d-9e6f-8a9b0c1d2e3f";
    const SI_GUID: &str = "1e2f3a4b-5c6d-4e7f-8091-a2b3c4d5e6f7";

    fn binding(rotation: Option<Rotation>) -> ServiceCredentialBinding {
        let mut cr = ServiceCredentialBinding::new(
            "db-key",
            ServiceCredentialBindingSpec {
                for_provider: ServiceCredentialBindingParameters {
                    r#type: BindingType::Key,
                    name: Some("db-key".to_string()),
                    service_instance: ServiceInstanceScope {
                        service_instance: Some(SI_GUID.to_string()),
                        ..ServiceInstanceScope::default()
                    },
                    ..ServiceCredentialBindingParameters::default()
                },
                rotation,
                connection_details_as_json: None,
                resource: ResourceSpec::default(),
            },
        );
        cr.metadata.namespace = Some(TEST_NAMESPACE.to_string());
        cr
    }

    fn hourly() -> Option<Rotation> {
        Some(Rotation {
            frequency: Some("1h".to_string()),
            ttl: Some("2h".to_string()),
        })
    }

    fn binding_json(guid: &str, name: &str, created_at: DateTime<Utc>) -> serde_json::Value {
        json!({
            "guid": guid,
            "name": name,
            "type": "key",
            "created_at": created_at.to_rfc3339(),
            "last_operation": { "type": "create", "state": "succeeded" },
            "relationships": { "service_instance": { "data": { "guid": SI_GUID } } }
        })
    }

    async fn mount_get(server: &MockServer, guid: &str, name: &str, created_at: DateTime<Utc>) {
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_credential_bindings/{guid}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(binding_json(guid, name, created_at)),
            )
            .mount(server)
            .await;
    }

    async fn mount_list(server: &MockServer, resources: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/v3/service_credential_bindings"))
            .and(query_param("service_instance_guids", SI_GUID))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": resources.len(), "next": null },
                "resources": resources
            })))
            .mount(server)
            .await;
    }

    async fn mount_create(server: &MockServer, created_at: DateTime<Utc>) {
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .and(body_partial_json(json!({
                "type": "key",
                "relationships": { "service_instance": { "data": { "guid": SI_GUID } } }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(binding_json(NEW_GUID, "db-key-abcde", created_at)),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_rotating_names_get_a_random_suffix() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

        let name = binding_name(&binding(hourly())).unwrap();
        assert!(name.starts_with("db-key-"));
        assert!(name_matches(Some("db-key"), true, Some(&name)));
        assert_eq!(binding_name(&binding(None)).as_deref(), Some("db-key"));
    }

    #[test]
    fn test_name_matching() {
        assert!(name_matches(Some("db-key"), false, Some("db-key")));
        assert!(!name_matches(Some("db-key"), false, Some("db-key-abcde")));
        assert!(!name_matches(Some("db-key"), true, Some("db-key-other-key")));
        assert!(!name_matches(Some("db-key"), true, None));
        assert!(name_matches(None, false, None));
    }

    #[tokio::test]
    async fn test_scheduled_rotation_then_expiry() {
        let now = Utc::now();
        let old_created = now - Duration::hours(2);

        // First reconcile: the active key is older than the frequency.
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key-aaaaa", old_created).await;
        mount_list(&server, vec![binding_json(OLD_GUID, "db-key-aaaaa", old_created)]).await;
        mount_create(&server, now).await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        set_external_name(&mut cr, OLD_GUID);

        let synced = sync_external(&mut cr, &external).await.unwrap();
        assert!(synced.created);
        assert_eq!(external_name(&cr), Some(NEW_GUID));
        assert_eq!(
            cr.retired_keys(),
            &[RetiredKey {
                guid: OLD_GUID.to_string(),
                created_at: old_created.to_rfc3339(),
            }]
        );

        // Second reconcile an hour later: the retired key outlived its TTL.
        let server = MockServer::start().await;
        mount_get(&server, NEW_GUID, "db-key-abcde", now).await;
        Mock::given(method("PATCH"))
            .and(path(format!("/v3/service_credential_bindings/{NEW_GUID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v3/service_credential_bindings/{OLD_GUID}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now + Duration::hours(1)));

        let synced = sync_external(&mut cr, &external).await.unwrap();
        assert!(synced.updated);
        assert_eq!(external_name(&cr), Some(NEW_GUID));
        assert!(cr.retired_keys().is_empty());
    }

    #[tokio::test]
    async fn test_force_rotation_clears_annotation() {
        let now = Utc::now();
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key-aaaaa", now - Duration::minutes(5)).await;
        mount_list(&server, Vec::new()).await;
        mount_create(&server, now).await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        set_external_name(&mut cr, OLD_GUID);
        cr.annotations_mut()
            .insert(FORCE_ROTATION_ANNOTATION.to_string(), String::new());

        sync_external(&mut cr, &external).await.unwrap();

        assert_eq!(external_name(&cr), Some(NEW_GUID));
        assert_eq!(cr.retired_keys().len(), 1);
        assert_eq!(cr.retired_keys()[0].guid, OLD_GUID);
        assert!(!cr.annotations().contains_key(FORCE_ROTATION_ANNOTATION));
    }

    #[tokio::test]
    async fn test_force_annotation_without_rotation_keeps_binding() {
        let now = Utc::now();
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key", now - Duration::minutes(5)).await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(None);
        set_external_name(&mut cr, OLD_GUID);
        cr.annotations_mut()
            .insert(FORCE_ROTATION_ANNOTATION.to_string(), String::new());

        let synced = sync_external(&mut cr, &external).await.unwrap();
        assert!(!synced.created);
        assert_eq!(external_name(&cr), Some(OLD_GUID));
        assert!(cr.retired_keys().is_empty());
        assert!(!cr.annotations().contains_key(FORCE_ROTATION_ANNOTATION));
    }

    #[tokio::test]
    async fn test_rotation_adopts_binding_from_lost_status_write() {
        let now = Utc::now();
        let old_created = now - Duration::hours(2);
        let orphan_guid = "0d1e2f3a-4b5c-4d6e-8f70-9a0b1c2d3e4f";
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key-aaaaa", old_created).await;
        mount_list(
            &server,
            vec![
                binding_json(OLD_GUID, "db-key-aaaaa", old_created),
                binding_json(orphan_guid, "db-key-zzzzz", now - Duration::minutes(30)),
            ],
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        set_external_name(&mut cr, OLD_GUID);

        let synced = sync_external(&mut cr, &external).await.unwrap();
        assert!(!synced.created);
        assert_eq!(external_name(&cr), Some(orphan_guid));
        assert_eq!(cr.retired_keys().len(), 1);
        assert_eq!(cr.retired_keys()[0].guid, OLD_GUID);
    }

    #[tokio::test]
    async fn test_rotation_keeps_old_key_when_create_fails() {
        let now = Utc::now();
        let old_created = now - Duration::hours(2);
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key-aaaaa", old_created).await;
        mount_list(&server, vec![binding_json(OLD_GUID, "db-key-aaaaa", old_created)]).await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "errors": [{ "code": 10001, "title": "CF-ServiceUnavailable", "detail": "broker down" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        set_external_name(&mut cr, OLD_GUID);

        assert!(sync_external(&mut cr, &external).await.is_err());
        assert_eq!(external_name(&cr), Some(OLD_GUID));
        assert_eq!(
            cr.retired_keys(),
            &[RetiredKey {
                guid: OLD_GUID.to_string(),
                created_at: old_created.to_rfc3339(),
            }]
        );

        // The retry finds the same key retired once and creates again.
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key-aaaaa", old_created).await;
        mount_list(&server, vec![binding_json(OLD_GUID, "db-key-aaaaa", old_created)]).await;
        mount_create(&server, now).await;
        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));

        let synced = sync_external(&mut cr, &external).await.unwrap();
        assert!(synced.created);
        assert_eq!(external_name(&cr), Some(NEW_GUID));
        assert_eq!(cr.retired_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_app_binding_ignores_force_annotation() {
        let now = Utc::now();
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "", now - Duration::days(30)).await;
        Mock::given(method("POST"))
            .and(path("/v3/service_credential_bindings"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(None);
        cr.spec.for_provider.r#type = BindingType::App;
        cr.spec.for_provider.name = None;
        cr.spec.for_provider.app = AppScope {
            app: Some("app-1".to_string()),
            ..AppScope::default()
        };
        set_external_name(&mut cr, OLD_GUID);
        cr.annotations_mut()
            .insert(FORCE_ROTATION_ANNOTATION.to_string(), String::new());

        let observation = external.observe(&mut cr).await.unwrap();
        assert!(observation.resource_exists);
        assert!(cr.retired_keys().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_skips_retired_and_takes_newest() {
        let now = Utc::now();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/service_credential_bindings"))
            .and(query_param("service_instance_guids", SI_GUID))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": 4, "next": null },
                "resources": [
                    binding_json(OLD_GUID, "db-key-aaaaa", now),
                    binding_json("older-guid", "db-key-bbbbb", now - Duration::hours(1)),
                    binding_json(NEW_GUID, "db-key-ccccc", now - Duration::minutes(1)),
                    binding_json("foreign-guid", "other-key", now)
                ]
            })))
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        cr.at_provider_mut().retired_keys = vec![RetiredKey {
            guid: OLD_GUID.to_string(),
            created_at: now.to_rfc3339(),
        }];

        let observation = external.observe(&mut cr).await.unwrap();
        assert!(observation.resource_exists);
        assert_eq!(external_name(&cr), Some(NEW_GUID));
    }

    #[tokio::test]
    async fn test_connection_details_published_when_requested() {
        let now = Utc::now();
        let server = MockServer::start().await;
        mount_get(&server, OLD_GUID, "db-key", now).await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/service_credential_bindings/{OLD_GUID}/details")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "credentials": { "uri": "postgres://db", "nested": { "port": 5432 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(None);
        cr.spec.resource.write_connection_secret_to_ref = Some(SecretReference {
            name: "db-key-conn".to_string(),
            namespace: None,
        });
        set_external_name(&mut cr, OLD_GUID);

        let observation = external.observe(&mut cr).await.unwrap();
        let details = observation.connection_details.unwrap();
        assert_eq!(details["uri"], b"postgres://db".to_vec());
        assert_eq!(details["nested_port"], b"5432".to_vec());
    }

    #[tokio::test]
    async fn test_delete_drains_retired_keys_first() {
        let now = Utc::now();
        let server = MockServer::start().await;
        mount_get(&server, NEW_GUID, "db-key-abcde", now).await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v3/service_credential_bindings/{OLD_GUID}")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{ "code": 10010, "title": "CF-ResourceNotFound", "detail": "not found" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v3/service_credential_bindings/{NEW_GUID}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let external = ServiceCredentialBindingExternal::new(context(&server), cf_client(&server))
            .with_rotator(Rotator::new(now));
        let mut cr = binding(hourly());
        set_external_name(&mut cr, NEW_GUID);
        cr.at_provider_mut().retired_keys = vec![RetiredKey {
            guid: OLD_GUID.to_string(),
            created_at: now.to_rfc3339(),
        }];

        assert!(!delete_external(&mut cr, &external).await.unwrap());
        assert!(cr.retired_keys().is_empty());
    }
}
