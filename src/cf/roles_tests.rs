// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `roles.rs`

#[cfg(test)]
mod tests {
    use crate::cf::client::CfClient;
    use crate::cf::errors::CfError;
    use crate::cf::roles::{is_no_such_user, RoleScope};
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

    fn roles_page() -> serde_json::Value {
        json!({
            "pagination": { "total_results": 2, "next": null },
            "resources": [
                {
                    "guid": "role-1",
                    "type": "organization_manager",
                    "relationships": { "user": { "data": { "guid": "user-1" } } }
                },
                {
                    "guid": "role-2",
                    "type": "organization_manager",
                    "relationships": { "user": { "data": { "guid": "user-2" } } }
                }
            ],
            "included": {
                "users": [
                    { "guid": "user-1", "username": "alice", "origin": "uaa" },
                    { "guid": "user-2", "username": "alice", "origin": "ldap" }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_list_joins_included_users() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/roles"))
            .and(query_param("types", "organization_manager"))
            .and(query_param("organization_guids", "org-1"))
            .and(query_param("include", "user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(roles_page()))
            .mount(&server)
            .await;

        let roles = client(&server)
            .roles()
            .list(RoleScope::Organization("org-1"), "organization_manager")
            .await
            .unwrap();
        let keys: Vec<String> = roles.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["alice@uaa".to_string(), "alice@ldap".to_string()]);
        assert_eq!(roles[1].user_guid, "user-2");
    }

    #[tokio::test]
    async fn test_create_sends_username_and_origin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/roles"))
            .and(body_json(json!({
                "type": "space_developer",
                "relationships": {
                    "user": { "data": { "username": "bob", "origin": "uaa" } },
                    "space": { "data": { "guid": "space-1" } }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "guid": "role-9",
                "type": "space_developer",
                "relationships": { "user": { "data": { "guid": "user-9" } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let role = client(&server)
            .roles()
            .ensure(RoleScope::Space("space-1"), "space_developer", "bob", "uaa")
            .await
            .unwrap();
        assert_eq!(role.guid, "role-9");
        assert_eq!(role.user_guid, "user-9");
        assert_eq!(role.key(), "bob@uaa");
    }

    #[tokio::test]
    async fn test_ensure_adopts_existing_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/roles"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [{
                    "code": 10008,
                    "title": "CF-UnprocessableEntity",
                    "detail": "User 'alice' already has 'organization_manager' role in organization 'acme'."
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(roles_page()))
            .mount(&server)
            .await;

        let role = client(&server)
            .roles()
            .ensure(RoleScope::Organization("org-1"), "organization_manager", "alice", "ldap")
            .await
            .unwrap();
        assert_eq!(role.guid, "role-2");
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/roles"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [{
                    "code": 10008,
                    "title": "CF-UnprocessableEntity",
                    "detail": "No user exists with the username 'ghost' and origin 'uaa'."
                }]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .roles()
            .create(RoleScope::Organization("org-1"), "organization_user", "ghost", "uaa")
            .await
            .unwrap_err();
        assert!(is_no_such_user(&err));
        assert!(!err.is_role_already_assigned());
    }

    #[tokio::test]
    async fn test_get_missing_role_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/roles"))
            .and(query_param("guids", "role-x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pagination": { "total_results": 0, "next": null },
                "resources": []
            })))
            .mount(&server)
            .await;

        let err = client(&server).roles().get("role-x").await.unwrap_err();
        assert!(matches!(err, CfError::NotFound { .. }));
    }
}
