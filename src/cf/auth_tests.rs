// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `auth.rs`

#[cfg(test)]
mod tests {
    use crate::cf::auth::{login, Credentials};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_root(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": { "login": { "href": format!("{}/login", server.uri()) } }
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_user_falls_back_to_email() {
        let creds: Credentials = serde_json::from_value(json!({
            "email": "ops@example.com", "password": "secret"
        }))
        .unwrap();
        assert_eq!(creds.user(), Some("ops@example.com"));

        let creds: Credentials = serde_json::from_value(json!({
            "email": "ops@example.com", "username": "ops", "password": "secret"
        }))
        .unwrap();
        assert_eq!(creds.user(), Some("ops"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds: Credentials = serde_json::from_value(json!({
            "username": "ops", "password": "hunter2"
        }))
        .unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("ops"));
    }

    #[tokio::test]
    async fn test_login_password_grant_with_origin() {
        let server = MockServer::start().await;
        mount_root(&server).await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/token"))
            .and(header("authorization", "Basic Y2Y6"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=ops"))
            .and(body_string_contains("login_hint="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "abc", "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v3/organizations/org-1"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "guid": "org-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let creds: Credentials = serde_json::from_value(json!({
            "username": "ops", "password": "secret", "origin": "ldap"
        }))
        .unwrap();
        let cf = login(
            &crate::reconcilers::testing::http_client(),
            &server.uri(),
            &creds,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let org: serde_json::Value = cf.get("/v3/organizations/org-1", "organization").await.unwrap();
        assert_eq!(org["guid"], "org-1");
    }

    #[tokio::test]
    async fn test_login_with_passcode() {
        let server = MockServer::start().await;
        mount_root(&server).await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/token"))
            .and(body_string_contains("passcode=otp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "xyz" })))
            .expect(1)
            .mount(&server)
            .await;

        let creds: Credentials =
            serde_json::from_value(json!({ "passcode": "otp-1" })).unwrap();
        login(&crate::reconcilers::testing::http_client(), &server.uri(), &creds, Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_unauthorized() {
        let server = MockServer::start().await;
        mount_root(&server).await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "unauthorized", "error_description": "Bad credentials"
            })))
            .mount(&server)
            .await;

        let creds: Credentials =
            serde_json::from_value(json!({ "username": "ops", "password": "wrong" })).unwrap();
        let err = login(&crate::reconcilers::testing::http_client(), &server.uri(), &creds, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
