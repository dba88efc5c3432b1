// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fixtures shared by the reconciler tests: a CF client and a Kubernetes
//! client both pointed at a `wiremock` server.

use crate::cf::CfClient;
use crate::context::{install_crypto_provider, Context, Settings};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_NAMESPACE: &str = "platform";

/// A plain HTTP client with the rustls crypto provider installed.
pub fn http_client() -> reqwest::Client {
    install_crypto_provider();
    reqwest::Client::new()
}

pub fn cf_client(server: &MockServer) -> CfClient {
    CfClient::new(
        http_client(),
        &server.uri(),
        None,
        Duration::from_millis(5),
    )
}

pub fn kube_client(server: &MockServer) -> kube::Client {
    install_crypto_provider();
    let uri = server.uri().parse().expect("mock server URI");
    let config = kube::Config::new(uri);
    kube::Client::try_from(config).expect("kube client")
}

pub fn context(server: &MockServer) -> Arc<Context> {
    Arc::new(Context::new(
        kube_client(server),
        http_client(),
        Settings {
            poll_interval: Duration::from_millis(5),
            ..Settings::default()
        },
    ))
}

/// A 202 response pointing at job `guid`.
pub fn accepted(server: &MockServer, guid: &str) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(202)
        .insert_header("Location", format!("{}/v3/jobs/{guid}", server.uri()).as_str())
}

/// Mounts `GET /v3/jobs/{guid}` answering `COMPLETE`.
pub async fn mount_complete_job(server: &MockServer, guid: &str) {
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path(format!("/v3/jobs/{guid}")))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "guid": guid,
            "operation": "test",
            "state": "COMPLETE",
            "errors": [],
            "warnings": []
        })))
        .mount(server)
        .await;
}
