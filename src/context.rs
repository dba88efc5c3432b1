// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client
//! - the HTTP client used for every CF and UAA call
//! - the operator [`Settings`]
//!
//! The controller path keeps no CF state across reconciles: each reconcile
//! authenticates afresh and all durable state lives in the resource status.

use crate::constants::{
    DEFAULT_MAX_RECONCILE_RATE, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RECONCILE_TIMEOUT_SECS,
    DEFAULT_SERVICE_INSTANCE_TIMEOUT_SECS, DEFAULT_SYNC_INTERVAL_SECS,
};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use std::time::Duration;
use tracing::debug;

/// Operator-wide timing and concurrency settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Requeue interval for resources that are Ready.
    pub sync_interval: Duration,

    /// Delay between two polls of a CF job or build.
    pub poll_interval: Duration,

    /// Upper bound of one reconcile.
    pub timeout: Duration,

    /// Upper bound of one `ServiceInstance` reconcile (broker operations are slow).
    pub service_instance_timeout: Duration,

    /// Concurrent reconciles per kind.
    pub max_reconcile_rate: u16,

    /// Restrict watches to one namespace; all namespaces when `None`.
    pub namespace: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            service_instance_timeout: Duration::from_secs(DEFAULT_SERVICE_INSTANCE_TIMEOUT_SECS),
            max_reconcile_rate: DEFAULT_MAX_RECONCILE_RATE,
            namespace: None,
        }
    }
}

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// HTTP client for CF and UAA calls. Certificate verification is disabled.
    pub http_client: reqwest::Client,

    pub settings: Settings,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, http_client: reqwest::Client, settings: Settings) -> Self {
        Self {
            client,
            http_client,
            settings,
        }
    }

    /// A namespaced API for `K`.
    #[must_use]
    pub fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// The API the controller for `K` watches: one namespace or all of them.
    #[must_use]
    pub fn watched_api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match &self.settings.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

/// Installs ring as the process-wide rustls crypto provider.
///
/// reqwest and kube both link rustls with more than one backend, so rustls
/// cannot pick one on its own. Safe to call more than once.
pub fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return;
    }
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Builds the shared CF HTTP client.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    install_crypto_provider();
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .user_agent(concat!("cf-operator/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
