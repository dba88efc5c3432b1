// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud Foundry v3 API adapter.
//!
//! [`CfClient`] owns the HTTP plumbing (auth header, pagination, error
//! translation, async jobs). Each CF resource kind gets a narrow accessor,
//! e.g. `cf.organizations().get(guid)`, returning [`CfError`] on failure.
//!
//! ```rust,no_run
//! # async fn example(http: reqwest::Client) -> Result<(), cf_operator::cf::CfError> {
//! use cf_operator::cf::{login, Credentials};
//! use std::time::Duration;
//!
//! let creds = Credentials {
//!     username: Some("admin".to_string()),
//!     password: Some("secret".to_string()),
//!     ..Default::default()
//! };
//! let cf = login(&http, "https://api.sys.example.com", &creds, Duration::from_secs(2)).await?;
//! let org = cf.organizations().single_by_name("acme").await?;
//! println!("{}", org.guid);
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod auth;
pub mod client;
pub mod domains;
pub mod errors;
pub mod jobs;
pub mod organizations;
pub mod push;
pub mod quotas;
pub mod roles;
pub mod routes;
pub mod service_credential_bindings;
pub mod service_instances;
pub mod service_route_bindings;
pub mod spaces;
pub mod types;

pub use auth::{login, Credentials};
pub use client::CfClient;
pub use errors::{cf_error, is_not_found, CfApiError, CfError};
