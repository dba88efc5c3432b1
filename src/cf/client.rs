// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Low-level CF v3 HTTP client.
//!
//! Every call is logged with method, URL and status and counted in the
//! `cf_api_requests_total` metric. Non-success responses are translated into
//! [`CfError`] before they reach the per-kind adapters. There is no in-process
//! retry: transient errors are returned and the controller requeues.

use super::errors::CfError;
use super::types::{Accepted, Page};
use crate::constants::CF_LIST_PAGE_SIZE;
use crate::metrics;
use reqwest::{header::LOCATION, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An authenticated client for one CF API endpoint.
///
/// Cheap to clone: the underlying `reqwest::Client` is shared.
#[derive(Clone, Debug)]
pub struct CfClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    poll_interval: Duration,
}

/// A raw CF response: status, `Location` header and body text.
#[derive(Debug)]
pub(crate) struct CfResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl CfClient {
    /// Creates a client for `api_url` (e.g. `https://api.sys.example.com`).
    ///
    /// `poll_interval` is the delay between two polls of an async job or build.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        token: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            poll_interval,
        }
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Absolute URL for a path such as `/v3/organizations`. Absolute URLs
    /// (pagination links, job locations) are passed through.
    pub(crate) fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.api_url)
        }
    }

    /// Sends one request and returns the raw response, or the translated error
    /// for non-success statuses.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        what: &str,
    ) -> Result<CfResponse, CfError> {
        let url = self.url(path);

        debug!(method = %method, url = %url, query = ?query, "CF API request");

        let mut request = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_cf_api_request(method.as_str(), 0);
                warn!(method = %method, url = %url, error = %e, "CF API request failed to send");
                return Err(CfError::from(e));
            }
        };

        let status = response.status();
        metrics::record_cf_api_request(method.as_str(), status.as_u16());

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let err = CfError::from_response(status.as_u16(), &text, what);
            if err.is_not_found() {
                debug!(method = %method, url = %url, status = %status, "CF resource not found");
            } else {
                warn!(
                    method = %method,
                    url = %url,
                    status = %status,
                    error = %text,
                    "CF API request failed"
                );
            }
            return Err(err);
        }

        debug!(
            method = %method,
            url = %url,
            status = %status,
            response_len = text.len(),
            "CF API request successful"
        );

        Ok(CfResponse {
            status,
            location,
            body: text,
        })
    }

    fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, CfError> {
        serde_json::from_str(body).map_err(|source| CfError::Decode {
            what: what.to_string(),
            source,
        })
    }

    /// `GET` a single resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, CfError> {
        let response = self
            .send::<()>(Method::GET, path, &[], None, what)
            .await?;
        Self::decode(&response.body, what)
    }

    /// `GET` every page of a list, following `pagination.next.href`.
    pub async fn pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<Vec<Page<T>>, CfError> {
        let mut first_query = query.to_vec();
        first_query.push(("per_page", CF_LIST_PAGE_SIZE.to_string()));

        let response = self
            .send::<()>(Method::GET, path, &first_query, None, what)
            .await?;
        let mut page: Page<T> = Self::decode(&response.body, what)?;
        let mut next = page.pagination.next.take();
        let mut pages = vec![page];

        while let Some(link) = next {
            let response = self
                .send::<()>(Method::GET, &link.href, &[], None, what)
                .await?;
            page = Self::decode(&response.body, what)?;
            next = page.pagination.next.take();
            pages.push(page);
        }

        Ok(pages)
    }

    /// `GET` every resource of a list.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<Vec<T>, CfError> {
        Ok(self
            .pages(path, query, what)
            .await?
            .into_iter()
            .flat_map(|p| p.resources)
            .collect())
    }

    /// Lists and returns the only match. No match is [`CfError::NotFound`],
    /// several matches are [`CfError::Ambiguous`].
    pub async fn single<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, CfError> {
        let mut items: Vec<T> = self.list(path, query, what).await?;
        match items.len() {
            0 => Err(CfError::not_found(what)),
            1 => Ok(items.remove(0)),
            count => Err(CfError::Ambiguous {
                what: what.to_string(),
                count,
            }),
        }
    }

    async fn mutate<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        what: &str,
    ) -> Result<Accepted<T>, CfError> {
        let response = self.send(method, path, &[], body, what).await?;

        let job = if response.status == StatusCode::ACCEPTED {
            response.location.as_deref().and_then(job_guid_from_location)
        } else {
            None
        };
        let resource = if response.body.trim().is_empty() {
            None
        } else {
            Some(Self::decode(&response.body, what)?)
        };

        Ok(Accepted { job, resource })
    }

    /// `POST` a create or action request.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<Accepted<T>, CfError> {
        self.mutate(Method::POST, path, Some(body), what).await
    }

    /// `PATCH` an update request.
    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<Accepted<T>, CfError> {
        self.mutate(Method::PATCH, path, Some(body), what).await
    }

    /// `DELETE` a resource. Returns the job GUID for async deletes.
    pub async fn delete(&self, path: &str, what: &str) -> Result<Option<String>, CfError> {
        let accepted: Accepted<serde_json::Value> =
            self.mutate::<(), _>(Method::DELETE, path, None, what).await?;
        Ok(accepted.job)
    }
}

/// Extracts the job GUID from a `Location: .../v3/jobs/{guid}` header.
#[must_use]
pub fn job_guid_from_location(location: &str) -> Option<String> {
    let (_, guid) = location.trim_end_matches('/').rsplit_once("/jobs/")?;
    let guid = guid.split(['?', '/']).next().unwrap_or_default();
    (!guid.is_empty()).then(|| guid.to_string())
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
