// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! JSON shapes shared by every CF v3 resource.

use crate::crd::CfMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// `{"guid": "..."}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidRef {
    pub guid: String,
}

/// A to-one relationship: `{"data": {"guid": "..."}}`. `data` is null when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToOne {
    #[serde(default)]
    pub data: Option<GuidRef>,
}

impl ToOne {
    #[must_use]
    pub fn to(guid: &str) -> Self {
        Self {
            data: Some(GuidRef {
                guid: guid.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.guid.as_str())
    }
}

/// A to-many relationship: `{"data": [{"guid": "..."}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToMany {
    #[serde(default)]
    pub data: Vec<GuidRef>,
}

impl ToMany {
    #[must_use]
    pub fn of<S: AsRef<str>>(guids: &[S]) -> Self {
        Self {
            data: guids
                .iter()
                .map(|g| GuidRef {
                    guid: g.as_ref().to_string(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn guids(&self) -> Vec<String> {
        self.data.iter().map(|d| d.guid.clone()).collect()
    }
}

/// CF resource metadata. Label and annotation values are always strings on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub labels: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub annotations: BTreeMap<String, Option<String>>,
}

impl Metadata {
    /// Whether every desired label and annotation is present with the desired value.
    /// Keys set on the CF side but absent from `desired` are ignored.
    #[must_use]
    pub fn satisfies(&self, desired: &CfMetadata) -> bool {
        let contains = |observed: &BTreeMap<String, Option<String>>,
                        wanted: &Option<BTreeMap<String, String>>| {
            wanted.as_ref().is_none_or(|w| {
                w.iter()
                    .all(|(k, v)| observed.get(k).and_then(Option::as_deref) == Some(v.as_str()))
            })
        };
        contains(&self.labels, &desired.labels) && contains(&self.annotations, &desired.annotations)
    }
}

/// Request body fragment `{"metadata": {"labels": ..., "annotations": ...}}`.
#[must_use]
pub fn metadata_body(metadata: &CfMetadata) -> Value {
    json!({
        "metadata": {
            "labels": metadata.labels.clone().unwrap_or_default(),
            "annotations": metadata.annotations.clone().unwrap_or_default(),
        }
    })
}

/// A link object: `{"href": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub next: Option<Link>,
}

/// One page of a CF list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
    /// Side-loaded resources requested with `include=`.
    #[serde(default)]
    pub included: Option<Value>,
}

/// Result of a mutating call that may be asynchronous.
///
/// CF answers an async operation with `202 Accepted` and a `Location` header
/// pointing at `/v3/jobs/{guid}`; synchronous operations return the resource.
#[derive(Debug, Clone)]
pub struct Accepted<T> {
    pub job: Option<String>,
    pub resource: Option<T>,
}

impl<T> Accepted<T> {
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.job.is_some()
    }
}
