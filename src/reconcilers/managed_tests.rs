// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `managed.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{
        external_name, set_external_name, ManagementPolicy, Organization,
        OrganizationParameters, OrganizationSpec, ResourceSpec,
    };
    use crate::reconcilers::managed::{
        delete_external, sync_external, ExternalClient, ExternalObservation,
    };
    use crate::reconcilers::status::ready_reason;
    use crate::secrets::ConnectionDetails;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeExternal {
        observation: ExternalObservation,
        late_init: bool,
        fail_create: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeExternal {
        fn new(observation: ExternalObservation) -> Self {
            Self {
                observation,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ExternalClient<Organization> for FakeExternal {
        async fn observe(&self, cr: &mut Organization) -> Result<ExternalObservation> {
            self.record("observe");
            if self.late_init {
                set_external_name(cr, "org-1");
                cr.spec.for_provider.suspended = Some(true);
            }
            Ok(self.observation.clone())
        }

        async fn create(&self, cr: &mut Organization) -> Result<()> {
            self.record("create");
            if self.fail_create {
                bail!("quota exceeded");
            }
            set_external_name(cr, "org-new");
            Ok(())
        }

        async fn update(&self, _cr: &mut Organization) -> Result<()> {
            self.record("update");
            Ok(())
        }

        async fn delete(&self, _cr: &mut Organization) -> Result<()> {
            self.record("delete");
            Ok(())
        }
    }

    fn org(policies: Vec<ManagementPolicy>) -> Organization {
        Organization::new(
            "acme",
            OrganizationSpec {
                for_provider: OrganizationParameters {
                    name: "acme".to_string(),
                    suspended: None,
                },
                resource: ResourceSpec {
                    management_policies: policies,
                    ..ResourceSpec::default()
                },
            },
        )
    }

    #[tokio::test]
    async fn test_absent_resource_is_created() {
        let external = FakeExternal::new(ExternalObservation::absent());
        let mut cr = org(vec![ManagementPolicy::All]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(synced.created);
        assert_eq!(external.calls(), vec!["observe", "create"]);
        assert_eq!(external_name(&cr), Some("org-new"));
        assert_eq!(ready_reason(&cr), Some("Creating"));
    }

    #[tokio::test]
    async fn test_create_failure_keeps_creating_condition() {
        let external = FakeExternal {
            observation: ExternalObservation::absent(),
            fail_create: true,
            ..FakeExternal::default()
        };
        let mut cr = org(vec![ManagementPolicy::All]);

        let err = sync_external(&mut cr, &external).await.unwrap_err();

        assert!(format!("{err:#}").contains("quota exceeded"));
        assert_eq!(ready_reason(&cr), Some("Creating"));
    }

    #[tokio::test]
    async fn test_up_to_date_resource_is_left_alone() {
        let external = FakeExternal::new(ExternalObservation::present(true));
        let mut cr = org(vec![ManagementPolicy::All]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(!synced.created && !synced.updated);
        assert_eq!(external.calls(), vec!["observe"]);
    }

    #[tokio::test]
    async fn test_drift_triggers_update() {
        let external = FakeExternal::new(ExternalObservation::present(false));
        let mut cr = org(vec![ManagementPolicy::All]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(synced.updated);
        assert_eq!(external.calls(), vec!["observe", "update"]);
    }

    #[tokio::test]
    async fn test_drift_without_update_policy_is_ignored() {
        let external = FakeExternal::new(ExternalObservation::present(false));
        let mut cr = org(vec![ManagementPolicy::Observe, ManagementPolicy::Create]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(!synced.updated);
        assert_eq!(external.calls(), vec!["observe"]);
    }

    #[tokio::test]
    async fn test_observe_only_missing_resource_is_an_error() {
        let external = FakeExternal::new(ExternalObservation::absent());
        let mut cr = org(vec![ManagementPolicy::Observe]);

        let err = sync_external(&mut cr, &external).await.unwrap_err();

        assert!(err.to_string().contains("does not exist"));
        assert_eq!(external.calls(), vec!["observe"]);
    }

    #[tokio::test]
    async fn test_create_skipped_without_create_policy() {
        let external = FakeExternal::new(ExternalObservation::absent());
        let mut cr = org(vec![ManagementPolicy::Observe, ManagementPolicy::Delete]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert!(!synced.created);
        assert_eq!(external.calls(), vec!["observe"]);
    }

    #[tokio::test]
    async fn test_late_initialization_reverted_without_policy() {
        let external = FakeExternal {
            observation: ExternalObservation::present(true).late_initialized(true),
            late_init: true,
            ..FakeExternal::default()
        };
        let mut cr = org(vec![
            ManagementPolicy::Observe,
            ManagementPolicy::Create,
            ManagementPolicy::Update,
            ManagementPolicy::Delete,
        ]);

        sync_external(&mut cr, &external).await.unwrap();

        assert_eq!(cr.spec.for_provider.suspended, None);
        assert_eq!(external_name(&cr), Some("org-1"));
    }

    #[tokio::test]
    async fn test_late_initialization_kept_with_policy() {
        let external = FakeExternal {
            observation: ExternalObservation::present(true).late_initialized(true),
            late_init: true,
            ..FakeExternal::default()
        };
        let mut cr = org(vec![ManagementPolicy::All]);

        sync_external(&mut cr, &external).await.unwrap();

        assert_eq!(cr.spec.for_provider.suspended, Some(true));
    }

    #[tokio::test]
    async fn test_connection_details_are_returned() {
        let details = ConnectionDetails::from([("password".to_string(), b"s3cret".to_vec())]);
        let external = FakeExternal::new(
            ExternalObservation::present(true).with_connection_details(details.clone()),
        );
        let mut cr = org(vec![ManagementPolicy::All]);

        let synced = sync_external(&mut cr, &external).await.unwrap();

        assert_eq!(synced.connection_details, Some(details));
    }

    #[tokio::test]
    async fn test_delete_existing_resource() {
        let external = FakeExternal::new(ExternalObservation::present(true));
        let mut cr = org(vec![ManagementPolicy::All]);

        let gone = delete_external(&mut cr, &external).await.unwrap();

        assert!(!gone);
        assert_eq!(external.calls(), vec!["observe", "delete"]);
        assert_eq!(ready_reason(&cr), Some("Deleting"));
    }

    #[tokio::test]
    async fn test_delete_missing_resource_is_done() {
        let external = FakeExternal::new(ExternalObservation::absent());
        let mut cr = org(vec![ManagementPolicy::All]);

        assert!(delete_external(&mut cr, &external).await.unwrap());
        assert_eq!(external.calls(), vec!["observe"]);
    }
}
