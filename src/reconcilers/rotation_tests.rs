// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rotation.rs`

#[cfg(test)]
mod tests {
    use crate::cf::CfError;
    use crate::crd::{
        set_external_name, BindingType, RetiredKey, Rotation, ServiceCredentialBinding,
        ServiceCredentialBindingParameters, ServiceCredentialBindingSpec, ServiceInstanceScope,
    };
    use crate::labels::FORCE_ROTATION_ANNOTATION;
    use crate::reconcilers::rotation::{delete_retired_keys, KeyDeleter, Rotator};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ago(hours: i64) -> String {
        (now() - Duration::hours(hours)).to_rfc3339()
    }

    fn binding(rotation: Option<Rotation>) -> ServiceCredentialBinding {
        ServiceCredentialBinding::new(
            "db-key",
            ServiceCredentialBindingSpec {
                for_provider: ServiceCredentialBindingParameters {
                    r#type: BindingType::Key,
                    name: Some("db-key".to_string()),
                    service_instance: ServiceInstanceScope {
                        service_instance: Some("si-1".to_string()),
                        ..ServiceInstanceScope::default()
                    },
                    ..ServiceCredentialBindingParameters::default()
                },
                rotation,
                connection_details_as_json: None,
                resource: Default::default(),
            },
        )
    }

    fn hourly() -> Option<Rotation> {
        Some(Rotation {
            frequency: Some("1h".to_string()),
            ttl: Some("2h".to_string()),
        })
    }

    fn retired(guid: &str, created_at: String) -> RetiredKey {
        RetiredKey {
            guid: guid.to_string(),
            created_at,
        }
    }

    #[derive(Default)]
    struct FakeDeleter {
        failures: HashMap<String, fn() -> CfError>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeDeleter {
        fn failing(guid: &str, error: fn() -> CfError) -> Self {
            Self {
                failures: HashMap::from([(guid.to_string(), error)]),
                ..Self::default()
            }
        }

        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeyDeleter for FakeDeleter {
        async fn delete_key(&self, guid: &str) -> Result<(), CfError> {
            self.deleted.lock().unwrap().push(guid.to_string());
            match self.failures.get(guid) {
                Some(error) => Err(error()),
                None => Ok(()),
            }
        }
    }

    fn transient() -> CfError {
        CfError::Transient {
            detail: "502 bad gateway".to_string(),
        }
    }

    fn gone() -> CfError {
        CfError::not_found("service credential binding")
    }

    #[test]
    fn test_binding_younger_than_frequency_is_kept() {
        let mut cr = binding(hourly());
        let due = Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &ago(0))
            .unwrap();
        assert!(!due);
        assert!(cr.retired_keys().is_empty());
    }

    #[test]
    fn test_binding_older_than_frequency_is_retired() {
        let mut cr = binding(hourly());
        let created_at = ago(2);
        let due = Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &created_at)
            .unwrap();
        assert!(due);
        assert_eq!(cr.retired_keys(), &[retired("scb-old", created_at)]);
    }

    #[test]
    fn test_retiring_twice_records_the_key_once() {
        let mut cr = binding(hourly());
        let rotator = Rotator::new(now());
        rotator.retire_binding(&mut cr, "scb-old", &ago(2)).unwrap();
        rotator.retire_binding(&mut cr, "scb-old", &ago(2)).unwrap();
        assert_eq!(cr.retired_keys().len(), 1);
    }

    #[test]
    fn test_force_annotation_retires_young_binding() {
        let mut cr = binding(hourly());
        cr.metadata.annotations = Some(BTreeMap::from([(
            FORCE_ROTATION_ANNOTATION.to_string(),
            String::new(),
        )]));
        let due = Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &ago(0))
            .unwrap();
        assert!(due);
        assert_eq!(cr.retired_keys()[0].guid, "scb-old");
    }

    #[test]
    fn test_force_annotation_without_rotation_is_ignored() {
        let mut cr = binding(None);
        cr.metadata.annotations = Some(BTreeMap::from([(
            FORCE_ROTATION_ANNOTATION.to_string(),
            String::new(),
        )]));
        let due = Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &ago(0))
            .unwrap();
        assert!(!due);
        assert!(cr.retired_keys().is_empty());
    }

    #[test]
    fn test_app_bindings_never_rotate() {
        let mut cr = binding(hourly());
        cr.spec.for_provider.r#type = BindingType::App;
        cr.metadata.annotations = Some(BTreeMap::from([(
            FORCE_ROTATION_ANNOTATION.to_string(),
            String::new(),
        )]));
        let due = Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &ago(48))
            .unwrap();
        assert!(!due);
        assert!(cr.retired_keys().is_empty());
    }

    #[test]
    fn test_invalid_created_at_is_an_error() {
        let mut cr = binding(hourly());
        assert!(Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", "yesterday")
            .is_err());
    }

    #[test]
    fn test_has_expired_keys() {
        let mut cr = binding(hourly());
        cr.at_provider_mut().retired_keys = vec![retired("a", ago(1))];
        assert!(!Rotator::new(now()).has_expired_keys(&cr).unwrap());

        cr.at_provider_mut().retired_keys.push(retired("b", ago(3)));
        assert!(Rotator::new(now()).has_expired_keys(&cr).unwrap());
    }

    #[test]
    fn test_without_ttl_keys_never_expire() {
        let mut cr = binding(Some(Rotation {
            frequency: Some("1h".to_string()),
            ttl: None,
        }));
        cr.at_provider_mut().retired_keys = vec![retired("a", ago(1000))];
        assert!(!Rotator::new(now()).has_expired_keys(&cr).unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_keys_keeps_young_and_active() {
        let mut cr = binding(hourly());
        set_external_name(&mut cr, "active");
        cr.at_provider_mut().retired_keys = vec![
            retired("young", ago(1)),
            retired("old", ago(3)),
            retired("active", ago(5)),
        ];
        let deleter = FakeDeleter::default();

        Rotator::new(now())
            .delete_expired_keys(&mut cr, &deleter)
            .await
            .unwrap();

        assert_eq!(deleter.deleted(), vec!["old".to_string()]);
        let left: Vec<&str> = cr.retired_keys().iter().map(|k| k.guid.as_str()).collect();
        assert_eq!(left, vec!["young", "active"]);
    }

    #[tokio::test]
    async fn test_delete_expired_keys_treats_not_found_as_deleted() {
        let mut cr = binding(hourly());
        cr.at_provider_mut().retired_keys = vec![retired("old", ago(3))];
        let deleter = FakeDeleter::failing("old", gone);

        Rotator::new(now())
            .delete_expired_keys(&mut cr, &deleter)
            .await
            .unwrap();
        assert!(cr.retired_keys().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_key_and_reports() {
        let mut cr = binding(hourly());
        cr.at_provider_mut().retired_keys = vec![retired("old", ago(3)), retired("older", ago(4))];
        let deleter = FakeDeleter::failing("old", transient);

        let err = Rotator::new(now())
            .delete_expired_keys(&mut cr, &deleter)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("502 bad gateway"));
        assert_eq!(cr.retired_keys(), &[retired("old", ago(3))]);
        assert_eq!(deleter.deleted(), vec!["old".to_string(), "older".to_string()]);
    }

    #[tokio::test]
    async fn test_scheduled_rotation_then_expiry() {
        let mut cr = binding(hourly());
        set_external_name(&mut cr, "scb-old");
        let created_at = ago(2);

        assert!(Rotator::new(now())
            .retire_binding(&mut cr, "scb-old", &created_at)
            .unwrap());
        set_external_name(&mut cr, "scb-new");
        assert_eq!(cr.retired_keys(), &[retired("scb-old", created_at)]);

        let later = Rotator::new(now() + Duration::hours(1));
        assert!(later.has_expired_keys(&cr).unwrap());
        let deleter = FakeDeleter::default();
        later.delete_expired_keys(&mut cr, &deleter).await.unwrap();

        assert_eq!(deleter.deleted(), vec!["scb-old".to_string()]);
        assert!(cr.retired_keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_retired_keys_is_best_effort() {
        let mut cr = binding(hourly());
        cr.at_provider_mut().retired_keys = vec![
            retired("a", ago(0)),
            retired("b", ago(0)),
            retired("c", ago(0)),
        ];
        let deleter = FakeDeleter::failing("b", transient);

        assert!(delete_retired_keys(&mut cr, &deleter).await.is_err());
        assert_eq!(
            deleter.deleted(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(cr.retired_keys(), &[retired("b", ago(0))]);
    }
}
