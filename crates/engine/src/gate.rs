//! Preference gate: per-conversation delivery opt-out.
//!
//! Only conversation-scoped kinds (`message`, `typing`, `call`) that carry a
//! source conversation are checked; everything else passes without a query.
//! A missing preference row is treated the same as an explicit opt-out.

use herald_common::error::AppError;
use herald_common::types::NotificationKind;

use crate::store::NotificationStore;

/// Gate verdict. A denial is a legitimate skip, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allowed,
    Denied,
}

pub struct PreferenceGate;

impl PreferenceGate {
    /// Decide whether `target_user_id` may be notified about `kind` from `source_id`.
    ///
    /// Query failures surface as `AppError::PreferenceLookup`.
    pub async fn check_permission(
        store: &dyn NotificationStore,
        kind: &NotificationKind,
        source_id: Option<&str>,
        target_user_id: &str,
    ) -> Result<Permission, AppError> {
        let conversation_id = match source_id {
            Some(id) if kind.is_conversation_scoped() => id,
            _ => return Ok(Permission::Allowed),
        };

        let preference = store
            .delivery_preference(conversation_id, target_user_id)
            .await
            .map_err(|e| AppError::PreferenceLookup(e.to_string()))?;

        let permission = match &preference {
            Some(p) if p.notifications_enabled => Permission::Allowed,
            _ => Permission::Denied,
        };

        tracing::debug!(
            conversation_id,
            target_user_id,
            found = preference.is_some(),
            ?permission,
            "Preference checked"
        );

        Ok(permission)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use herald_common::types::{DeliveryPreference, UserDestinations};

    use super::*;

    enum Row {
        Enabled,
        Disabled,
        Missing,
        Broken,
    }

    struct PreferenceOnly {
        row: Row,
        queries: AtomicUsize,
    }

    impl PreferenceOnly {
        fn new(row: Row) -> Self {
            Self {
                row,
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NotificationStore for PreferenceOnly {
        async fn delivery_preference(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<DeliveryPreference>, AppError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            match self.row {
                Row::Enabled => Ok(Some(DeliveryPreference {
                    notifications_enabled: true,
                })),
                Row::Disabled => Ok(Some(DeliveryPreference {
                    notifications_enabled: false,
                })),
                Row::Missing => Ok(None),
                Row::Broken => Err(AppError::Internal("connection reset".to_string())),
            }
        }

        async fn user_destinations(&self, _: &str) -> Result<Option<UserDestinations>, AppError> {
            unreachable!("gate never resolves destinations")
        }
    }

    async fn check(store: &PreferenceOnly, kind: &str, source: Option<&str>) -> Result<Permission, AppError> {
        PreferenceGate::check_permission(store, &NotificationKind::from(kind), source, "user-1").await
    }

    #[tokio::test]
    async fn test_non_conversation_kind_skips_lookup() {
        let store = PreferenceOnly::new(Row::Disabled);
        assert_eq!(check(&store, "follow", Some("conv-1")).await.unwrap(), Permission::Allowed);
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_source_skips_lookup() {
        let store = PreferenceOnly::new(Row::Disabled);
        assert_eq!(check(&store, "message", None).await.unwrap(), Permission::Allowed);
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enabled_preference_allows() {
        let store = PreferenceOnly::new(Row::Enabled);
        assert_eq!(check(&store, "call", Some("conv-1")).await.unwrap(), Permission::Allowed);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_preference_denies() {
        let store = PreferenceOnly::new(Row::Disabled);
        assert_eq!(check(&store, "typing", Some("conv-1")).await.unwrap(), Permission::Denied);
    }

    #[tokio::test]
    async fn test_missing_row_denies() {
        let store = PreferenceOnly::new(Row::Missing);
        assert_eq!(check(&store, "message", Some("conv-1")).await.unwrap(), Permission::Denied);
    }

    #[tokio::test]
    async fn test_query_error_is_lookup_failure() {
        let store = PreferenceOnly::new(Row::Broken);
        let err = check(&store, "message", Some("conv-1")).await.unwrap_err();
        assert!(matches!(err, AppError::PreferenceLookup(_)));
    }
}
