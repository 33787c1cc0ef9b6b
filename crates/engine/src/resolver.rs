//! Destination resolver: the recipient's registered push tokens.

use herald_common::error::AppError;

use crate::store::NotificationStore;

pub struct DestinationResolver;

impl DestinationResolver {
    /// Look up the push tokens for `user_id`.
    ///
    /// An absent user, a null token column and an empty array all yield an
    /// empty list. Blank entries are dropped; every other entry is one
    /// destination, repeats included.
    pub async fn resolve_destinations(
        store: &dyn NotificationStore,
        user_id: &str,
    ) -> Result<Vec<String>, AppError> {
        let row = store
            .user_destinations(user_id)
            .await
            .map_err(|e| AppError::DestinationLookup(e.to_string()))?;

        let tokens = row
            .and_then(|r| r.fcm_token)
            .unwrap_or_default()
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use herald_common::types::{DeliveryPreference, UserDestinations};

    use super::*;

    struct TokensOnly(Result<Option<UserDestinations>, ()>);

    #[async_trait]
    impl NotificationStore for TokensOnly {
        async fn delivery_preference(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<DeliveryPreference>, AppError> {
            unreachable!("resolver never reads preferences")
        }

        async fn user_destinations(&self, _: &str) -> Result<Option<UserDestinations>, AppError> {
            self.0
                .clone()
                .map_err(|_| AppError::Internal("relation \"users\" does not exist".to_string()))
        }
    }

    fn row(tokens: Option<Vec<&str>>) -> TokensOnly {
        TokensOnly(Ok(Some(UserDestinations {
            fcm_token: tokens.map(|t| t.into_iter().map(str::to_string).collect()),
        })))
    }

    #[tokio::test]
    async fn test_tokens_returned_in_order() {
        let store = row(Some(vec!["phone", "tablet"]));
        let tokens = DestinationResolver::resolve_destinations(&store, "u1").await.unwrap();
        assert_eq!(tokens, ["phone", "tablet"]);
    }

    #[tokio::test]
    async fn test_absent_user_is_empty() {
        let store = TokensOnly(Ok(None));
        let tokens = DestinationResolver::resolve_destinations(&store, "u1").await.unwrap();
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_null_and_empty_columns_are_empty() {
        for store in [row(None), row(Some(vec![]))] {
            let tokens = DestinationResolver::resolve_destinations(&store, "u1").await.unwrap();
            assert!(tokens.is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_tokens_dropped() {
        let store = row(Some(vec!["phone", " ", "", "tablet"]));
        let tokens = DestinationResolver::resolve_destinations(&store, "u1").await.unwrap();
        assert_eq!(tokens, ["phone", "tablet"]);
    }

    #[tokio::test]
    async fn test_repeated_tokens_each_kept() {
        let store = row(Some(vec!["a", "a", " b "]));
        let tokens = DestinationResolver::resolve_destinations(&store, "u1").await.unwrap();
        assert_eq!(tokens, ["a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_query_error_is_lookup_failure() {
        let store = TokensOnly(Err(()));
        let err = DestinationResolver::resolve_destinations(&store, "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DestinationLookup(_)));
    }
}
