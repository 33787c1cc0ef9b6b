//! Concurrent delivery of one message to every destination of a recipient.

use futures::future::join_all;

use crate::credential::AccessToken;
use crate::fcm::{DeliveryReport, PushMessage, PushSender};

/// Joined results of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct FanOutSummary {
    pub reports: Vec<DeliveryReport>,
}

impl FanOutSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_success()).count()
    }

    /// Partial success counts as failure.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeliveryReport> {
        self.reports.iter().filter(|r| !r.is_success())
    }
}

/// Send `message` to every destination at once and wait for all of them.
///
/// Every destination gets exactly one attempt; a failing send never cancels
/// the others.
pub async fn send_all(
    sender: &dyn PushSender,
    destinations: &[String],
    access_token: &AccessToken,
    project_id: &str,
    message: &PushMessage,
) -> FanOutSummary {
    let sends = destinations
        .iter()
        .map(|destination| sender.send(destination, access_token, project_id, message));

    FanOutSummary {
        reports: join_all(sends).await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Barrier;

    use super::*;

    /// Fails tokens starting with "bad"; every send waits on a barrier sized to
    /// the destination count, so sequential sending would never finish.
    struct BarrierSender {
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl PushSender for BarrierSender {
        async fn send(
            &self,
            destination: &str,
            _: &AccessToken,
            _: &str,
            _: &PushMessage,
        ) -> DeliveryReport {
            self.barrier.wait().await;
            let status = if destination.starts_with("bad") { 404 } else { 200 };
            DeliveryReport {
                destination: destination.to_string(),
                status: Some(status),
                error: None,
            }
        }
    }

    fn message() -> PushMessage {
        PushMessage {
            title: "t".to_string(),
            body: "b".to_string(),
            image: None,
            kind: "follow".to_string(),
            source_id: None,
        }
    }

    async fn run(destinations: &[&str]) -> FanOutSummary {
        let destinations: Vec<String> = destinations.iter().map(|d| d.to_string()).collect();
        let sender = BarrierSender {
            barrier: Arc::new(Barrier::new(destinations.len())),
        };
        let token = AccessToken::new("ya29", Utc::now());

        tokio::time::timeout(
            Duration::from_secs(5),
            send_all(&sender, &destinations, &token, "p", &message()),
        )
        .await
        .expect("sends were not issued concurrently")
    }

    #[tokio::test]
    async fn test_all_destinations_sent_concurrently() {
        let summary = run(&["a", "b", "c", "d"]).await;
        assert_eq!(summary.total(), 4);
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_partial_failure_is_failure() {
        let summary = run(&["a", "bad-1", "c"]).await;
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert_eq!(summary.failures().next().unwrap().destination, "bad-1");
        // Reports keep destination order
        let order: Vec<_> = summary.reports.iter().map(|r| r.destination.as_str()).collect();
        assert_eq!(order, ["a", "bad-1", "c"]);
    }
}
