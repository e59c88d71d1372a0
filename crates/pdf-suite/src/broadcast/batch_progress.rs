//! Batch progress broadcaster for streaming job status to subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::batch::BatchStatus;

/// Lifecycle point a progress event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Queued,
    Started,
    ItemCompleted,
    Completed,
    Failed,
}

impl BatchPhase {
    fn status(self) -> BatchStatus {
        match self {
            BatchPhase::Queued => BatchStatus::Queued,
            BatchPhase::Started | BatchPhase::ItemCompleted => BatchStatus::Processing,
            BatchPhase::Completed => BatchStatus::Completed,
            BatchPhase::Failed => BatchStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgressEvent {
    pub batch_id: String,
    pub operation: String,
    pub phase: BatchPhase,
    pub status: BatchStatus,
    pub processed_items: u32,
    pub total_items: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// File reference of the item just finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchProgressEvent {
    pub fn new(
        batch_id: &str,
        operation: &str,
        phase: BatchPhase,
        processed_items: u32,
        total_items: u32,
        message: &str,
    ) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            operation: operation.to_string(),
            phase,
            status: phase.status(),
            processed_items,
            total_items,
            message: message.to_string(),
            timestamp: Utc::now(),
            item: None,
            error: None,
        }
    }

    pub fn with_item(mut self, item: &str) -> Self {
        self.item = Some(item.to_string());
        self
    }

    pub fn failed(
        batch_id: &str,
        operation: &str,
        processed_items: u32,
        total_items: u32,
        error: &str,
    ) -> Self {
        let mut event = Self::new(
            batch_id,
            operation,
            BatchPhase::Failed,
            processed_items,
            total_items,
            "Batch job failed",
        );
        event.error = Some(error.to_string());
        event
    }
}

/// Receives batch lifecycle events from the engine.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: BatchProgressEvent);
}

/// Reporter that drops every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: BatchProgressEvent) {}
}

#[derive(Clone)]
pub struct BatchProgressBroadcaster {
    sender: Arc<broadcast::Sender<BatchProgressEvent>>,
}

impl BatchProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: BatchProgressEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchProgressEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BatchProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressReporter for BatchProgressBroadcaster {
    fn report(&self, event: BatchProgressEvent) {
        self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_status_follows_phase() {
        let event = BatchProgressEvent::new("b1", "compress", BatchPhase::ItemCompleted, 1, 3, "done");
        assert_eq!(event.status, BatchStatus::Processing);

        let failed = BatchProgressEvent::failed("b1", "compress", 1, 3, "boom");
        assert_eq!(failed.status, BatchStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = BatchProgressEvent::new("b1", "ocr", BatchPhase::Queued, 0, 2, "queued")
            .with_item("/files/a.pdf");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["batchId"], "b1");
        assert_eq!(json["processedItems"], 0);
        assert_eq!(json["totalItems"], 2);
        assert_eq!(json["phase"], "queued");
        assert_eq!(json["status"], "Queued");
        assert_eq!(json["item"], "/files/a.pdf");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let broadcaster = BatchProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.report(BatchProgressEvent::new(
            "b1",
            "merge",
            BatchPhase::Completed,
            2,
            2,
            "Batch job completed",
        ));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.batch_id, "b1");
        assert_eq!(event.phase, BatchPhase::Completed);
    }

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = BatchProgressBroadcaster::default();
        broadcaster.send(BatchProgressEvent::new("b1", "merge", BatchPhase::Started, 0, 2, ""));
    }
}
