use async_trait::async_trait;

/// A pending delivery naming the candidate to advance (§5, §6.3). The core
/// enqueues itself whenever a stage defers work: a snooze expiry, a backoff
/// retry, or simply handing off to the next stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub workspace_id: String,
    pub drift_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub delay_seconds: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(String),
}

/// Outbound delivery queue (§6.3). Out of scope for the core's own logic:
/// exposed only as this narrow enqueue surface, with the actual broker
/// (SQS, Redis streams, Postgres-backed queue) left to the deployment.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn enqueue(
        &self,
        message: QueueMessage,
        options: EnqueueOptions,
    ) -> Result<String, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct InMemoryQueue {
        sent: Mutex<Vec<(QueueMessage, EnqueueOptions)>>,
    }

    #[async_trait]
    impl Queue for InMemoryQueue {
        async fn enqueue(
            &self,
            message: QueueMessage,
            options: EnqueueOptions,
        ) -> Result<String, QueueError> {
            self.sent.lock().unwrap().push((message, options));
            Ok("msg-1".to_string())
        }
    }

    #[tokio::test]
    async fn enqueue_records_the_delay_when_one_is_given() {
        let queue = InMemoryQueue {
            sent: Mutex::new(Vec::new()),
        };
        let message_id = queue
            .enqueue(
                QueueMessage {
                    workspace_id: "ws1".to_string(),
                    drift_id: "drift1".to_string(),
                },
                EnqueueOptions {
                    delay_seconds: Some(300),
                },
            )
            .await
            .unwrap();
        assert_eq!(message_id, "msg-1");
        assert_eq!(queue.sent.lock().unwrap()[0].1.delay_seconds, Some(300));
    }
}
