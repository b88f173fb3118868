use crate::routing::{RoutingDecision, RoutingTarget};
use async_trait::async_trait;

/// Outbound message-posting sink (§6.3). The core knows nothing about
/// delivery semantics beyond "posted" and "can be updated in place" — the
/// concrete transport (Slack, Teams, email digest) lives outside the core.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn post(
        &self,
        channel: &str,
        text: &str,
        blocks: serde_json::Value,
    ) -> Result<PostedMessage, NotifyError>;

    async fn update(
        &self,
        channel_id: &str,
        message_ts: &str,
        text: &str,
        blocks: serde_json::Value,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel_id: String,
    pub message_ts: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(String),
}

/// Resolves a `RoutingDecision` to the channel a notification actually goes
/// to. Direct messages address the owner's Slack DM channel; team-channel
/// and digest routing use the workspace's configured channel names, which
/// the caller supplies since they are workspace configuration, not routing
/// policy.
pub fn target_channel(decision: &RoutingDecision, team_channel: &str, digest_channel: &str) -> String {
    match &decision.target {
        RoutingTarget::DirectMessage { owner_slack_id } => owner_slack_id.clone(),
        RoutingTarget::TeamChannel => team_channel.to_string(),
        RoutingTarget::DigestDelayed => digest_channel.to_string(),
    }
}
