//! Inbound frame handling: parse, admit, append, broadcast.
//!
//! Admission order for chat frames is rate limit → spam gate → append →
//! broadcast, so a rejected duplicate still consumed rate-limit budget.
//! Rejections answer on the sender's own queue and never reach the hub.

use std::sync::Arc;

use tracing::{error, warn};

use proxchat_service::message::{ChatMessage, MessageStore};
use proxchat_service::ratelimit::RateLimiter;
use proxchat_service::spam::SpamDetector;

use crate::client::ClientHandle;
use crate::hub::Hub;
use crate::protocol::{Frame, Inbound};

/// Per-connection ingress pipeline, shared by every reader task.
#[derive(Clone)]
pub struct IngressPipeline {
    hub: Arc<Hub>,
    limiter: Arc<RateLimiter>,
    spam: Arc<SpamDetector>,
    messages: Arc<MessageStore>,
}

impl IngressPipeline {
    pub fn new(
        hub: Arc<Hub>,
        limiter: Arc<RateLimiter>,
        spam: Arc<SpamDetector>,
        messages: Arc<MessageStore>,
    ) -> Self {
        Self {
            hub,
            limiter,
            spam,
            messages,
        }
    }

    /// Handle one raw inbound frame. Malformed JSON and unknown frame
    /// types are dropped silently.
    pub async fn handle_frame(&self, client: &Arc<ClientHandle>, raw: &str) {
        let Ok(inbound) = serde_json::from_str::<Inbound>(raw) else {
            return;
        };

        match inbound {
            Inbound::ChatMessage { content, .. } => {
                self.handle_chat(client, &content).await;
            }
            Inbound::Ping => {
                let _ = client.try_send(Frame::pong_now());
            }
        }
    }

    async fn handle_chat(&self, client: &Arc<ClientHandle>, content: &str) {
        match self.limiter.allow_message(&client.session_id).await {
            Ok(true) => {}
            Ok(false) => {
                client.send_error("Rate limit exceeded", "RATE_LIMIT");
                return;
            }
            Err(e) => {
                warn!(error = %e, session_id = %client.session_id, "rate-limit check failed");
                client.send_error("Failed to send message", "INTERNAL_ERROR");
                return;
            }
        }

        match self.spam.validate(&client.session_id, content).await {
            Ok(None) => {}
            Ok(Some(reason)) => {
                client.send_error(&reason.to_string(), reason.as_code());
                if let Err(e) = self
                    .spam
                    .increment_violation(&client.session_id, reason.violation_kind())
                    .await
                {
                    warn!(error = %e, "failed to record violation");
                }
                // Repeat offenders lose the connection.
                match self.spam.should_ban(&client.session_id).await {
                    Ok(Some(ban_reason)) => {
                        warn!(
                            session_id = %client.session_id,
                            reason = %ban_reason,
                            "disconnecting session over violation threshold"
                        );
                        self.hub.unregister(&client.session_id).await;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "ban check failed"),
                }
                return;
            }
            Err(e) => {
                warn!(error = %e, session_id = %client.session_id, "spam check failed");
                client.send_error("Failed to send message", "INTERNAL_ERROR");
                return;
            }
        }

        let cell = client.cell();
        if cell.is_empty() {
            client.send_error("location not set", "INVALID_FORMAT");
            return;
        }

        let message = ChatMessage::new(
            &client.session_id,
            &client.username(),
            content,
            &cell,
            self.messages.ttl(),
        );

        if let Err(e) = self.messages.append(&message).await {
            error!(error = %e, "failed to store message");
            client.send_error("Failed to send message", "INTERNAL_ERROR");
            return;
        }

        self.hub.broadcast(message).await;
    }
}
