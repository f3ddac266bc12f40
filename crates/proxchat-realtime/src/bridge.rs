//! Cross-node pub/sub bridge.
//!
//! Every node publishes accepted chat frames on `chat:{cell}`; this
//! task subscribes to `chat:*` and replays sibling-node frames into the
//! local fan-out path. Envelopes published by this node are skipped:
//! the hub already delivered those locally.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use proxchat_core::traits::store::KvStore;
use proxchat_store::{keys, StoreManager};

use crate::hub::Hub;
use crate::protocol::BrokerEnvelope;

/// Broker-to-hub relay for one process.
pub struct PubSubBridge {
    hub: Arc<Hub>,
    store: Arc<StoreManager>,
    shutdown: CancellationToken,
}

impl PubSubBridge {
    pub fn new(hub: Arc<Hub>, store: Arc<StoreManager>, shutdown: CancellationToken) -> Self {
        Self {
            hub,
            store,
            shutdown,
        }
    }

    /// Run the relay until shutdown or the subscription ends.
    pub async fn run(self) {
        let mut rx = match self.store.subscribe(&keys::chat_pattern()).await {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "failed to subscribe to chat channels");
                return;
            }
        };

        info!("pub/sub bridge started");
        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Some(msg) => {
                            let envelope: BrokerEnvelope =
                                match serde_json::from_str(&msg.payload) {
                                    Ok(env) => env,
                                    Err(e) => {
                                        warn!(error = %e, channel = %msg.channel,
                                            "dropping malformed broker envelope");
                                        continue;
                                    }
                                };

                            if envelope.origin == self.hub.node_id() {
                                continue;
                            }

                            debug!(
                                cell = %envelope.message.cell,
                                origin = %envelope.origin,
                                "relaying sibling-node frame"
                            );
                            self.hub.deliver_remote(envelope.message).await;
                        }
                        None => {
                            warn!("pub/sub stream ended");
                            return;
                        }
                    }
                }
                _ = self.shutdown.cancelled() => {
                    info!("pub/sub bridge stopped");
                    return;
                }
            }
        }
    }
}
