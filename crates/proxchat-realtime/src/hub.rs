//! The connection hub.
//!
//! A single event-loop task owns every mutation of the client registry;
//! readers take the shared lock. Fan-out never waits on a slow
//! consumer: a full outbound queue evicts the connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use proxchat_core::traits::store::KvStore;
use proxchat_geo::neighbors;
use proxchat_service::message::ChatMessage;
use proxchat_store::{keys, StoreManager};

use crate::client::ClientHandle;
use crate::protocol::{BrokerEnvelope, Frame};

/// Buffer sizes for the hub's command channels.
const REGISTER_BUFFER: usize = 10;
const BROADCAST_BUFFER: usize = 256;

/// A message headed for fan-out. `publish` is false for frames arriving
/// from sibling nodes, which were already published once.
#[derive(Debug)]
struct HubBroadcast {
    message: ChatMessage,
    publish: bool,
}

/// Whether a client bound to `client_cell` should see traffic from
/// `message_cell`: the same cell or one of its 8 neighbors.
pub fn should_receive(client_cell: &str, message_cell: &str) -> bool {
    if client_cell.is_empty() || message_cell.is_empty() {
        return false;
    }
    client_cell == message_cell
        || neighbors(message_cell).iter().any(|n| n == client_cell)
}

/// Shared half of the hub: the registry plus command-channel senders.
#[derive(Debug)]
pub struct Hub {
    clients: RwLock<HashMap<String, Arc<ClientHandle>>>,
    register_tx: mpsc::Sender<Arc<ClientHandle>>,
    unregister_tx: mpsc::Sender<String>,
    broadcast_tx: mpsc::Sender<HubBroadcast>,
    delivered: AtomicU64,
    node_id: String,
    store: Arc<StoreManager>,
}

impl Hub {
    /// Create the hub and its event loop. The loop must be spawned by
    /// the caller; it is the sole writer of the registry.
    pub fn new(store: Arc<StoreManager>, shutdown: CancellationToken) -> (Arc<Hub>, HubLoop) {
        let (register_tx, register_rx) = mpsc::channel(REGISTER_BUFFER);
        let (unregister_tx, unregister_rx) = mpsc::channel(REGISTER_BUFFER);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_BUFFER);

        let hub = Arc::new(Hub {
            clients: RwLock::new(HashMap::new()),
            register_tx,
            unregister_tx,
            broadcast_tx,
            delivered: AtomicU64::new(0),
            node_id: Uuid::new_v4().to_string(),
            store,
        });

        let hub_loop = HubLoop {
            hub: hub.clone(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            shutdown,
        };

        (hub, hub_loop)
    }

    /// This node's identity on the broker channels.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Hand a new connection to the event loop.
    pub async fn register(&self, client: Arc<ClientHandle>) {
        if self.register_tx.send(client).await.is_err() {
            warn!("hub loop gone, dropping register");
        }
    }

    /// Ask the event loop to drop a connection.
    pub async fn unregister(&self, session_id: &str) {
        if self.unregister_tx.send(session_id.to_string()).await.is_err() {
            warn!("hub loop gone, dropping unregister");
        }
    }

    /// Submit an accepted chat message for publish + local fan-out.
    pub async fn broadcast(&self, message: ChatMessage) {
        let cmd = HubBroadcast {
            message,
            publish: true,
        };
        if self.broadcast_tx.send(cmd).await.is_err() {
            warn!("hub loop gone, dropping broadcast");
        }
    }

    /// Deliver a frame received from a sibling node: local fan-out only.
    pub async fn deliver_remote(&self, message: ChatMessage) {
        let cmd = HubBroadcast {
            message,
            publish: false,
        };
        if self.broadcast_tx.send(cmd).await.is_err() {
            warn!("hub loop gone, dropping remote frame");
        }
    }

    /// Look up a live connection by session id.
    pub fn client(&self, session_id: &str) -> Option<Arc<ClientHandle>> {
        self.clients.read().get(session_id).cloned()
    }

    /// Number of locally connected clients.
    pub fn user_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Total frame copies delivered to local queues.
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

/// The exclusive-writer half of the hub. Consumes command channels
/// until shutdown; one bad connection never blocks the loop.
pub struct HubLoop {
    hub: Arc<Hub>,
    register_rx: mpsc::Receiver<Arc<ClientHandle>>,
    unregister_rx: mpsc::Receiver<String>,
    broadcast_rx: mpsc::Receiver<HubBroadcast>,
    shutdown: CancellationToken,
}

impl HubLoop {
    /// Run the serialization loop until shutdown.
    pub async fn run(mut self) {
        info!(node_id = %self.hub.node_id, "hub started");
        loop {
            tokio::select! {
                Some(client) = self.register_rx.recv() => {
                    self.handle_register(client).await;
                }
                Some(session_id) = self.unregister_rx.recv() => {
                    self.handle_unregister(&session_id).await;
                }
                Some(broadcast) = self.broadcast_rx.recv() => {
                    self.handle_broadcast(broadcast).await;
                }
                _ = self.shutdown.cancelled() => {
                    self.drain();
                    info!("hub stopped");
                    return;
                }
            }
        }
    }

    async fn handle_register(&mut self, client: Arc<ClientHandle>) {
        let user_count = {
            let mut clients = self.hub.clients.write();
            clients.insert(client.session_id.clone(), client.clone());
            clients.len()
        };

        if let Err(e) = self
            .hub
            .store
            .sadd(&keys::ws_active(), &client.session_id)
            .await
        {
            warn!(error = %e, "failed to track connection in active set");
        }

        // Tell nearby peers someone arrived.
        let notice = Frame::UserJoined {
            username: client.username(),
            user_count,
        };
        let peers: Vec<Arc<ClientHandle>> = {
            let clients = self.hub.clients.read();
            clients
                .values()
                .filter(|c| {
                    c.session_id != client.session_id
                        && should_receive(&c.cell(), &client.cell())
                })
                .cloned()
                .collect()
        };
        for peer in peers {
            let _ = peer.try_send(notice.clone());
        }

        info!(
            session_id = %client.session_id,
            cell = %client.cell(),
            user_count,
            "connection registered"
        );
    }

    async fn handle_unregister(&mut self, session_id: &str) {
        let removed = self.hub.clients.write().remove(session_id);
        let Some(client) = removed else {
            return;
        };

        client.close();

        if let Err(e) = self.hub.store.srem(&keys::ws_active(), session_id).await {
            warn!(error = %e, "failed to remove connection from active set");
        }

        let (user_count, peers) = {
            let clients = self.hub.clients.read();
            (
                clients.len(),
                clients.values().cloned().collect::<Vec<_>>(),
            )
        };
        let notice = Frame::UserLeft {
            username: client.username(),
            user_count,
        };
        for peer in peers {
            let _ = peer.try_send(notice.clone());
        }

        info!(session_id, user_count, "connection unregistered");
    }

    async fn handle_broadcast(&mut self, broadcast: HubBroadcast) {
        let message = broadcast.message;

        if broadcast.publish {
            match serde_json::to_string(&BrokerEnvelope {
                origin: self.hub.node_id.clone(),
                message: message.clone(),
            }) {
                Ok(payload) => {
                    let channel = keys::chat_channel(&message.cell);
                    if let Err(e) = self.hub.store.publish(&channel, &payload).await {
                        warn!(error = %e, channel, "broker publish failed");
                    }
                }
                Err(e) => error!(error = %e, "failed to serialize broker envelope"),
            }
        }

        // Candidate cells: the message's cell plus its Moore
        // neighborhood. Hub membership bounds the blast radius.
        let mut allowed = neighbors(&message.cell);
        allowed.push(message.cell.clone());

        let frame = Frame::chat(&message);
        let targets: Vec<Arc<ClientHandle>> = {
            let clients = self.hub.clients.read();
            clients
                .values()
                .filter(|c| {
                    let cell = c.cell();
                    !cell.is_empty() && allowed.contains(&cell)
                })
                .cloned()
                .collect()
        };

        let mut delivered = 0u64;
        let mut evicted = Vec::new();
        for target in targets {
            match target.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session_id = %target.session_id,
                        "outbound queue full, evicting wedged client"
                    );
                    evicted.push(target.session_id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    evicted.push(target.session_id.clone());
                }
            }
        }

        self.hub.delivered.fetch_add(delivered, Ordering::Relaxed);
        debug!(cell = %message.cell, delivered, "message fanned out");

        for session_id in evicted {
            self.handle_unregister(&session_id).await;
        }
    }

    /// Close every queue so writers terminate, and empty the registry.
    fn drain(&mut self) {
        let mut clients = self.hub.clients.write();
        for client in clients.values() {
            client.close();
        }
        clients.clear();
    }
}
