//! Broadcast hub: subscription registry and non-blocking fan-out.
//!
//! Registry mutations (register, unregister, subscribe, unsubscribe) take
//! effect synchronously under a shared-exclusive guard, so a subscriber can
//! subscribe the moment `register` returns. Delivery is the actor part: one
//! task drains the broadcast queue and fans each message out.
//!
//! Delivery never blocks on a subscriber: each subscriber has a bounded
//! outbound queue drained by its own writer task, and on overflow the
//! message is dropped for that subscriber only.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics;
use ticker_common::types::StreamMessage;

pub type SubscriberId = Uuid;

#[derive(Default)]
struct Registry {
    /// Connected subscribers and their outbound queues
    clients: HashMap<SubscriberId, mpsc::Sender<StreamMessage>>,
    /// symbol -> subscribers
    symbols: HashMap<String, HashSet<SubscriberId>>,
    /// subscriber -> symbols (dual of `symbols`)
    subscriptions: HashMap<SubscriberId, HashSet<String>>,
}

impl Registry {
    fn remove_client(&mut self, id: &SubscriberId) -> bool {
        if self.clients.remove(id).is_none() {
            return false;
        }
        if let Some(symbols) = self.subscriptions.remove(id) {
            for symbol in symbols {
                if let Some(subscribers) = self.symbols.get_mut(&symbol) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        self.symbols.remove(&symbol);
                    }
                }
            }
        }
        true
    }
}

/// Handle used by producers and the WebSocket layer. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<RwLock<Registry>>,
    messages: mpsc::UnboundedSender<StreamMessage>,
}

/// The hub's delivery loop; run it on its own task.
pub struct HubTask {
    registry: Arc<RwLock<Registry>>,
    messages: mpsc::UnboundedReceiver<StreamMessage>,
}

impl Hub {
    pub fn new() -> (Hub, HubTask) {
        let registry = Arc::new(RwLock::new(Registry::default()));
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Hub {
                registry: registry.clone(),
                messages: tx,
            },
            HubTask {
                registry,
                messages: rx,
            },
        )
    }

    /// Add a subscriber together with its outbound queue. The queue capacity
    /// is the backpressure boundary for this subscriber. Effective
    /// immediately: a subscribe call may follow without waiting.
    pub fn register(&self, id: SubscriberId, sender: mpsc::Sender<StreamMessage>) {
        let mut registry = self.registry.write();
        registry.clients.insert(id, sender);
        registry.subscriptions.entry(id).or_default();
        metrics::ACTIVE_CONNECTIONS.set(registry.clients.len() as i64);
        info!("subscriber {} connected", id);
    }

    /// Remove a subscriber, purge it from every symbol bucket and close its
    /// outbound queue so the writer task exits.
    pub fn unregister(&self, id: SubscriberId) {
        let mut registry = self.registry.write();
        if registry.remove_client(&id) {
            metrics::ACTIVE_CONNECTIONS.set(registry.clients.len() as i64);
            info!("subscriber {} disconnected", id);
        }
    }

    /// Queue a message for delivery to the symbol's subscribers. Returns
    /// immediately; delivery happens on the hub task.
    pub fn broadcast(&self, message: StreamMessage) {
        let _ = self.messages.send(message);
    }

    /// Subscribe a connected subscriber to a symbol. Returns false if the
    /// subscriber is not connected.
    pub fn subscribe(&self, id: SubscriberId, symbol: &str) -> bool {
        let mut registry = self.registry.write();
        if !registry.clients.contains_key(&id) {
            return false;
        }
        registry
            .symbols
            .entry(symbol.to_string())
            .or_default()
            .insert(id);
        registry
            .subscriptions
            .entry(id)
            .or_default()
            .insert(symbol.to_string());
        debug!("subscriber {} subscribed to {}", id, symbol);
        true
    }

    /// Unsubscribe from a symbol; an empty symbol bucket is removed.
    pub fn unsubscribe(&self, id: SubscriberId, symbol: &str) -> bool {
        let mut registry = self.registry.write();
        let removed = registry
            .subscriptions
            .get_mut(&id)
            .map(|symbols| symbols.remove(symbol))
            .unwrap_or(false);
        if let Some(subscribers) = registry.symbols.get_mut(symbol) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                registry.symbols.remove(symbol);
            }
        }
        if removed {
            debug!("subscriber {} unsubscribed from {}", id, symbol);
        }
        removed
    }

    /// Snapshot of the symbols with at least one subscriber. Ordering is
    /// unspecified.
    pub fn list_active_symbols(&self) -> Vec<String> {
        self.registry.read().symbols.keys().cloned().collect()
    }

    /// Number of connected subscribers, subscribed or not.
    pub fn connected_count(&self) -> usize {
        self.registry.read().clients.len()
    }

    /// Whether a subscriber is currently subscribed to a symbol.
    pub fn is_subscribed(&self, id: SubscriberId, symbol: &str) -> bool {
        self.registry
            .read()
            .subscriptions
            .get(&id)
            .map(|symbols| symbols.contains(symbol))
            .unwrap_or(false)
    }
}

impl HubTask {
    /// Serial delivery loop. Exits on shutdown or when every hub handle is
    /// gone.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                message = self.messages.recv() => {
                    match message {
                        Some(message) => self.deliver(message),
                        None => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("broadcast hub shutting down");
                    break;
                }
            }
        }
    }

    fn deliver(&self, message: StreamMessage) {
        let registry = self.registry.read();
        let Some(subscribers) = registry.symbols.get(&message.symbol) else {
            return;
        };
        for id in subscribers {
            let Some(sender) = registry.clients.get(id) else {
                continue;
            };
            match sender.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    metrics::MESSAGES_DROPPED.inc();
                    warn!(
                        "slow subscriber {}, dropping {} message for {}",
                        id,
                        message.kind.as_str(),
                        message.symbol
                    );
                }
                // Queue already closed; the subscriber is being torn down.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
    }
}
