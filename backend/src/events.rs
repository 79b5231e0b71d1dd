//! Per-process event bus
//!
//! The transport layer publishes domain events here and subscribers pick the
//! topic they care about plus an optional filter predicate. One bus lives in
//! `AppState`; there is no global instance.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// Topic an event is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Session,
    Account,
}

/// Events emitted by the authentication surface. No secrets in payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedUp { user_id: Uuid },
    SignedIn { user_id: Uuid },
    TokensRefreshed { user_id: Uuid },
    LoggedOut { user_id: Uuid },
}

impl AuthEvent {
    pub fn topic(&self) -> Topic {
        match self {
            AuthEvent::SignedUp { .. } => Topic::Account,
            AuthEvent::SignedIn { .. }
            | AuthEvent::TokensRefreshed { .. }
            | AuthEvent::LoggedOut { .. } => Topic::Session,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            AuthEvent::SignedUp { user_id }
            | AuthEvent::SignedIn { user_id }
            | AuthEvent::TokensRefreshed { user_id }
            | AuthEvent::LoggedOut { user_id } => *user_id,
        }
    }
}

type Filter = Box<dyn Fn(&AuthEvent) -> bool + Send + Sync>;

/// Broadcast bus for [`AuthEvent`]s
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: AuthEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to every event on `topic`
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        self.subscribe_filtered(topic, |_| true)
    }

    /// Subscribe to events on `topic` for which `filter` holds
    pub fn subscribe_filtered<F>(&self, topic: Topic, filter: F) -> Subscription
    where
        F: Fn(&AuthEvent) -> bool + Send + Sync + 'static,
    {
        Subscription {
            receiver: self.sender.subscribe(),
            topic,
            filter: Box::new(filter),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A topic subscription; dropping it unsubscribes
pub struct Subscription {
    receiver: broadcast::Receiver<AuthEvent>,
    topic: Topic,
    filter: Filter,
}

impl Subscription {
    /// Next matching event, or `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.topic() == self.topic && (self.filter)(&event) => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, topic = ?self.topic, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.topic() == self.topic && (self.filter)(&event) => {
                    return Some(event)
                }
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, topic = ?self.topic, "Event subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
