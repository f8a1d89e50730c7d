//! Domain event bus
//!
//! Handlers emit an event after each state change commits. The binary
//! attaches a logging listener; tests subscribe directly.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Events emitted by API handlers
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    UserRegistered {
        user_id: String,
    },
    RankingCreated {
        id: String,
        author_id: String,
    },
    RankingPublished {
        id: String,
        author_id: String,
    },
    RankingRejected {
        id: String,
        reviewer_id: String,
    },
    RankingDeleted {
        id: String,
    },
    RankingLikeToggled {
        ranking_id: String,
        user_id: String,
        liked: bool,
    },
    CommentPosted {
        id: String,
        ranking_id: String,
        author_id: String,
    },
    MvpSelected {
        comment_id: String,
        ranking_id: String,
    },
    SubscriptionToggled {
        subscriber_id: String,
        target_id: String,
        subscribed: bool,
    },
    Recharged {
        user_id: String,
        coins: i64,
        exp_gained: u64,
        new_level: u32,
        level_up: bool,
    },
    ItemPurchased {
        user_id: String,
        item_id: String,
        quantity: i64,
        cost: i64,
    },
    VipPurchased {
        user_id: String,
        plan: String,
    },
    DebateCreated {
        id: String,
        creator_id: String,
        reward: i64,
    },
    DebateEnded {
        id: String,
        winner_id: Option<String>,
    },
    TaskRewardClaimed {
        user_id: String,
        task_id: String,
        reward: i64,
    },
    AchievementUnlocked {
        user_id: String,
        achievement_id: String,
        reward: i64,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &BattleEvent);
}

/// Broadcast channel for domain events
pub struct EventBus {
    sender: broadcast::Sender<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: BattleEvent) {
        trace!(event = ?event, "Emitting event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BattleEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes economy events at info and the rest at debug
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &BattleEvent) {
        match event {
            BattleEvent::Recharged {
                user_id,
                coins,
                new_level,
                level_up,
                ..
            } => {
                info!(user = %user_id, coins, level = new_level, level_up, "Wallet recharged");
            }
            BattleEvent::ItemPurchased {
                user_id,
                item_id,
                cost,
                ..
            } => {
                info!(user = %user_id, item = %item_id, cost, "Item purchased");
            }
            BattleEvent::DebateEnded { id, winner_id } => {
                info!(debate = %id, winner = ?winner_id, "Debate ended");
            }
            BattleEvent::RankingPublished { id, author_id } => {
                debug!(ranking = %id, author = %author_id, "Ranking published");
            }
            _ => {
                debug!(event = ?event, "Event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(BattleEvent::RankingPublished {
            id: "r1".into(),
            author_id: "u1".into(),
        });

        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            BattleEvent::RankingPublished {
                id: "r1".into(),
                author_id: "u1".into()
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::with_capacity(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(BattleEvent::RankingDeleted { id: "gone".into() });
    }
}
