//! Headless publish/subscribe bus for [`ArmEvent`]s.
//!
//! Uses [`tokio::sync::broadcast`] under the hood so that every subscriber
//! receives every event without any single subscriber blocking the
//! publisher.  A slow subscriber loses the oldest events and is told how
//! many it missed.

use leubot_types::ArmEvent;
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ArmEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `event` to every current subscriber.
    ///
    /// Returns the number of subscribers that were handed the event; `0`
    /// when nobody is listening, which is a normal condition.
    pub fn publish(&self, event: ArmEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> broadcast::Receiver<ArmEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leubot_types::{EventPayload, IdentityInfo, Pose};

    fn lease_event() -> ArmEvent {
        ArmEvent::new(
            "test",
            EventPayload::LeaseGranted(IdentityInfo {
                name: "Ada".into(),
                email: "ada@example.org".into(),
            }),
        )
    }

    fn motion_event() -> ArmEvent {
        ArmEvent::new(
            "test",
            EventPayload::PoseDispatched {
                pose: Pose::HOME,
                delta: 128,
            },
        )
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = lease_event();
        assert_eq!(bus.publish(event.clone()), 1);

        let received = rx.recv().await?;
        assert_eq!(received.id, event.id);
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(lease_event()), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = motion_event();
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(rx1.recv().await?.id, event.id);
        assert_eq!(rx2.recv().await?.id, event.id);
        Ok(())
    }
}
