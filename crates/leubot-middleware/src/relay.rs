//! [`NotificationRelay`] – best-effort outbound notices.
//!
//! The relay runs as its own task, subscribed to the [`EventBus`].  Each
//! event maps to zero or more [`Notice`]s which are handed to every
//! [`Notifier`] in turn.  A notifier failure is logged and dropped; it never
//! reaches the arbitrator and never stops the relay.
//!
//! | Event | Notice |
//! |---|---|
//! | lease granted | chat: "started using" |
//! | lease released | chat: "stopped using" |
//! | lease expired | chat: "inactive for N seconds" |
//! | lifecycle → Ready | light on |
//! | lifecycle → Sleeping | light off |

use std::sync::Arc;

use async_trait::async_trait;
use leubot_types::{ArmEvent, EventPayload, LifecycleState};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::EventBus;

/// Something worth telling the people around the arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A line of text for the team chat.
    Chat(String),
    /// Switch the status light on (`true`) or off.
    Light(bool),
}

impl Notice {
    /// Notices triggered by `payload`, in delivery order.
    pub fn for_event(payload: &EventPayload) -> Vec<Notice> {
        match payload {
            EventPayload::LeaseGranted(who) => vec![Notice::Chat(format!(
                "<!here> User {} ({}) started using Leubot.",
                who.name, who.email
            ))],
            EventPayload::LeaseReleased(who) => vec![Notice::Chat(format!(
                "<!here> User {} ({}) stopped using Leubot.",
                who.name, who.email
            ))],
            EventPayload::LeaseExpired { holder, idle_secs } => vec![Notice::Chat(format!(
                "<!here> User {} ({}) was inactive for {} seconds, releasing Leubot.",
                holder.name, holder.email, idle_secs
            ))],
            EventPayload::LifecycleChanged {
                to: LifecycleState::Ready,
                ..
            } => vec![Notice::Light(true)],
            EventPayload::LifecycleChanged {
                to: LifecycleState::Sleeping,
                ..
            } => vec![Notice::Light(false)],
            EventPayload::LeaseReissued(_)
            | EventPayload::LifecycleChanged { .. }
            | EventPayload::PoseDispatched { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(u16),

    #[error("could not run command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("command exited with {0}")]
    Exit(String),
}

/// Anything that can deliver a [`Notice`].
///
/// A notifier ignores notices it does not handle and returns `Ok(())`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs, e.g. `"slack"`.
    fn name(&self) -> &str;

    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}

#[derive(Default, Clone)]
pub struct NotificationRelay {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifiers.push(Arc::new(notifier));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver every notice for `event`.  Failures are logged, not returned.
    pub async fn handle(&self, event: &ArmEvent) {
        for notice in Notice::for_event(&event.payload) {
            for notifier in &self.notifiers {
                match notifier.notify(&notice).await {
                    Ok(()) => debug!(notifier = notifier.name(), ?notice, "notice delivered"),
                    Err(e) => warn!(notifier = notifier.name(), ?notice, error = %e, "notice dropped"),
                }
            }
        }
    }

    /// Run the relay until the bus closes.
    pub fn spawn(self, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            info!(notifiers = self.notifiers.len(), "notification relay started");
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle(&event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged_by = n, "notification relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            info!("notification relay stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leubot_types::IdentityInfo;
    use std::sync::Mutex;

    fn ada() -> IdentityInfo {
        IdentityInfo {
            name: "Ada".into(),
            email: "ada@example.org".into(),
        }
    }

    #[derive(Default, Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<Notice>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(notice.clone());
            if self.fail {
                return Err(NotifyError::Status(500));
            }
            Ok(())
        }
    }

    #[test]
    fn lease_events_map_to_chat_lines() {
        assert_eq!(
            Notice::for_event(&EventPayload::LeaseGranted(ada())),
            vec![Notice::Chat(
                "<!here> User Ada (ada@example.org) started using Leubot.".into()
            )]
        );
        assert_eq!(
            Notice::for_event(&EventPayload::LeaseExpired {
                holder: ada(),
                idle_secs: 900
            }),
            vec![Notice::Chat(
                "<!here> User Ada (ada@example.org) was inactive for 900 seconds, releasing Leubot."
                    .into()
            )]
        );
        assert!(Notice::for_event(&EventPayload::LeaseReissued(ada())).is_empty());
    }

    #[test]
    fn lifecycle_events_map_to_light() {
        let wake = EventPayload::LifecycleChanged {
            from: LifecycleState::Sleeping,
            to: LifecycleState::Ready,
        };
        let sleep = EventPayload::LifecycleChanged {
            from: LifecycleState::Ready,
            to: LifecycleState::Sleeping,
        };
        assert_eq!(Notice::for_event(&wake), vec![Notice::Light(true)]);
        assert_eq!(Notice::for_event(&sleep), vec![Notice::Light(false)]);
    }

    #[tokio::test]
    async fn failing_notifier_does_not_block_others() {
        let broken = Recorder {
            fail: true,
            ..Default::default()
        };
        let good = Recorder::default();
        let relay = NotificationRelay::new()
            .with_notifier(broken.clone())
            .with_notifier(good.clone());

        relay
            .handle(&ArmEvent::new("test", EventPayload::LeaseReleased(ada())))
            .await;

        assert_eq!(broken.seen.lock().unwrap().len(), 1);
        assert_eq!(
            *good.seen.lock().unwrap(),
            vec![Notice::Chat(
                "<!here> User Ada (ada@example.org) stopped using Leubot.".into()
            )]
        );
    }

    #[tokio::test]
    async fn spawned_relay_drains_bus_until_closed() {
        let bus = EventBus::default();
        let recorder = Recorder::default();
        let task = NotificationRelay::new()
            .with_notifier(recorder.clone())
            .spawn(&bus);

        bus.publish(ArmEvent::new("test", EventPayload::LeaseGranted(ada())));
        bus.publish(ArmEvent::new(
            "test",
            EventPayload::LifecycleChanged {
                from: LifecycleState::Offline,
                to: LifecycleState::Ready,
            },
        ));
        drop(bus);
        task.await.unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Notice::Light(true));
    }
}
