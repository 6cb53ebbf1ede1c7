//! `leubot-middleware` – event routing and outbound notices
//!
//! The arbitrator publishes an [`ArmEvent`][leubot_types::ArmEvent] for every
//! lease change, lifecycle transition and pose dispatch.  Nothing on the
//! command path waits for a subscriber.
//!
//! # Modules
//!
//! - [`bus`] – broadcast event bus shared by the arbitrator, the relay and the cockpit stream.
//! - [`relay`] – [`NotificationRelay`]: turns bus events into
//!   [`Notice`]s and fans them out to every configured [`Notifier`].
//! - [`slack`] – chat notices through an incoming-webhook URL.
//! - [`light`] – ambient status light toggled through an external CLI.

pub mod bus;
pub mod light;
pub mod relay;
pub mod slack;

pub use bus::EventBus;
pub use light::LightSwitch;
pub use relay::{Notice, NotificationRelay, Notifier, NotifyError};
pub use slack::SlackWebhook;
