//! `leubot-hal` – Hardware Abstraction Layer
//!
//! The arbitrator never talks to a serial port directly.  It holds a
//! `Box<dyn` [`ArmTransport`]`>` and issues three kinds of command: move to a
//! complete pose, reset into joint mode, and sleep.
//!
//! # Modules
//!
//! - [`transport`] – the [`ArmTransport`] trait and [`TransportError`].
//! - [`armlink`] – [`ArmLinkPacket`][armlink::ArmLinkPacket]: the 17-byte
//!   ArmLink frame understood by the arm's ArbotiX controller.
//! - [`serial`] – [`ArmLinkTransport`][serial::ArmLinkTransport]: writes
//!   ArmLink frames to any async byte sink (a tty device, or
//!   `tokio::io::sink()` for a dry run).
//! - [`sim`] – [`SimArm`][sim::SimArm]: records every command for headless
//!   tests and CI.

pub mod armlink;
pub mod serial;
pub mod sim;
pub mod transport;

pub use armlink::{ArmLinkPacket, Extended};
pub use serial::ArmLinkTransport;
pub use sim::{SimArm, SimArmLog};
pub use transport::{ArmTransport, TransportCommand, TransportError};
