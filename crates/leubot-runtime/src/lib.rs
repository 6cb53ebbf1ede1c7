//! `leubot-runtime` – the command arbitrator
//!
//! Runs the single actor that owns all mutable arm state and gives the rest
//! of the process a cheap handle to talk to it.
//!
//! # Modules
//!
//! - [`arbitrator`] – [`Arbitrator`]: mailbox loop, validate/authorize/apply
//!   pipeline, idle timer injection and bounded transport dispatch.
//! - [`handle`] – [`ArmHandle`]: submit a request, await its reply.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Kernel gating
//!
//! Every mutating request passes through
//! [`CommandGate::authorize_and_verify`] inside the arbitrator before any
//! state changes or any byte reaches the transport.

pub mod arbitrator;
pub mod handle;
pub mod telemetry;

pub use arbitrator::{Arbitrator, ArbitratorConfig};
pub use handle::ArmHandle;
pub use telemetry::{TracerProviderGuard, init_tracing};

pub use leubot_kernel::CommandGate;
