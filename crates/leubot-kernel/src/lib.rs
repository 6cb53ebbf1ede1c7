//! `leubot-kernel` – Session & Safety Rules
//!
//! Pure, synchronous bookkeeping for the arm.  Nothing in this crate performs
//! I/O or owns a thread; the arbitrator in `leubot-runtime` drives every type
//! here from its single actor task.
//!
//! # Modules
//!
//! - [`range_table`] – [`RangeTable`][range_table::RangeTable]: the fixed
//!   per-joint `[min, max]` table every motion command is checked against.
//! - [`lease_manager`] – [`LeaseManager`][lease_manager::LeaseManager]:
//!   holds at most one operator lease and the administrative override token.
//! - [`idle_watchdog`] – [`IdleWatchdog`][idle_watchdog::IdleWatchdog]:
//!   epoch-tagged inactivity deadline so stale timer firings can be told apart
//!   from live ones.
//! - [`lifecycle`] – [`Lifecycle`][lifecycle::Lifecycle]: the
//!   Offline → Ready ⇄ Sleeping state machine.
//! - [`command_gate`] – [`CommandGate`][command_gate::CommandGate]: the single
//!   interception point combining authorization and range validation.

pub mod command_gate;
pub mod idle_watchdog;
pub mod lease_manager;
pub mod lifecycle;
pub mod range_table;

pub use command_gate::{CommandGate, MotionIntent};
pub use idle_watchdog::{IdleWatchdog, WatchdogArm};
pub use lease_manager::{Authorization, GrantKind, LeaseGrant, LeaseManager};
pub use lifecycle::{Lifecycle, Transition};
pub use range_table::{Range, RangeTable};
