//! In-process simulated arm for CI/CD testing without physical hardware.
//!
//! [`SimArm`] accepts every command and appends it to a shared
//! [`SimArmLog`] the test keeps hold of after the transport has been boxed
//! and handed to the arbitrator.  It can also be told to stall or fail so
//! dispatch timeouts and transport errors can be exercised.
//!
//! # Example
//!
//! ```rust
//! use leubot_hal::{ArmTransport, SimArm, TransportCommand};
//! use leubot_types::Pose;
//!
//! # tokio_test_block_on(async {
//! let (mut arm, log) = SimArm::new();
//! arm.send_pose(&Pose::HOME, 128).await.unwrap();
//! assert_eq!(
//!     log.commands(),
//!     vec![TransportCommand::Pose { pose: Pose::HOME, delta: 128 }]
//! );
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use leubot_types::Pose;
use tracing::debug;

use crate::transport::{ArmTransport, TransportCommand, TransportError};

/// Shared, clonable view of the commands a [`SimArm`] has received.
#[derive(Debug, Clone, Default)]
pub struct SimArmLog {
    inner: Arc<Mutex<Vec<TransportCommand>>>,
}

impl SimArmLog {
    fn lock(&self) -> MutexGuard<'_, Vec<TransportCommand>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, command: TransportCommand) {
        self.lock().push(command);
    }

    /// Snapshot of every command received so far, oldest first.
    pub fn commands(&self) -> Vec<TransportCommand> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The most recent pose sent, if any.
    pub fn last_pose(&self) -> Option<(Pose, u8)> {
        self.lock().iter().rev().find_map(|c| match c {
            TransportCommand::Pose { pose, delta } => Some((*pose, *delta)),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A simulated arm that records every command.
#[derive(Debug)]
pub struct SimArm {
    log: SimArmLog,
    latency: Option<Duration>,
    fail: bool,
}

impl SimArm {
    /// Create a simulated arm and the log it writes to.
    pub fn new() -> (Self, SimArmLog) {
        let log = SimArmLog::default();
        (
            Self {
                log: log.clone(),
                latency: None,
                fail: false,
            },
            log,
        )
    }

    /// Stall every command for `latency` before recording it.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Record every command, then report it as rejected.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    async fn accept(&mut self, command: TransportCommand) -> Result<(), TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        debug!(?command, "sim arm");
        self.log.push(command);
        if self.fail {
            return Err(TransportError::Rejected("simulated fault".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArmTransport for SimArm {
    async fn send_pose(&mut self, pose: &Pose, delta: u8) -> Result<(), TransportError> {
        self.accept(TransportCommand::Pose { pose: *pose, delta })
            .await
    }

    async fn send_reset(&mut self) -> Result<(), TransportError> {
        self.accept(TransportCommand::Reset).await
    }

    async fn send_sleep(&mut self) -> Result<(), TransportError> {
        self.accept(TransportCommand::Sleep).await
    }
}
