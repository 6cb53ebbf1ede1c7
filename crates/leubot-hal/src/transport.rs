//! The [`ArmTransport`] trait.
//!
//! A transport accepts complete commands only.  Single-joint moves are
//! merged into the current pose by the arbitrator before they reach here, so
//! the device always receives a full six-joint target.

use async_trait::async_trait;
use leubot_types::Pose;
use thiserror::Error;

/// Failure to hand a command to the device.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("device rejected command: {0}")]
    Rejected(String),
}

/// A command as it was handed to a transport.  Used by recording
/// transports and in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Pose { pose: Pose, delta: u8 },
    Reset,
    Sleep,
}

/// Anything that can drive the arm.
///
/// # Contract
///
/// * `send_pose` – move all joints to `pose`; `delta` is the transition
///   speed hint, lower is faster.
/// * `send_reset` – put the controller back into joint-control mode.
/// * `send_sleep` – drop into the low-power rest posture.
///
/// Implementations may block for the duration of the device write; the
/// caller bounds each call with its own timeout.
#[async_trait]
pub trait ArmTransport: Send {
    async fn send_pose(&mut self, pose: &Pose, delta: u8) -> Result<(), TransportError>;

    async fn send_reset(&mut self) -> Result<(), TransportError>;

    async fn send_sleep(&mut self) -> Result<(), TransportError>;

    /// Dispatch a recorded [`TransportCommand`].
    async fn send(&mut self, command: TransportCommand) -> Result<(), TransportError> {
        match command {
            TransportCommand::Pose { pose, delta } => self.send_pose(&pose, delta).await,
            TransportCommand::Reset => self.send_reset().await,
            TransportCommand::Sleep => self.send_sleep().await,
        }
    }
}

#[async_trait]
impl<T: ArmTransport + ?Sized> ArmTransport for Box<T> {
    async fn send_pose(&mut self, pose: &Pose, delta: u8) -> Result<(), TransportError> {
        (**self).send_pose(pose, delta).await
    }

    async fn send_reset(&mut self) -> Result<(), TransportError> {
        (**self).send_reset().await
    }

    async fn send_sleep(&mut self) -> Result<(), TransportError> {
        (**self).send_sleep().await
    }
}
