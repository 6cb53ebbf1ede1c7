//! [`ArmHandle`] – the only way into the arbitrator.
//!
//! Every call is one message on the arbitrator's mailbox with its own
//! one-shot reply slot, so concurrent callers can never read each other's
//! replies.

use leubot_types::{ArmError, ArmRequest, ArmResult};
use tokio::sync::{mpsc, oneshot};

/// Messages the arbitrator consumes, in arrival order.
#[derive(Debug)]
pub(crate) enum Mailbox {
    Request {
        request: ArmRequest,
        reply: oneshot::Sender<ArmResult>,
    },
    /// Injected by the idle timer armed under `epoch`.
    LeaseExpired { epoch: u64 },
    /// Put the arm to sleep and stop.
    Shutdown { ack: oneshot::Sender<()> },
}

/// Cheap, clonable client of a running arbitrator.
#[derive(Debug, Clone)]
pub struct ArmHandle {
    tx: mpsc::UnboundedSender<Mailbox>,
}

impl ArmHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Mailbox>) -> Self {
        Self { tx }
    }

    /// Submit `request` and wait for its reply.
    ///
    /// # Errors
    ///
    /// Every rejection the arbitrator produces, plus
    /// [`ArmError::MailboxClosed`] when the arbitrator is gone.
    pub async fn call(&self, request: ArmRequest) -> ArmResult {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Mailbox::Request { request, reply })
            .map_err(|_| ArmError::MailboxClosed)?;
        rx.await.map_err(|_| ArmError::MailboxClosed)?
    }

    /// Ask the arbitrator to sleep the arm and exit, and wait until it has.
    pub async fn shutdown(&self) -> Result<(), ArmError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(Mailbox::Shutdown { ack })
            .map_err(|_| ArmError::MailboxClosed)?;
        rx.await.map_err(|_| ArmError::MailboxClosed)
    }
}
