//! [`Arbitrator`] – the single serialization point for the arm.
//!
//! The arbitrator is one task that owns the lease, the pose, the lifecycle
//! state and the transport.  It consumes its mailbox strictly in arrival
//! order and finishes each message, hardware dispatch included, before it
//! looks at the next.  That ordering is the only mutual exclusion in the
//! system; nothing else holds a lock on arm state.
//!
//! Every mutating request runs the same pipeline:
//!
//! 1. **Authorize + validate** – [`CommandGate::authorize_and_verify`].  A
//!    rejected command changes nothing and never wakes the arm.
//! 2. **Activity** – re-arm the idle timer to a full window.
//! 3. **Wake** – run the Ready-entry sequence if the arm is Offline or
//!    Sleeping.
//! 4. **Mutate** – update the in-memory pose.
//! 5. **Dispatch** – send the complete pose to the transport, bounded by the
//!    dispatch timeout.
//! 6. **Reply** – [`ArmReply::Performed`].
//!
//! # Idle timer
//!
//! The timer never touches state.  Each arm spawns a sleeper that posts
//! `LeaseExpired { epoch }` back into the mailbox; the previous sleeper is
//! aborted, and an expiry whose epoch the [`IdleWatchdog`] no longer
//! considers current is ignored.  A release that wins the race against its
//! own timer therefore cannot evict the next lease holder.
//!
//! # Startup
//!
//! The first thing the task does is park the arm: one sleep instruction and
//! the Offline → Sleeping transition, so a restarted process never leaves
//! the servos holding whatever pose they had before.
//!
//! # Example
//!
//! ```rust
//! use leubot_hal::SimArm;
//! use leubot_middleware::EventBus;
//! use leubot_runtime::{Arbitrator, ArbitratorConfig};
//! use leubot_types::{ArmReply, ArmRequest, Joint};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (arm, _log) = SimArm::new();
//! let (handle, _task) =
//!     Arbitrator::spawn(ArbitratorConfig::default(), Box::new(arm), EventBus::default())
//!         .unwrap();
//!
//! let reply = handle.call(ArmRequest::GetJoint(Joint::Base)).await.unwrap();
//! assert_eq!(reply, ArmReply::Joint { joint: Joint::Base, value: 512 });
//! # });
//! ```

use std::fmt;
use std::time::Duration;

use leubot_hal::{ArmTransport, TransportCommand};
use leubot_kernel::{
    Authorization, CommandGate, GrantKind, IdleWatchdog, LeaseManager, Lifecycle, MotionIntent,
    RangeTable,
};
use leubot_middleware::EventBus;
use leubot_types::{
    ArmError, ArmEvent, ArmReply, ArmRequest, ArmResult, EventPayload, Joint, LifecycleState,
    Pose, PoseCommand,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::handle::{ArmHandle, Mailbox};

const EVENT_SOURCE: &str = "leubot-runtime::arbitrator";

/// Construction-time settings for [`Arbitrator`].
#[derive(Clone)]
pub struct ArbitratorConfig {
    /// Transition speed for single-joint moves and home syncs.
    pub default_delta: u8,
    /// Idle window after which the lease is revoked.  `None` disables it.
    pub user_timeout: Option<Duration>,
    /// Upper bound on a single transport call.
    pub dispatch_timeout: Duration,
    /// Administrative override token.  `None` or empty disables it.
    pub master_token: Option<Zeroizing<String>>,
    pub ranges: RangeTable,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            default_delta: 128,
            user_timeout: Some(Duration::from_secs(900)),
            dispatch_timeout: Duration::from_millis(2000),
            master_token: None,
            ranges: RangeTable::DEFAULT,
        }
    }
}

impl ArbitratorConfig {
    /// Check the settings that end up on the wire.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidCommand`] when `default_delta` lies outside
    /// `ranges.delta`.
    pub fn validate(&self) -> Result<(), ArmError> {
        self.ranges.verify_delta(u16::from(self.default_delta))
    }
}

impl fmt::Debug for ArbitratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArbitratorConfig")
            .field("default_delta", &self.default_delta)
            .field("user_timeout", &self.user_timeout)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field(
                "master_token",
                &self.master_token.as_ref().map(|_| "<redacted>"),
            )
            .field("ranges", &self.ranges)
            .finish()
    }
}

pub struct Arbitrator {
    gate: CommandGate,
    lifecycle: Lifecycle,
    pose: Pose,
    watchdog: IdleWatchdog,
    timer: Option<JoinHandle<()>>,
    transport: Box<dyn ArmTransport>,
    bus: EventBus,
    default_delta: u8,
    dispatch_timeout: Duration,
    mailbox: mpsc::WeakUnboundedSender<Mailbox>,
}

impl Arbitrator {
    /// Start the arbitrator task.
    ///
    /// Returns the client handle and the task's [`JoinHandle`].  The task
    /// ends after a [`ArmHandle::shutdown`] or once every handle is dropped;
    /// either way the arm is put to sleep first.
    ///
    /// # Errors
    ///
    /// Whatever [`ArbitratorConfig::validate`] rejects.  Nothing is spawned
    /// in that case.
    pub fn spawn(
        config: ArbitratorConfig,
        transport: Box<dyn ArmTransport>,
        bus: EventBus,
    ) -> Result<(ArmHandle, JoinHandle<()>), ArmError> {
        config.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let arbitrator = Arbitrator {
            gate: CommandGate::new(LeaseManager::new(config.master_token), config.ranges),
            lifecycle: Lifecycle::new(),
            pose: Pose::HOME,
            watchdog: IdleWatchdog::new(config.user_timeout),
            timer: None,
            transport,
            bus,
            default_delta: config.default_delta,
            dispatch_timeout: config.dispatch_timeout,
            mailbox: tx.downgrade(),
        };
        let task = tokio::spawn(arbitrator.run(rx));
        Ok((ArmHandle::new(tx), task))
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Mailbox>) {
        info!(
            idle_timeout = ?self.watchdog.timeout(),
            dispatch_timeout = ?self.dispatch_timeout,
            "arbitrator started"
        );
        self.park().await;
        while let Some(message) = rx.recv().await {
            match message {
                Mailbox::Request { request, reply } => {
                    let result = self.handle(request).await;
                    if reply.send(result).is_err() {
                        debug!("caller went away before the reply");
                    }
                }
                Mailbox::LeaseExpired { epoch } => self.expire(epoch).await,
                Mailbox::Shutdown { ack } => {
                    self.shutdown().await;
                    let _ = ack.send(());
                    return;
                }
            }
        }
        self.shutdown().await;
    }

    #[instrument(skip_all, fields(op = request.kind()))]
    async fn handle(&mut self, request: ArmRequest) -> ArmResult {
        let result = match request {
            ArmRequest::AcquireLease { name, email } => self.acquire(&name, &email).await,
            ArmRequest::ReleaseLease { token } => self.release(&token).await,
            ArmRequest::GetIdentity => Ok(ArmReply::Identity(self.gate.leases().info())),
            ArmRequest::GetJoint(joint) => Ok(ArmReply::Joint {
                joint,
                value: self.pose.get(joint),
            }),
            ArmRequest::GetPose => Ok(ArmReply::Pose(self.pose)),
            ArmRequest::SetJoint {
                joint,
                token,
                value,
            } => {
                self.command(&token, MotionIntent::Joint { joint, value })
                    .await
            }
            ArmRequest::SetPose { token, command } => {
                self.command(&token, MotionIntent::Pose(command)).await
            }
            ArmRequest::Reset { token } => self.command(&token, MotionIntent::Reset).await,
            ArmRequest::Sleep { token } => self.command(&token, MotionIntent::Sleep).await,
        };
        if let Err(e) = &result {
            debug!(error = %e, "request rejected");
        }
        result
    }

    // ── Lease ────────────────────────────────────────────────────────────────

    async fn acquire(&mut self, name: &str, email: &str) -> ArmResult {
        let grant = self.gate.leases_mut().acquire(name, email)?;
        self.arm_timer();
        let info = grant.identity.info();
        match grant.kind {
            GrantKind::Fresh => {
                self.publish(EventPayload::LeaseGranted(info));
                self.enter_ready().await?;
            }
            GrantKind::Reissued => self.publish(EventPayload::LeaseReissued(info)),
        }
        Ok(ArmReply::Granted(grant.identity))
    }

    async fn release(&mut self, token: &str) -> ArmResult {
        let holder = self.gate.leases_mut().release(token)?;
        self.disarm_timer();
        self.enter_sleeping().await?;
        info!(email = %holder.email, "lease released");
        self.publish(EventPayload::LeaseReleased(holder.info()));
        Ok(ArmReply::Released)
    }

    async fn expire(&mut self, epoch: u64) {
        if !self.watchdog.is_current(epoch) {
            debug!(epoch, "stale idle expiry ignored");
            return;
        }
        let idle_secs = self.watchdog.timeout().map_or(0, |t| t.as_secs());
        // The sleeper that sent this message has already finished.
        self.timer = None;
        self.watchdog.disarm();
        let Some(holder) = self.gate.leases_mut().clear() else {
            return;
        };
        info!(email = %holder.email, idle_secs, "lease expired");
        if let Err(e) = self.enter_sleeping().await {
            warn!(error = %e, "could not put the arm to sleep after expiry");
        }
        self.publish(EventPayload::LeaseExpired {
            holder: holder.info(),
            idle_secs,
        });
    }

    fn arm_timer(&mut self) {
        if let Some(previous) = self.timer.take() {
            previous.abort();
        }
        let Some(deadline) = self.watchdog.arm() else {
            return;
        };
        let mailbox = self.mailbox.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(deadline.timeout).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Mailbox::LeaseExpired {
                    epoch: deadline.epoch,
                });
            }
        }));
    }

    fn disarm_timer(&mut self) {
        if let Some(previous) = self.timer.take() {
            previous.abort();
        }
        self.watchdog.disarm();
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    async fn command(&mut self, token: &str, intent: MotionIntent) -> ArmResult {
        let auth = self.gate.authorize_and_verify(token, &intent)?;
        if let Authorization::Provisioned(identity) = &auth {
            self.publish(EventPayload::LeaseGranted(identity.info()));
        }
        self.arm_timer();

        match intent {
            MotionIntent::Joint { joint, value } => self.move_joint(joint, value).await?,
            MotionIntent::Pose(command) => self.move_pose(command).await?,
            MotionIntent::Reset => self.enter_ready().await?,
            MotionIntent::Sleep => {
                if self.lifecycle.state() == LifecycleState::Ready {
                    self.enter_sleeping().await?;
                } else {
                    debug!(state = %self.lifecycle.state(), "sleep ignored");
                }
            }
        }
        Ok(ArmReply::Performed)
    }

    async fn move_joint(&mut self, joint: Joint, value: u16) -> Result<(), ArmError> {
        self.wake_if_needed().await?;
        self.pose.set(joint, value);
        self.dispatch_pose(self.default_delta).await;
        Ok(())
    }

    async fn move_pose(&mut self, command: PoseCommand) -> Result<(), ArmError> {
        let delta = u8::try_from(command.delta)
            .map_err(|_| ArmError::Internal(format!("delta {} exceeds u8", command.delta)))?;
        self.wake_if_needed().await?;
        self.pose = command.pose;
        self.dispatch_pose(delta).await;
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    async fn wake_if_needed(&mut self) -> Result<(), ArmError> {
        if self.lifecycle.needs_wake() {
            info!(state = %self.lifecycle.state(), "waking the arm");
            self.enter_ready().await?;
        }
        Ok(())
    }

    /// Reset into joint mode, go home, and mark the arm Ready.
    async fn enter_ready(&mut self) -> Result<(), ArmError> {
        self.dispatch(TransportCommand::Reset).await;
        self.pose = Pose::HOME;
        self.dispatch_pose(self.default_delta).await;
        self.transition(LifecycleState::Ready)
    }

    /// Forget the pose, send the arm to sleep and mark it Sleeping.
    async fn enter_sleeping(&mut self) -> Result<(), ArmError> {
        self.pose = Pose::HOME;
        self.dispatch(TransportCommand::Sleep).await;
        self.transition(LifecycleState::Sleeping)
    }

    fn transition(&mut self, to: LifecycleState) -> Result<(), ArmError> {
        if let Some(t) = self.lifecycle.transition(to)? {
            self.publish(EventPayload::LifecycleChanged {
                from: t.from,
                to: t.to,
            });
        }
        Ok(())
    }

    /// Sleep the arm before taking any request.
    async fn park(&mut self) {
        info!("parking the arm");
        self.dispatch(TransportCommand::Sleep).await;
        if let Err(e) = self.transition(LifecycleState::Sleeping) {
            warn!(error = %e, "lifecycle not updated on startup");
        }
    }

    async fn shutdown(&mut self) {
        self.disarm_timer();
        info!("arbitrator shutting down; sleeping the arm");
        self.dispatch(TransportCommand::Sleep).await;
        if let Err(e) = self.transition(LifecycleState::Sleeping) {
            warn!(error = %e, "lifecycle not updated on shutdown");
        }
    }

    // ── Transport ────────────────────────────────────────────────────────────

    async fn dispatch_pose(&mut self, delta: u8) {
        let pose = self.pose;
        self.dispatch(TransportCommand::Pose { pose, delta }).await;
        self.publish(EventPayload::PoseDispatched { pose, delta });
    }

    /// Send one command.  Failures and timeouts are logged, never returned:
    /// the in-memory state is authoritative.
    async fn dispatch(&mut self, command: TransportCommand) {
        self.lifecycle.begin_dispatch();
        let outcome =
            tokio::time::timeout(self.dispatch_timeout, self.transport.send(command)).await;
        self.lifecycle.end_dispatch();
        match outcome {
            Ok(Ok(())) => debug!(?command, "dispatched"),
            Ok(Err(e)) => warn!(?command, error = %e, "transport dispatch failed"),
            Err(_) => warn!(
                ?command,
                timeout = ?self.dispatch_timeout,
                "transport dispatch timed out"
            ),
        }
    }

    fn publish(&self, payload: EventPayload) {
        self.bus.publish(ArmEvent::new(EVENT_SOURCE, payload));
    }
}
