//! [`Lifecycle`] – operational mode of the arm.
//!
//! ```text
//!  Offline ──► Ready ◄──► Sleeping
//!     │         │ ▲          ▲
//!     │         ▼ │          │
//!     │         Busy         │
//!     └──────────────────────┘
//! ```
//!
//! `Offline` is the only initial state; the arbitrator parks the arm
//! (Offline → Sleeping) as soon as it starts.  `Busy` brackets a single hardware
//! dispatch; since the arbitrator handles one request at a time nobody
//! outside it can ever observe `Busy`, and nothing relies on it for mutual
//! exclusion.

use leubot_types::{ArmError, LifecycleState};
use tracing::debug;

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
    /// State to restore once the in-flight dispatch finishes.
    resume: Option<LifecycleState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// `true` when a mutating command must run the Ready-entry sequence
    /// before it can be applied.
    pub fn needs_wake(&self) -> bool {
        matches!(self.state, LifecycleState::Offline | LifecycleState::Sleeping)
    }

    pub fn enter_ready(&mut self) -> Result<Option<Transition>, ArmError> {
        self.transition(LifecycleState::Ready)
    }

    pub fn enter_sleeping(&mut self) -> Result<Option<Transition>, ArmError> {
        self.transition(LifecycleState::Sleeping)
    }

    /// Mark a hardware command as in flight.
    pub fn begin_dispatch(&mut self) {
        if self.state != LifecycleState::Busy {
            self.resume = Some(self.state);
            self.state = LifecycleState::Busy;
        }
    }

    /// Clear the in-flight marker set by [`Lifecycle::begin_dispatch`].
    pub fn end_dispatch(&mut self) {
        if let Some(prev) = self.resume.take() {
            self.state = prev;
        }
    }

    /// Move to `to`.  Returns `Ok(None)` when already there.
    ///
    /// # Errors
    ///
    /// [`ArmError::Internal`] for a move the state machine does not allow,
    /// including any move while a dispatch is in flight.
    pub fn transition(&mut self, to: LifecycleState) -> Result<Option<Transition>, ArmError> {
        use LifecycleState::*;

        let from = self.state;
        if from == to {
            return Ok(None);
        }
        let allowed = matches!(
            (from, to),
            (Offline, Ready) | (Offline, Sleeping) | (Ready, Sleeping) | (Sleeping, Ready)
        );
        if !allowed {
            return Err(ArmError::Internal(format!(
                "illegal lifecycle transition {from} -> {to}"
            )));
        }
        self.state = to;
        debug!(%from, %to, "lifecycle transition");
        Ok(Some(Transition { from, to }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn starts_offline_and_needs_wake() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), Offline);
        assert!(lc.needs_wake());
    }

    #[test]
    fn ready_sleep_ready_cycle() {
        let mut lc = Lifecycle::new();
        assert_eq!(
            lc.enter_ready().unwrap(),
            Some(Transition { from: Offline, to: Ready })
        );
        assert!(!lc.needs_wake());
        assert_eq!(
            lc.enter_sleeping().unwrap(),
            Some(Transition { from: Ready, to: Sleeping })
        );
        assert!(lc.needs_wake());
        assert_eq!(
            lc.enter_ready().unwrap(),
            Some(Transition { from: Sleeping, to: Ready })
        );
    }

    #[test]
    fn same_state_is_noop() {
        let mut lc = Lifecycle::new();
        lc.enter_ready().unwrap();
        assert_eq!(lc.enter_ready().unwrap(), None);
    }

    #[test]
    fn busy_brackets_dispatch() {
        let mut lc = Lifecycle::new();
        lc.enter_ready().unwrap();
        lc.begin_dispatch();
        assert_eq!(lc.state(), Busy);
        assert!(lc.enter_sleeping().is_err());
        lc.end_dispatch();
        assert_eq!(lc.state(), Ready);
    }

    #[test]
    fn end_without_begin_is_noop() {
        let mut lc = Lifecycle::new();
        lc.end_dispatch();
        assert_eq!(lc.state(), Offline);
    }
}
