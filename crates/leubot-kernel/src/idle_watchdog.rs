//! [`IdleWatchdog`] – lease inactivity deadline.
//!
//! The watchdog does not sleep or spawn anything itself.  Each call to
//! [`IdleWatchdog::arm`] starts a new *epoch* and returns a [`WatchdogArm`]
//! describing the deadline to schedule; whoever schedules it must report the
//! epoch back when the deadline passes.  [`IdleWatchdog::is_current`] then
//! tells a live expiry from a stale one that was superseded by a later arm or
//! a disarm.

use std::time::Duration;

/// A freshly armed deadline: fire after `timeout`, tagged with `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogArm {
    pub epoch: u64,
    pub timeout: Duration,
}

/// Epoch-tagged inactivity deadline for the current lease.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use leubot_kernel::IdleWatchdog;
///
/// let mut wd = IdleWatchdog::new(Some(Duration::from_secs(900)));
/// let first = wd.arm().unwrap();
/// let second = wd.arm().unwrap();
///
/// assert!(!wd.is_current(first.epoch));
/// assert!(wd.is_current(second.epoch));
/// ```
#[derive(Debug, Default)]
pub struct IdleWatchdog {
    timeout: Option<Duration>,
    epoch: u64,
    armed: bool,
}

impl IdleWatchdog {
    /// Create a stopped watchdog.  `None` (or a zero duration) disables it.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
            epoch: 0,
            armed: false,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start a full window, superseding any earlier deadline.
    ///
    /// Returns `None` when the watchdog is disabled.
    pub fn arm(&mut self) -> Option<WatchdogArm> {
        let timeout = self.timeout?;
        self.epoch += 1;
        self.armed = true;
        Some(WatchdogArm {
            epoch: self.epoch,
            timeout,
        })
    }

    /// Stop the watchdog.  Any deadline scheduled so far becomes stale.
    pub fn disarm(&mut self) {
        self.epoch += 1;
        self.armed = false;
    }

    /// `true` when `epoch` is the deadline armed most recently and it has not
    /// been disarmed since.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.armed && self.epoch == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped() {
        let wd = IdleWatchdog::new(Some(Duration::from_secs(1)));
        assert!(!wd.is_current(0));
        assert!(!wd.is_current(1));
    }

    #[test]
    fn rearm_supersedes_previous_deadline() {
        let mut wd = IdleWatchdog::new(Some(Duration::from_secs(1)));
        let a = wd.arm().unwrap();
        let b = wd.arm().unwrap();
        assert!(b.epoch > a.epoch);
        assert!(!wd.is_current(a.epoch));
        assert!(wd.is_current(b.epoch));
        assert_eq!(b.timeout, Duration::from_secs(1));
    }

    #[test]
    fn disarm_makes_pending_deadline_stale() {
        let mut wd = IdleWatchdog::new(Some(Duration::from_secs(1)));
        let a = wd.arm().unwrap();
        wd.disarm();
        assert!(!wd.is_current(a.epoch));
        assert!(!wd.is_current(a.epoch + 1));

        // A later lease gets a fresh epoch the old firing can't match.
        let b = wd.arm().unwrap();
        assert_ne!(a.epoch, b.epoch);
        assert!(!wd.is_current(a.epoch));
    }

    #[test]
    fn disabled_watchdog_never_arms() {
        let mut off = IdleWatchdog::new(None);
        assert!(off.arm().is_none());
        let mut zero = IdleWatchdog::new(Some(Duration::ZERO));
        assert!(zero.arm().is_none());
        assert_eq!(zero.timeout(), None);
    }
}
