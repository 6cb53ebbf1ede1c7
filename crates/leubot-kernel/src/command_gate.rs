//! [`CommandGate`] – single interception point for mutating commands.
//!
//! Every [`MotionIntent`] must pass through
//! [`CommandGate::authorize_and_verify`] before the arbitrator applies it.
//! Two checks run in order:
//!
//! 1. **Authorization** ([`LeaseManager::authorize`]): the token must belong
//!    to the lease holder or be the override token.
//! 2. **Range validation** ([`RangeTable`]): every submitted value must lie
//!    within its joint's safe range.
//!
//! A failed authorization is reported even if the values are also out of
//! range.
//!
//! # Example
//!
//! ```
//! use leubot_kernel::{CommandGate, LeaseManager, MotionIntent, RangeTable};
//! use leubot_types::Joint;
//!
//! let mut gate = CommandGate::new(LeaseManager::new(None), RangeTable::DEFAULT);
//! let token = gate.leases_mut().acquire("Ada", "ada@example.org").unwrap().identity.token;
//!
//! let ok = MotionIntent::Joint { joint: Joint::Base, value: 300 };
//! assert!(gate.authorize_and_verify(&token, &ok).is_ok());
//!
//! let too_far = MotionIntent::Joint { joint: Joint::Gripper, value: 600 };
//! assert!(gate.authorize_and_verify(&token, &too_far).is_err());
//! ```

use leubot_types::{ArmError, Joint, PoseCommand};

use crate::lease_manager::{Authorization, LeaseManager};
use crate::range_table::RangeTable;

/// The mutating commands the gate knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionIntent {
    Joint { joint: Joint, value: u16 },
    Pose(PoseCommand),
    Reset,
    Sleep,
}

pub struct CommandGate {
    leases: LeaseManager,
    ranges: RangeTable,
}

impl CommandGate {
    pub fn new(leases: LeaseManager, ranges: RangeTable) -> Self {
        Self { leases, ranges }
    }

    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    pub fn leases_mut(&mut self) -> &mut LeaseManager {
        &mut self.leases
    }

    /// Authorize `token` and validate `intent`.
    ///
    /// When the override token claims an empty session but validation then
    /// fails, the provisioned lease is dropped again so a rejected command
    /// leaves no trace.
    ///
    /// # Errors
    ///
    /// - [`ArmError::NoSession`] / [`ArmError::InvalidToken`] – authorization
    ///   failed.
    /// - [`ArmError::InvalidCommand`] – a value is outside its range.
    pub fn authorize_and_verify(
        &mut self,
        token: &str,
        intent: &MotionIntent,
    ) -> Result<Authorization, ArmError> {
        let auth = self.leases.authorize(token)?;
        if let Err(e) = self.verify(intent) {
            if matches!(auth, Authorization::Provisioned(_)) {
                self.leases.clear();
            }
            return Err(e);
        }
        Ok(auth)
    }

    /// Range-check `intent` without touching the lease.
    pub fn verify(&self, intent: &MotionIntent) -> Result<(), ArmError> {
        match intent {
            MotionIntent::Joint { joint, value } => self.ranges.verify_joint(*joint, *value),
            MotionIntent::Pose(command) => self.ranges.verify_pose(command),
            MotionIntent::Reset | MotionIntent::Sleep => Ok(()),
        }
    }
}
