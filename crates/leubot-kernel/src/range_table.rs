//! [`RangeTable`] – hardware-safe joint limits.
//!
//! Every motion command passes through [`RangeTable::verify_joint`] or
//! [`RangeTable::verify_pose`] before it can touch the arm.  The first field
//! outside its inclusive `[min, max]` range yields
//! [`ArmError::InvalidCommand`] and nothing is applied.

use leubot_types::{ArmError, Joint, PoseCommand};

/// Inclusive range of encoder units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: u16,
    pub max: u16,
}

impl Range {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u16) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Fixed per-joint limits plus the transition-speed bound.
///
/// # Example
///
/// ```
/// use leubot_kernel::RangeTable;
/// use leubot_types::Joint;
///
/// let table = RangeTable::DEFAULT;
/// assert!(table.verify_joint(Joint::Shoulder, 205).is_ok());
/// assert!(table.verify_joint(Joint::Shoulder, 204).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTable {
    pub base: Range,
    pub shoulder: Range,
    pub elbow: Range,
    pub wrist_angle: Range,
    pub wrist_rotation: Range,
    pub gripper: Range,
    pub delta: Range,
}

impl RangeTable {
    /// Limits of the PhantomX reactor arm with AX-12 servos.
    pub const DEFAULT: RangeTable = RangeTable {
        base: Range::new(0, 1023),
        shoulder: Range::new(205, 810),
        elbow: Range::new(210, 900),
        wrist_angle: Range::new(200, 830),
        wrist_rotation: Range::new(0, 1023),
        gripper: Range::new(0, 512),
        delta: Range::new(0, 254),
    };

    pub fn range(&self, joint: Joint) -> Range {
        match joint {
            Joint::Base => self.base,
            Joint::Shoulder => self.shoulder,
            Joint::Elbow => self.elbow,
            Joint::WristAngle => self.wrist_angle,
            Joint::WristRotation => self.wrist_rotation,
            Joint::Gripper => self.gripper,
        }
    }

    /// Check a single joint target.
    pub fn verify_joint(&self, joint: Joint, value: u16) -> Result<(), ArmError> {
        check(joint.field(), value, self.range(joint))
    }

    /// Check all six joints and the speed of a full-pose command.  Any one
    /// violation rejects the whole command.
    pub fn verify_pose(&self, command: &PoseCommand) -> Result<(), ArmError> {
        for joint in Joint::ALL {
            self.verify_joint(joint, command.pose.get(joint))?;
        }
        self.verify_delta(command.delta)
    }

    /// Check a transition speed.
    pub fn verify_delta(&self, delta: u16) -> Result<(), ArmError> {
        check("delta", delta, self.delta)
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn check(field: &str, value: u16, range: Range) -> Result<(), ArmError> {
    if range.contains(value) {
        Ok(())
    } else {
        Err(ArmError::InvalidCommand {
            field: field.to_string(),
            value,
            min: range.min,
            max: range.max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leubot_types::Pose;

    fn home_command(delta: u16) -> PoseCommand {
        PoseCommand {
            pose: Pose::HOME,
            delta,
        }
    }

    #[test]
    fn boundaries_are_inclusive_for_every_joint() {
        let table = RangeTable::DEFAULT;
        for joint in Joint::ALL {
            let r = table.range(joint);
            assert!(table.verify_joint(joint, r.min).is_ok(), "{joint} min");
            assert!(table.verify_joint(joint, r.max).is_ok(), "{joint} max");
        }
    }

    #[test]
    fn one_unit_outside_is_rejected() {
        let table = RangeTable::DEFAULT;
        for joint in Joint::ALL {
            let r = table.range(joint);
            if r.min > 0 {
                assert!(
                    matches!(
                        table.verify_joint(joint, r.min - 1),
                        Err(ArmError::InvalidCommand { .. })
                    ),
                    "{joint} below min"
                );
            }
            assert!(
                matches!(
                    table.verify_joint(joint, r.max + 1),
                    Err(ArmError::InvalidCommand { .. })
                ),
                "{joint} above max"
            );
        }
    }

    #[test]
    fn rejection_names_the_field() {
        let err = RangeTable::DEFAULT
            .verify_joint(Joint::Elbow, 901)
            .unwrap_err();
        assert_eq!(
            err,
            ArmError::InvalidCommand {
                field: "elbow".into(),
                value: 901,
                min: 210,
                max: 900,
            }
        );
    }

    #[test]
    fn home_pose_is_valid() {
        assert!(RangeTable::DEFAULT.verify_pose(&home_command(128)).is_ok());
    }

    #[test]
    fn pose_with_one_bad_joint_is_rejected() {
        let mut cmd = home_command(128);
        cmd.pose.gripper = 513;
        assert!(RangeTable::DEFAULT.verify_pose(&cmd).is_err());
    }

    #[test]
    fn speed_bound_is_checked() {
        assert!(RangeTable::DEFAULT.verify_pose(&home_command(254)).is_ok());
        let err = RangeTable::DEFAULT
            .verify_pose(&home_command(255))
            .unwrap_err();
        assert!(matches!(err, ArmError::InvalidCommand { ref field, .. } if field == "delta"));
    }
}
