use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One of the six servo-driven joints of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    Base,
    Shoulder,
    Elbow,
    WristAngle,
    WristRotation,
    Gripper,
}

impl Joint {
    /// Every joint, in wire order.
    pub const ALL: [Joint; 6] = [
        Joint::Base,
        Joint::Shoulder,
        Joint::Elbow,
        Joint::WristAngle,
        Joint::WristRotation,
        Joint::Gripper,
    ];

    /// Resource name used by the HTTP layer, e.g. `"wrist/angle"`.
    pub fn resource(self) -> &'static str {
        match self {
            Joint::Base => "base",
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::WristAngle => "wrist/angle",
            Joint::WristRotation => "wrist/rotation",
            Joint::Gripper => "gripper",
        }
    }

    /// Field name used in posture payloads, e.g. `"wristAngle"`.
    pub fn field(self) -> &'static str {
        match self {
            Joint::Base => "base",
            Joint::Shoulder => "shoulder",
            Joint::Elbow => "elbow",
            Joint::WristAngle => "wristAngle",
            Joint::WristRotation => "wristRotation",
            Joint::Gripper => "gripper",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Complete six-joint target of the arm, in device encoder units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pose {
    pub base: u16,
    pub shoulder: u16,
    pub elbow: u16,
    pub wrist_angle: u16,
    pub wrist_rotation: u16,
    pub gripper: u16,
}

impl Pose {
    /// The home vector the arm returns to on lease changes and resets.
    pub const HOME: Pose = Pose {
        base: 512,
        shoulder: 400,
        elbow: 400,
        wrist_angle: 580,
        wrist_rotation: 512,
        gripper: 128,
    };

    pub fn get(&self, joint: Joint) -> u16 {
        match joint {
            Joint::Base => self.base,
            Joint::Shoulder => self.shoulder,
            Joint::Elbow => self.elbow,
            Joint::WristAngle => self.wrist_angle,
            Joint::WristRotation => self.wrist_rotation,
            Joint::Gripper => self.gripper,
        }
    }

    pub fn set(&mut self, joint: Joint, value: u16) {
        let slot = match joint {
            Joint::Base => &mut self.base,
            Joint::Shoulder => &mut self.shoulder,
            Joint::Elbow => &mut self.elbow,
            Joint::WristAngle => &mut self.wrist_angle,
            Joint::WristRotation => &mut self.wrist_rotation,
            Joint::Gripper => &mut self.gripper,
        };
        *slot = value;
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::HOME
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "base={} shoulder={} elbow={} wristAngle={} wristRotation={} gripper={}",
            self.base, self.shoulder, self.elbow, self.wrist_angle, self.wrist_rotation, self.gripper
        )
    }
}

/// A full-pose move: all six joints plus the transition speed.
///
/// `delta` is carried as `u16` so that out-of-range speeds reach the range
/// validator instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseCommand {
    #[serde(flatten)]
    pub pose: Pose,
    pub delta: u16,
}

/// The operator currently holding the lease.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub token: String,
    pub acquired_at: DateTime<Utc>,
}

impl Identity {
    /// Public view without the token.
    pub fn info(&self) -> IdentityInfo {
        IdentityInfo {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

/// Name and contact of an operator, as submitted and as reported back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Operational mode of the arm, independent of session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Not yet initialised since process start.
    #[default]
    Offline,
    /// Initialised and accepting motion.
    Ready,
    /// A hardware command is being dispatched.  Never observable from outside
    /// the arbitrator, which finishes each request before taking the next.
    Busy,
    /// Parked in the sleep posture; woken by the next authorized command.
    Sleeping,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Offline => "offline",
            LifecycleState::Ready => "ready",
            LifecycleState::Busy => "busy",
            LifecycleState::Sleeping => "sleeping",
        };
        f.write_str(s)
    }
}

/// Every operation the arbitrator accepts.  This is the only way into the
/// arbitrator's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmRequest {
    AcquireLease { name: String, email: String },
    ReleaseLease { token: String },
    GetIdentity,
    GetJoint(Joint),
    GetPose,
    SetJoint { joint: Joint, token: String, value: u16 },
    SetPose { token: String, command: PoseCommand },
    Reset { token: String },
    Sleep { token: String },
}

impl ArmRequest {
    /// Short operation name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ArmRequest::AcquireLease { .. } => "acquire_lease",
            ArmRequest::ReleaseLease { .. } => "release_lease",
            ArmRequest::GetIdentity => "get_identity",
            ArmRequest::GetJoint(_) => "get_joint",
            ArmRequest::GetPose => "get_pose",
            ArmRequest::SetJoint { .. } => "set_joint",
            ArmRequest::SetPose { .. } => "set_pose",
            ArmRequest::Reset { .. } => "reset",
            ArmRequest::Sleep { .. } => "sleep",
        }
    }
}

/// Successful outcome of an [`ArmRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmReply {
    /// A lease was granted (or reissued) to this identity.
    Granted(Identity),
    Released,
    /// Current lease holder, `None` when no lease is held.
    Identity(Option<IdentityInfo>),
    Joint { joint: Joint, value: u16 },
    Pose(Pose),
    /// A mutating command was applied and dispatched.
    Performed,
}

/// Result type returned for every arbitrator request.
pub type ArmResult = Result<ArmReply, ArmError>;

/// Rejections and failures produced by the arbitrator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmError {
    #[error("Lease already held by another operator")]
    IdentityConflict,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("No active session")]
    NoSession,

    #[error("No session matches the given token")]
    NotFound,

    #[error("Invalid command: {field}={value} outside [{min}, {max}]")]
    InvalidCommand {
        field: String,
        value: u16,
        min: u16,
        max: u16,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Arbitrator mailbox closed")]
    MailboxClosed,
}

/// Unified event wrapper for the arm event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "leubot-runtime::arbitrator"
    pub source: String,
    pub payload: EventPayload,
}

impl ArmEvent {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Things that happened inside the arbitrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    LeaseGranted(IdentityInfo),
    LeaseReissued(IdentityInfo),
    LeaseReleased(IdentityInfo),
    LeaseExpired { holder: IdentityInfo, idle_secs: u64 },
    LifecycleChanged { from: LifecycleState, to: LifecycleState },
    PoseDispatched { pose: Pose, delta: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_pose_matches_reference_vector() {
        let home = Pose::HOME;
        assert_eq!(home.base, 512);
        assert_eq!(home.shoulder, 400);
        assert_eq!(home.elbow, 400);
        assert_eq!(home.wrist_angle, 580);
        assert_eq!(home.wrist_rotation, 512);
        assert_eq!(home.gripper, 128);
    }

    #[test]
    fn set_touches_only_the_named_joint() {
        let mut pose = Pose::HOME;
        pose.set(Joint::WristRotation, 7);
        for joint in Joint::ALL {
            let expected = if joint == Joint::WristRotation {
                7
            } else {
                Pose::HOME.get(joint)
            };
            assert_eq!(pose.get(joint), expected, "{joint}");
        }
    }

    #[test]
    fn pose_command_uses_camel_case_flat_fields() {
        let json = r#"{"base":1,"shoulder":205,"elbow":210,"wristAngle":200,"wristRotation":0,"gripper":0,"delta":10}"#;
        let cmd: PoseCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.pose.wrist_angle, 200);
        assert_eq!(cmd.delta, 10);
    }

    #[test]
    fn identity_debug_hides_token() {
        let id = Identity {
            name: "Ada".into(),
            email: "ada@example.org".into(),
            token: "s3cr3t".into(),
            acquired_at: Utc::now(),
        };
        let dbg = format!("{id:?}");
        assert!(!dbg.contains("s3cr3t"));
        assert_eq!(id.info().email, "ada@example.org");
    }

    #[test]
    fn arm_error_display() {
        let err = ArmError::InvalidCommand {
            field: "gripper".into(),
            value: 513,
            min: 0,
            max: 512,
        };
        assert!(err.to_string().contains("gripper=513"));
        assert!(ArmError::NoSession.to_string().contains("No active session"));
    }
}
