//! ArmLink serial framing.
//!
//! Every command to the ArbotiX controller is one fixed 17-byte frame:
//!
//! ```text
//!  0      1..=12                     13     14      15        16
//! 0xFF | six joints, u16 BE each | delta | button | extended | checksum
//! ```
//!
//! The checksum is `255 - (sum of bytes 1..=15 mod 256)`.  The extended byte
//! selects what the controller does with the frame; see [`Extended`].

use std::fmt;

use leubot_types::{Joint, Pose};

pub const HEADER: u8 = 0xFF;
pub const PACKET_LEN: usize = 17;

/// Extended instruction carried in byte 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Extended {
    /// Move to the joint targets in the frame.
    Move = 0x00,
    /// Reset into joint-control mode and return home.
    Reset = 0x40,
    /// Enter the rest posture and relax the servos.
    Sleep = 0x60,
}

/// One ArmLink frame before serialisation.
///
/// # Example
///
/// ```
/// use leubot_hal::{ArmLinkPacket, Extended};
/// use leubot_types::Pose;
///
/// let frame = ArmLinkPacket::pose(&Pose::HOME, 128).to_bytes();
/// assert_eq!(frame[0], 0xFF);
/// assert_eq!(&frame[1..3], &512u16.to_be_bytes());
/// assert_eq!(frame[15], Extended::Move as u8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmLinkPacket {
    pub joints: [u16; 6],
    pub delta: u8,
    pub button: u8,
    pub extended: Extended,
}

impl ArmLinkPacket {
    /// A move frame for `pose` at speed `delta`.
    pub fn pose(pose: &Pose, delta: u8) -> Self {
        Self {
            joints: Joint::ALL.map(|j| pose.get(j)),
            delta,
            button: 0,
            extended: Extended::Move,
        }
    }

    /// An instruction-only frame; joint targets are ignored by the
    /// controller and sent as zero.
    pub fn instruction(extended: Extended) -> Self {
        Self {
            joints: [0; 6],
            delta: 0,
            button: 0,
            extended,
        }
    }

    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0] = HEADER;
        for (i, value) in self.joints.iter().enumerate() {
            let [hi, lo] = value.to_be_bytes();
            out[1 + 2 * i] = hi;
            out[2 + 2 * i] = lo;
        }
        out[13] = self.delta;
        out[14] = self.button;
        out[15] = self.extended as u8;
        out[16] = checksum(&out[1..16]);
        out
    }
}

impl fmt::Display for ArmLinkPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// ArmLink checksum over the payload bytes (everything between header and
/// checksum).
pub fn checksum(payload: &[u8]) -> u8 {
    let sum = payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    255 - sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_frame_layout() {
        let bytes = ArmLinkPacket::pose(&Pose::HOME, 128).to_bytes();
        assert_eq!(
            &bytes[..16],
            &[
                0xFF, 0x02, 0x00, 0x01, 0x90, 0x01, 0x90, 0x02, 0x44, 0x02, 0x00, 0x00, 0x80,
                0x80, 0x00, 0x00
            ]
        );
        // 2+0+1+144+1+144+2+68+2+0+0+128+128 = 620; 620 mod 256 = 108
        assert_eq!(bytes[16], 255 - 108);
    }

    #[test]
    fn checksum_makes_payload_sum_to_255() {
        let bytes = ArmLinkPacket::pose(
            &Pose {
                base: 1023,
                shoulder: 810,
                elbow: 900,
                wrist_angle: 830,
                wrist_rotation: 1023,
                gripper: 512,
            },
            254,
        )
        .to_bytes();
        let total = bytes[1..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(total, 255);
    }

    #[test]
    fn instruction_frames() {
        let reset = ArmLinkPacket::instruction(Extended::Reset).to_bytes();
        assert_eq!(reset[15], 0x40);
        assert_eq!(reset[16], 255 - 0x40);

        let sleep = ArmLinkPacket::instruction(Extended::Sleep).to_bytes();
        assert_eq!(sleep[15], 0x60);
        assert!(sleep[1..13].iter().all(|b| *b == 0));
    }

    #[test]
    fn display_is_hex() {
        let text = ArmLinkPacket::instruction(Extended::Sleep).to_string();
        assert!(text.starts_with("FF 00"));
        assert!(text.ends_with("60 9F"));
    }
}
