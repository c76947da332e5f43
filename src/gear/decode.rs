//! DALI command decoder.
//!
//! Maps the opcode byte of a forward frame (the address byte already
//! resolved) to a [`Command`]. Commands that address a scene or group
//! carry the index from the low nibble. Unknown and reserved opcodes
//! decode to [`Command::Nop`]; decoding never fails.

use crate::gear::device::{DeviceCommand, DeviceProfile};
use serde::{Serialize, Deserialize};

/// Decoded DALI command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    // ==================== Arc Power ====================

    Off,
    Up,
    Down,
    StepUp,
    StepDown,
    RecallMaxLevel,
    RecallMinLevel,
    StepDownAndOff,
    OnAndStepUp,
    EnableDapcSequence,
    GoToScene(u8),

    // ==================== Configuration ====================

    Reset,
    StoreActualLevelInDtr,
    StoreDtrAsMaxLevel,
    StoreDtrAsMinLevel,
    StoreDtrAsSystemFailureLevel,
    StoreDtrAsPowerOnLevel,
    StoreDtrAsFadeTime,
    StoreDtrAsFadeRate,
    StoreDtrAsScene(u8),
    RemoveFromScene(u8),
    AddToGroup(u8),
    RemoveFromGroup(u8),
    StoreDtrAsShortAddress,
    EnableWriteMemory,

    // ==================== Queries ====================

    QueryStatus,
    QueryControlGearPresent,
    QueryLampFailure,
    QueryLampPowerOn,
    QueryLimitError,
    QueryResetState,
    QueryMissingShortAddress,
    QueryVersionNumber,
    QueryContentDtr,
    QueryDeviceType,
    QueryPhysicalMinimum,
    QueryPowerFailure,
    QueryContentDtr1,
    QueryContentDtr2,
    QueryActualLevel,
    QueryMaxLevel,
    QueryMinLevel,
    QueryPowerOnLevel,
    QuerySystemFailureLevel,
    QueryFadeTimeRate,
    QuerySceneLevel(u8),
    QueryGroupsZeroToSeven,
    QueryGroupsEightToFifteen,
    QueryRandomAddressH,
    QueryRandomAddressM,
    QueryRandomAddressL,
    ReadMemoryLocation,

    // ==================== Other ====================

    /// Application extended command, decoded by the device profile.
    DeviceSpecific(DeviceCommand),

    /// Reserved or unsupported opcode.
    Nop,
}

impl Command {
    /// Whether this command changes the arc power level.
    pub fn is_arc_power(&self) -> bool {
        matches!(
            self,
            Command::Off
                | Command::Up
                | Command::Down
                | Command::StepUp
                | Command::StepDown
                | Command::RecallMaxLevel
                | Command::RecallMinLevel
                | Command::StepDownAndOff
                | Command::OnAndStepUp
                | Command::GoToScene(_)
        )
    }
}

/// Decode an opcode byte.
pub fn decode(opcode: u8, profile: &dyn DeviceProfile) -> Command {
    let n = opcode & 0x0F;
    match opcode {
        0x00 => Command::Off,
        0x01 => Command::Up,
        0x02 => Command::Down,
        0x03 => Command::StepUp,
        0x04 => Command::StepDown,
        0x05 => Command::RecallMaxLevel,
        0x06 => Command::RecallMinLevel,
        0x07 => Command::StepDownAndOff,
        0x08 => Command::OnAndStepUp,
        0x09 => Command::EnableDapcSequence,
        0x10..=0x1F => Command::GoToScene(n),

        0x20 => Command::Reset,
        0x21 => Command::StoreActualLevelInDtr,
        0x2A => Command::StoreDtrAsMaxLevel,
        0x2B => Command::StoreDtrAsMinLevel,
        0x2C => Command::StoreDtrAsSystemFailureLevel,
        0x2D => Command::StoreDtrAsPowerOnLevel,
        0x2E => Command::StoreDtrAsFadeTime,
        0x2F => Command::StoreDtrAsFadeRate,
        0x40..=0x4F => Command::StoreDtrAsScene(n),
        0x50..=0x5F => Command::RemoveFromScene(n),
        0x60..=0x6F => Command::AddToGroup(n),
        0x70..=0x7F => Command::RemoveFromGroup(n),
        0x80 => Command::StoreDtrAsShortAddress,
        0x81 => Command::EnableWriteMemory,

        0x90 => Command::QueryStatus,
        0x91 => Command::QueryControlGearPresent,
        0x92 => Command::QueryLampFailure,
        0x93 => Command::QueryLampPowerOn,
        0x94 => Command::QueryLimitError,
        0x95 => Command::QueryResetState,
        0x96 => Command::QueryMissingShortAddress,
        0x97 => Command::QueryVersionNumber,
        0x98 => Command::QueryContentDtr,
        0x99 => Command::QueryDeviceType,
        0x9A => Command::QueryPhysicalMinimum,
        0x9B => Command::QueryPowerFailure,
        0x9C => Command::QueryContentDtr1,
        0x9D => Command::QueryContentDtr2,

        0xA0 => Command::QueryActualLevel,
        0xA1 => Command::QueryMaxLevel,
        0xA2 => Command::QueryMinLevel,
        0xA3 => Command::QueryPowerOnLevel,
        0xA4 => Command::QuerySystemFailureLevel,
        0xA5 => Command::QueryFadeTimeRate,
        0xB0..=0xBF => Command::QuerySceneLevel(n),

        0xC0 => Command::QueryGroupsZeroToSeven,
        0xC1 => Command::QueryGroupsEightToFifteen,
        0xC2 => Command::QueryRandomAddressH,
        0xC3 => Command::QueryRandomAddressM,
        0xC4 => Command::QueryRandomAddressL,
        0xC5 => Command::ReadMemoryLocation,

        0xE0..=0xFF => Command::DeviceSpecific(profile.decode(opcode & 0x1F)),

        _ => Command::Nop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::device::LedProfile;
    use proptest::prelude::*;

    fn led(opcode: u8) -> Command {
        decode(opcode, &LedProfile)
    }

    #[test]
    fn test_arc_power_commands() {
        assert_eq!(led(0x00), Command::Off);
        assert_eq!(led(0x01), Command::Up);
        assert_eq!(led(0x02), Command::Down);
        assert_eq!(led(0x05), Command::RecallMaxLevel);
        assert_eq!(led(0x08), Command::OnAndStepUp);
        assert_eq!(led(0x1C), Command::GoToScene(12));
        assert!(led(0x13).is_arc_power());
        assert!(!led(0x09).is_arc_power());
    }

    #[test]
    fn test_configuration_commands() {
        assert_eq!(led(0x20), Command::Reset);
        assert_eq!(led(0x21), Command::StoreActualLevelInDtr);
        assert_eq!(led(0x2A), Command::StoreDtrAsMaxLevel);
        assert_eq!(led(0x2B), Command::StoreDtrAsMinLevel);
        assert_eq!(led(0x2F), Command::StoreDtrAsFadeRate);
        assert_eq!(led(0x43), Command::StoreDtrAsScene(3));
        assert_eq!(led(0x5F), Command::RemoveFromScene(15));
        assert_eq!(led(0x6A), Command::AddToGroup(10));
        assert_eq!(led(0x70), Command::RemoveFromGroup(0));
        assert_eq!(led(0x80), Command::StoreDtrAsShortAddress);
    }

    #[test]
    fn test_query_commands() {
        assert_eq!(led(0x90), Command::QueryStatus);
        assert_eq!(led(0x99), Command::QueryDeviceType);
        assert_eq!(led(0x9D), Command::QueryContentDtr2);
        assert_eq!(led(0xA1), Command::QueryMaxLevel);
        assert_eq!(led(0xA2), Command::QueryMinLevel);
        assert_eq!(led(0xA5), Command::QueryFadeTimeRate);
        assert_eq!(led(0xB7), Command::QuerySceneLevel(7));
        assert_eq!(led(0xC1), Command::QueryGroupsEightToFifteen);
        assert_eq!(led(0xC4), Command::QueryRandomAddressL);
    }

    #[test]
    fn test_reserved_opcodes_are_nop() {
        for opcode in [0x0A, 0x0F, 0x22, 0x29, 0x30, 0x3F, 0x82, 0x8F, 0x9E, 0xA6, 0xAF, 0xC6, 0xDF] {
            assert_eq!(led(opcode), Command::Nop, "opcode {:#04x}", opcode);
        }
    }

    #[test]
    fn test_device_specific_goes_to_profile() {
        assert_eq!(led(0xFF), Command::DeviceSpecific(DeviceCommand::QueryExtendedVersion));
        assert_eq!(led(0xE0), Command::DeviceSpecific(DeviceCommand::Nop));
    }

    proptest! {
        #[test]
        fn prop_operand_is_low_nibble(opcode in 0x40u8..0x80) {
            let n = opcode & 0x0F;
            let operand = match led(opcode) {
                Command::StoreDtrAsScene(i)
                | Command::RemoveFromScene(i)
                | Command::AddToGroup(i)
                | Command::RemoveFromGroup(i) => i,
                other => return Err(TestCaseError::fail(format!("{:?}", other))),
            };
            prop_assert_eq!(operand, n);
        }
    }
}
