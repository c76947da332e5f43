//! Device-type profiles.
//!
//! Opcodes `0xE0..=0xFF` are application extended commands whose meaning
//! depends on the device type. A [`DeviceProfile`] is chosen once when the
//! gear is built; asking for a type without a profile is a configuration
//! error.

use crate::config::ConfigError;
use crate::gear::registers::Registers;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Device type codes (IEC 62386-2xx part number minus 200).
pub mod types {
    pub const FLUORESCENT: u8 = 0;
    pub const EMERGENCY: u8 = 1;
    pub const DISCHARGE: u8 = 2;
    pub const HALOGEN: u8 = 3;
    pub const INCANDESCENT: u8 = 4;
    pub const DC_CONVERTER: u8 = 5;
    pub const LED: u8 = 6;
    pub const SWITCHING: u8 = 7;
    pub const COLOUR: u8 = 8;
}

/// Device-specific command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceCommand {
    QueryExtendedVersion,
    Nop,
}

/// Behaviour that differs between device types.
pub trait DeviceProfile: fmt::Debug + Sync {
    /// Type code answered to QUERY DEVICE TYPE.
    fn device_type(&self) -> u8;

    /// Decode the low five bits of an extended opcode.
    fn decode(&self, field: u8) -> DeviceCommand;

    /// Execute a device-specific command, returning the reply if any.
    fn execute(&self, command: DeviceCommand, regs: &mut Registers) -> Option<u8>;
}

/// LED modules (device type 6).
#[derive(Debug, Clone, Copy, Default)]
pub struct LedProfile;

impl LedProfile {
    /// Answer to QUERY EXTENDED VERSION NUMBER.
    pub const EXTENDED_VERSION: u8 = 1;
}

impl DeviceProfile for LedProfile {
    fn device_type(&self) -> u8 {
        types::LED
    }

    fn decode(&self, field: u8) -> DeviceCommand {
        match field & 0x1F {
            0x1F => DeviceCommand::QueryExtendedVersion,
            _ => DeviceCommand::Nop,
        }
    }

    fn execute(&self, command: DeviceCommand, _regs: &mut Registers) -> Option<u8> {
        match command {
            DeviceCommand::QueryExtendedVersion => Some(Self::EXTENDED_VERSION),
            DeviceCommand::Nop => None,
        }
    }
}

static LED_PROFILE: LedProfile = LedProfile;

/// Look up the profile for a device type.
pub fn profile_for(device_type: u8) -> Result<&'static dyn DeviceProfile, ConfigError> {
    match device_type {
        types::LED => Ok(&LED_PROFILE),
        other => Err(ConfigError::UnsupportedDeviceType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_profile_lookup() {
        let profile = profile_for(types::LED).unwrap();
        assert_eq!(profile.device_type(), 6);
    }

    #[test]
    fn test_unsupported_profiles() {
        for ty in [types::FLUORESCENT, types::HALOGEN, types::COLOUR, 0xFF] {
            assert_eq!(profile_for(ty).unwrap_err(), ConfigError::UnsupportedDeviceType(ty));
        }
    }

    #[test]
    fn test_led_decode() {
        let led = LedProfile;
        assert_eq!(led.decode(0x1F), DeviceCommand::QueryExtendedVersion);
        assert_eq!(led.decode(0xFF), DeviceCommand::QueryExtendedVersion);
        for field in 0..0x1F {
            assert_eq!(led.decode(field), DeviceCommand::Nop);
        }
    }

    #[test]
    fn test_led_execute() {
        let led = LedProfile;
        let mut regs = Registers::new();
        assert_eq!(led.execute(DeviceCommand::QueryExtendedVersion, &mut regs), Some(1));
        assert_eq!(led.execute(DeviceCommand::Nop, &mut regs), None);
        assert_eq!(regs, Registers::new());
    }
}
