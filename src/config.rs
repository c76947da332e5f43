//! Gear configuration.
//!
//! Everything the embedding firmware decides once at build or boot time:
//! the system clock, the bus rate, which device type the gear reports and
//! where in the FRAM its persistent registers live.

use crate::dali::DALI_BAUD_RATE;
use crate::fram::FRAM_SIZE;
use crate::gear::device::{self, types};
use crate::gear::persist::PERSIST_BYTES;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported device type: {0}")]
    UnsupportedDeviceType(u8),

    #[error("Baud rate must be non-zero")]
    ZeroBaudRate,

    #[error("Clock {clock_frequency} Hz is too slow for {baud_rate} baud (half-bit divisor {divisor} < 2)")]
    DivisorTooSmall {
        clock_frequency: u32,
        baud_rate: u32,
        divisor: u32,
    },

    #[error("Physical minimum level {0} must lie strictly between 0 and 255")]
    PhysicalMinimum(u8),

    #[error("Persistence table at {base:#06x} runs past the end of the FRAM")]
    PersistenceOutOfRange { base: u16 },

    #[error("Malformed configuration: {0}")]
    Parse(String),
}

/// Control gear configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    /// System tick frequency in Hz.
    pub clock_frequency: u32,
    /// DALI bit rate.
    pub baud_rate: u32,
    /// Device type reported on the bus; selects the device profile.
    pub device_type: u8,
    /// Lowest level the lamp can physically produce.
    pub physical_min_level: u8,
    /// FRAM offset of the first persisted register.
    pub persist_base: u16,
}

impl GearConfig {
    pub fn new() -> Self {
        Self {
            clock_frequency: 16_000_000,
            baud_rate: DALI_BAUD_RATE,
            device_type: types::LED,
            physical_min_level: 1,
            persist_base: 0,
        }
    }

    /// Parse a (possibly partial) JSON document; missing fields keep
    /// their defaults. The result is validated.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GearConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Half-bit period in system ticks.
    pub fn half_bit_ticks(&self) -> Result<u32, ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        let divisor = self.clock_frequency / self.baud_rate.saturating_mul(2);
        if divisor < 2 {
            return Err(ConfigError::DivisorTooSmall {
                clock_frequency: self.clock_frequency,
                baud_rate: self.baud_rate,
                divisor,
            });
        }
        Ok(divisor)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.half_bit_ticks()?;

        if self.physical_min_level == 0 || self.physical_min_level == 0xFF {
            return Err(ConfigError::PhysicalMinimum(self.physical_min_level));
        }

        if usize::from(self.persist_base) + PERSIST_BYTES > FRAM_SIZE {
            return Err(ConfigError::PersistenceOutOfRange { base: self.persist_base });
        }

        device::profile_for(self.device_type)?;
        Ok(())
    }
}

impl Default for GearConfig {
    fn default() -> Self {
        Self::new()
    }
}
