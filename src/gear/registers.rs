//! DALI control gear register set.
//!
//! Holds the variables a control gear keeps for the bus:
//! - addressing: short address, random address, group membership
//! - light levels: actual, power-on, failure, min, max, 16 scenes
//! - fade time and fade rate (4 bits each)
//! - transfer registers DTR, DTR1, DTR2
//! - the power-failure flag
//!
//! The status byte is not stored; it is derived on demand.

use serde::{Serialize, Deserialize};

/// "No value" marker for levels, scenes and the short address.
pub const MASK: u8 = 0xFF;
/// Largest arc power level a gear may be set to.
pub const MAX_ARC_LEVEL: u8 = 254;
/// Largest value of the 4-bit fade time and fade rate registers.
pub const MAX_FADE: u8 = 15;

/// Status byte flags.
pub mod status {
    pub const GEAR_FAILURE: u8 = 0x01;
    pub const LAMP_FAILURE: u8 = 0x02;
    pub const LAMP_ON: u8 = 0x04;
    pub const LIMIT_ERROR: u8 = 0x08;
    pub const FADE_RUNNING: u8 = 0x10;
    pub const RESET_STATE: u8 = 0x20;
    pub const NO_ADDRESS: u8 = 0x40;
    pub const POWER_CYCLE: u8 = 0x80;
}

/// The register file of one control gear.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Short address (0-63), or [`MASK`] when unassigned.
    pub short_address: u8,
    /// 24-bit random address used during address assignment.
    pub random_address: u32,
    /// Group membership, bit n = group n.
    pub groups: u16,
    /// Scene levels, [`MASK`] when the gear is not part of the scene.
    pub scenes: [u8; 16],

    pub actual_level: u8,
    pub power_on_level: u8,
    pub system_failure_level: u8,
    pub min_level: u8,
    pub max_level: u8,

    pub fade_time: u8,
    pub fade_rate: u8,

    pub dtr: u8,
    pub dtr1: u8,
    pub dtr2: u8,

    /// Set at power-on, cleared by the first arc power command.
    pub power_failure: bool,
}

impl Registers {
    /// Power-on register contents: everything zero, power failure set.
    pub fn new() -> Self {
        Self {
            short_address: 0,
            random_address: 0,
            groups: 0,
            scenes: [0; 16],
            actual_level: 0,
            power_on_level: 0,
            system_failure_level: 0,
            min_level: 0,
            max_level: 0,
            fade_time: 0,
            fade_rate: 0,
            dtr: 0,
            dtr1: 0,
            dtr2: 0,
            power_failure: true,
        }
    }

    /// Apply the values a RESET command restores.
    ///
    /// The short address and random address survive a reset.
    pub fn reset_values(&mut self, physical_min_level: u8) {
        self.actual_level = MAX_ARC_LEVEL;
        self.power_on_level = MAX_ARC_LEVEL;
        self.system_failure_level = MAX_ARC_LEVEL;
        self.min_level = physical_min_level;
        self.max_level = MAX_ARC_LEVEL;
        self.fade_time = 0;
        self.fade_rate = 7;
        self.scenes = [MASK; 16];
        self.groups = 0;
    }

    /// Derive the status byte from the current register contents.
    pub fn status(&self) -> u8 {
        let mut value = 0;
        if self.actual_level > 0 {
            value |= status::LAMP_ON;
        }
        if self.short_address == MASK {
            value |= status::NO_ADDRESS;
        }
        if self.power_failure {
            value |= status::POWER_CYCLE;
        }
        value
    }

    /// Whether the gear belongs to `group` (0-15).
    #[inline]
    pub fn in_group(&self, group: u8) -> bool {
        self.groups & (1 << (group & 0x0F)) != 0
    }

    /// Group bits 0-7.
    #[inline]
    pub fn groups_low(&self) -> u8 {
        self.groups as u8
    }

    /// Group bits 8-15.
    #[inline]
    pub fn groups_high(&self) -> u8 {
        (self.groups >> 8) as u8
    }

    /// Clamp a level into the configured `[min, max]` window.
    pub fn clamp_level(&self, level: u8) -> u8 {
        level.max(self.min_level).min(self.max_level)
    }

    /// Store the transfer register as max level.
    ///
    /// 0xFF maps to 254; anything at or below the min level pins to it.
    pub fn store_dtr_as_max_level(&mut self) {
        self.max_level = if self.dtr == MASK {
            MAX_ARC_LEVEL
        } else if self.dtr > self.min_level {
            self.dtr
        } else {
            self.min_level
        };
    }

    /// Store the transfer register as min level, bounded by the physical
    /// minimum below and the max level above.
    pub fn store_dtr_as_min_level(&mut self, physical_min_level: u8) {
        self.min_level = if self.dtr < physical_min_level {
            physical_min_level
        } else if self.dtr > self.max_level {
            self.max_level
        } else {
            self.dtr
        };
    }

    pub fn store_dtr_as_fade_time(&mut self) {
        self.fade_time = self.dtr.min(MAX_FADE);
    }

    pub fn store_dtr_as_fade_rate(&mut self) {
        self.fade_rate = self.dtr.min(MAX_FADE);
    }

    /// Store the transfer register as short address.
    ///
    /// Returns false when DTR holds neither `0AAAAAA1` nor 0xFF.
    pub fn store_dtr_as_short_address(&mut self) -> bool {
        if self.dtr == MASK {
            self.short_address = MASK;
            true
        } else if self.dtr & 0x81 == 0x01 {
            self.short_address = self.dtr >> 1;
            true
        } else {
            false
        }
    }

    /// Fade time and rate packed as the query answers them.
    pub fn fade_time_rate(&self) -> u8 {
        (self.fade_time << 4) | (self.fade_rate & 0x0F)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
