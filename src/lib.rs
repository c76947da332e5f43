//! # Salvador
//!
//! A tick-accurate model of a DALI LED control gear.
//!
//! The gear listens for Manchester coded forward frames on the DALI bus,
//! executes the commands addressed to it and answers queries with backward
//! frames. Configuration registers are kept in an SPI FRAM and restored at
//! power-on. Every part is a synchronous state machine stepped once per
//! system clock tick through [`ControlGear::tick`].

pub mod config;
pub mod dali;
pub mod fram;
pub mod gear;
pub mod system;

#[cfg(test)]
pub(crate) mod testbench;

// Re-export commonly used types
pub use config::{ConfigError, GearConfig};
pub use dali::{RxFrame, Serial};
pub use fram::{Fram, FramRequest, SpiPins};
pub use gear::{Command, Gear, GearState, Registers};
pub use system::{ControlGear, TickInputs, TickOutputs};
