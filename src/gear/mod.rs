//! DALI control gear logic.
//!
//! This module implements the gear side of IEC 62386-102:
//! - the register file with its clamping rules
//! - the opcode decoder and per-device-type profiles
//! - the execution state machine, including the FRAM restore at power-on
//!   and the writeback of changed configuration

pub mod registers;
pub mod decode;
pub mod device;
pub mod persist;
pub mod execute;

pub use registers::Registers;
pub use decode::{decode, Command};
pub use device::{profile_for, DeviceCommand, DeviceProfile, LedProfile};
pub use persist::{DirtySet, PersistMap, Persisted, PERSIST_BYTES};
pub use execute::{Addressing, Gear, GearInputs, GearOutputs, GearState};
