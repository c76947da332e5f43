//! Command execution state machine.
//!
//! The gear spends its life in [`GearState::Idle`] waiting for a forward
//! frame. An accepted frame walks through address resolution, arc power
//! dispatch, decoding and execution, one state per tick. Queries hand a
//! byte to the transmitter and wait for it to go out; configuration
//! writes are persisted one FRAM slot at a time before the gear listens
//! again. At power-on every persisted slot is read back before the first
//! frame is accepted.

use crate::config::{ConfigError, GearConfig};
use crate::dali::RxFrame;
use crate::fram::FramRequest;
use crate::gear::decode::{self, Command};
use crate::gear::device::{self, DeviceProfile};
use crate::gear::persist::{self, DirtySet, PersistMap, Persisted, PERSIST_BYTES};
use crate::gear::registers::{Registers, MASK};
use log::{debug, trace};
use serde::{Serialize, Deserialize};

/// Affirmative answer to a yes/no query. "No" is silence.
pub const YES: u8 = 0xFF;
/// Answer to QUERY VERSION NUMBER.
pub const VERSION_NUMBER: u8 = 1;

/// Special command address bytes.
pub mod special {
    /// DATA TRANSFER REGISTER (DTR0).
    pub const DTR: u8 = 0xA3;
    /// DATA TRANSFER REGISTER 1.
    pub const DTR1: u8 = 0xC3;
    /// DATA TRANSFER REGISTER 2.
    pub const DTR2: u8 = 0xC5;
}

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearState {
    /// Power-on entry point.
    Startup,
    /// Requesting the next persisted slot.
    BeginRead,
    /// Waiting for the slot to arrive.
    WaitRead,
    /// Storing the slot into the register file.
    StoreRead,
    Reset,
    /// Listening for forward frames.
    Idle,
    /// Resolving the address byte.
    Address,
    /// Separating direct arc power from commands.
    Dispatch,
    Decode,
    Execute,
    /// Waiting for the reply to finish transmitting.
    Wait,
    /// Writing the next dirty slot.
    Writeback,
    /// Waiting for the slot write to complete.
    WritebackWait,
}

/// How the address byte of a frame was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Addressing {
    Short(u8),
    Group(u8),
    Broadcast,
    Special(u8),
}

impl Addressing {
    /// Classify an address byte.
    pub fn classify(address: u8) -> Self {
        if address & 0x80 == 0 {
            Addressing::Short((address >> 1) & 0x3F)
        } else if address & 0xE0 == 0x80 {
            Addressing::Group((address >> 1) & 0x0F)
        } else if address | 0x01 == 0xFF {
            Addressing::Broadcast
        } else {
            Addressing::Special(address)
        }
    }
}

/// Inputs to [`Gear::step`], all produced on the previous tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct GearInputs {
    /// Frame-available pulse from the receiver.
    pub frame: Option<RxFrame>,
    /// Send-complete pulse from the transmitter.
    pub send_complete: bool,
    /// Completion pulse from the FRAM sequencer.
    pub persist_complete: Option<u8>,
}

/// Outputs from [`Gear::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GearOutputs {
    /// Send strobe for the transmitter.
    pub send: Option<u8>,
    /// Request strobe for the FRAM sequencer.
    pub persist: Option<FramRequest>,
}

/// Result of executing one command.
enum Outcome {
    Done,
    Reply(u8),
    Persist,
}

/// The command execution machine and the register file it owns.
#[derive(Debug, Clone)]
pub struct Gear {
    /// Register file.
    pub regs: Registers,
    state: GearState,
    profile: &'static dyn DeviceProfile,
    map: PersistMap,
    physical_min_level: u8,
    dirty: DirtySet,
    /// Startup restore cursor.
    slot: usize,
    restored: u8,
    frame: u16,
    command: Command,
    reply: u8,
}

impl Gear {
    /// Build a gear in its power-on state.
    pub fn new(config: &GearConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            regs: Registers::new(),
            state: GearState::Startup,
            profile: device::profile_for(config.device_type)?,
            map: PersistMap::new(config.persist_base),
            physical_min_level: config.physical_min_level,
            dirty: DirtySet::new(),
            slot: 0,
            restored: 0,
            frame: 0,
            command: Command::Nop,
            reply: 0,
        })
    }

    pub fn state(&self) -> GearState {
        self.state
    }

    pub fn profile(&self) -> &'static dyn DeviceProfile {
        self.profile
    }

    pub fn persist_map(&self) -> PersistMap {
        self.map
    }

    /// Last byte handed to the transmitter.
    pub fn reply(&self) -> u8 {
        self.reply
    }

    /// Whether frames are currently being accepted.
    pub fn is_idle(&self) -> bool {
        self.state == GearState::Idle
    }

    /// Advance one tick.
    pub fn step(&mut self, inputs: GearInputs) -> GearOutputs {
        let mut outputs = GearOutputs::default();

        match self.state {
            // ==================== Startup Restore ====================

            GearState::Startup => {
                debug!("gear: restoring {} persisted bytes from {:#05x}", PERSIST_BYTES, self.map.base());
                self.slot = 0;
                self.state = GearState::BeginRead;
            }

            GearState::BeginRead => {
                if self.slot < PERSIST_BYTES {
                    outputs.persist = Some(FramRequest::Read { address: self.map.address(self.slot) });
                    self.state = GearState::WaitRead;
                } else {
                    self.state = GearState::Reset;
                }
            }

            GearState::WaitRead => {
                if let Some(byte) = inputs.persist_complete {
                    self.restored = byte;
                    self.state = GearState::StoreRead;
                }
            }

            GearState::StoreRead => {
                trace!("gear: slot {} <- {:02x}", self.slot, self.restored);
                persist::restore_slot(&mut self.regs, self.slot, self.restored);
                self.slot += 1;
                self.state = GearState::BeginRead;
            }

            GearState::Reset => {
                debug!("gear: ready");
                self.state = GearState::Idle;
            }

            // ==================== Frame Handling ====================

            GearState::Idle => {
                if let Some(frame) = inputs.frame {
                    if frame.error {
                        debug!("gear: dropping garbled frame {:04x}", frame.data);
                    } else {
                        self.frame = frame.data;
                        self.state = GearState::Address;
                    }
                }
            }

            GearState::Address => {
                let address = (self.frame >> 8) as u8;
                self.state = match Addressing::classify(address) {
                    Addressing::Short(short) if short == self.regs.short_address => GearState::Dispatch,
                    Addressing::Group(group) if self.regs.in_group(group) => GearState::Dispatch,
                    Addressing::Broadcast => GearState::Dispatch,
                    Addressing::Special(address) => {
                        self.special_command(address, self.frame as u8);
                        GearState::Idle
                    }
                    _ => GearState::Idle,
                };
            }

            GearState::Dispatch => {
                if self.frame & 0x0100 == 0 {
                    self.direct_arc_power(self.frame as u8);
                    self.state = GearState::Idle;
                } else {
                    self.state = GearState::Decode;
                }
            }

            GearState::Decode => {
                self.command = decode::decode(self.frame as u8, self.profile);
                self.state = GearState::Execute;
            }

            GearState::Execute => {
                debug!("gear: {:?}", self.command);
                self.state = match self.execute(self.command) {
                    Outcome::Done => GearState::Idle,
                    Outcome::Reply(byte) => {
                        self.reply = byte;
                        outputs.send = Some(byte);
                        GearState::Wait
                    }
                    Outcome::Persist => GearState::Writeback,
                };
            }

            GearState::Wait => {
                if inputs.send_complete {
                    self.state = GearState::Idle;
                }
            }

            // ==================== Writeback ====================

            GearState::Writeback => {
                match self.dirty.take_lowest().and_then(|slot| {
                    persist::read_slot(&self.regs, slot).map(|data| (slot, data))
                }) {
                    Some((slot, data)) => {
                        trace!("gear: slot {} -> {:02x}", slot, data);
                        outputs.persist = Some(FramRequest::Write { address: self.map.address(slot), data });
                        self.state = GearState::WritebackWait;
                    }
                    None => self.state = GearState::Idle,
                }
            }

            GearState::WritebackWait => {
                if inputs.persist_complete.is_some() {
                    self.state = GearState::Writeback;
                }
            }
        }

        outputs
    }

    /// Commands sent to special addresses.
    fn special_command(&mut self, address: u8, data: u8) {
        match address {
            special::DTR => self.regs.dtr = data,
            special::DTR1 => self.regs.dtr1 = data,
            special::DTR2 => self.regs.dtr2 = data,
            other => trace!("gear: ignoring special command {:02x}", other),
        }
    }

    /// DIRECT ARC POWER CONTROL. 0xFF means "no change".
    fn direct_arc_power(&mut self, level: u8) {
        if level != MASK {
            self.set_arc_level(level);
        }
    }

    /// Move to a level at once: 0 switches off, anything else is clamped.
    fn set_arc_level(&mut self, level: u8) {
        self.regs.actual_level = if level == 0 { 0 } else { self.regs.clamp_level(level) };
        self.regs.power_failure = false;
    }

    fn execute(&mut self, command: Command) -> Outcome {
        let regs = &mut self.regs;
        let answer = |condition: bool| if condition { Outcome::Reply(YES) } else { Outcome::Done };

        match command {
            // ==================== Arc Power ====================

            Command::Off => {
                self.set_arc_level(0);
                Outcome::Done
            }
            Command::Up | Command::StepUp => {
                let level = regs.actual_level;
                if level != 0 && level < regs.max_level {
                    self.set_arc_level(level + 1);
                }
                Outcome::Done
            }
            Command::Down | Command::StepDown => {
                let level = regs.actual_level;
                if level != 0 && level > regs.min_level {
                    self.set_arc_level(level - 1);
                }
                Outcome::Done
            }
            Command::RecallMaxLevel => {
                let level = regs.max_level;
                self.set_arc_level(level);
                Outcome::Done
            }
            Command::RecallMinLevel => {
                let level = regs.min_level;
                self.set_arc_level(level);
                Outcome::Done
            }
            Command::StepDownAndOff => {
                let level = regs.actual_level;
                if level <= regs.min_level {
                    self.set_arc_level(0);
                } else {
                    self.set_arc_level(level - 1);
                }
                Outcome::Done
            }
            Command::OnAndStepUp => {
                let level = regs.actual_level;
                if level == 0 {
                    let min = regs.min_level;
                    self.set_arc_level(min);
                } else if level < regs.max_level {
                    self.set_arc_level(level + 1);
                }
                Outcome::Done
            }
            Command::GoToScene(n) => {
                let level = regs.scenes[usize::from(n & 0x0F)];
                if level != MASK {
                    self.set_arc_level(level);
                }
                Outcome::Done
            }

            // ==================== Configuration ====================

            Command::Reset => {
                regs.reset_values(self.physical_min_level);
                self.dirty.mark_all();
                Outcome::Persist
            }
            Command::StoreActualLevelInDtr => {
                regs.dtr = regs.actual_level;
                Outcome::Done
            }
            Command::StoreDtrAsMaxLevel => {
                regs.store_dtr_as_max_level();
                self.dirty.mark_register(Persisted::MaxLevel);
                Outcome::Persist
            }
            Command::StoreDtrAsMinLevel => {
                regs.store_dtr_as_min_level(self.physical_min_level);
                self.dirty.mark_register(Persisted::MinLevel);
                Outcome::Persist
            }
            Command::StoreDtrAsSystemFailureLevel => {
                regs.system_failure_level = regs.dtr;
                self.dirty.mark_register(Persisted::SystemFailureLevel);
                Outcome::Persist
            }
            Command::StoreDtrAsPowerOnLevel => {
                regs.power_on_level = regs.dtr;
                self.dirty.mark_register(Persisted::PowerOnLevel);
                Outcome::Persist
            }
            Command::StoreDtrAsFadeTime => {
                regs.store_dtr_as_fade_time();
                self.dirty.mark_register(Persisted::FadeTime);
                Outcome::Persist
            }
            Command::StoreDtrAsFadeRate => {
                regs.store_dtr_as_fade_rate();
                self.dirty.mark_register(Persisted::FadeRate);
                Outcome::Persist
            }
            Command::StoreDtrAsScene(n) => {
                let n = usize::from(n & 0x0F);
                regs.scenes[n] = regs.dtr;
                self.dirty.mark(Persisted::Scenes.slot(n));
                Outcome::Persist
            }
            Command::RemoveFromScene(n) => {
                let n = usize::from(n & 0x0F);
                regs.scenes[n] = MASK;
                self.dirty.mark(Persisted::Scenes.slot(n));
                Outcome::Persist
            }
            Command::AddToGroup(n) => {
                regs.groups |= 1 << (n & 0x0F);
                self.dirty.mark(Persisted::Groups.slot(usize::from(n & 0x0F) / 8));
                Outcome::Persist
            }
            Command::RemoveFromGroup(n) => {
                regs.groups &= !(1 << (n & 0x0F));
                self.dirty.mark(Persisted::Groups.slot(usize::from(n & 0x0F) / 8));
                Outcome::Persist
            }
            Command::StoreDtrAsShortAddress => {
                if regs.store_dtr_as_short_address() {
                    self.dirty.mark_register(Persisted::ShortAddress);
                }
                Outcome::Persist
            }

            // ==================== Queries ====================

            Command::QueryStatus => Outcome::Reply(regs.status()),
            Command::QueryControlGearPresent => Outcome::Reply(YES),
            Command::QueryLampFailure | Command::QueryLimitError | Command::QueryResetState => Outcome::Done,
            Command::QueryLampPowerOn => answer(regs.actual_level > 0),
            Command::QueryMissingShortAddress => answer(regs.short_address == MASK),
            Command::QueryVersionNumber => Outcome::Reply(VERSION_NUMBER),
            Command::QueryContentDtr => Outcome::Reply(regs.dtr),
            Command::QueryDeviceType => Outcome::Reply(self.profile.device_type()),
            Command::QueryPhysicalMinimum => Outcome::Reply(self.physical_min_level),
            Command::QueryPowerFailure => answer(regs.power_failure),
            Command::QueryContentDtr1 => Outcome::Reply(regs.dtr1),
            Command::QueryContentDtr2 => Outcome::Reply(regs.dtr2),
            Command::QueryActualLevel => Outcome::Reply(regs.actual_level),
            Command::QueryMaxLevel => Outcome::Reply(regs.max_level),
            Command::QueryMinLevel => Outcome::Reply(regs.min_level),
            Command::QueryPowerOnLevel => Outcome::Reply(regs.power_on_level),
            Command::QuerySystemFailureLevel => Outcome::Reply(regs.system_failure_level),
            Command::QueryFadeTimeRate => Outcome::Reply(regs.fade_time_rate()),
            Command::QuerySceneLevel(n) => Outcome::Reply(regs.scenes[usize::from(n & 0x0F)]),
            Command::QueryGroupsZeroToSeven => Outcome::Reply(regs.groups_low()),
            Command::QueryGroupsEightToFifteen => Outcome::Reply(regs.groups_high()),
            Command::QueryRandomAddressH => Outcome::Reply((regs.random_address >> 16) as u8),
            Command::QueryRandomAddressM => Outcome::Reply((regs.random_address >> 8) as u8),
            Command::QueryRandomAddressL => Outcome::Reply(regs.random_address as u8),

            // ==================== Other ====================

            Command::DeviceSpecific(command) => match self.profile.execute(command, regs) {
                Some(byte) => Outcome::Reply(byte),
                None => Outcome::Done,
            },

            // Memory banks are not modelled.
            Command::EnableWriteMemory | Command::ReadMemoryLocation => Outcome::Done,
            Command::EnableDapcSequence | Command::Nop => Outcome::Done,
        }
    }
}
