//! Top-level control gear.
//!
//! [`ControlGear`] owns the frame engine, the execution machine and the
//! FRAM controller and advances all of them once per [`tick`](ControlGear::tick).
//! Each machine sees the strobes the others raised on the previous tick;
//! the new outputs are latched only after every machine has stepped.

use crate::config::{ConfigError, GearConfig};
use crate::dali::{RxFrame, Serial, SerialInputs, SerialOutputs};
use crate::fram::{Fram, FramInputs, FramOutputs, SpiPins};
use crate::gear::{Gear, GearInputs, GearOutputs, GearState, Registers};
use log::debug;

/// Pin levels sampled at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInputs {
    pub dali_rx: bool,
    pub fram_cipo: bool,
}

impl Default for TickInputs {
    fn default() -> Self {
        Self { dali_rx: true, fram_cipo: false }
    }
}

/// Pin levels and observation pulses produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutputs {
    pub dali_tx: bool,
    pub fram: SpiPins,
    /// A forward frame finished arriving on this tick.
    pub frame: Option<RxFrame>,
    /// A reply finished transmitting on this tick.
    pub reply: Option<u8>,
}

/// A complete DALI control gear.
#[derive(Debug, Clone)]
pub struct ControlGear {
    gear: Gear,
    serial: Serial,
    fram: Fram,
    serial_out: SerialOutputs,
    gear_out: GearOutputs,
    fram_out: FramOutputs,
    ticks: u64,
}

impl ControlGear {
    /// Build a gear in its power-on state. The startup restore runs on
    /// the first ticks.
    pub fn new(config: &GearConfig) -> Result<Self, ConfigError> {
        let gear = Gear::new(config)?;
        let half_bit_ticks = config.half_bit_ticks()?;
        debug!(
            "control gear: type {} at {} baud, {} ticks per half-bit",
            config.device_type, config.baud_rate, half_bit_ticks
        );
        Ok(Self {
            gear,
            serial: Serial::new(half_bit_ticks),
            fram: Fram::new(),
            serial_out: SerialOutputs::default(),
            gear_out: GearOutputs::default(),
            fram_out: FramOutputs::default(),
            ticks: 0,
        })
    }

    /// Advance every machine by one tick.
    pub fn tick(&mut self, inputs: TickInputs) -> TickOutputs {
        let serial_out = self.serial.step(SerialInputs {
            rx: inputs.dali_rx,
            send: self.gear_out.send,
        });
        let fram_out = self.fram.step(FramInputs {
            request: self.gear_out.persist,
            cipo: inputs.fram_cipo,
        });
        let gear_out = self.gear.step(GearInputs {
            frame: self.serial_out.frame,
            send_complete: self.serial_out.send_complete,
            persist_complete: self.fram_out.complete,
        });

        self.serial_out = serial_out;
        self.fram_out = fram_out;
        self.gear_out = gear_out;
        self.ticks += 1;

        TickOutputs {
            dali_tx: serial_out.tx,
            fram: self.fram.pins(),
            frame: serial_out.frame,
            reply: serial_out.send_complete.then(|| self.gear.reply()),
        }
    }

    /// True once the startup restore is done and no command is in flight.
    pub fn is_ready(&self) -> bool {
        self.gear.is_idle()
    }

    pub fn state(&self) -> GearState {
        self.gear.state()
    }

    pub fn registers(&self) -> &Registers {
        &self.gear.regs
    }

    /// Ticks since power-on.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
