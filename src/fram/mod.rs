//! FRAM persistence controller.
//!
//! Two layers:
//! - [`spi::SpiBus`] shifts single bytes over the serial bus
//! - [`Fram`] sequences those bytes into FRAM commands: write-enable,
//!   opcode, 11-bit address and one data byte, framed by chip select

pub mod spi;

use log::{trace, warn};
use serde::{Serialize, Deserialize};
use spi::{SpiBus, SpiInputs, SpiOutputs};

/// Addressable bytes in the FRAM.
pub const FRAM_SIZE: usize = 2048;
/// Mask for the 11-bit FRAM address.
pub const ADDRESS_MASK: u16 = 0x07FF;

/// FRAM command opcodes.
pub mod opcode {
    pub const WRITE_ENABLE: u8 = 0b0000_0110;
    pub const WRITE_DISABLE: u8 = 0b0000_0100;
    pub const READ_STATUS: u8 = 0b0000_0101;
    pub const WRITE_STATUS: u8 = 0b0000_0001;
    pub const READ: u8 = 0b0000_0011;
    pub const WRITE: u8 = 0b0000_0010;
}

/// One byte-sized FRAM transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramRequest {
    Read { address: u16 },
    Write { address: u16, data: u8 },
}

impl FramRequest {
    pub fn address(&self) -> u16 {
        match *self {
            FramRequest::Read { address } | FramRequest::Write { address, .. } => address,
        }
    }
}

/// Pin levels driven towards the FRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiPins {
    /// Chip select, true while the chip is selected.
    pub cs: bool,
    pub clk: bool,
    pub copi: bool,
    /// Output enable for `copi`; released while reading data.
    pub copi_oe: bool,
}

impl Default for SpiPins {
    fn default() -> Self {
        Self {
            cs: false,
            clk: true,
            copi: false,
            copi_oe: true,
        }
    }
}

/// Sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramState {
    Idle,
    /// Sending the write-enable opcode.
    WriteEnable,
    /// Waiting for write-enable to finish, then deselecting.
    WaitWriteEnable,
    /// Reselecting the chip for the write command.
    Write,
    /// Sending the read/write opcode.
    IssueCmd,
    /// Sending address bits 10:8.
    IssueAddrHigh,
    /// Sending address bits 7:0.
    IssueAddrLow,
    /// Exchanging the data byte.
    IssueData,
    /// Waiting for the data byte, then completing.
    IssueDataWait,
}

/// Inputs to [`Fram::step`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FramInputs {
    /// Request strobe.
    pub request: Option<FramRequest>,
    /// `cipo` pin level.
    pub cipo: bool,
}

/// Outputs from [`Fram::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramOutputs {
    /// Completion pulse; carries the byte read (or shifted in on a write).
    pub complete: Option<u8>,
}

/// FRAM command sequencer.
///
/// Accepts one [`FramRequest`] at a time. The embedded [`SpiBus`] is
/// stepped alongside and, like every other machine, sees the sequencer's
/// strobes one tick after they are raised.
#[derive(Debug, Clone)]
pub struct Fram {
    state: FramState,
    bus: SpiBus,
    bus_out: SpiOutputs,
    begin: Option<u8>,
    command: u8,
    address: u16,
    data: u8,
    cs: bool,
    copi_oe: bool,
}

impl Fram {
    pub fn new() -> Self {
        Self {
            state: FramState::Idle,
            bus: SpiBus::new(),
            bus_out: SpiOutputs::default(),
            begin: None,
            command: opcode::READ,
            address: 0,
            data: 0,
            cs: false,
            copi_oe: true,
        }
    }

    pub fn state(&self) -> FramState {
        self.state
    }

    /// True while a transaction is outstanding.
    pub fn is_busy(&self) -> bool {
        self.state != FramState::Idle
    }

    /// Current pin levels.
    pub fn pins(&self) -> SpiPins {
        SpiPins {
            cs: self.cs,
            clk: self.bus.clk(),
            copi: self.bus.copi(),
            copi_oe: self.copi_oe,
        }
    }

    /// Advance one tick.
    pub fn step(&mut self, inputs: FramInputs) -> FramOutputs {
        // Both layers see each other's previous-tick strobes.
        let bus_complete = self.bus_out.complete;
        let bus_out = self.bus.step(SpiInputs {
            begin: self.begin.take(),
            cipo: inputs.cipo,
        });

        if self.state != FramState::Idle {
            if let Some(request) = inputs.request {
                warn!("fram: {:?} while busy, dropped", request);
            }
        }

        let mut outputs = FramOutputs::default();
        match self.state {
            FramState::Idle => match inputs.request {
                Some(FramRequest::Read { address }) => {
                    trace!("fram: read {:03x}", address);
                    self.address = address & ADDRESS_MASK;
                    self.command = opcode::READ;
                    self.cs = true;
                    self.state = FramState::IssueCmd;
                }
                Some(FramRequest::Write { address, data }) => {
                    trace!("fram: write {:03x} <- {:02x}", address, data);
                    self.address = address & ADDRESS_MASK;
                    self.data = data;
                    self.state = FramState::WriteEnable;
                }
                None => {}
            },

            FramState::WriteEnable => {
                self.cs = true;
                self.begin = Some(opcode::WRITE_ENABLE);
                self.state = FramState::WaitWriteEnable;
            }

            FramState::WaitWriteEnable => {
                if bus_complete.is_some() {
                    self.cs = false;
                    self.state = FramState::Write;
                }
            }

            FramState::Write => {
                self.command = opcode::WRITE;
                self.cs = true;
                self.state = FramState::IssueCmd;
            }

            FramState::IssueCmd => {
                self.copi_oe = true;
                self.begin = Some(self.command);
                self.state = FramState::IssueAddrHigh;
            }

            FramState::IssueAddrHigh => {
                if bus_complete.is_some() {
                    self.begin = Some((self.address >> 8) as u8 & 0x07);
                    self.state = FramState::IssueAddrLow;
                }
            }

            FramState::IssueAddrLow => {
                if bus_complete.is_some() {
                    self.begin = Some(self.address as u8);
                    self.state = FramState::IssueData;
                }
            }

            FramState::IssueData => {
                if bus_complete.is_some() {
                    if self.command == opcode::READ {
                        self.copi_oe = false;
                        self.begin = Some(0);
                    } else {
                        self.begin = Some(self.data);
                    }
                    self.state = FramState::IssueDataWait;
                }
            }

            FramState::IssueDataWait => {
                if let Some(byte) = bus_complete {
                    self.cs = false;
                    self.copi_oe = true;
                    outputs.complete = Some(byte);
                    self.state = FramState::Idle;
                }
            }
        }

        self.bus_out = bus_out;
        outputs
    }
}

impl Default for Fram {
    fn default() -> Self {
        Self::new()
    }
}
