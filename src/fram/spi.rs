//! Raw SPI byte transaction engine.
//!
//! Shifts one byte out on `copi` and one byte in from `cipo`, most
//! significant bit first, in response to a begin strobe. The clock idles
//! high: `copi` changes on the falling edge and `cipo` is sampled on the
//! rising edge. Chip select belongs to the caller so that several bytes can
//! be framed into one command.

use serde::{Serialize, Deserialize};

/// Bus engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiState {
    Idle,
    /// Clock low, next bit driven on `copi`.
    ShiftLow,
    /// Clock high, `cipo` sampled.
    ShiftHigh,
    /// Byte done; completion is signalled on this tick.
    Finish,
}

/// Inputs to [`SpiBus::step`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpiInputs {
    /// Begin strobe carrying the byte to shift out.
    pub begin: Option<u8>,
    /// Level of the `cipo` pin.
    pub cipo: bool,
}

/// Outputs from [`SpiBus::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiOutputs {
    /// Completion pulse carrying the byte shifted in.
    pub complete: Option<u8>,
}

/// The byte shifter.
#[derive(Debug, Clone)]
pub struct SpiBus {
    state: SpiState,
    data: u8,
    received: u8,
    bits_left: u8,
    clk: bool,
    copi: bool,
}

impl SpiBus {
    pub fn new() -> Self {
        Self {
            state: SpiState::Idle,
            data: 0,
            received: 0,
            bits_left: 0,
            clk: true,
            copi: false,
        }
    }

    pub fn state(&self) -> SpiState {
        self.state
    }

    /// Clock pin level.
    #[inline]
    pub fn clk(&self) -> bool {
        self.clk
    }

    /// `copi` pin level.
    #[inline]
    pub fn copi(&self) -> bool {
        self.copi
    }

    /// Advance one tick.
    pub fn step(&mut self, inputs: SpiInputs) -> SpiOutputs {
        match self.state {
            SpiState::Idle => {
                if let Some(byte) = inputs.begin {
                    self.data = byte;
                    self.bits_left = 8;
                    self.state = SpiState::ShiftLow;
                }
                SpiOutputs::default()
            }
            SpiState::ShiftLow => {
                self.clk = false;
                self.copi = self.data & 0x80 != 0;
                self.data <<= 1;
                self.bits_left -= 1;
                self.state = SpiState::ShiftHigh;
                SpiOutputs::default()
            }
            SpiState::ShiftHigh => {
                self.clk = true;
                self.received = (self.received << 1) | u8::from(inputs.cipo);
                self.state = if self.bits_left == 0 {
                    SpiState::Finish
                } else {
                    SpiState::ShiftLow
                };
                SpiOutputs::default()
            }
            SpiState::Finish => {
                self.state = SpiState::Idle;
                SpiOutputs { complete: Some(self.received) }
            }
        }
    }
}

impl Default for SpiBus {
    fn default() -> Self {
        Self::new()
    }
}
