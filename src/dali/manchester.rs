//! Manchester line coding for the DALI bus.
//!
//! Each logical bit occupies two half-bit periods. The first half carries
//! the bit value and the second half its complement, so every bit has a
//! transition in the middle. Stop bits are not Manchester coded: the line
//! simply idles high, which is what [`CodecMode::Stop`] expresses.

use serde::{Serialize, Deserialize};

/// How a half-bit pair is coded on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodecMode {
    /// Mid-bit transition coding (start and data bits).
    #[default]
    Data,
    /// Level passed straight through (stop bits / idle).
    Stop,
}

/// A bit recovered from a pair of half-bit samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedBit {
    /// Level sampled in the first half of the bit.
    pub value: bool,
    /// Whether the second half agreed with the coding mode.
    pub valid: bool,
}

/// Half-bit line encoder.
///
/// [`step`](Self::step) is called once per half-bit period by the
/// transmitter; the line level is then read back with [`line`](Self::line).
#[derive(Debug, Clone)]
pub struct ManchesterEncoder {
    latched: bool,
    second_half: bool,
    line: bool,
}

impl ManchesterEncoder {
    /// Create an encoder with the line idling high.
    pub fn new() -> Self {
        Self {
            latched: false,
            second_half: false,
            line: true,
        }
    }

    /// Advance by one half-bit.
    ///
    /// In [`CodecMode::Data`] the bit is latched on the first half and its
    /// complement driven on the second; `bit` is ignored on the second half.
    pub fn step(&mut self, bit: bool, mode: CodecMode) {
        match mode {
            CodecMode::Stop => {
                self.line = bit;
                self.second_half = false;
            }
            CodecMode::Data if !self.second_half => {
                self.latched = bit;
                self.line = bit;
                self.second_half = true;
            }
            CodecMode::Data => {
                self.line = !self.latched;
                self.second_half = false;
            }
        }
    }

    /// Current line level.
    #[inline]
    pub fn line(&self) -> bool {
        self.line
    }
}

impl Default for ManchesterEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Half-bit line decoder.
///
/// The decoder keeps no history beyond the current bit: the first sample
/// goes into a latch, the second produces the bit and its validity.
#[derive(Debug, Clone, Default)]
pub struct ManchesterDecoder {
    latch: bool,
    second_half: bool,
    last: DecodedBit,
}

impl ManchesterDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-align to the first half of a bit.
    pub fn reset(&mut self) {
        self.second_half = false;
        self.last = DecodedBit::default();
    }

    /// Feed one half-bit sample.
    ///
    /// Returns the decoded bit once both halves have been seen.
    pub fn sample(&mut self, level: bool, mode: CodecMode) -> Option<DecodedBit> {
        if !self.second_half {
            self.latch = level;
            self.second_half = true;
            return None;
        }

        let valid = match mode {
            CodecMode::Data => self.latch != level,
            CodecMode::Stop => self.latch == level,
        };
        self.second_half = false;
        self.last = DecodedBit { value: self.latch, valid };
        Some(self.last)
    }

    /// Value of the last completed bit.
    #[inline]
    pub fn value(&self) -> bool {
        self.last.value
    }

    /// Validity of the last completed bit.
    #[inline]
    pub fn valid(&self) -> bool {
        self.last.valid
    }
}
