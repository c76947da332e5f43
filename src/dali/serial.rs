//! DALI frame engine.
//!
//! Two independent state machines share one bit-time divisor:
//! - [`Receiver`] assembles 16-bit forward frames from the RX line
//! - [`Transmitter`] sends 8-bit backward frames on the TX line
//!
//! Both advance exactly once per system tick. Their completion signals are
//! returned from `step` and only exist for that tick.

use crate::dali::manchester::{CodecMode, ManchesterDecoder, ManchesterEncoder};
use log::{debug, trace, warn};
use serde::{Serialize, Deserialize};

/// Data bits in a forward (control device to gear) frame.
pub const FORWARD_BITS: u8 = 16;
/// Data bits in a backward (gear to control device) frame.
pub const BACKWARD_BITS: u8 = 8;
/// Stop bits terminating every frame.
pub const STOP_BITS: u8 = 2;
/// Idle half-bits the transmitter waits before a backward frame. The
/// receiver reports a frame half a half-bit before its stop bits end, so
/// this keeps the start bit at least 7 half-bits clear of the forward frame.
pub const SETTLING_HALVES: u8 = 8;

/// A received forward frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxFrame {
    /// Address byte in the high half, opcode/data in the low half.
    pub data: u16,
    /// Set when any data or stop bit failed to decode.
    pub error: bool,
}

impl RxFrame {
    /// The address byte.
    #[inline]
    pub fn address(&self) -> u8 {
        (self.data >> 8) as u8
    }

    /// The opcode (or data) byte.
    #[inline]
    pub fn opcode(&self) -> u8 {
        self.data as u8
    }
}

/// Half-bit timer shared in shape by both directions.
#[derive(Debug, Clone)]
struct HalfBitTimer {
    period: u32,
    countdown: u32,
}

impl HalfBitTimer {
    fn new(period: u32) -> Self {
        Self { period, countdown: 0 }
    }

    /// Arm so that the first strobe fires after `delay` further ticks.
    fn arm(&mut self, delay: u32) {
        self.countdown = delay;
    }

    /// Advance one tick; true on the ticks where a half-bit step happens.
    fn tick(&mut self) -> bool {
        if self.countdown == 0 {
            self.countdown = self.period - 1;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }
}

/// Receive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RxState {
    /// Waiting for a falling edge.
    Idle,
    /// Sampling the start bit.
    Start,
    /// Validating the start bit.
    StartCheck,
    /// Shifting data bits.
    Shift,
    /// Sampling the stop bits.
    Stop,
}

/// Forward-frame receiver.
#[derive(Debug, Clone)]
pub struct Receiver {
    state: RxState,
    timer: HalfBitTimer,
    decoder: ManchesterDecoder,
    mode: CodecMode,
    prev_line: bool,
    shift: u16,
    bits: u8,
    stop_bits: u8,
    error: bool,
}

impl Receiver {
    /// Create a receiver for the given half-bit period (in ticks, >= 2).
    pub fn new(half_bit_ticks: u32) -> Self {
        Self {
            state: RxState::Idle,
            timer: HalfBitTimer::new(half_bit_ticks),
            decoder: ManchesterDecoder::new(),
            mode: CodecMode::Data,
            prev_line: true,
            shift: 0,
            bits: 0,
            stop_bits: 0,
            error: false,
        }
    }

    /// Current receive state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Advance one tick with the sampled RX line level.
    ///
    /// Returns the completed frame on the single tick it becomes available.
    pub fn step(&mut self, line: bool) -> Option<RxFrame> {
        let falling = self.prev_line && !line;
        self.prev_line = line;

        if self.state == RxState::Idle {
            if falling {
                // Sample in the middle of each half-bit.
                self.timer.arm(self.timer.period / 2 - 1);
                self.decoder.reset();
                self.mode = CodecMode::Data;
                self.state = RxState::Start;
            }
            return None;
        }

        let strobe = self.timer.tick();

        match self.state {
            RxState::Idle => None,

            RxState::Start => {
                if strobe && self.decoder.sample(line, self.mode).is_some() {
                    self.state = RxState::StartCheck;
                }
                None
            }

            RxState::StartCheck => {
                // The start bit is a 0 coded as low then high.
                if self.decoder.valid() && !self.decoder.value() {
                    self.shift = 0;
                    self.bits = 0;
                    self.error = false;
                    self.state = RxState::Shift;
                } else {
                    trace!("rx: invalid start bit, back to idle");
                    self.state = RxState::Idle;
                }
                None
            }

            RxState::Shift => {
                if !strobe {
                    return None;
                }
                if let Some(bit) = self.decoder.sample(line, self.mode) {
                    self.shift = (self.shift << 1) | u16::from(bit.value);
                    self.error |= !bit.valid;
                    self.bits += 1;
                    if self.bits == FORWARD_BITS {
                        self.mode = CodecMode::Stop;
                        self.stop_bits = 0;
                        self.state = RxState::Stop;
                    }
                }
                None
            }

            RxState::Stop => {
                if !strobe {
                    return None;
                }
                let bit = self.decoder.sample(line, self.mode)?;
                self.error |= !(bit.valid && bit.value);
                self.stop_bits += 1;
                if self.stop_bits < STOP_BITS {
                    return None;
                }
                self.state = RxState::Idle;
                let frame = RxFrame { data: self.shift, error: self.error };
                debug!("rx: frame {:04x} error={}", frame.data, frame.error);
                Some(frame)
            }
        }
    }
}

/// Transmit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// Line idle, waiting for a send strobe.
    Idle,
    /// Holding the line idle before the start bit.
    Settle,
    /// Driving the start bit.
    Start,
    /// Driving data bits, most significant first.
    Shift,
    /// Driving the stop bits.
    Stop,
}

/// Backward-frame transmitter.
#[derive(Debug, Clone)]
pub struct Transmitter {
    state: TxState,
    timer: HalfBitTimer,
    encoder: ManchesterEncoder,
    byte: u8,
    halves: u8,
}

impl Transmitter {
    /// Create a transmitter for the given half-bit period (in ticks, >= 2).
    pub fn new(half_bit_ticks: u32) -> Self {
        Self {
            state: TxState::Idle,
            timer: HalfBitTimer::new(half_bit_ticks),
            encoder: ManchesterEncoder::new(),
            byte: 0,
            halves: 0,
        }
    }

    /// Current transmit state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// TX line level.
    #[inline]
    pub fn line(&self) -> bool {
        self.encoder.line()
    }

    /// Advance one tick. `send` carries the byte on the strobe tick.
    ///
    /// Returns true on the single tick the frame completes.
    pub fn step(&mut self, send: Option<u8>) -> bool {
        if self.state == TxState::Idle {
            if let Some(byte) = send {
                trace!("tx: sending {:02x}", byte);
                self.byte = byte;
                self.halves = 0;
                self.timer.arm(0);
                self.state = TxState::Settle;
            }
            return false;
        }

        if let Some(byte) = send {
            warn!("tx: send strobe for {:02x} while busy, dropped", byte);
        }

        if !self.timer.tick() {
            return false;
        }

        match self.state {
            TxState::Idle => false,

            TxState::Settle => {
                self.halves += 1;
                if self.halves == SETTLING_HALVES {
                    self.halves = 0;
                    self.state = TxState::Start;
                }
                false
            }

            TxState::Start => {
                self.encoder.step(false, CodecMode::Data);
                self.halves += 1;
                if self.halves == 2 {
                    self.halves = 0;
                    self.state = TxState::Shift;
                }
                false
            }

            TxState::Shift => {
                let index = self.halves / 2;
                let bit = (self.byte >> (BACKWARD_BITS - 1 - index)) & 1 != 0;
                self.encoder.step(bit, CodecMode::Data);
                self.halves += 1;
                if self.halves == BACKWARD_BITS * 2 {
                    self.halves = 0;
                    self.state = TxState::Stop;
                }
                false
            }

            TxState::Stop => {
                if self.halves == STOP_BITS * 2 {
                    self.state = TxState::Idle;
                    return true;
                }
                self.encoder.step(true, CodecMode::Stop);
                self.halves += 1;
                false
            }
        }
    }
}

/// Inputs sampled by [`Serial`] on one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialInputs {
    /// RX line level.
    pub rx: bool,
    /// Send strobe carrying the reply byte.
    pub send: Option<u8>,
}

/// Outputs produced by [`Serial`] on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOutputs {
    /// Frame-available pulse.
    pub frame: Option<RxFrame>,
    /// Send-complete pulse.
    pub send_complete: bool,
    /// TX line level.
    pub tx: bool,
}

impl Default for SerialOutputs {
    fn default() -> Self {
        Self {
            frame: None,
            send_complete: false,
            tx: true,
        }
    }
}

/// The receive and transmit engines bound to one bit-time divisor.
#[derive(Debug, Clone)]
pub struct Serial {
    rx: Receiver,
    tx: Transmitter,
}

impl Serial {
    pub fn new(half_bit_ticks: u32) -> Self {
        Self {
            rx: Receiver::new(half_bit_ticks),
            tx: Transmitter::new(half_bit_ticks),
        }
    }

    /// Advance both engines by one tick.
    pub fn step(&mut self, inputs: SerialInputs) -> SerialOutputs {
        let frame = self.rx.step(inputs.rx);
        let send_complete = self.tx.step(inputs.send);
        SerialOutputs {
            frame,
            send_complete,
            tx: self.tx.line(),
        }
    }

    pub fn receiver(&self) -> &Receiver {
        &self.rx
    }

    pub fn transmitter(&self) -> &Transmitter {
        &self.tx
    }
}
