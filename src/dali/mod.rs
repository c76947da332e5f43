//! DALI bus physical layer.
//!
//! The line is Manchester coded at a nominal 1200 baud. Forward frames
//! (control device to gear) carry 16 data bits, backward frames (gear to
//! control device) carry 8. Both start with a `0` start bit and end with
//! two idle-high stop bits.

pub mod manchester;
pub mod serial;

pub use manchester::{CodecMode, DecodedBit, ManchesterDecoder, ManchesterEncoder};
pub use serial::{Receiver, RxFrame, RxState, Serial, SerialInputs, SerialOutputs, Transmitter, TxState};

/// Nominal DALI bit rate.
pub const DALI_BAUD_RATE: u32 = 1200;
