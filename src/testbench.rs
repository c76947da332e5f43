//! Test bench shared by the unit tests: a DALI bus driver and recorder, a
//! behavioural SPI FRAM and a harness wiring both to a [`ControlGear`].

use crate::config::GearConfig;
use crate::dali::RxFrame;
use crate::fram::{opcode, SpiPins, ADDRESS_MASK, FRAM_SIZE};
use crate::system::{ControlGear, TickInputs};

/// Half-bit levels of a forward frame: start bit, 16 data bits MSB first
/// and two idle-high stop bits.
pub fn forward_halves(data: u16) -> Vec<bool> {
    let mut halves = vec![false, true];
    for i in (0..16).rev() {
        let bit = (data >> i) & 1 != 0;
        halves.push(bit);
        halves.push(!bit);
    }
    halves.extend([true; 4]);
    halves
}

/// Decode the first backward frame in a per-tick TX trace.
///
/// Returns `None` if the line never goes low. Panics on a malformed frame.
pub fn decode_backward(trace: &[bool], half: u32) -> Option<u8> {
    let start = trace.iter().position(|&level| !level)?;
    let half = half as usize;
    let sample = |h: usize| {
        let index = start + h * half + half / 2;
        assert!(index < trace.len(), "trace ends inside the backward frame");
        trace[index]
    };

    assert_eq!((sample(0), sample(1)), (false, true), "bad start bit");
    let mut byte = 0u8;
    for bit in 0..8 {
        let first = sample(2 + bit * 2);
        let second = sample(3 + bit * 2);
        assert_ne!(first, second, "bit {} is not Manchester coded", bit);
        byte = (byte << 1) | u8::from(first);
    }
    for h in 18..22 {
        assert!(sample(h), "stop half {} is low", h);
    }
    Some(byte)
}

/// Behavioural model of an SPI FRAM with 11-bit addressing.
///
/// Samples `copi` on rising clock edges, drives `cipo` on falling edges
/// and records every chip-select framed transaction.
#[derive(Debug, Clone)]
pub struct FramChip {
    memory: Vec<u8>,
    commands: Vec<Vec<u8>>,
    current: Vec<u8>,
    selected: bool,
    prev_clk: bool,
    shift: u8,
    bits: u8,
    write_enabled: bool,
    address: usize,
    out: Option<u8>,
    cipo: bool,
}

impl FramChip {
    pub fn new() -> Self {
        Self {
            memory: vec![0; FRAM_SIZE],
            commands: Vec::new(),
            current: Vec::new(),
            selected: false,
            prev_clk: true,
            shift: 0,
            bits: 0,
            write_enabled: false,
            address: 0,
            out: None,
            cipo: false,
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Completed transactions, one byte list per chip-select assertion.
    pub fn commands(&self) -> &[Vec<u8>] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Advance one tick with the controller's pins; returns `cipo`.
    pub fn step(&mut self, pins: SpiPins) -> bool {
        if !pins.cs {
            if self.selected {
                self.deselect();
            }
            self.prev_clk = pins.clk;
            return self.cipo;
        }

        if !self.selected {
            self.selected = true;
            self.current.clear();
            self.shift = 0;
            self.bits = 0;
            self.out = None;
        }

        if self.prev_clk && !pins.clk {
            if let Some(out) = self.out.as_mut() {
                self.cipo = *out & 0x80 != 0;
                *out <<= 1;
            }
        }

        if !self.prev_clk && pins.clk {
            if !pins.copi_oe {
                assert!(!self.current.is_empty(), "copi released during opcode");
            }
            self.shift = (self.shift << 1) | u8::from(pins.copi);
            self.bits += 1;
            if self.bits == 8 {
                let byte = self.shift;
                self.bits = 0;
                self.current.push(byte);
                self.on_byte(byte);
            }
        }

        self.prev_clk = pins.clk;
        self.cipo
    }

    fn on_byte(&mut self, byte: u8) {
        let len = self.current.len();
        match self.current[0] {
            opcode::WRITE_ENABLE if len == 1 => self.write_enabled = true,
            opcode::WRITE_DISABLE if len == 1 => self.write_enabled = false,
            opcode::READ | opcode::WRITE if len == 3 => {
                let high = usize::from(self.current[1] & 0x07);
                self.address = (high << 8 | usize::from(self.current[2])) & usize::from(ADDRESS_MASK);
                if self.current[0] == opcode::READ {
                    self.out = Some(self.memory[self.address]);
                }
            }
            opcode::READ if len > 3 => {
                self.address = (self.address + 1) % FRAM_SIZE;
                self.out = Some(self.memory[self.address]);
            }
            opcode::WRITE if len > 3 => {
                if self.write_enabled {
                    self.memory[self.address] = byte;
                }
                self.address = (self.address + 1) % FRAM_SIZE;
            }
            _ => {}
        }
    }

    fn deselect(&mut self) {
        self.selected = false;
        self.out = None;
        let transaction = std::mem::take(&mut self.current);
        if transaction.first() == Some(&opcode::WRITE) {
            self.write_enabled = false;
        }
        if !transaction.is_empty() {
            self.commands.push(transaction);
        }
    }
}

/// Idle half-bits [`Bench::send_halves`] drives before a frame.
pub const LEAD_HALVES: usize = 4;
/// Idle half-bits [`Bench::send_halves`] drives after a frame.
pub const TAIL_HALVES: usize = 40;

/// A [`ControlGear`] on a DALI bus with an SPI FRAM attached.
pub struct Bench {
    pub gear: ControlGear,
    pub chip: FramChip,
    cipo: bool,
    half: u32,
    /// TX line level per tick since the last [`send`](Self::send).
    pub tx: Vec<bool>,
    /// Reply pulses since the last [`send`](Self::send).
    pub replies: Vec<u8>,
    /// Frames the receiver produced since the last [`send`](Self::send).
    pub frames: Vec<RxFrame>,
}

impl Bench {
    /// 19.2 kHz tick, 8 ticks per half-bit.
    pub fn config() -> GearConfig {
        GearConfig { clock_frequency: 19_200, ..GearConfig::default() }
    }

    pub fn new() -> Self {
        Self::with_chip(Self::config(), FramChip::new())
    }

    pub fn with_chip(config: GearConfig, chip: FramChip) -> Self {
        let half = config.half_bit_ticks().unwrap();
        Self {
            gear: ControlGear::new(&config).unwrap(),
            chip,
            cipo: false,
            half,
            tx: Vec::new(),
            replies: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn tick(&mut self, rx: bool) {
        let outputs = self.gear.tick(TickInputs { dali_rx: rx, fram_cipo: self.cipo });
        self.cipo = self.chip.step(outputs.fram);
        self.tx.push(outputs.dali_tx);
        self.replies.extend(outputs.reply);
        self.frames.extend(outputs.frame);
    }

    pub fn drive(&mut self, halves: &[bool]) {
        for &level in halves {
            for _ in 0..self.half {
                self.tick(level);
            }
        }
    }

    pub fn idle(&mut self, halves: usize) {
        for _ in 0..halves * self.half as usize {
            self.tick(true);
        }
    }

    fn wait_ready(&mut self) {
        for _ in 0..1_000_000 {
            if self.gear.is_ready() {
                return;
            }
            self.tick(true);
        }
        panic!("gear stuck in {:?}", self.gear.state());
    }

    /// Run the startup restore to completion.
    pub fn boot(self) -> Self {
        let mut bench = self;
        bench.wait_ready();
        bench
    }

    /// Send raw half-bit levels and return the decoded reply, if any.
    pub fn send_halves(&mut self, halves: &[bool]) -> Option<u8> {
        self.tx.clear();
        self.replies.clear();
        self.frames.clear();
        self.idle(LEAD_HALVES);
        self.drive(halves);
        self.idle(TAIL_HALVES);
        self.wait_ready();

        let reply = decode_backward(&self.tx, self.half);
        assert_eq!(reply, self.replies.last().copied());
        reply
    }

    /// Send a forward frame and return the decoded reply, if any.
    pub fn send(&mut self, frame: u16) -> Option<u8> {
        self.send_halves(&forward_halves(frame))
    }
}
