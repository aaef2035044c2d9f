//! Simulated keypad bus.
//!
//! Virtual time only moves inside [`SimDelay`]. While it moves, the delay
//! delivers the sampling tick every 52 µs and a pin-change interrupt on
//! every rising receive level, and lets the keypad model react to what the
//! driver put on the transmit line.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use keybus::consts::{BIT_US, TICK_US};
use keybus::encoding::line_levels;
use keybus::transport::KeypadBus;

const US: u64 = 1_000;
const BIT_NS: u64 = BIT_US as u64 * US;
const TICK_NS: u64 = TICK_US as u64 * US;
// Eleven bits plus the one bit guard.
const BYTE_SLOT_NS: u64 = 12 * BIT_NS;

/// A keys frame from keypad 16: two key bytes and a valid checksum.
pub const KEYS_FRAME: [u8; 5] = [0x50, 0x03, 0x01, 0x02, 0xAA];

/// Shared line state.
#[derive(Default)]
pub struct Wire {
    now: Cell<u64>,
    tx: RefCell<Vec<(u64, bool)>>,
    rx_high: RefCell<Vec<(u64, u64)>>,
}

impl Wire {
    /// Virtual time in nanoseconds.
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    fn tx_level_at(&self, at: u64) -> bool {
        self.tx
            .borrow()
            .iter()
            .rev()
            .find(|(time, _)| *time <= at)
            .map(|&(_, level)| level)
            .unwrap_or(true)
    }

    fn set_tx(&self, level: bool) {
        let mut tx = self.tx.borrow_mut();
        let current = tx.last().map(|&(_, level)| level).unwrap_or(true);
        if current != level {
            tx.push((self.now(), level));
        }
    }

    fn rx_level(&self) -> bool {
        let now = self.now();
        self.rx_high
            .borrow()
            .iter()
            .any(|&(start, end)| start <= now && now < end)
    }

    fn pulse_rx(&self, start: u64, len: u64) {
        self.rx_high.borrow_mut().push((start, start + len));
    }

    fn drive_rx(&self, start: u64, levels: impl IntoIterator<Item = bool>) {
        let mut at = start;
        for high in levels {
            if high {
                self.pulse_rx(at, BIT_NS);
            }
            at += BIT_NS;
        }
    }
}

/// One keypad on the simulated bus.
pub struct SimKeypad {
    /// Bus address, 16..=23.
    pub address: u8,
    /// Frame sent when asked for data; cleared by an acknowledgement.
    pub pending: Option<Vec<u8>>,
}

struct Burst {
    start: u64,
    bytes: Vec<u8>,
    expected: Option<usize>,
}

/// Keypad side of the bus.
#[derive(Default)]
pub struct Keypads {
    /// Attached keypads.
    pub keypads: Vec<SimKeypad>,
    /// Addresses asked for data, in order.
    pub requests: Vec<u8>,
    /// Acknowledgement bytes received.
    pub acks: Vec<u8>,
    /// Status messages received.
    pub status: Vec<Vec<u8>>,
    cursor: usize,
    last_fall: u64,
    probe: u8,
    burst: Option<Burst>,
    ignore_until: u64,
}

impl Keypads {
    /// Pending frame of the keypad at `address`.
    pub fn pending(&self, address: u8) -> Option<&[u8]> {
        self.keypads
            .iter()
            .find(|keypad| keypad.address == address)
            .and_then(|keypad| keypad.pending.as_deref())
    }

    fn pending_mask(&self) -> u8 {
        self.keypads
            .iter()
            .filter(|keypad| keypad.pending.is_some())
            .fold(0xFF, |mask, keypad| mask & !(1 << (keypad.address - 16)))
    }

    fn react(&mut self, wire: &Wire) {
        let now = wire.now();
        loop {
            let entry = wire.tx.borrow().get(self.cursor).copied();
            let Some((time, level)) = entry else {
                break;
            };
            self.decode(wire, time);
            self.cursor += 1;
            if !level {
                self.last_fall = time;
                continue;
            }
            if time < self.ignore_until {
                continue;
            }
            self.on_rising(wire, time, time - self.last_fall);
        }
        self.decode(wire, now);
    }

    fn on_rising(&mut self, wire: &Wire, time: u64, low: u64) {
        if low >= 10_000 * US {
            self.probe = 1;
            self.answer_probe(wire, time);
        } else if low >= 4_000 * US {
            self.probe = 0;
            self.burst = Some(Burst {
                start: time,
                bytes: Vec::new(),
                expected: None,
            });
            self.ignore_until = u64::MAX;
        } else if low < 2_000 * US && (1..=2).contains(&self.probe) {
            self.probe += 1;
            self.answer_probe(wire, time);
        } else {
            self.probe = 0;
        }
    }

    fn answer_probe(&self, wire: &Wire, time: u64) {
        let mask = self.pending_mask();
        if mask == 0xFF {
            return;
        }
        let start = time + 100 * US;
        if self.probe < 3 {
            wire.pulse_rx(start, 200 * US);
        } else {
            wire.drive_rx(start, line_levels(mask, false));
        }
    }

    fn decode(&mut self, wire: &Wire, limit: u64) {
        let Some(burst) = self.burst.as_mut() else {
            return;
        };
        loop {
            let n = burst.bytes.len();
            if burst.expected.is_some_and(|expected| n >= expected) {
                break;
            }
            let byte_start = burst.start + n as u64 * BYTE_SLOT_NS;
            if byte_start + 11 * BIT_NS > limit {
                return;
            }
            let mut byte = 0u8;
            for bit in 0..8u64 {
                let centre = byte_start + (bit + 1) * BIT_NS + BIT_NS / 2;
                if !wire.tx_level_at(centre) {
                    byte |= 1 << bit;
                }
            }
            burst.bytes.push(byte);
            if n == 0 {
                let expected = match byte {
                    0xF6 => 2,
                    0xF7 => 48,
                    _ => 1,
                };
                burst.expected = Some(expected);
                self.ignore_until = burst.start + expected as u64 * BYTE_SLOT_NS;
            }
        }
        if let Some(burst) = self.burst.take() {
            self.finish(wire, limit, burst.bytes);
        }
    }

    fn finish(&mut self, wire: &Wire, at: u64, bytes: Vec<u8>) {
        match bytes[0] {
            0xF6 => {
                let address = bytes[1];
                self.requests.push(address);
                if let Some(frame) = self.pending(address) {
                    let mut start = at + 400 * US;
                    for &byte in frame {
                        wire.drive_rx(start, line_levels(byte, true));
                        start += BYTE_SLOT_NS;
                    }
                }
            }
            0xF7 => self.status.push(bytes),
            ack => {
                self.acks.push(ack);
                if let Some(keypad) = self
                    .keypads
                    .iter_mut()
                    .find(|keypad| keypad.address == ack & 0x3F)
                {
                    keypad.pending = None;
                }
            }
        }
    }
}

/// Transmit pin.
pub struct SimTx(Rc<Wire>);

impl ErrorType for SimTx {
    type Error = Infallible;
}

impl OutputPin for SimTx {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set_tx(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set_tx(true);
        Ok(())
    }
}

/// Receive pin.
pub struct SimRx(Rc<Wire>);

impl ErrorType for SimRx {
    type Error = Infallible;
}

impl InputPin for SimRx {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.rx_level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.rx_level())
    }
}

/// Delay provider that advances virtual time and delivers interrupts.
pub struct SimDelay<'a> {
    wire: Rc<Wire>,
    keypads: Rc<RefCell<Keypads>>,
    bus: &'a KeypadBus<SimRx>,
    next_tick: u64,
    last_rx: bool,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        let end = self.wire.now() + u64::from(ns);
        self.keypads.borrow_mut().react(&self.wire);
        while self.next_tick <= end {
            self.wire.now.set(self.next_tick);
            self.keypads.borrow_mut().react(&self.wire);
            self.bus.on_tick();
            let level = self.wire.rx_level();
            if level && !self.last_rx {
                self.bus.on_edge();
            }
            self.last_rx = level;
            self.next_tick += TICK_NS;
        }
        self.wire.now.set(end);
    }
}

/// A simulated bus with its keypads.
pub struct Sim {
    pub wire: Rc<Wire>,
    pub keypads: Rc<RefCell<Keypads>>,
}

impl Sim {
    pub fn new() -> Self {
        Self {
            wire: Rc::new(Wire::default()),
            keypads: Rc::new(RefCell::new(Keypads::default())),
        }
    }

    /// Adds a keypad, optionally with a frame waiting to be sent.
    pub fn with_keypad(self, address: u8, pending: Option<&[u8]>) -> Self {
        self.keypads.borrow_mut().keypads.push(SimKeypad {
            address,
            pending: pending.map(<[u8]>::to_vec),
        });
        self
    }

    pub fn tx(&self) -> SimTx {
        SimTx(Rc::clone(&self.wire))
    }

    pub fn rx(&self) -> SimRx {
        SimRx(Rc::clone(&self.wire))
    }

    pub fn delay<'a>(&self, bus: &'a KeypadBus<SimRx>) -> SimDelay<'a> {
        SimDelay {
            wire: Rc::clone(&self.wire),
            keypads: Rc::clone(&self.keypads),
            bus,
            next_tick: TICK_NS,
            last_rx: false,
        }
    }
}

/// In-memory host link.
#[derive(Default)]
pub struct MockHost {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl MockHost {
    pub fn with_input(text: &str) -> Self {
        Self {
            input: text.bytes().collect(),
            output: Vec::new(),
        }
    }

    pub fn take_output(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.output)).unwrap()
    }
}

impl embedded_io::ErrorType for MockHost {
    type Error = Infallible;
}

impl embedded_io::Read for MockHost {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let count = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for MockHost {
    fn read_ready(&mut self) -> Result<bool, Infallible> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for MockHost {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}
