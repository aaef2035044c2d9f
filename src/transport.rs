//! Software-timed transport for the alarm-panel keypad bus.
//!
//! This module provides the two halves of the bus driver:
//!
//! - [`KeypadBus`] holds everything the interrupt handlers touch: the poll
//!   state, the parity setting, the receive pin, the byte sampler and the
//!   queue of received bytes. It has a `const` constructor so firmware can
//!   keep exactly one instance in a `static`.
//! - [`KeypadSerial`] is the foreground driver. It owns the transmit pin and
//!   a delay provider and bit-bangs bytes onto the line with exact timing,
//!   while the interrupts keep assembling incoming bytes during its delays.
//!
//! ## Line behaviour
//!
//! The transmit line rests HIGH. Before a regular write it is dropped LOW for
//! ~4 ms, the bytes are clocked out at 4800 baud 8E1 (inverted logic) with a
//! one bit guard after each byte, and the line is restored HIGH.
//!
//! ## Interrupts
//!
//! Two interrupt sources drive reception:
//!
//! - a pin-change interrupt on the receive pin, routed to
//!   [`KeypadBus::on_edge`];
//! - a periodic timer firing every [`TICK_US`](crate::consts::TICK_US)
//!   microseconds, routed to [`KeypadBus::on_tick`].
//!
//! See [`crate::timer`] for routing helpers.

use core::cell::RefCell;
use core::convert::Infallible;
use core::fmt;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Deque;
use portable_atomic::{AtomicBool, Ordering};

use crate::consts::{BIT_US, LOW_BEFORE_WRITE_US, RX_POLL_STEP_US, RX_QUEUE_LEN};
use crate::encoding::line_levels;
use crate::error::BusError;
use crate::poll::{PollCell, PollState};
use crate::sampler::{ByteSampler, Sample};

/// Receive-side counters kept by the interrupt handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Bytes assembled and queued.
    pub bytes: u16,
    /// Bytes dropped because their parity bit was wrong.
    pub parity_errors: u16,
    /// Bytes dropped because the receive queue was full.
    pub overruns: u16,
}

#[derive(Debug)]
struct BusLine<RX> {
    rx: RX,
    sampler: ByteSampler,
    queue: Deque<u8, RX_QUEUE_LEN>,
    stats: LineStats,
}

/// Interrupt-shared state of the keypad bus.
///
/// The poll state and parity flag are atomics so the foreground can read and
/// set them without a critical section. The receive pin, sampler and byte
/// queue live behind a `critical_section::Mutex`.
///
/// ## Example
///
/// ```ignore
/// static KEYPAD_BUS: KeypadBus<RxPin> = KeypadBus::new();
///
/// fn main() {
///     KEYPAD_BUS.attach(rx_pin);
///     let mut serial = KeypadSerial::new(tx_pin, delay, &KEYPAD_BUS).unwrap();
///     let keypads = serial.poll().unwrap();
/// }
///
/// #[interrupt]
/// fn PCINT0() {
///     KEYPAD_BUS.on_edge();
/// }
/// ```
pub struct KeypadBus<RX> {
    poll: PollCell,
    parity: AtomicBool,
    line: Mutex<RefCell<Option<BusLine<RX>>>>,
}

impl<RX> Default for KeypadBus<RX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RX> fmt::Debug for KeypadBus<RX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypadBus")
            .field("poll_state", &self.poll.load())
            .field("parity", &self.parity())
            .finish_non_exhaustive()
    }
}

impl<RX> KeypadBus<RX> {
    /// Creates a bus with no receive pin attached.
    ///
    /// Interrupts arriving before [`attach`](KeypadBus::attach) are ignored.
    pub const fn new() -> Self {
        Self {
            poll: PollCell::new(),
            parity: AtomicBool::new(true),
            line: Mutex::new(RefCell::new(None)),
        }
    }

    /// Current step of the poll handshake.
    pub fn poll_state(&self) -> PollState {
        self.poll.load()
    }

    /// Whether incoming and outgoing bytes carry an even parity bit.
    pub fn parity(&self) -> bool {
        self.parity.load(Ordering::Acquire)
    }

    pub(crate) fn poll_cell(&self) -> &PollCell {
        &self.poll
    }

    pub(crate) fn set_parity(&self, parity: bool) {
        self.parity.store(parity, Ordering::Release);
    }
}

impl<RX: InputPin> KeypadBus<RX> {
    /// Installs the receive pin. Call once at start-up, before enabling the
    /// bus interrupts.
    pub fn attach(&self, rx: RX) {
        critical_section::with(|cs| {
            let _ = self.line.borrow(cs).replace(Some(BusLine {
                rx,
                sampler: ByteSampler::new(),
                queue: Deque::new(),
                stats: LineStats::default(),
            }));
        });
    }

    /// Removes and returns the receive pin.
    pub fn detach(&self) -> Option<RX> {
        critical_section::with(|cs| self.line.borrow(cs).take().map(|line| line.rx))
    }

    /// Pin-change interrupt entry point.
    ///
    /// On a low to high transition that is not part of a byte already being
    /// assembled:
    /// - starts assembling a byte when the bus is idle or in the third poll
    ///   step;
    /// - advances the poll state by one step when a poll is in progress.
    ///
    /// High to low transitions are ignored.
    pub fn on_edge(&self) {
        critical_section::with(|cs| {
            let mut guard = self.line.borrow(cs).borrow_mut();
            let Some(line) = guard.as_mut() else {
                return;
            };
            if !line.rx.is_high().unwrap_or(false) || line.sampler.is_active() {
                return;
            }
            let state = self.poll.load();
            if matches!(state, PollState::Idle | PollState::Step3) {
                line.sampler.start(self.parity());
            }
            if state != PollState::Idle {
                let _ = self.poll.advance();
            }
        });
    }

    /// Sampling timer interrupt entry point.
    ///
    /// Must be called every [`TICK_US`](crate::consts::TICK_US) microseconds.
    pub fn on_tick(&self) {
        critical_section::with(|cs| {
            let mut guard = self.line.borrow(cs).borrow_mut();
            let Some(line) = guard.as_mut() else {
                return;
            };
            match line.sampler.update(&mut line.rx) {
                Sample::Pending => {}
                Sample::Byte(byte) => {
                    if line.queue.push_back(byte).is_ok() {
                        line.stats.bytes = line.stats.bytes.wrapping_add(1);
                    } else {
                        line.stats.overruns = line.stats.overruns.wrapping_add(1);
                    }
                }
                Sample::ParityError(_) => {
                    line.stats.parity_errors = line.stats.parity_errors.wrapping_add(1);
                }
            }
        });
    }

    /// Snapshot of the receive counters.
    pub fn line_stats(&self) -> LineStats {
        critical_section::with(|cs| {
            self.line
                .borrow(cs)
                .borrow()
                .as_ref()
                .map(|line| line.stats)
                .unwrap_or_default()
        })
    }

    pub(crate) fn pop_byte(&self) -> Option<u8> {
        critical_section::with(|cs| {
            self.line
                .borrow(cs)
                .borrow_mut()
                .as_mut()
                .and_then(|line| line.queue.pop_front())
        })
    }

    pub(crate) fn flush(&self) {
        critical_section::with(|cs| {
            if let Some(line) = self.line.borrow(cs).borrow_mut().as_mut() {
                line.queue.clear();
            }
        });
    }
}

/// Foreground driver for the keypad bus.
///
/// `KeypadSerial` owns the transmit pin and a delay provider and shares the
/// receive side with the interrupt handlers through a [`KeypadBus`].
///
/// ## Type Parameters
///
/// - `TX`: transmit pin, [`embedded_hal::digital::OutputPin`]
/// - `RX`: receive pin held by the bus, [`embedded_hal::digital::InputPin`]
/// - `D`: delay provider, [`embedded_hal::delay::DelayNs`]. Its delays must
///   not disable interrupts.
///
/// ## Example
///
/// ```rust
/// # use embedded_hal_mock::eh1::delay::NoopDelay;
/// # use embedded_hal_mock::eh1::digital::{
/// #     Mock as Pin, State as PinState, Transaction as PinTransaction,
/// # };
/// use keybus::transport::{KeypadBus, KeypadSerial};
///
/// let bus: KeypadBus<Pin> = KeypadBus::new();
/// # let mut tx = Pin::new(&[PinTransaction::set(PinState::High)]);
/// # let tx_pin = tx.clone();
/// let serial = KeypadSerial::new(tx_pin, NoopDelay::new(), &bus).unwrap();
/// assert!(bus.parity());
/// # drop(serial);
/// # tx.done();
/// ```
#[derive(Debug)]
pub struct KeypadSerial<'a, TX, RX, D> {
    tx: TX,
    delay: D,
    bus: &'a KeypadBus<RX>,
}

impl<'a, TX, RX, D> KeypadSerial<'a, TX, RX, D>
where
    TX: OutputPin,
    RX: InputPin,
    D: DelayNs,
{
    /// Creates the driver, enables parity, clears any poll in progress and
    /// releases the transmit line to its resting HIGH level.
    pub fn new(tx: TX, delay: D, bus: &'a KeypadBus<RX>) -> Result<Self, BusError<TX::Error>> {
        bus.set_parity(true);
        bus.poll_cell().reset();
        let mut serial = Self { tx, delay, bus };
        serial.release_line()?;
        Ok(serial)
    }

    /// The shared bus state this driver works with.
    pub fn bus(&self) -> &'a KeypadBus<RX> {
        self.bus
    }

    /// Releases the transmit pin and delay provider.
    pub fn free(self) -> (TX, D) {
        (self.tx, self.delay)
    }

    pub(crate) fn drive(&mut self, high: bool) -> Result<(), BusError<TX::Error>> {
        if high {
            self.tx.set_high().map_err(BusError::Line)
        } else {
            self.tx.set_low().map_err(BusError::Line)
        }
    }

    pub(crate) fn release_line(&mut self) -> Result<(), BusError<TX::Error>> {
        self.drive(true)
    }

    pub(crate) fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    pub(crate) fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusError<TX::Error>> {
        for level in line_levels(byte, self.bus.parity()) {
            self.drive(level)?;
            self.delay.delay_us(BIT_US);
        }
        Ok(())
    }

    /// Writes `bytes` to the bus.
    ///
    /// The line is held LOW for [`LOW_BEFORE_WRITE_US`] so keypads see a
    /// clean start condition, each byte is followed by a one bit guard, and
    /// the line is restored HIGH afterwards.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), BusError<TX::Error>> {
        self.drive(false)?;
        self.delay.delay_us(LOW_BEFORE_WRITE_US);
        for &byte in bytes {
            self.write_byte(byte)?;
            self.delay.delay_us(BIT_US);
        }
        self.release_line()
    }

    /// Takes one received byte, or `WouldBlock` if none is queued.
    pub fn try_read(&mut self) -> nb::Result<u8, Infallible> {
        self.bus.pop_byte().ok_or(nb::Error::WouldBlock)
    }

    /// Waits up to `timeout_ms` for a received byte.
    ///
    /// The receive queue is checked every [`RX_POLL_STEP_US`] microseconds.
    /// A timeout of zero performs a single non-blocking check.
    pub fn receive_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        let steps = timeout_ms.saturating_mul(1_000) / RX_POLL_STEP_US;
        for _ in 0..steps {
            if let Ok(byte) = self.try_read() {
                return Some(byte);
            }
            self.delay.delay_us(RX_POLL_STEP_US);
        }
        self.try_read().ok()
    }

    /// Discards every byte already received.
    pub fn flush_input(&mut self) {
        self.bus.flush();
    }

    /// Receive counters of the shared bus.
    pub fn line_stats(&self) -> LineStats {
        self.bus.line_stats()
    }

    /// Waits `bits` bit times.
    pub fn delay_bits(&mut self, bits: u32) {
        self.delay.delay_us(BIT_US.saturating_mul(bits));
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    fn level(high: bool) -> PinTransaction {
        PinTransaction::set(if high { PinState::High } else { PinState::Low })
    }

    #[test]
    fn test_serial_initialization_releases_line() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        bus.set_parity(false);
        let mut tx = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let serial = KeypadSerial::new(tx.clone(), NoopDelay::new(), &bus).unwrap();

        assert!(bus.parity());
        assert_eq!(bus.poll_state(), PollState::Idle);
        drop(serial);
        tx.done();
    }

    #[test]
    fn test_send_frames_byte_with_parity() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        let mut expectations = vec![
            PinTransaction::set(PinState::High), // new()
            PinTransaction::set(PinState::Low),  // before write
        ];
        expectations.extend(line_levels(0xF6, true).map(level));
        expectations.push(PinTransaction::set(PinState::High)); // after write
        let mut tx = PinMock::new(&expectations);

        let mut serial = KeypadSerial::new(tx.clone(), NoopDelay::new(), &bus).unwrap();
        serial.send(&[0xF6]).unwrap();

        tx.done();
    }

    #[test]
    fn test_receive_byte_times_out_without_data() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        let mut rx = PinMock::new(&[]);
        bus.attach(rx.clone());
        let mut tx = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let mut serial = KeypadSerial::new(tx.clone(), NoopDelay::new(), &bus).unwrap();
        assert_eq!(serial.receive_byte(10), None);
        assert_eq!(serial.receive_byte(0), None);
        assert!(serial.try_read().is_err());

        tx.done();
        rx.done();
    }

    #[test]
    fn test_edges_and_ticks_queue_a_byte() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        // Rising edge, then the nine sampled bits of 0x50 with parity.
        let mut expectations = vec![PinTransaction::get(PinState::High)];
        expectations.extend(line_levels(0x50, true).skip(1).take(9).map(|high| {
            PinTransaction::get(if high { PinState::High } else { PinState::Low })
        }));
        let mut rx = PinMock::new(&expectations);
        bus.attach(rx.clone());

        bus.on_edge();
        for _ in 0..64 {
            bus.on_tick();
        }

        assert_eq!(bus.pop_byte(), Some(0x50));
        assert_eq!(bus.pop_byte(), None);
        assert_eq!(bus.line_stats().bytes, 1);
        rx.done();
    }

    #[test]
    fn test_falling_edge_is_ignored() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        let mut rx = PinMock::new(&[PinTransaction::get(PinState::Low)]);
        bus.attach(rx.clone());
        bus.poll_cell().start();

        bus.on_edge();

        assert_eq!(bus.poll_state(), PollState::Step1);
        rx.done();
    }

    #[test]
    fn test_poll_edges_advance_state_without_sampling() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        let mut rx = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
        ]);
        bus.attach(rx.clone());
        bus.poll_cell().start();

        bus.on_edge();
        bus.on_edge();

        assert_eq!(bus.poll_state(), PollState::Step3);
        // Nothing is being assembled, so ticks read no pin.
        bus.on_tick();
        rx.done();
    }

    #[test]
    fn test_detach_returns_pin() {
        let bus: KeypadBus<PinMock> = KeypadBus::new();
        let rx = PinMock::new(&[]);
        bus.attach(rx.clone());
        let mut pin = bus.detach().unwrap();
        assert!(bus.detach().is_none());
        // Interrupts after detaching are ignored.
        bus.on_edge();
        bus.on_tick();
        pin.done();
        drop(rx);
    }
}
