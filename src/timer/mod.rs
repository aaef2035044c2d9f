//! Timer and interrupt routing utilities for the keypad bus.
//!
//! Reception needs two interrupt sources:
//!
//! - a pin-change interrupt on the receive pin, forwarded to
//!   [`KeypadBus::on_edge`](crate::transport::KeypadBus::on_edge);
//! - a periodic timer firing every [`TICK_US`] microseconds (four times per
//!   bit), forwarded to
//!   [`KeypadBus::on_tick`](crate::transport::KeypadBus::on_tick).
//!
//! Contains helpers for both, including:
//! - `compute_ocr_value`: runtime OCR calculator for the sampling timer
//! - `const_ocr_value`: compile-time OCR calculator
//! - `keypad_bus_edge` / `keypad_bus_tick` and the `keypad_bus_edge!()` /
//!   `keypad_bus_tick!()` macros: interrupt entry points for a static bus
//!
//! Timer counts for a 52 µs tick:
//!
//! | F_CPU | PRESCALER | TIMER_COUNTS |
//! |-------|-----------|--------------|
//! | 16 MHz | 8 | 104 |
//! | 16 MHz | 64 | 13 |
//! | 8 MHz | 8 | 52 |

use libm::round;

use crate::consts::TICK_US;

mod isr;
pub use isr::*;

mod macros;

/// Sampling tick rate, in ticks per second.
pub const TICKS_PER_SECOND: u32 = 1_000_000 / TICK_US;

/// Computes the timer compare value for the sampling tick (CTC mode).
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `tick_us`: desired tick interval in microseconds (normally [`TICK_US`])
///
/// # Returns
/// - Timer counts per tick, rounded to the nearest integer
pub fn compute_ocr_value(f_cpu: u32, prescaler: u32, tick_us: f32) -> u16 {
    let counts_per_second = f64::from(f_cpu) / f64::from(prescaler);
    let counts = counts_per_second * f64::from(tick_us) / 1_000_000.0;
    round(counts) as u16
}

/// Compile-time timer compare value for a whole-microsecond tick.
///
/// Truncates instead of rounding.
pub const fn const_ocr_value(f_cpu: u32, prescaler: u32, tick_us: u32) -> u16 {
    ((f_cpu / prescaler) as u64 * tick_us as u64 / 1_000_000) as u16
}
