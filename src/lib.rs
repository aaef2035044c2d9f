//! # keybus
//!
//! A portable, no_std Rust bridge between an alarm panel's keypad bus and a
//! host controller on a text serial link.
//!
//! The crate plays the panel's part on the bus using:
//! - `embedded-hal` traits for digital I/O and timing
//! - an edge-started, timer-sampled byte receiver driven from interrupts
//! - interrupt-safe shared state with `critical-section` and atomics
//! - `embedded-io` traits for the host link
//!
//! ## Crate features
//! | Feature     | Description |
//! |-------------|-------------|
//! | `std`       | Builds against `std` (host tools and simulation) |
//! | `defmt-0-3` | Uses `defmt` logging |
//! | `log`       | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **4800 baud 8E1 transmitter** with the bus's inverted line levels
//! - **Keypad discovery** with the four step poll handshake
//! - **Keypad frame requests** with checksum and address validation and
//!   acknowledgement
//! - **`F7` status display messages** built from `F7 z=.. 1=..` host commands
//! - **Host bridge** step that ties the above together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keybus::bridge::Bridge;
//! use keybus::transport::KeypadSerial;
//!
//! keybus::init_keypad_bus!(RxPin);
//!
//! KEYPAD_BUS.attach(rx_pin);
//! let mut serial = KeypadSerial::new(tx_pin, delay, &KEYPAD_BUS)?;
//! let mut bridge = Bridge::new();
//! loop {
//!     bridge.service(&mut serial, &mut usb_serial)?;
//! }
//!
//! #[interrupt]
//! fn PCINT0() {
//!     keybus::keypad_bus_edge!();
//! }
//!
//! #[interrupt]
//! fn TIMER2_COMPA() {
//!     keybus::keypad_bus_tick!(); // every 52 µs
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - The delay provider must not disable interrupts; bytes keep arriving
//!   while the foreground waits.
//! - Only one bus instance should be active at a time in interrupt-driven
//!   mode.
//! - Timing precision is critical; the sampling tick should come from a
//!   hardware timer.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]
#![warn(unused_results)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod fmt;

pub use critical_section;
pub use heapless;

pub mod bridge;
pub(crate) mod checksum;
pub mod codec;
pub mod consts;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod host;
pub mod poll;
pub mod sampler;
pub mod timer;
pub mod transceiver;
pub mod transport;

pub use error::{BridgeError, BusError, CommandError, LineError};
