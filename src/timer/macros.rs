/// Declares the static global `KEYPAD_BUS` shared by the interrupt handlers
/// and the foreground driver.
///
/// # Arguments
/// - `$rx`: The concrete type of the receive pin (must implement `InputPin`)
///
/// # Example
/// ```rust,ignore
/// init_keypad_bus!(MyRxPinType);
///
/// fn main() {
///     KEYPAD_BUS.attach(rx);
///     let mut serial = KeypadSerial::new(tx, delay, &KEYPAD_BUS).unwrap();
/// }
/// ```
#[macro_export]
macro_rules! init_keypad_bus {
    ( $rx:ty ) => {
        pub static KEYPAD_BUS: $crate::transport::KeypadBus<$rx> =
            $crate::transport::KeypadBus::new();
    };
}

/// Forwards a pin-change interrupt to the global `KEYPAD_BUS`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn PCINT0() {
///     keypad_bus_edge!();
/// }
/// ```
///
/// # Notes
/// - This macro assumes `KEYPAD_BUS` was declared with `init_keypad_bus!`.
/// - Does nothing until the receive pin has been attached.
#[macro_export]
macro_rules! keypad_bus_edge {
    () => {
        KEYPAD_BUS.on_edge()
    };
}

/// Runs the sampling tick on the global `KEYPAD_BUS`.
///
/// Must be invoked every [`TICK_US`](crate::consts::TICK_US) microseconds.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER2_COMPA() {
///     keypad_bus_tick!();
/// }
/// ```
#[macro_export]
macro_rules! keypad_bus_tick {
    () => {
        KEYPAD_BUS.on_tick()
    };
}
