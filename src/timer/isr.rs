use embedded_hal::digital::InputPin;

use crate::transport::KeypadBus;

/// Forwards a pin-change interrupt to the global `KeypadBus`.
///
/// # Arguments
/// * The global static `KeypadBus`
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn PCINT0() {
///     keypad_bus_edge(&KEYPAD_BUS);
/// }
/// ```
pub fn keypad_bus_edge<RX: InputPin>(bus: &'static KeypadBus<RX>) {
    bus.on_edge();
}

/// Runs the sampling tick at each timer interrupt.
///
/// # Arguments
/// * The global static `KeypadBus`
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER2_COMPA() {
///     keypad_bus_tick(&KEYPAD_BUS);
/// }
/// ```
pub fn keypad_bus_tick<RX: InputPin>(bus: &'static KeypadBus<RX>) {
    bus.on_tick();
}
