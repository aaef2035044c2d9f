//! One service step of the keypad bus to host bridge.
//!
//! Each [`Bridge::service`] call:
//!
//! 1. drains the host link, applying every complete command line to the
//!    status slots and answering bad lines with `ERROR: ...`;
//! 2. sends the next status message on the keypad bus;
//! 3. polls the keypads and forwards each accepted frame to the host as a
//!    listing line.
//!
//! Firmware calls it from its main loop.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_io::{Read, ReadReady, Write};
use heapless::String;

use crate::codec::{StatusSlots, encode_listing};
use crate::consts::HOST_LINE_LEN;
use crate::error::{BridgeError, BusError};
use crate::host::LineReader;
use crate::poll::KeypadAddresses;
use crate::transceiver::{FrameStats, Transceiver};
use crate::transport::KeypadSerial;

const HOST_CHUNK: usize = 16;
const REPORT_LEN: usize = 64;

/// What one service step did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReport {
    /// Host lines applied to the status slots.
    pub commands: u8,
    /// Host lines answered with an error.
    pub rejected: u8,
    /// Keypads that answered the poll.
    pub keypads: KeypadAddresses,
    /// Keypad frames forwarded to the host.
    pub frames: u8,
}

/// Host command state, status slots and frame counters of the bridge.
#[derive(Debug, Default)]
pub struct Bridge {
    reader: LineReader<HOST_LINE_LEN>,
    slots: StatusSlots,
    transceiver: Transceiver,
}

impl Bridge {
    /// Creates a bridge showing the default status message.
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained status messages.
    pub fn slots(&self) -> &StatusSlots {
        &self.slots
    }

    /// Keypad request counters.
    pub fn frame_stats(&self) -> FrameStats {
        self.transceiver.stats()
    }

    /// Runs one service step.
    ///
    /// Only pin and host link faults are returned; malformed commands and
    /// rejected keypad frames are reported and skipped.
    pub fn service<TX, RX, D, H>(
        &mut self,
        serial: &mut KeypadSerial<'_, TX, RX, D>,
        host: &mut H,
    ) -> Result<ServiceReport, BridgeError<TX::Error, H::Error>>
    where
        TX: OutputPin,
        RX: InputPin,
        D: DelayNs,
        H: Read + ReadReady + Write,
    {
        let mut report = ServiceReport::default();
        self.drain_host(host, &mut report)?;

        let status = self.slots.next_outbound();
        let _ = recoverable(serial.send(status.as_bytes())).map_err(BridgeError::Bus)?;

        report.keypads = recoverable(serial.poll())
            .map_err(BridgeError::Bus)?
            .unwrap_or_default();

        for &address in &report.keypads {
            let request = self.transceiver.request(serial, address);
            let Some(message) = recoverable(request).map_err(BridgeError::Bus)? else {
                continue;
            };
            let listing = encode_listing(message.address, message.kind, &message.frame);
            host.write_all(listing.as_bytes())
                .map_err(BridgeError::Host)?;
            report.frames = report.frames.saturating_add(1);
        }
        Ok(report)
    }

    fn drain_host<H, BE>(
        &mut self,
        host: &mut H,
        report: &mut ServiceReport,
    ) -> Result<(), BridgeError<BE, H::Error>>
    where
        H: Read + ReadReady + Write,
    {
        let mut chunk = [0u8; HOST_CHUNK];
        while host.read_ready().map_err(BridgeError::Host)? {
            let read = host.read(&mut chunk).map_err(BridgeError::Host)?;
            if read == 0 {
                break;
            }
            for &byte in &chunk[..read] {
                let mut error: String<REPORT_LEN> = String::new();
                match self.reader.feed(byte) {
                    Ok(None) => continue,
                    Ok(Some("")) => continue,
                    Ok(Some(line)) => match self.slots.apply(line) {
                        Ok(Some(_)) => {
                            report.commands = report.commands.saturating_add(1);
                            continue;
                        }
                        Ok(None) => {
                            debug!("unknown host command");
                            let _ = error.push_str("ERROR: unknown command\n");
                        }
                        Err(err) => {
                            debug!("bad host command");
                            let _ = writeln!(error, "ERROR: {}", err);
                        }
                    },
                    Err(err) => {
                        let _ = writeln!(error, "ERROR: {}", err);
                    }
                }
                report.rejected = report.rejected.saturating_add(1);
                host.write_all(error.as_bytes()).map_err(BridgeError::Host)?;
            }
        }
        Ok(())
    }
}

// Protocol failures only cost this step's data; line faults end the step.
fn recoverable<T, E>(result: Result<T, BusError<E>>) -> Result<Option<T>, E> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(BusError::Line(err)) => Err(err),
        Err(_) => Ok(None),
    }
}
