//! Serial line source for the LoRa transceiver.
//!
//! The framing matches the transceiver firmware (Arduino defaults) and is not configurable:
//! 9600 baud, 8 data bits, no parity, 1 stop bit, 100 ms read timeout.

use super::{LineBuffer, LineSource, ReadOutcome, SourceOpener};
use crate::error::{AppResult, LoggerError};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
#[cfg(feature = "instrument_serial")]
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;

/// Baud rate expected by the transceiver firmware.
pub const BAUD_RATE: u32 = 9600;

/// Per-read timeout; bounds how late a session may notice its deadline.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A serial port as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    /// OS port name (e.g., "/dev/ttyUSB0", "COM3")
    pub name: String,
    /// Product or port type, when the OS reports one
    pub description: Option<String>,
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} - {}", self.name, description),
            None => write!(f, "{}", self.name),
        }
    }
}

/// List the serial ports currently present on this machine.
#[cfg(feature = "instrument_serial")]
pub fn list_ports() -> AppResult<Vec<PortEntry>> {
    use serialport::SerialPortType;

    let ports = serialport::available_ports().map_err(|e| LoggerError::PortUnavailable {
        port: "*".to_string(),
        reason: e.to_string(),
    })?;

    Ok(ports
        .into_iter()
        .map(|info| {
            let description = match info.port_type {
                SerialPortType::UsbPort(usb) => usb
                    .product
                    .or(usb.manufacturer)
                    .or_else(|| Some(format!("USB {:04x}:{:04x}", usb.vid, usb.pid))),
                SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                SerialPortType::PciPort => Some("PCI".to_string()),
                SerialPortType::Unknown => None,
            };
            PortEntry {
                name: info.port_name,
                description,
            }
        })
        .collect())
}

/// Serial support is compiled out; always fails with [`LoggerError::SerialFeatureDisabled`].
#[cfg(not(feature = "instrument_serial"))]
pub fn list_ports() -> AppResult<Vec<PortEntry>> {
    Err(LoggerError::SerialFeatureDisabled)
}

/// Line source reading newline-terminated text from a serial port.
pub struct SerialLineSource {
    port_name: String,
    buffer: LineBuffer,
    #[cfg(feature = "instrument_serial")]
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLineSource {
    /// Open `port_name` with the fixed transceiver framing and discard stale input.
    #[cfg(feature = "instrument_serial")]
    pub fn open(port_name: &str) -> AppResult<Self> {
        use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};

        let unavailable = |e: serialport::Error| LoggerError::PortUnavailable {
            port: port_name.to_string(),
            reason: e.to_string(),
        };

        let port = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(unavailable)?;

        port.clear(ClearBuffer::Input).map_err(unavailable)?;

        debug!("Serial port '{}' opened at {} baud", port_name, BAUD_RATE);
        Ok(Self {
            port_name: port_name.to_string(),
            buffer: LineBuffer::new(),
            port: Some(port),
        })
    }

    /// Serial support is compiled out; always fails with [`LoggerError::SerialFeatureDisabled`].
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(_port_name: &str) -> AppResult<Self> {
        Err(LoggerError::SerialFeatureDisabled)
    }

    /// Port name this source was opened on
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl LineSource for SerialLineSource {
    #[cfg(feature = "instrument_serial")]
    fn read_line(&mut self) -> ReadOutcome {
        use std::io::{ErrorKind, Read};

        if let Some(outcome) = self.buffer.next_line() {
            return outcome;
        }

        let Some(port) = self.port.as_mut() else {
            return ReadOutcome::Transient("serial port closed".to_string());
        };

        // One read per call: the port timeout bounds how long this blocks.
        let mut chunk = [0u8; 256];
        match port.read(&mut chunk) {
            Ok(0) => ReadOutcome::Timeout,
            Ok(n) => {
                self.buffer.push(&chunk[..n]);
                self.buffer.next_line().unwrap_or(ReadOutcome::Timeout)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => ReadOutcome::Timeout,
            Err(e) => ReadOutcome::Transient(e.to_string()),
        }
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn read_line(&mut self) -> ReadOutcome {
        ReadOutcome::Transient("serial support not enabled".to_string())
    }

    fn close(&mut self) {
        #[cfg(feature = "instrument_serial")]
        if self.port.take().is_some() {
            debug!("Serial port '{}' closed", self.port_name);
        }
        self.buffer.clear();
    }

    fn describe(&self) -> String {
        format!("SerialLineSource({} @ {} baud)", self.port_name(), BAUD_RATE)
    }
}

/// Opens [`SerialLineSource`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl SourceOpener for SerialOpener {
    fn open(&self, port: &str) -> AppResult<Box<dyn LineSource>> {
        Ok(Box::new(SerialLineSource::open(port)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_entry_display_matches_picker_format() {
        let entry = PortEntry {
            name: "COM3".to_string(),
            description: Some("USB-SERIAL CH340".to_string()),
        };
        assert_eq!(entry.to_string(), "COM3 - USB-SERIAL CH340");

        let bare = PortEntry {
            name: "/dev/ttyS0".to_string(),
            description: None,
        };
        assert_eq!(bare.to_string(), "/dev/ttyS0");
    }

    #[test]
    #[cfg(not(feature = "instrument_serial"))]
    fn serial_disabled_build_refuses_ports() {
        assert!(matches!(list_ports(), Err(LoggerError::SerialFeatureDisabled)));
        assert!(matches!(
            SerialOpener.open("COM3"),
            Err(LoggerError::SerialFeatureDisabled)
        ));
    }

    #[test]
    #[cfg(feature = "instrument_serial")]
    fn missing_port_is_unavailable() {
        let result = SerialOpener.open("/dev/rssi-logger-no-such-port");
        match result {
            Err(LoggerError::PortUnavailable { port, .. }) => {
                assert_eq!(port, "/dev/rssi-logger-no-such-port");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }
}
