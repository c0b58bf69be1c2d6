//! Application-wide constants and compile-time configuration.
//!
//! USB identity, endpoint sizing, and protocol limits live here so they
//! can be tuned in one place.

use crate::usb::SpinLimit;

// USB identity

/// USB VID/PID - the values the mbed LPC1768 HID examples enumerate with.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x0D28;
pub const USB_PID: u16 = 0x0205;

/// Device release number (BCD).
pub const USB_BCD_DEVICE: u16 = 0x0000;

// Endpoints

/// bConfigurationValue of the only configuration.
pub const CONFIGURATION_VALUE: u8 = 1;

/// Max packet size of the control endpoint pair (EP0 IN/OUT).
pub const EP0_MAX_PACKET: u16 = 64;

/// Max packet size of the interrupt IN endpoint carrying input reports.
pub const INTERRUPT_IN_MAX_PACKET: u16 = 64;

/// HID polling interval advertised in the endpoint descriptor (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Bytes the control engine can stage for one OUT data stage.
pub const CONTROL_OUT_CAPACITY: usize = 64;

// HID reports

/// Maximum input report payload, not counting the leading report ID.
pub const MAX_REPORT_SIZE: usize = 8;

/// Report ID of the keyboard collection.
pub const REPORT_ID_KEYBOARD: u8 = 1;

/// Report ID of the mouse collection.
pub const REPORT_ID_MOUSE: u8 = 2;

// Hardware handshakes

/// Spin policy for every SIE handshake on target: wait as long as it takes.
pub const SPIN_LIMIT: SpinLimit = SpinLimit::Unbounded;
