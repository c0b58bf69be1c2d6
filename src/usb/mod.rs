//! USB device subsystem - the three protocol layers below the HID class.
//!
//! The LPC17xx's built-in USB 2.0 full-speed controller is driven
//! directly through its Serial Interface Engine (SIE):
//!
//! - [`driver`]  - endpoint lifecycle, FIFO read/write, interrupt dispatch
//! - [`control`] - the SETUP/DATA/STATUS state machine and standard requests
//! - [`device`]  - glue binding a driver, a control pipe, and a class together
//!
//! Hardware access goes through [`registers::UsbRegisters`]; [`sim`] is a
//! register-level model used by host tests.

pub mod control;
pub mod device;
pub mod driver;
#[cfg(feature = "embedded")]
pub mod lpc17xx;
pub mod registers;
pub mod setup;
pub mod sie;
pub mod sim;
pub mod standard;

pub use control::{ClassHandler, ControlPipe, ControlTransfer, Device, DeviceState};
pub use device::UsbDevice;
pub use driver::{EventHandler, EventMask, UsbDriver};
pub use registers::{Reg, SpinLimit, UsbRegisters};
pub use setup::{Direction, Recipient, RequestType, SetupPacket};

/// Physical endpoints of the controller.
///
/// Even numbers are OUT, odd numbers IN; the logical endpoint number is
/// the physical number halved. Bulk endpoints are realisable but unused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Endpoint {
    /// Control OUT (EP0 OUT).
    ControlOut = 0,
    /// Control IN (EP0 IN).
    ControlIn = 1,
    /// Interrupt OUT (EP1 OUT).
    InterruptOut = 2,
    /// Interrupt IN (EP1 IN).
    InterruptIn = 3,
    /// Bulk OUT (EP2 OUT).
    BulkOut = 4,
    /// Bulk IN (EP2 IN).
    BulkIn = 5,
}

impl Endpoint {
    /// All endpoints in interrupt-service order.
    pub const ALL: [Endpoint; 6] = [
        Endpoint::ControlOut,
        Endpoint::ControlIn,
        Endpoint::InterruptOut,
        Endpoint::InterruptIn,
        Endpoint::BulkOut,
        Endpoint::BulkIn,
    ];

    /// Physical endpoint number (0..=5).
    pub const fn physical(self) -> u8 {
        self as u8
    }

    /// Bit of this endpoint in `EpIntSt`/`EpIntEn`/`ReEp` and in the stall cache.
    pub const fn mask(self) -> u32 {
        1 << self as u32
    }

    /// Logical endpoint number as used on the wire.
    pub const fn logical(self) -> u8 {
        self as u8 >> 1
    }

    /// `true` for the device-to-host half of an endpoint pair.
    pub const fn is_in(self) -> bool {
        self as u8 & 1 == 1
    }

    /// `true` for either half of the control endpoint pair.
    pub const fn is_control(self) -> bool {
        self.logical() == 0
    }

    /// Endpoint for a physical number, if the controller has it.
    pub const fn from_physical(n: u8) -> Option<Self> {
        match n {
            0 => Some(Endpoint::ControlOut),
            1 => Some(Endpoint::ControlIn),
            2 => Some(Endpoint::InterruptOut),
            3 => Some(Endpoint::InterruptIn),
            4 => Some(Endpoint::BulkOut),
            5 => Some(Endpoint::BulkIn),
            _ => None,
        }
    }

    /// Endpoint addressed by the `wIndex` of an endpoint-recipient request
    /// (bits 3..0 endpoint number, bit 7 direction).
    pub const fn from_windex(index: u16) -> Option<Self> {
        if index & !0x008F != 0 {
            return None;
        }
        let number = (index & 0x0F) as u8;
        let dir_in = (index & 0x80) != 0;
        if number > 2 {
            return None;
        }
        Self::from_physical((number << 1) | dir_in as u8)
    }
}
