//! USB 2.0 full-speed HID keyboard/mouse stack for the LPC17xx.
//!
//! Layers, bottom-up:
//!
//! - [`usb::driver`]: endpoint and SIE access over a [`usb::UsbRegisters`]
//!   backend (MMIO on target, [`usb::sim::SimPeripheral`] on the host).
//! - [`usb::control`]: EP0 transfer engine and standard requests.
//! - [`hid`]: descriptors, SET_REPORT and blocking input reports.
//!
//! Host tests: `cargo test`. Firmware: `cargo build --release --features embedded`.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod hid;
pub mod irq;
pub mod usb;

pub use error::Error;
pub use hid::{HidClass, Pointer, ReportFlags, UsbHid};
pub use irq::IrqSlot;
