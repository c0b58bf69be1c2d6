//! HID class: keyboard + mouse on one interrupt IN endpoint.
//!
//! [`HidClass`] plugs into the control engine (descriptors, SET_REPORT,
//! endpoint bring-up on SET_CONFIGURATION). [`UsbHid`] owns the whole device
//! and is the application surface: it is shared between the interrupt
//! context (`on_interrupt`) and mainline code sending input reports.
//!
//! The two contexts meet only through [`ReportFlags`]:
//!
//! ```text
//!   mainline                              interrupt
//!   --------                              ---------
//!   spin until configured        <------  SET_CONFIGURATION(1)   configured = true
//!   complete = false
//!   [masked] write EP1 IN
//!   spin until complete          <------  EP1 IN event           complete = true
//!         or !configured         <------  bus reset / SET_CONFIGURATION(0)
//! ```

pub mod descriptors;
pub mod keyboard;
pub mod keymap;
pub mod mouse;
pub mod pointer;

#[cfg(test)]
mod tests;

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use heapless::Vec;

use crate::config::{
    INTERRUPT_IN_MAX_PACKET, MAX_REPORT_SIZE, REPORT_ID_KEYBOARD, REPORT_ID_MOUSE,
};
use crate::error::Error;
use crate::usb::standard::{
    DESCRIPTOR_CONFIGURATION, DESCRIPTOR_DEVICE, DESCRIPTOR_ENDPOINT, DESCRIPTOR_INTERFACE,
    DESCRIPTOR_STRING,
};
use crate::usb::{
    ClassHandler, ControlTransfer, DeviceState, Endpoint, RequestType, SetupPacket, SpinLimit,
    UsbDevice, UsbDriver, UsbRegisters,
};
use descriptors::{
    hid_descriptor, CONFIGURATION_DESCRIPTOR, DESCRIPTOR_HID, DESCRIPTOR_REPORT, DEVICE_DESCRIPTOR,
    REPORT_DESCRIPTOR,
};
use keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};
use mouse::{MouseReport, MOUSE_REPORT_SIZE};

pub use mouse::{BUTTON_LEFT, BUTTON_MIDDLE, BUTTON_RIGHT};
pub use pointer::Pointer;

/// HID class request carrying an output report.
pub const SET_REPORT: u8 = 0x09;

/// Report ID byte plus the largest payload.
const REPORT_BUFFER_SIZE: usize = MAX_REPORT_SIZE + 1;

/// Flags written by the interrupt context and polled by the report sender.
pub struct ReportFlags {
    configured: AtomicBool,
    complete: AtomicBool,
}

impl Default for ReportFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFlags {
    pub const fn new() -> Self {
        Self {
            configured: AtomicBool::new(false),
            complete: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

/// The HID class handler installed on the control engine.
pub struct HidClass<'a> {
    flags: &'a ReportFlags,
    output_report: [u8; MAX_REPORT_SIZE],
    output_len: usize,
}

impl<'a> HidClass<'a> {
    pub fn new(flags: &'a ReportFlags) -> Self {
        Self {
            flags,
            output_report: [0; MAX_REPORT_SIZE],
            output_len: 0,
        }
    }

    /// Last keyboard output report received through SET_REPORT.
    pub fn output_report(&self) -> &[u8] {
        &self.output_report[..self.output_len]
    }

    /// LED bitmap of the last keyboard output report, 0 before the first one.
    ///
    /// The host may send the bitmap alone or prefixed with the report ID.
    pub fn keyboard_leds(&self) -> u8 {
        match self.output_report() {
            [REPORT_ID_KEYBOARD, leds, ..] => *leds,
            [leds] => *leds,
            _ => 0,
        }
    }
}

impl<R: UsbRegisters> ClassHandler<R> for HidClass<'_> {
    fn request(&mut self, setup: &SetupPacket, transfer: &mut ControlTransfer) -> Result<(), Error> {
        if setup.request_type != RequestType::Class || setup.request != SET_REPORT {
            return Err(Error::Protocol);
        }
        if setup.value as u8 != REPORT_ID_KEYBOARD {
            return Err(Error::Protocol);
        }
        let len = setup.length as usize;
        if len > MAX_REPORT_SIZE {
            return Err(Error::TransferSize);
        }
        transfer.receive(len)
    }

    fn get_descriptor(
        &mut self,
        setup: &SetupPacket,
        transfer: &mut ControlTransfer,
    ) -> Result<(), Error> {
        match setup.descriptor_type() {
            DESCRIPTOR_DEVICE => transfer.send(&DEVICE_DESCRIPTOR),
            DESCRIPTOR_CONFIGURATION => transfer.send(&CONFIGURATION_DESCRIPTOR),
            DESCRIPTOR_HID => transfer.send(hid_descriptor()),
            DESCRIPTOR_REPORT => transfer.send(&REPORT_DESCRIPTOR),
            DESCRIPTOR_STRING | DESCRIPTOR_INTERFACE | DESCRIPTOR_ENDPOINT => {
                return Err(Error::Unsupported)
            }
            _ => return Err(Error::Protocol),
        }
        Ok(())
    }

    fn request_out(&mut self, setup: &SetupPacket, data: &[u8]) -> Result<(), Error> {
        if setup.request == SET_REPORT {
            let len = data.len().min(MAX_REPORT_SIZE);
            self.output_report[..len].copy_from_slice(&data[..len]);
            self.output_len = len;
            debug!("hid: output report {=[u8]}", self.output_report());
        }
        Ok(())
    }

    fn configuration_changed(&mut self, driver: &mut UsbDriver<R>, value: u8) {
        if value != 0 {
            driver.realize_endpoint(Endpoint::InterruptIn, INTERRUPT_IN_MAX_PACKET);
            driver.enable_endpoint_event(Endpoint::InterruptIn);
            self.flags.configured.store(true, Ordering::Release);
        } else {
            driver.disable_endpoint_event(Endpoint::InterruptIn);
            self.flags.configured.store(false, Ordering::Release);
        }
    }

    fn bus_reset(&mut self) {
        self.flags.configured.store(false, Ordering::Release);
    }

    fn endpoint_event(&mut self, _driver: &mut UsbDriver<R>, ep: Endpoint) {
        if ep == Endpoint::InterruptIn {
            self.flags.complete.store(true, Ordering::Release);
        }
    }
}

/// A HID keyboard/mouse device shared between interrupt and mainline code.
pub struct UsbHid<'a, R> {
    device: Mutex<RefCell<UsbDevice<R, HidClass<'a>>>>,
    flags: &'a ReportFlags,
}

impl<'a, R: UsbRegisters> UsbHid<'a, R> {
    /// Initialize the stack on a powered peripheral. Nothing is visible to
    /// the host until [`connect`](Self::connect).
    pub fn new(regs: R, flags: &'a ReportFlags, spin: SpinLimit) -> Self {
        Self {
            device: Mutex::new(RefCell::new(UsbDevice::new(regs, spin, HidClass::new(flags)))),
            flags,
        }
    }

    fn with_device<T>(&self, f: impl FnOnce(&mut UsbDevice<R, HidClass<'a>>) -> T) -> T {
        critical_section::with(|cs| f(&mut self.device.borrow_ref_mut(cs)))
    }

    /// USB interrupt entry point.
    pub fn on_interrupt(&self) {
        self.with_device(|device| device.on_interrupt());
    }

    pub fn connect(&self) {
        self.with_device(|device| device.connect());
    }

    pub fn disconnect(&self) {
        self.with_device(|device| device.disconnect());
    }

    pub fn state(&self) -> DeviceState {
        self.with_device(|device| device.state())
    }

    pub fn is_configured(&self) -> bool {
        self.flags.is_configured()
    }

    pub fn keyboard_leds(&self) -> u8 {
        self.with_device(|device| device.class().keyboard_leds())
    }

    /// Run `f` on the register backend inside the critical section.
    pub fn with_peripheral<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        self.with_device(|device| f(device.registers_mut()))
    }

    /// Send one input report and wait until the host has taken it.
    ///
    /// `data == None` sends `size` zero bytes. Blocks until the device is
    /// configured; returns [`Error::NotConfigured`] if the host deconfigures
    /// it while the report is in flight. Must not be called from the
    /// interrupt context.
    pub fn send_input_report(&self, id: u8, data: Option<&[u8]>, size: usize) -> Result<(), Error> {
        if size > MAX_REPORT_SIZE {
            return Err(Error::TransferSize);
        }

        let mut report: Vec<u8, REPORT_BUFFER_SIZE> = Vec::new();
        report.push(id).map_err(|_| Error::TransferSize)?;
        match data {
            Some(data) => {
                let payload = data.get(..size).ok_or(Error::TransferSize)?;
                report
                    .extend_from_slice(payload)
                    .map_err(|_| Error::TransferSize)?;
            }
            None => report.resize(size + 1, 0).map_err(|_| Error::TransferSize)?,
        }

        while !self.flags.is_configured() {
            core::hint::spin_loop();
        }

        self.flags.complete.store(false, Ordering::Release);
        self.with_device(|device| {
            let mut masked = device.driver_mut().mask_events();
            masked.endpoint_write(Endpoint::InterruptIn, &report);
        });
        trace!("hid: report {=[u8]}", &report[..]);

        loop {
            if self.flags.is_complete() {
                return Ok(());
            }
            if !self.flags.is_configured() {
                warn!("hid: deconfigured while sending report {}", id);
                return Err(Error::NotConfigured);
            }
            core::hint::spin_loop();
        }
    }

    /// Type one character: key down, then key up.
    pub fn keyboard_char(&self, c: char) -> Result<(), Error> {
        let key = keymap::lookup(c).ok_or(Error::UnmappedCharacter)?;
        let down = KeyboardReport::press(key).to_bytes();
        self.send_input_report(REPORT_ID_KEYBOARD, Some(&down), KEYBOARD_REPORT_SIZE)?;
        self.send_input_report(REPORT_ID_KEYBOARD, None, KEYBOARD_REPORT_SIZE)
    }

    /// Type a string, stopping at a NUL or at the first failure.
    pub fn keyboard_str(&self, s: &str) -> Result<(), Error> {
        s.chars()
            .take_while(|&c| c != '\0')
            .try_for_each(|c| self.keyboard_char(c))
    }

    /// One mouse report with relative motion, button state and wheel.
    pub fn mouse(&self, dx: i8, dy: i8, buttons: u8, wheel: i8) -> Result<(), Error> {
        let report = MouseReport {
            buttons,
            x: dx,
            y: dy,
            wheel,
        };
        self.send_input_report(REPORT_ID_MOUSE, Some(&report.to_bytes()), MOUSE_REPORT_SIZE)
    }
}
