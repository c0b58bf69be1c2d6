//! Control-transfer engine.
//!
//! Drives the SETUP / DATA / STATUS stages over the EP0 pair, keeps the
//! device state machine, and hands class-specific work (descriptors,
//! class/vendor requests, OUT data) to a [`ClassHandler`].
//!
//! ```text
//!            bus reset (any state)
//!   Powered ───────────────► Default ◄──── SET_ADDRESS(0)
//!                               │               │
//!                  SET_ADDRESS(n)               │
//!                               ▼               │
//!                            Address ───────────┘
//!                          ▲       │
//!      SET_CONFIGURATION(0)│       │SET_CONFIGURATION(1)
//!                          │       ▼
//!                           Configured
//! ```
//!
//! A rejected request stalls the control pipe and leaves the state alone.

use super::driver::UsbDriver;
use super::registers::UsbRegisters;
use super::setup::{Direction, RequestType, SetupPacket};
use super::Endpoint;
use crate::config::{CONTROL_OUT_CAPACITY, EP0_MAX_PACKET};
use crate::error::Error;

/// Largest value a handler can hand over by copy (status words, config value).
const INLINE_CAPACITY: usize = 8;

/// Device state per USB 2.0 chapter 9 (Attached and Suspended are not tracked
/// as states).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Powered,
    Default,
    Address,
    Configured,
}

/// Device-wide protocol state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Device {
    pub state: DeviceState,
    /// Last accepted SET_CONFIGURATION value.
    pub configuration: u8,
    pub suspended: bool,
}

impl Device {
    const fn powered() -> Self {
        Self {
            state: DeviceState::Powered,
            configuration: 0,
            suspended: false,
        }
    }
}

/// Where the bytes of an IN data stage come from.
#[derive(Clone, Copy, Debug)]
enum Payload {
    None,
    Static(&'static [u8]),
    Inline([u8; INLINE_CAPACITY], usize),
}

/// The single in-flight control transfer.
///
/// Class handlers describe the data stage they want through [`send`],
/// [`send_copy`] or [`receive`]; the engine then moves the cursor and
/// counts `remaining` down to zero.
///
/// [`send`]: ControlTransfer::send
/// [`send_copy`]: ControlTransfer::send_copy
/// [`receive`]: ControlTransfer::receive
pub struct ControlTransfer {
    payload: Payload,
    cursor: usize,
    remaining: usize,
    direction: Option<Direction>,
    zlp: bool,
    out: [u8; CONTROL_OUT_CAPACITY],
}

impl ControlTransfer {
    const fn new() -> Self {
        Self {
            payload: Payload::None,
            cursor: 0,
            remaining: 0,
            direction: None,
            zlp: false,
            out: [0; CONTROL_OUT_CAPACITY],
        }
    }

    fn reset(&mut self) {
        self.payload = Payload::None;
        self.cursor = 0;
        self.remaining = 0;
        self.direction = None;
        self.zlp = false;
    }

    /// IN data stage from a static table (descriptors).
    pub fn send(&mut self, data: &'static [u8]) {
        self.payload = Payload::Static(data);
        self.cursor = 0;
        self.remaining = data.len();
        self.direction = Some(Direction::In);
    }

    /// IN data stage from a short computed value, copied into the transfer.
    pub fn send_copy(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut buf = [0u8; INLINE_CAPACITY];
        buf.get_mut(..data.len())
            .ok_or(Error::TransferSize)?
            .copy_from_slice(data);
        self.payload = Payload::Inline(buf, data.len());
        self.cursor = 0;
        self.remaining = data.len();
        self.direction = Some(Direction::In);
        Ok(())
    }

    /// OUT data stage of `len` bytes, staged in the transfer's own buffer.
    pub fn receive(&mut self, len: usize) -> Result<(), Error> {
        if len > CONTROL_OUT_CAPACITY {
            return Err(Error::TransferSize);
        }
        self.payload = Payload::None;
        self.cursor = 0;
        self.remaining = len;
        self.direction = Some(Direction::Out);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// `true` while a trailing zero-length packet is still owed to the host.
    pub fn zero_length_pending(&self) -> bool {
        self.zlp
    }

    fn in_data(&self) -> &[u8] {
        match &self.payload {
            Payload::None => &[],
            Payload::Static(data) => data,
            Payload::Inline(buf, len) => &buf[..*len],
        }
    }
}

/// Extension points of the control engine, implemented by a device class.
///
/// Defaults reject every class request and every descriptor, accept OUT data
/// and ignore the remaining notifications.
pub trait ClassHandler<R: UsbRegisters> {
    /// Class or vendor request. Set up the data stage on `transfer` and
    /// return `Ok` to accept.
    fn request(&mut self, _setup: &SetupPacket, _transfer: &mut ControlTransfer) -> Result<(), Error> {
        Err(Error::Protocol)
    }

    /// Standard GET_DESCRIPTOR; this layer supplies no descriptors itself.
    fn get_descriptor(
        &mut self,
        _setup: &SetupPacket,
        _transfer: &mut ControlTransfer,
    ) -> Result<(), Error> {
        Err(Error::Protocol)
    }

    /// OUT data stage complete; `data` is everything the host sent.
    fn request_out(&mut self, _setup: &SetupPacket, _data: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    /// SET_CONFIGURATION was applied (`value == 0` means deconfigured).
    fn configuration_changed(&mut self, _driver: &mut UsbDriver<R>, _value: u8) {}

    /// Bus reset; the device is back in the Default state.
    fn bus_reset(&mut self) {}

    /// Event on a non-control endpoint.
    fn endpoint_event(&mut self, _driver: &mut UsbDriver<R>, _ep: Endpoint) {}
}

/// Control pipe state: device state machine plus the in-flight transfer.
pub struct ControlPipe {
    pub(super) device: Device,
    pub(super) setup: Option<SetupPacket>,
    pub(super) transfer: ControlTransfer,
}

impl Default for ControlPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPipe {
    pub const fn new() -> Self {
        Self {
            device: Device::powered(),
            setup: None,
            transfer: ControlTransfer::new(),
        }
    }

    /// Realize the EP0 pair and unmask its events.
    pub fn attach<R: UsbRegisters>(&mut self, driver: &mut UsbDriver<R>) {
        driver.realize_endpoint(Endpoint::ControlIn, EP0_MAX_PACKET);
        driver.realize_endpoint(Endpoint::ControlOut, EP0_MAX_PACKET);
        driver.enable_endpoint_event(Endpoint::ControlIn);
        driver.enable_endpoint_event(Endpoint::ControlOut);
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn state(&self) -> DeviceState {
        self.device.state
    }

    pub fn transfer(&self) -> &ControlTransfer {
        &self.transfer
    }

    pub fn bus_reset(&mut self) {
        self.device.state = DeviceState::Default;
        self.device.configuration = 0;
        self.device.suspended = false;
    }

    /// SETUP event on EP0 OUT; stalls the pipe on any rejection.
    pub fn on_setup<R: UsbRegisters, C: ClassHandler<R>>(
        &mut self,
        driver: &mut UsbDriver<R>,
        class: &mut C,
    ) {
        if let Err(err) = self.setup_stage(driver, class) {
            warn!("usb: setup rejected ({}), stalling EP0", err);
            driver.stall_endpoint(Endpoint::ControlOut);
        }
    }

    /// Data event on EP0 OUT; stalls the pipe on any rejection.
    pub fn on_out<R: UsbRegisters, C: ClassHandler<R>>(
        &mut self,
        driver: &mut UsbDriver<R>,
        class: &mut C,
    ) {
        if let Err(err) = self.out_stage(driver, class) {
            warn!("usb: OUT stage rejected ({}), stalling EP0", err);
            driver.stall_endpoint(Endpoint::ControlOut);
        }
    }

    /// IN-complete event on EP0 IN; stalls the pipe on any rejection.
    pub fn on_in<R: UsbRegisters>(&mut self, driver: &mut UsbDriver<R>) {
        if let Err(err) = self.in_stage(driver) {
            warn!("usb: IN stage rejected ({}), stalling EP0", err);
            driver.stall_endpoint(Endpoint::ControlOut);
        }
    }

    fn setup_stage<R: UsbRegisters, C: ClassHandler<R>>(
        &mut self,
        driver: &mut UsbDriver<R>,
        class: &mut C,
    ) -> Result<(), Error> {
        let mut buf = [0u8; EP0_MAX_PACKET as usize];
        let count = driver.endpoint_read(Endpoint::ControlOut, &mut buf);
        let setup = SetupPacket::parse(buf.get(..count).ok_or(Error::Protocol)?)?;

        self.setup = Some(setup);
        self.transfer.reset();
        debug!("usb: setup {}", setup);

        match setup.request_type {
            RequestType::Standard => self.standard_request(&setup, driver, class)?,
            _ => class.request(&setup, &mut self.transfer)?,
        }

        let requested = setup.length as usize;
        if requested == 0 {
            // No data stage: straight to the status stage.
            if self.transfer.remaining != 0 {
                return Err(Error::TransferSize);
            }
            driver.endpoint_write(Endpoint::ControlIn, &[]);
            return Ok(());
        }

        match setup.direction {
            Direction::In => {
                if self.transfer.direction != Some(Direction::In) {
                    return Err(Error::Protocol);
                }
                // Never send more than the host asked for.
                if self.transfer.remaining > requested {
                    self.transfer.remaining = requested;
                }
                // A short transfer that ends on a packet boundary needs a ZLP.
                if requested > self.transfer.remaining
                    && self.transfer.remaining % EP0_MAX_PACKET as usize == 0
                {
                    self.transfer.zlp = true;
                }
                self.in_stage(driver)
            }
            Direction::Out => {
                if self.transfer.direction != Some(Direction::Out) {
                    return Err(Error::Protocol);
                }
                if self.transfer.remaining != requested {
                    return Err(Error::TransferSize);
                }
                Ok(())
            }
        }
    }

    fn out_stage<R: UsbRegisters, C: ClassHandler<R>>(
        &mut self,
        driver: &mut UsbDriver<R>,
        class: &mut C,
    ) -> Result<(), Error> {
        if self.transfer.direction != Some(Direction::Out) {
            return Err(Error::Protocol);
        }

        let mut buf = [0u8; EP0_MAX_PACKET as usize];
        let size = driver.endpoint_read(Endpoint::ControlOut, &mut buf);
        if size > self.transfer.remaining {
            return Err(Error::TransferSize);
        }

        let start = self.transfer.cursor;
        self.transfer
            .out
            .get_mut(start..start + size)
            .ok_or(Error::TransferSize)?
            .copy_from_slice(&buf[..size]);
        self.transfer.cursor += size;
        self.transfer.remaining -= size;

        if self.transfer.remaining == 0 {
            let setup = self.setup.ok_or(Error::Protocol)?;
            class.request_out(&setup, &self.transfer.out[..self.transfer.cursor])?;
            driver.endpoint_write(Endpoint::ControlIn, &[]);
        }
        Ok(())
    }

    fn in_stage<R: UsbRegisters>(&mut self, driver: &mut UsbDriver<R>) -> Result<(), Error> {
        // Status-stage completions also arrive here with nothing left.
        if self.transfer.remaining == 0 {
            if self.transfer.zlp {
                driver.endpoint_write(Endpoint::ControlIn, &[]);
                self.transfer.zlp = false;
            }
            return Ok(());
        }

        if self.transfer.direction != Some(Direction::In) {
            return Err(Error::Protocol);
        }

        let chunk = self.transfer.remaining.min(EP0_MAX_PACKET as usize);
        let start = self.transfer.cursor;
        let data = self
            .transfer
            .in_data()
            .get(start..start + chunk)
            .ok_or(Error::TransferSize)?;
        driver.endpoint_write(Endpoint::ControlIn, data);

        self.transfer.cursor += chunk;
        self.transfer.remaining -= chunk;
        Ok(())
    }
}
