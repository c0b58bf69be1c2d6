//! Chapter 9 standard requests.

use super::control::{ClassHandler, ControlPipe, DeviceState};
use super::driver::UsbDriver;
use super::registers::UsbRegisters;
use super::setup::{Recipient, SetupPacket};
use super::Endpoint;
use crate::config::CONFIGURATION_VALUE;
use crate::error::Error;

// bRequest
pub const GET_STATUS: u8 = 0;
pub const CLEAR_FEATURE: u8 = 1;
pub const SET_FEATURE: u8 = 3;
pub const SET_ADDRESS: u8 = 5;
pub const GET_DESCRIPTOR: u8 = 6;
pub const SET_DESCRIPTOR: u8 = 7;
pub const GET_CONFIGURATION: u8 = 8;
pub const SET_CONFIGURATION: u8 = 9;
pub const GET_INTERFACE: u8 = 10;
pub const SET_INTERFACE: u8 = 11;

// Descriptor types
pub const DESCRIPTOR_DEVICE: u8 = 1;
pub const DESCRIPTOR_CONFIGURATION: u8 = 2;
pub const DESCRIPTOR_STRING: u8 = 3;
pub const DESCRIPTOR_INTERFACE: u8 = 4;
pub const DESCRIPTOR_ENDPOINT: u8 = 5;

// Feature selectors
pub const FEATURE_ENDPOINT_HALT: u16 = 0;
pub const FEATURE_DEVICE_REMOTE_WAKEUP: u16 = 1;

// GET_STATUS bits
const STATUS_SELF_POWERED: u16 = 1 << 0;
const STATUS_HALT: u16 = 1 << 0;

impl ControlPipe {
    pub(super) fn standard_request<R: UsbRegisters, C: ClassHandler<R>>(
        &mut self,
        setup: &SetupPacket,
        driver: &mut UsbDriver<R>,
        class: &mut C,
    ) -> Result<(), Error> {
        match setup.request {
            GET_STATUS => self.get_status(setup, driver),
            CLEAR_FEATURE => self.feature(setup, driver, false),
            SET_FEATURE => self.feature(setup, driver, true),
            SET_ADDRESS => {
                let address = (setup.value & 0x7F) as u8;
                driver.set_address(address);
                self.device.state = if address == 0 {
                    DeviceState::Default
                } else {
                    DeviceState::Address
                };
                info!("usb: address {}", address);
                Ok(())
            }
            GET_DESCRIPTOR => class.get_descriptor(setup, &mut self.transfer),
            SET_DESCRIPTOR => Err(Error::Unsupported),
            GET_CONFIGURATION => self.transfer.send_copy(&[self.device.configuration]),
            SET_CONFIGURATION => {
                let value = match setup.value {
                    0 => {
                        driver.configure_device(false);
                        self.device.state = DeviceState::Address;
                        0
                    }
                    v if v == CONFIGURATION_VALUE as u16 => {
                        driver.configure_device(true);
                        self.device.state = DeviceState::Configured;
                        CONFIGURATION_VALUE
                    }
                    _ => return Err(Error::Protocol),
                };
                self.device.configuration = value;
                info!("usb: configuration {}", value);
                class.configuration_changed(driver, value);
                Ok(())
            }
            GET_INTERFACE => {
                if self.device.state != DeviceState::Configured {
                    return Err(Error::Protocol);
                }
                // Single interface, no alternate settings.
                self.transfer.send_copy(&[0])
            }
            SET_INTERFACE => Err(Error::Unsupported),
            _ => Err(Error::Protocol),
        }
    }

    /// Before configuration only `wIndex == 0` may be addressed.
    fn check_index(&self, setup: &SetupPacket) -> Result<(), Error> {
        if self.device.state != DeviceState::Configured && setup.index != 0 {
            return Err(Error::Protocol);
        }
        Ok(())
    }

    fn get_status<R: UsbRegisters>(
        &mut self,
        setup: &SetupPacket,
        driver: &UsbDriver<R>,
    ) -> Result<(), Error> {
        self.check_index(setup)?;

        let status = match setup.recipient {
            Recipient::Device => STATUS_SELF_POWERED,
            Recipient::Interface => 0,
            Recipient::Endpoint => {
                let ep = Endpoint::from_windex(setup.index).ok_or(Error::Protocol)?;
                if driver.is_endpoint_stalled(ep) {
                    STATUS_HALT
                } else {
                    0
                }
            }
            _ => return Err(Error::Protocol),
        };
        self.transfer.send_copy(&status.to_le_bytes())
    }

    fn feature<R: UsbRegisters>(
        &mut self,
        setup: &SetupPacket,
        driver: &mut UsbDriver<R>,
        set: bool,
    ) -> Result<(), Error> {
        self.check_index(setup)?;

        match (setup.recipient, setup.value) {
            (Recipient::Endpoint, FEATURE_ENDPOINT_HALT) => {
                let ep = Endpoint::from_windex(setup.index).ok_or(Error::Protocol)?;
                if set {
                    driver.stall_endpoint(ep);
                } else {
                    driver.unstall_endpoint(ep);
                }
                Ok(())
            }
            (Recipient::Device, FEATURE_DEVICE_REMOTE_WAKEUP) => Err(Error::Unsupported),
            _ => Err(Error::Protocol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::registers::SpinLimit;
    use crate::usb::sim::SimPeripheral;

    struct NoClass;

    impl ClassHandler<SimPeripheral> for NoClass {}

    struct Rig {
        driver: UsbDriver<SimPeripheral>,
        pipe: ControlPipe,
    }

    impl Rig {
        fn new() -> Self {
            let mut driver = UsbDriver::new(SimPeripheral::new(), SpinLimit::Polls(10_000));
            driver.initialize();
            let mut pipe = ControlPipe::new();
            pipe.attach(&mut driver);
            pipe.bus_reset();
            Self { driver, pipe }
        }

        fn configured() -> Self {
            let mut rig = Self::new();
            rig.request([0x00, SET_ADDRESS, 3, 0, 0, 0, 0, 0]);
            rig.request([0x00, SET_CONFIGURATION, 1, 0, 0, 0, 0, 0]);
            rig.driver.realize_endpoint(Endpoint::InterruptIn, 64);
            rig
        }

        /// Run one request and return the first data packet, `None` if the
        /// pipe stalled.
        fn request(&mut self, packet: [u8; 8]) -> Option<std::vec::Vec<u8>> {
            self.driver.registers_mut().host_setup(packet);
            self.pipe.on_setup(&mut self.driver, &mut NoClass);
            let sim = self.driver.registers_mut();
            if sim.is_stalled(Endpoint::ControlOut) {
                while sim.pop_sent().is_some() {}
                return None;
            }
            let first = sim.pop_sent().map(|p| p.data.to_vec());
            while sim.pop_sent().is_some() {}
            first
        }
    }

    #[test]
    fn get_status_device_reports_self_powered() {
        let mut rig = Rig::new();
        assert_eq!(rig.request([0x80, GET_STATUS, 0, 0, 0, 0, 2, 0]), Some(vec![1, 0]));
    }

    #[test]
    fn get_status_interface_is_zero() {
        let mut rig = Rig::new();
        assert_eq!(rig.request([0x81, GET_STATUS, 0, 0, 0, 0, 2, 0]), Some(vec![0, 0]));
    }

    #[test]
    fn nonzero_index_before_configuration_is_rejected() {
        let mut rig = Rig::new();
        assert_eq!(rig.request([0x82, GET_STATUS, 0, 0, 0x81, 0, 2, 0]), None);
        assert_eq!(rig.request([0x02, SET_FEATURE, 0, 0, 0x81, 0, 0, 0]), None);
    }

    #[test]
    fn endpoint_halt_round_trip_after_configuration() {
        let mut rig = Rig::configured();

        assert_eq!(rig.request([0x82, GET_STATUS, 0, 0, 0x81, 0, 2, 0]), Some(vec![0, 0]));

        assert_eq!(rig.request([0x02, SET_FEATURE, 0, 0, 0x81, 0, 0, 0]), Some(vec![]));
        assert!(rig.driver.registers_mut().is_stalled(Endpoint::InterruptIn));
        assert_eq!(rig.request([0x82, GET_STATUS, 0, 0, 0x81, 0, 2, 0]), Some(vec![1, 0]));

        assert_eq!(rig.request([0x02, CLEAR_FEATURE, 0, 0, 0x81, 0, 0, 0]), Some(vec![]));
        assert!(!rig.driver.registers_mut().is_stalled(Endpoint::InterruptIn));
        assert_eq!(rig.request([0x82, GET_STATUS, 0, 0, 0x81, 0, 2, 0]), Some(vec![0, 0]));
    }

    #[test]
    fn unknown_endpoint_index_is_rejected() {
        let mut rig = Rig::configured();
        assert_eq!(rig.request([0x82, GET_STATUS, 0, 0, 0x85, 0, 2, 0]), None);
        assert_eq!(rig.request([0x02, SET_FEATURE, 0, 0, 0x03, 0, 0, 0]), None);
    }

    #[test]
    fn remote_wakeup_is_not_supported() {
        let mut rig = Rig::configured();
        assert_eq!(rig.request([0x00, SET_FEATURE, 1, 0, 0, 0, 0, 0]), None);
        assert_eq!(rig.request([0x00, CLEAR_FEATURE, 1, 0, 0, 0, 0, 0]), None);
    }

    #[test]
    fn set_address_moves_between_default_and_address() {
        let mut rig = Rig::new();
        assert_eq!(rig.request([0x00, SET_ADDRESS, 9, 0, 0, 0, 0, 0]), Some(vec![]));
        assert_eq!(rig.pipe.state(), DeviceState::Address);
        assert_eq!(rig.driver.registers_mut().address(), Some(9));

        rig.request([0x00, SET_ADDRESS, 0, 0, 0, 0, 0, 0]);
        assert_eq!(rig.pipe.state(), DeviceState::Default);
    }

    #[test]
    fn configuration_value_is_stored_and_reported() {
        let mut rig = Rig::new();
        rig.request([0x00, SET_ADDRESS, 1, 0, 0, 0, 0, 0]);
        assert_eq!(rig.request([0x80, GET_CONFIGURATION, 0, 0, 0, 0, 1, 0]), Some(vec![0]));

        rig.request([0x00, SET_CONFIGURATION, 1, 0, 0, 0, 0, 0]);
        assert_eq!(rig.pipe.state(), DeviceState::Configured);
        assert!(rig.driver.registers_mut().is_configured());
        assert_eq!(rig.request([0x80, GET_CONFIGURATION, 0, 0, 0, 0, 1, 0]), Some(vec![1]));

        rig.request([0x00, SET_CONFIGURATION, 0, 0, 0, 0, 0, 0]);
        assert_eq!(rig.pipe.state(), DeviceState::Address);
        assert!(!rig.driver.registers_mut().is_configured());
        assert_eq!(rig.pipe.device().configuration, 0);
    }

    #[test]
    fn unknown_configuration_value_stalls_and_keeps_state() {
        let mut rig = Rig::configured();

        // High byte set: not the same as configuration 0.
        assert_eq!(rig.request([0x00, SET_CONFIGURATION, 0x00, 0x01, 0, 0, 0, 0]), None);
        assert_eq!(rig.pipe.state(), DeviceState::Configured);
        assert!(rig.driver.registers_mut().is_configured());

        assert_eq!(rig.request([0x00, SET_CONFIGURATION, 2, 0, 0, 0, 0, 0]), None);
        assert_eq!(rig.pipe.state(), DeviceState::Configured);
        assert_eq!(rig.request([0x80, GET_CONFIGURATION, 0, 0, 0, 0, 1, 0]), Some(vec![1]));
    }

    #[test]
    fn get_interface_requires_configuration() {
        let mut rig = Rig::new();
        assert_eq!(rig.request([0x81, GET_INTERFACE, 0, 0, 0, 0, 1, 0]), None);

        let mut rig = Rig::configured();
        assert_eq!(rig.request([0x81, GET_INTERFACE, 0, 0, 0, 0, 1, 0]), Some(vec![0]));
    }

    #[test]
    fn unsupported_requests_stall() {
        let mut rig = Rig::configured();
        assert_eq!(rig.request([0x01, SET_INTERFACE, 1, 0, 0, 0, 0, 0]), None);
        assert_eq!(rig.request([0x00, SET_DESCRIPTOR, 0, 1, 0, 0, 0, 0]), None);
        assert_eq!(rig.request([0x80, 0x0C, 0, 0, 0, 0, 2, 0]), None);
        // No class to supply descriptors.
        assert_eq!(rig.request([0x80, GET_DESCRIPTOR, 0, 1, 0, 0, 18, 0]), None);
        assert_eq!(rig.pipe.state(), DeviceState::Configured);
    }
}
