//! A complete USB device: driver, control pipe and class behind one interrupt entry.

use super::control::{ClassHandler, ControlPipe, Device, DeviceState};
use super::driver::{EventHandler, UsbDriver};
use super::registers::{SpinLimit, UsbRegisters};
use super::Endpoint;

pub struct UsbDevice<R, C> {
    driver: UsbDriver<R>,
    pipe: ControlPipe,
    class: C,
}

impl<R: UsbRegisters, C: ClassHandler<R>> UsbDevice<R, C> {
    /// Bring up the driver and the EP0 pair. The device stays off the bus
    /// until [`connect`](Self::connect).
    pub fn new(regs: R, spin: SpinLimit, class: C) -> Self {
        let mut driver = UsbDriver::new(regs, spin);
        driver.initialize();
        let mut pipe = ControlPipe::new();
        pipe.attach(&mut driver);
        Self {
            driver,
            pipe,
            class,
        }
    }

    /// Service the USB interrupt line.
    pub fn on_interrupt(&mut self) {
        let Self {
            driver,
            pipe,
            class,
        } = self;
        driver.handle_interrupt(&mut Dispatch { pipe, class });
    }

    pub fn connect(&mut self) {
        self.driver.connect();
    }

    pub fn disconnect(&mut self) {
        self.driver.disconnect();
    }

    pub fn state(&self) -> DeviceState {
        self.pipe.state()
    }

    pub fn device(&self) -> &Device {
        self.pipe.device()
    }

    pub fn driver_mut(&mut self) -> &mut UsbDriver<R> {
        &mut self.driver
    }

    pub fn registers_mut(&mut self) -> &mut R {
        self.driver.registers_mut()
    }

    pub fn class(&self) -> &C {
        &self.class
    }

    pub fn class_mut(&mut self) -> &mut C {
        &mut self.class
    }
}

/// Routes driver events to the control pipe and the class.
struct Dispatch<'a, C> {
    pipe: &'a mut ControlPipe,
    class: &'a mut C,
}

impl<R: UsbRegisters, C: ClassHandler<R>> EventHandler<R> for Dispatch<'_, C> {
    fn bus_reset(&mut self, _driver: &mut UsbDriver<R>) {
        self.pipe.bus_reset();
        self.class.bus_reset();
    }

    fn control_setup(&mut self, driver: &mut UsbDriver<R>) {
        self.pipe.on_setup(driver, &mut *self.class);
    }

    fn control_out(&mut self, driver: &mut UsbDriver<R>) {
        self.pipe.on_out(driver, &mut *self.class);
    }

    fn control_in(&mut self, driver: &mut UsbDriver<R>) {
        self.pipe.on_in(driver);
    }

    fn endpoint(&mut self, driver: &mut UsbDriver<R>, ep: Endpoint) {
        self.class.endpoint_event(driver, ep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::sim::SimPeripheral;

    #[derive(Default)]
    struct Counting {
        resets: usize,
        events: usize,
    }

    impl ClassHandler<SimPeripheral> for Counting {
        fn bus_reset(&mut self) {
            self.resets += 1;
        }

        fn configuration_changed(&mut self, driver: &mut UsbDriver<SimPeripheral>, value: u8) {
            if value != 0 {
                driver.realize_endpoint(Endpoint::InterruptIn, 8);
                driver.enable_endpoint_event(Endpoint::InterruptIn);
            }
        }

        fn endpoint_event(&mut self, _driver: &mut UsbDriver<SimPeripheral>, ep: Endpoint) {
            assert_eq!(ep, Endpoint::InterruptIn);
            self.events += 1;
        }
    }

    fn pump(dev: &mut UsbDevice<SimPeripheral, Counting>) {
        while dev.registers_mut().irq_pending() {
            dev.on_interrupt();
        }
    }

    #[test]
    fn new_device_is_powered_with_ep0_realized() {
        let mut dev = UsbDevice::new(SimPeripheral::new(), SpinLimit::Polls(10_000), Counting::default());
        assert_eq!(dev.state(), DeviceState::Powered);
        assert_eq!(dev.registers_mut().realized(Endpoint::ControlOut), Some(64));
        assert_eq!(dev.registers_mut().realized(Endpoint::ControlIn), Some(64));
        assert!(!dev.registers_mut().is_connected());
    }

    #[test]
    fn interrupt_drives_enumeration_and_class_events() {
        let mut dev = UsbDevice::new(SimPeripheral::new(), SpinLimit::Polls(10_000), Counting::default());
        dev.connect();

        dev.registers_mut().host_bus_reset();
        pump(&mut dev);
        assert_eq!(dev.state(), DeviceState::Default);
        assert_eq!(dev.class().resets, 1);

        dev.registers_mut().host_setup([0x00, 5, 7, 0, 0, 0, 0, 0]);
        pump(&mut dev);
        assert_eq!(dev.state(), DeviceState::Address);

        dev.registers_mut().host_setup([0x00, 9, 1, 0, 0, 0, 0, 0]);
        pump(&mut dev);
        assert_eq!(dev.state(), DeviceState::Configured);
        assert_eq!(dev.device().configuration, 1);

        dev.driver_mut().endpoint_write(Endpoint::InterruptIn, &[1, 2]);
        pump(&mut dev);
        assert_eq!(dev.class().events, 1);
    }
}
