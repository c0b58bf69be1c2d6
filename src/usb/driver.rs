//! Endpoint/command driver.
//!
//! Translates logical endpoint operations into SIE transactions and routes
//! the single USB interrupt to an [`EventHandler`]. Every handshake is a
//! blocking spin; there is no recoverable error at this layer.

use core::ops::{Deref, DerefMut};

use super::registers::{
    Reg, SpinLimit, UsbRegisters, DEV_STAT, DV, EP_RLZED, EP_SLOW, FRAME, PKT_LNGTH_MASK,
    PKT_RDY, RD_EN, WR_EN,
};
use super::sie::{Sie, DS_CON, DS_RST, SES_CND_ST, SES_ST, SE_STP};
use super::Endpoint;

/// Hooks invoked from [`UsbDriver::handle_interrupt`].
///
/// Every hook defaults to a no-op; a layer overrides only what it needs.
/// Hooks receive the driver so they can read and write endpoints.
pub trait EventHandler<R: UsbRegisters> {
    /// Bus reset signalled through the device status register.
    fn bus_reset(&mut self, _driver: &mut UsbDriver<R>) {}

    /// Start-of-frame.
    fn frame(&mut self, _driver: &mut UsbDriver<R>) {}

    /// SETUP packet waiting on the control OUT endpoint.
    fn control_setup(&mut self, _driver: &mut UsbDriver<R>) {}

    /// Data (non-SETUP) packet waiting on the control OUT endpoint.
    fn control_out(&mut self, _driver: &mut UsbDriver<R>) {}

    /// Control IN packet sent and acknowledged.
    fn control_in(&mut self, _driver: &mut UsbDriver<R>) {}

    /// Event on a non-control endpoint.
    fn endpoint(&mut self, _driver: &mut UsbDriver<R>, _ep: Endpoint) {}
}

/// Driver for the USB device controller.
pub struct UsbDriver<R> {
    sie: Sie<R>,
    /// Stall state of non-control endpoints; the SIE has no cheap read-back.
    stalled: u32,
}

impl<R: UsbRegisters> UsbDriver<R> {
    pub fn new(regs: R, spin: SpinLimit) -> Self {
        Self {
            sie: Sie::new(regs, spin),
            stalled: 0,
        }
    }

    /// Unmask the device-status and (slow) endpoint interrupt sources.
    ///
    /// Clocks and pins must already be up; the USB vector is bound by the
    /// owner of the driver (see [`crate::irq::IrqSlot`]).
    pub fn initialize(&mut self) {
        self.enable_events();
        debug!("usb: driver initialised");
    }

    /// Direct register access, e.g. for a simulated peripheral's host side.
    pub fn registers_mut(&mut self) -> &mut R {
        self.sie.regs()
    }

    /// Set the SIE "connected" bit: the host sees the device.
    pub fn connect(&mut self) {
        let status = self.sie.device_status();
        self.sie.set_device_status(status | DS_CON);
        info!("usb: connected");
    }

    /// Clear the SIE "connected" bit: the device drops off the bus.
    pub fn disconnect(&mut self) {
        let status = self.sie.device_status();
        self.sie.set_device_status(status & !DS_CON);
        info!("usb: disconnected");
    }

    pub fn set_address(&mut self, address: u8) {
        self.sie.set_address(address);
    }

    pub fn configure_device(&mut self, configured: bool) {
        self.sie.configure_device(configured);
    }

    /// Allocate endpoint buffer space and wait for the controller to confirm.
    pub fn realize_endpoint(&mut self, ep: Endpoint, max_packet: u16) {
        let regs = self.sie.regs();
        regs.write(Reg::DevIntClr, EP_RLZED);
        let realized = regs.read(Reg::ReEp);
        regs.write(Reg::ReEp, realized | ep.mask());
        regs.write(Reg::EpInd, ep.physical() as u32);
        regs.write(Reg::MaxPSize, max_packet as u32);

        self.sie.wait(Reg::DevIntSt, EP_RLZED);
        self.sie.regs().write(Reg::DevIntClr, EP_RLZED);

        self.stalled &= !ep.mask();
    }

    pub fn enable_endpoint_event(&mut self, ep: Endpoint) {
        let regs = self.sie.regs();
        let enabled = regs.read(Reg::EpIntEn);
        regs.write(Reg::EpIntEn, enabled | ep.mask());
    }

    pub fn disable_endpoint_event(&mut self, ep: Endpoint) {
        let regs = self.sie.regs();
        let enabled = regs.read(Reg::EpIntEn);
        regs.write(Reg::EpIntEn, enabled & !ep.mask());
    }

    /// Stall an endpoint.
    ///
    /// Either control endpoint conditionally stalls the whole control pipe
    /// through EP0 OUT; the stall clears itself on the next SETUP and is not
    /// cached.
    pub fn stall_endpoint(&mut self, ep: Endpoint) {
        if ep.is_control() {
            self.sie
                .set_endpoint_status(Endpoint::ControlOut, SES_CND_ST);
        } else {
            self.sie.set_endpoint_status(ep, SES_ST);
            self.stalled |= ep.mask();
        }
    }

    /// Clear STALL; the endpoint's data toggle is reinitialised as well.
    pub fn unstall_endpoint(&mut self, ep: Endpoint) {
        self.sie.set_endpoint_status(ep, 0);
        self.stalled &= !ep.mask();
    }

    pub fn is_endpoint_stalled(&self, ep: Endpoint) -> bool {
        self.stalled & ep.mask() != 0
    }

    /// Read one packet from an OUT endpoint into `buf`.
    ///
    /// Blocks until the packet is ready, drains the FIFO a word at a time and
    /// always releases the buffer, zero-length packets included. Returns the
    /// SIE-reported length; bytes past `buf.len()` are drained and dropped.
    pub fn endpoint_read(&mut self, ep: Endpoint, buf: &mut [u8]) -> usize {
        self.sie
            .regs()
            .write(Reg::Ctrl, ((ep.logical() as u32) << 2) | RD_EN);
        self.sie.wait(Reg::RxPLen, PKT_RDY);

        let plen = self.sie.regs().read(Reg::RxPLen);
        let size = if plen & DV != 0 {
            (plen & PKT_LNGTH_MASK) as usize
        } else {
            0
        };

        let regs = self.sie.regs();
        let mut word = 0u32;
        for i in 0..size {
            if i % 4 == 0 {
                word = regs.read(Reg::RxData);
            }
            if let Some(byte) = buf.get_mut(i) {
                *byte = (word >> ((i % 4) * 8)) as u8;
            }
        }

        // Clearing RD_EN also covers the zero-length case.
        regs.write(Reg::Ctrl, 0);

        self.sie.select_endpoint(ep);
        self.sie.clear_buffer();

        size
    }

    /// Write one packet to an IN endpoint and queue it for transmission.
    ///
    /// A zero-length `data` still validates the buffer so that a real ZLP
    /// goes out.
    pub fn endpoint_write(&mut self, ep: Endpoint, data: &[u8]) {
        let regs = self.sie.regs();
        regs.write(Reg::Ctrl, ((ep.logical() as u32) << 2) | WR_EN);
        regs.write(Reg::TxPLen, data.len() as u32);

        for chunk in data.chunks(4) {
            let word = chunk
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &b)| acc | (b as u32) << (i * 8));
            regs.write(Reg::TxData, word);
        }

        regs.write(Reg::Ctrl, 0);

        self.sie.select_endpoint(ep);
        self.sie.validate_buffer();
    }

    /// Unmask the interrupt sources this stack services.
    pub fn enable_events(&mut self) {
        self.sie.regs().write(Reg::DevIntEn, EP_SLOW | DEV_STAT);
    }

    /// Mask every device interrupt source.
    pub fn disable_events(&mut self) {
        self.sie.regs().write(Reg::DevIntEn, 0);
    }

    /// Mask every device interrupt source until the returned guard drops.
    pub fn mask_events(&mut self) -> EventMask<'_, R> {
        let saved = self.sie.regs().read(Reg::DevIntEn);
        self.disable_events();
        EventMask {
            driver: self,
            saved,
        }
    }

    /// Service the USB interrupt line.
    ///
    /// Frame, device-status and endpoint sources are checked independently,
    /// each against a fresh read of `USBDevIntSt`.
    pub fn handle_interrupt<H: EventHandler<R>>(&mut self, handler: &mut H) {
        if self.pending(FRAME) {
            handler.frame(self);
            self.sie.regs().write(Reg::DevIntClr, FRAME);
        }

        if self.pending(DEV_STAT) {
            // The flag must be cleared before the SIE status is read.
            self.sie.regs().write(Reg::DevIntClr, DEV_STAT);
            let device_status = self.sie.device_status();
            if device_status & DS_RST != 0 {
                info!("usb: bus reset");
                handler.bus_reset(self);
            }
        }

        if self.pending(EP_SLOW) {
            for ep in Endpoint::ALL {
                if self.sie.regs().read(Reg::EpIntSt) & ep.mask() == 0 {
                    continue;
                }
                let select = self.sie.select_endpoint_clear_interrupt(ep);
                match ep {
                    Endpoint::ControlOut if select & SE_STP != 0 => handler.control_setup(self),
                    Endpoint::ControlOut => handler.control_out(self),
                    Endpoint::ControlIn => handler.control_in(self),
                    other => handler.endpoint(self, other),
                }
            }
            // EP_SLOW only after the endpoint bits it summarises.
            self.sie.regs().write(Reg::DevIntClr, EP_SLOW);
        }
    }

    fn pending(&mut self, source: u32) -> bool {
        self.sie.regs().read(Reg::DevIntSt) & source != 0
    }
}

/// Scoped "USB interrupts masked" region; restores `USBDevIntEn` on drop.
pub struct EventMask<'a, R: UsbRegisters> {
    driver: &'a mut UsbDriver<R>,
    saved: u32,
}

impl<R: UsbRegisters> Deref for EventMask<'_, R> {
    type Target = UsbDriver<R>;

    fn deref(&self) -> &Self::Target {
        self.driver
    }
}

impl<R: UsbRegisters> DerefMut for EventMask<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.driver
    }
}

impl<R: UsbRegisters> Drop for EventMask<'_, R> {
    fn drop(&mut self) {
        self.driver.sie.regs().write(Reg::DevIntEn, self.saved);
    }
}
