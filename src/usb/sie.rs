//! Serial Interface Engine (SIE) command protocol.
//!
//! Every SIE transaction is up to three phases, each a write to
//! `USBCmdCode` followed by a blocking poll of `USBDevIntSt`:
//!
//! ```text
//! command    : CmdCode = (0x05 << 8) | (code << 16)  -> wait CCEMPTY
//! write data : CmdCode = (0x01 << 8) | (data << 16)  -> wait CCEMPTY
//! read data  : CmdCode = (0x02 << 8) | (code << 16)  -> wait CDFULL, read CmdData
//! ```
//!
//! There is no error path: a peripheral that never raises the flag keeps
//! the caller spinning, bounded only by the configured [`SpinLimit`].

use super::registers::{Reg, SpinLimit, UsbRegisters, CCEMPTY, CDFULL};
use super::Endpoint;

// Command phases
const PHASE_WRITE: u32 = 0x01;
const PHASE_READ: u32 = 0x02;
const PHASE_COMMAND: u32 = 0x05;

// Command codes
pub const CMD_SET_ADDRESS: u8 = 0xD0;
pub const CMD_CONFIGURE_DEVICE: u8 = 0xD8;
pub const CMD_DEVICE_STATUS: u8 = 0xFE;
pub const CMD_SELECT_ENDPOINT: u8 = 0x00;
pub const CMD_SET_ENDPOINT_STATUS: u8 = 0x40;
pub const CMD_CLEAR_BUFFER: u8 = 0xF2;
pub const CMD_VALIDATE_BUFFER: u8 = 0xFA;

// Device status register
pub const DS_CON: u8 = 1 << 0;
pub const DS_CON_CH: u8 = 1 << 1;
pub const DS_SUS_CH: u8 = 1 << 3;
pub const DS_RST: u8 = 1 << 4;

// Set Address register
pub const DSA_DEV_EN: u8 = 1 << 7;

// Configure Device register
pub const CONF_DEVICE: u8 = 1 << 0;

// Select Endpoint register
pub const SE_FE: u8 = 1 << 0;
pub const SE_ST: u8 = 1 << 1;
pub const SE_STP: u8 = 1 << 2;

// Set Endpoint Status register
pub const SES_ST: u8 = 1 << 0;
pub const SES_CND_ST: u8 = 1 << 7;

/// `USBCmdCode` value for one SIE phase.
pub const fn cmd_code(phase: u32, data: u8) -> u32 {
    (phase << 8) | ((data as u32) << 16)
}

/// Owner of the register file; issues SIE transactions and hardware waits.
pub struct Sie<R> {
    regs: R,
    spin: SpinLimit,
}

impl<R: UsbRegisters> Sie<R> {
    pub fn new(regs: R, spin: SpinLimit) -> Self {
        Self { regs, spin }
    }

    pub fn regs(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Spin until any bit of `mask` is set in `reg`.
    pub fn wait(&mut self, reg: Reg, mask: u32) {
        let mut polls: u32 = 0;
        while self.regs.read(reg) & mask == 0 {
            if let SpinLimit::Polls(limit) = self.spin {
                polls += 1;
                if polls >= limit {
                    error!("usb: peripheral wedged waiting on {} & {=u32:#x}", reg, mask);
                    panic!("usb peripheral wedged");
                }
            }
            core::hint::spin_loop();
        }
    }

    /// Command phase.
    pub fn command(&mut self, code: u8) {
        self.regs.write(Reg::DevIntClr, CCEMPTY);
        self.regs.write(Reg::CmdCode, cmd_code(PHASE_COMMAND, code));
        self.wait(Reg::DevIntSt, CCEMPTY);
    }

    /// Data write phase.
    pub fn write_data(&mut self, data: u8) {
        self.regs.write(Reg::DevIntClr, CCEMPTY);
        self.regs.write(Reg::CmdCode, cmd_code(PHASE_WRITE, data));
        self.wait(Reg::DevIntSt, CCEMPTY);
    }

    /// Data read phase.
    pub fn read_data(&mut self, code: u8) -> u8 {
        self.regs.write(Reg::DevIntClr, CDFULL);
        self.regs.write(Reg::CmdCode, cmd_code(PHASE_READ, code));
        self.wait(Reg::DevIntSt, CDFULL);
        self.regs.read(Reg::CmdData) as u8
    }

    pub fn device_status(&mut self) -> u8 {
        self.command(CMD_DEVICE_STATUS);
        self.read_data(CMD_DEVICE_STATUS)
    }

    pub fn set_device_status(&mut self, status: u8) {
        self.command(CMD_DEVICE_STATUS);
        self.write_data(status);
    }

    pub fn set_address(&mut self, address: u8) {
        self.command(CMD_SET_ADDRESS);
        self.write_data((address & 0x7F) | DSA_DEV_EN);
    }

    pub fn configure_device(&mut self, configured: bool) {
        self.command(CMD_CONFIGURE_DEVICE);
        self.write_data(if configured { CONF_DEVICE } else { 0 });
    }

    pub fn select_endpoint(&mut self, ep: Endpoint) -> u8 {
        let code = CMD_SELECT_ENDPOINT + ep.physical();
        self.command(code);
        self.read_data(code)
    }

    /// Select endpoint / clear interrupt, performed through `USBEpIntClr`
    /// which clears the `EpIntSt` bit and loads the select status into
    /// `USBCmdData` in one step.
    pub fn select_endpoint_clear_interrupt(&mut self, ep: Endpoint) -> u8 {
        self.regs.write(Reg::DevIntClr, CDFULL);
        self.regs.write(Reg::EpIntClr, ep.mask());
        self.wait(Reg::DevIntSt, CDFULL);
        self.regs.read(Reg::CmdData) as u8
    }

    pub fn set_endpoint_status(&mut self, ep: Endpoint, status: u8) {
        self.command(CMD_SET_ENDPOINT_STATUS + ep.physical());
        self.write_data(status);
    }

    /// Release the selected OUT buffer back to the SIE.
    pub fn clear_buffer(&mut self) -> u8 {
        self.command(CMD_CLEAR_BUFFER);
        self.read_data(CMD_CLEAR_BUFFER)
    }

    /// Queue the selected IN buffer for transmission.
    pub fn validate_buffer(&mut self) {
        self.command(CMD_VALIDATE_BUFFER);
    }
}
