//! LPC17xx USB device controller register file.
//!
//! The driver never touches memory directly: every access goes through
//! [`UsbRegisters`], so the same driver runs against the MMIO backend on
//! target and against [`crate::usb::sim::SimPeripheral`] on the host.

/// Registers of the USB device controller used by this stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    /// USBDevIntSt - device interrupt status.
    DevIntSt,
    /// USBDevIntEn - device interrupt enable.
    DevIntEn,
    /// USBDevIntClr - device interrupt clear (write-1-to-clear).
    DevIntClr,
    /// USBEpIntSt - endpoint interrupt status.
    EpIntSt,
    /// USBEpIntEn - endpoint interrupt enable.
    EpIntEn,
    /// USBEpIntClr - endpoint interrupt clear; also loads CmdData with the
    /// endpoint's select status.
    EpIntClr,
    /// USBReEp - realized endpoints.
    ReEp,
    /// USBEpInd - endpoint index for MaxPSize.
    EpInd,
    /// USBMaxPSize - max packet size of the indexed endpoint.
    MaxPSize,
    /// USBRxData - receive FIFO, one word per read.
    RxData,
    /// USBRxPLen - receive packet length and ready flags.
    RxPLen,
    /// USBTxData - transmit FIFO, one word per write.
    TxData,
    /// USBTxPLen - transmit packet length.
    TxPLen,
    /// USBCtrl - selects the logical endpoint for FIFO access.
    Ctrl,
    /// USBCmdCode - SIE command code/phase.
    CmdCode,
    /// USBCmdData - SIE command read data.
    CmdData,
}

/// Raw access to the USB device controller registers.
pub trait UsbRegisters {
    /// Read a register. Reads of FIFO registers have side effects.
    fn read(&mut self, reg: Reg) -> u32;

    /// Write a register.
    fn write(&mut self, reg: Reg, value: u32);
}

/// How long a hardware handshake may spin before the peripheral is
/// declared wedged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpinLimit {
    /// Spin until the peripheral answers, forever if it never does.
    Unbounded,
    /// Panic after this many unanswered polls.
    Polls(u32),
}

// USBDevIntSt / En / Clr bits
pub const FRAME: u32 = 1 << 0;
pub const EP_FAST: u32 = 1 << 1;
pub const EP_SLOW: u32 = 1 << 2;
pub const DEV_STAT: u32 = 1 << 3;
pub const CCEMPTY: u32 = 1 << 4;
pub const CDFULL: u32 = 1 << 5;
pub const EP_RLZED: u32 = 1 << 8;

// USBCtrl bits
pub const RD_EN: u32 = 1 << 0;
pub const WR_EN: u32 = 1 << 1;

// USBRxPLen bits
pub const PKT_LNGTH_MASK: u32 = 0x3FF;
pub const DV: u32 = 1 << 10;
pub const PKT_RDY: u32 = 1 << 11;
