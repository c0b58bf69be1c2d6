//! LPC17xx memory-mapped backend.

use core::ptr;

use cortex_m::interrupt::InterruptNumber;

use super::registers::{Reg, UsbRegisters};

const USB_BASE: usize = 0x5000_C200;

const USB_CLK_CTRL: *mut u32 = 0x5000_CFF4 as *mut u32;
const USB_CLK_ST: *const u32 = 0x5000_CFF8 as *const u32;
const PCONP: *mut u32 = 0x400F_C0C4 as *mut u32;
const USBCLKCFG: *mut u32 = 0x400F_C108 as *mut u32;
const PINSEL1: *mut u32 = 0x4002_C004 as *mut u32;
const PINSEL4: *mut u32 = 0x4002_C010 as *mut u32;

const PCUSB: u32 = 1 << 31;
const DEV_CLK_EN: u32 = 1 << 1;
const AHB_CLK_EN: u32 = 1 << 4;
/// PLL0 at 288 MHz divided by 6 for the 48 MHz USB clock.
const USBCLK_DIV_6: u32 = 5;

/// Core cycles that keep CONNECT low for well over 2.5 us.
const CONNECT_LOW_CYCLES: u32 = 100_000;

const fn offset(reg: Reg) -> usize {
    match reg {
        Reg::DevIntSt => 0x00,
        Reg::DevIntEn => 0x04,
        Reg::DevIntClr => 0x08,
        Reg::CmdCode => 0x10,
        Reg::CmdData => 0x14,
        Reg::RxData => 0x18,
        Reg::TxData => 0x1C,
        Reg::RxPLen => 0x20,
        Reg::TxPLen => 0x24,
        Reg::Ctrl => 0x28,
        Reg::EpIntSt => 0x30,
        Reg::EpIntEn => 0x34,
        Reg::EpIntClr => 0x38,
        Reg::ReEp => 0x44,
        Reg::EpInd => 0x48,
        Reg::MaxPSize => 0x4C,
    }
}

/// The on-chip USB device controller.
pub struct Lpc17xxUsb {
    _private: (),
}

impl Lpc17xxUsb {
    /// # Safety
    ///
    /// The controller must have been brought up with [`power_up`], and only
    /// one instance may exist.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn addr(reg: Reg) -> *mut u32 {
        (USB_BASE + offset(reg)) as *mut u32
    }
}

impl UsbRegisters for Lpc17xxUsb {
    fn read(&mut self, reg: Reg) -> u32 {
        // SAFETY: fixed, aligned device register inside the USB block.
        unsafe { ptr::read_volatile(Self::addr(reg)) }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        // SAFETY: fixed, aligned device register inside the USB block.
        unsafe { ptr::write_volatile(Self::addr(reg), value) }
    }
}

/// Power the USB block, start its clocks and hand D+, D- and CONNECT
/// (P0.29, P0.30, P2.9) to the controller.
///
/// # Safety
///
/// Read-modify-writes system control and pin-connect registers shared with
/// the rest of the firmware; call once, before other code touches them.
pub unsafe fn power_up() {
    ptr::write_volatile(USBCLKCFG, USBCLK_DIV_6);
    ptr::write_volatile(PCONP, ptr::read_volatile(PCONP) | PCUSB);

    let clocks = DEV_CLK_EN | AHB_CLK_EN;
    ptr::write_volatile(USB_CLK_CTRL, ptr::read_volatile(USB_CLK_CTRL) | clocks);
    while ptr::read_volatile(USB_CLK_ST) & clocks != clocks {}

    let pinsel1 = ptr::read_volatile(PINSEL1) & 0xC3FF_FFFF;
    ptr::write_volatile(PINSEL1, pinsel1 | 0x1400_0000);

    let pinsel4 = ptr::read_volatile(PINSEL4) & 0xFFFC_FFFF;
    ptr::write_volatile(PINSEL4, pinsel4 | 0x0004_0000);

    cortex_m::asm::delay(CONNECT_LOW_CYCLES);
    debug!("usb: peripheral powered");
}

/// NVIC line of the USB controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsbIrq;

impl UsbIrq {
    pub const NUMBER: u16 = 24;
}

// SAFETY: 24 is the USB interrupt on every LPC17xx part.
unsafe impl InterruptNumber for UsbIrq {
    fn number(self) -> u16 {
        Self::NUMBER
    }
}
