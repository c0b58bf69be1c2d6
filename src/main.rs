//! lpc-hid firmware: enumerates as a keyboard + mouse, types a greeting,
//! then walks the pointer around a square.

#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use cortex_m::peripheral::NVIC;
use static_cell::StaticCell;

use lpc_hid::config::SPIN_LIMIT;
use lpc_hid::usb::lpc17xx::{self, Lpc17xxUsb, UsbIrq};
use lpc_hid::{IrqSlot, Pointer, ReportFlags, UsbHid};

type Hid = UsbHid<'static, Lpc17xxUsb>;

static FLAGS: ReportFlags = ReportFlags::new();
static HID: StaticCell<Hid> = StaticCell::new();
static USB_IRQ: IrqSlot<Hid> = IrqSlot::new();

const SQUARE_SIDE: i32 = 200;
const PAUSE_CYCLES: u32 = 10_000_000;

#[cortex_m_rt::entry]
fn main() -> ! {
    defmt::info!("lpc-hid starting");

    // SAFETY: first and only bring-up of the USB block, before the vector
    // is unmasked.
    unsafe { lpc17xx::power_up() };
    let regs = unsafe { Lpc17xxUsb::steal() };

    let hid: &'static Hid = HID.init(UsbHid::new(regs, &FLAGS, SPIN_LIMIT));
    if USB_IRQ.bind(hid).is_err() {
        defmt::panic!("usb interrupt already bound");
    }

    // SAFETY: the handler only reaches the stack through USB_IRQ, which is
    // bound above.
    unsafe { NVIC::unmask(UsbIrq) };
    hid.connect();
    defmt::info!("connected, waiting for the host");

    // Blocks until SET_CONFIGURATION.
    if let Err(e) = hid.keyboard_str("Hello from the LPC1768\n") {
        defmt::warn!("greeting aborted: {}", e);
    }

    let mut pointer = Pointer::new(hid);
    loop {
        for (dx, dy) in [(SQUARE_SIDE, 0), (0, SQUARE_SIDE), (-SQUARE_SIDE, 0), (0, -SQUARE_SIDE)] {
            if let Err(e) = pointer.move_by(dx, dy) {
                defmt::warn!("pointer move failed: {}", e);
            }
            cortex_m::asm::delay(PAUSE_CYCLES);
        }
    }
}

#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    if irqn == UsbIrq::NUMBER as i16 {
        if let Some(hid) = USB_IRQ.get() {
            hid.on_interrupt();
        }
    } else {
        defmt::warn!("unexpected interrupt {}", irqn);
    }
}
