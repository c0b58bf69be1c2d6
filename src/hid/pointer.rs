//! Pointer convenience layer over [`UsbHid::mouse`].
//!
//! Takes unbounded deltas and splits them into as many 8-bit mouse reports
//! as needed (steps of 127 forward, -128 backward), keeping the button state
//! between calls.

use super::mouse::{BUTTON_LEFT, BUTTON_MIDDLE, BUTTON_RIGHT};
use super::UsbHid;
use crate::error::Error;
use crate::usb::UsbRegisters;

pub struct Pointer<'h, 'a, R> {
    hid: &'h UsbHid<'a, R>,
    buttons: u8,
}

impl<'h, 'a, R: UsbRegisters> Pointer<'h, 'a, R> {
    pub fn new(hid: &'h UsbHid<'a, R>) -> Self {
        Self { hid, buttons: 0 }
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Move by `(x, y)`; X is drained before Y.
    pub fn move_by(&mut self, x: i32, y: i32) -> Result<(), Error> {
        let x = self.drain(x, |hid, buttons, step| hid.mouse(step, 0, buttons, 0))?;
        let y = self.drain(y, |hid, buttons, step| hid.mouse(0, step, buttons, 0))?;
        self.hid.mouse(x, y, self.buttons, 0)
    }

    pub fn scroll(&mut self, z: i32) -> Result<(), Error> {
        let z = self.drain(z, |hid, buttons, step| hid.mouse(0, 0, buttons, step))?;
        self.hid.mouse(0, 0, self.buttons, z)
    }

    /// Replace the button state and report it without motion.
    pub fn set_buttons(&mut self, left: bool, middle: bool, right: bool) -> Result<(), Error> {
        let mut buttons = 0;
        if left {
            buttons |= BUTTON_LEFT;
        }
        if middle {
            buttons |= BUTTON_MIDDLE;
        }
        if right {
            buttons |= BUTTON_RIGHT;
        }
        self.buttons = buttons;
        self.hid.mouse(0, 0, buttons, 0)
    }

    /// Send full steps until `delta` fits in an `i8`; returns the remainder.
    fn drain(
        &self,
        mut delta: i32,
        send: impl Fn(&UsbHid<'a, R>, u8, i8) -> Result<(), Error>,
    ) -> Result<i8, Error> {
        while delta > i8::MAX as i32 {
            send(self.hid, self.buttons, i8::MAX)?;
            delta -= i8::MAX as i32;
        }
        while delta < i8::MIN as i32 {
            send(self.hid, self.buttons, i8::MIN)?;
            delta -= i8::MIN as i32;
        }
        Ok(delta as i8)
    }
}
