//! Keyboard input report (report ID 1).
//!
//! Payload layout (8 bytes, after the report ID byte):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```
//!
//! The matching output report carries the LED state (5 bits + padding).

use super::keymap::KeyMapping;
use crate::config::REPORT_ID_KEYBOARD;

/// Keyboard report payload size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

// LED output report bits
pub const LED_NUM_LOCK: u8 = 1 << 0;
pub const LED_CAPS_LOCK: u8 = 1 << 1;
pub const LED_SCROLL_LOCK: u8 = 1 << 2;
pub const LED_COMPOSE: u8 = 1 << 3;
pub const LED_KANA: u8 = 1 << 4;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// A single key held down with its modifiers.
    pub const fn press(key: KeyMapping) -> Self {
        Self {
            modifier: key.modifier,
            reserved: 0,
            keycodes: [key.usage, 0, 0, 0, 0, 0],
        }
    }

    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.keycodes);
        buf
    }
}

/// Keyboard application collection of the report descriptor.
#[rustfmt::skip]
pub const KEYBOARD_COLLECTION: &[u8] = &[
    0x05, 0x01,     // Usage Page (Generic Desktop)
    0x09, 0x06,     // Usage (Keyboard)
    0xA1, 0x01,     // Collection (Application)
    0x85, REPORT_ID_KEYBOARD, //   Report ID
    //
    //   - Modifier keys (8 bits) -
    0x05, 0x07,     //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0,     //   Usage Minimum (Left Control)
    0x29, 0xE7,     //   Usage Maximum (Right GUI)
    0x15, 0x00,     //   Logical Minimum (0)
    0x25, 0x01,     //   Logical Maximum (1)
    0x75, 0x01,     //   Report Size (1)
    0x95, 0x08,     //   Report Count (8)
    0x81, 0x02,     //   Input (Data, Variable, Absolute)
    //
    //   - Reserved byte -
    0x95, 0x01,     //   Report Count (1)
    0x75, 0x08,     //   Report Size (8)
    0x81, 0x01,     //   Input (Constant)
    //
    //   - LED output (5 bits + 3 padding) -
    0x95, 0x05,     //   Report Count (5)
    0x75, 0x01,     //   Report Size (1)
    0x05, 0x08,     //   Usage Page (LEDs)
    0x19, 0x01,     //   Usage Minimum (Num Lock)
    0x29, 0x05,     //   Usage Maximum (Kana)
    0x91, 0x02,     //   Output (Data, Variable, Absolute)
    0x95, 0x01,     //   Report Count (1)
    0x75, 0x03,     //   Report Size (3)
    0x91, 0x01,     //   Output (Constant)
    //
    //   - Key codes (6 bytes) -
    0x95, 0x06,     //   Report Count (6)
    0x75, 0x08,     //   Report Size (8)
    0x15, 0x00,     //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07,     //   Usage Page (Keyboard/Keypad)
    0x19, 0x00,     //   Usage Minimum (0)
    0x2A, 0xFF, 0x00, // Usage Maximum (255)
    0x81, 0x00,     //   Input (Data, Array)
    //
    0xC0,           // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keymap::{lookup, SHIFT};

    #[test]
    fn press_puts_usage_in_first_slot() {
        let report = KeyboardReport::press(lookup('A').unwrap());
        assert_eq!(report.to_bytes(), [SHIFT, 0, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn default_report_is_key_up() {
        assert_eq!(KeyboardReport::default().to_bytes(), [0; KEYBOARD_REPORT_SIZE]);
    }
}
