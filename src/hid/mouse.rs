//! Mouse input report (report ID 2).
//!
//! Payload layout (4 bytes, after the report ID byte):
//! ```text
//! Byte 0: Button bitfield
//!         Bit 0 = Left, Bit 1 = Right, Bit 2 = Middle
//! Byte 1: X displacement (signed, -127..127)
//! Byte 2: Y displacement (signed, -127..127)
//! Byte 3: Scroll wheel  (signed, -127..127)
//! ```

use crate::config::REPORT_ID_MOUSE;

/// Mouse report payload size in bytes.
pub const MOUSE_REPORT_SIZE: usize = 4;

pub const BUTTON_LEFT: u8 = 1 << 0;
pub const BUTTON_RIGHT: u8 = 1 << 1;
pub const BUTTON_MIDDLE: u8 = 1 << 2;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitfield (bit 0 = left, bit 1 = right, bit 2 = middle).
    pub buttons: u8,
    /// Relative X movement (signed).
    pub x: i8,
    /// Relative Y movement (signed).
    pub y: i8,
    /// Scroll wheel delta (signed).
    pub wheel: i8,
}

impl MouseReport {
    pub fn to_bytes(&self) -> [u8; MOUSE_REPORT_SIZE] {
        [self.buttons, self.x as u8, self.y as u8, self.wheel as u8]
    }
}

/// Mouse application collection of the report descriptor.
#[rustfmt::skip]
pub const MOUSE_COLLECTION: &[u8] = &[
    0x05, 0x01,     // Usage Page (Generic Desktop)
    0x09, 0x02,     // Usage (Mouse)
    0xA1, 0x01,     // Collection (Application)
    0x09, 0x01,     //   Usage (Pointer)
    0xA1, 0x00,     //   Collection (Physical)
    0x85, REPORT_ID_MOUSE, //     Report ID
    //
    //   - Buttons (3 bits + 5 padding) -
    0x95, 0x03,     //     Report Count (3)
    0x75, 0x01,     //     Report Size (1)
    0x05, 0x09,     //     Usage Page (Buttons)
    0x19, 0x01,     //     Usage Minimum (Button 1)
    0x29, 0x03,     //     Usage Maximum (Button 3)
    0x15, 0x00,     //     Logical Minimum (0)
    0x25, 0x01,     //     Logical Maximum (1)
    0x81, 0x02,     //     Input (Data, Variable, Absolute)
    0x95, 0x01,     //     Report Count (1)
    0x75, 0x05,     //     Report Size (5)
    0x81, 0x01,     //     Input (Constant)
    //
    //   - X, Y displacement and wheel -
    0x95, 0x03,     //     Report Count (3)
    0x75, 0x08,     //     Report Size (8)
    0x05, 0x01,     //     Usage Page (Generic Desktop)
    0x09, 0x30,     //     Usage (X)
    0x09, 0x31,     //     Usage (Y)
    0x09, 0x38,     //     Usage (Wheel)
    0x15, 0x81,     //     Logical Minimum (-127)
    0x25, 0x7F,     //     Logical Maximum (127)
    0x81, 0x06,     //     Input (Data, Variable, Relative)
    //
    0xC0,           //   End Collection (Physical)
    0xC0,           // End Collection (Application)
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_deltas_are_twos_complement() {
        let report = MouseReport {
            buttons: BUTTON_LEFT,
            x: 10,
            y: -5,
            wheel: -1,
        };
        assert_eq!(report.to_bytes(), [0x01, 0x0a, 0xfb, 0xff]);
    }
}
