//! Descriptor tables served by the HID class.
//!
//! The configuration descriptor is assembled at compile time from named
//! blocks, so `wTotalLength`, the HID descriptor's report length and its
//! offset inside the bundle all follow from the block definitions.

use super::keyboard::KEYBOARD_COLLECTION;
use super::mouse::MOUSE_COLLECTION;
use crate::config::{
    CONFIGURATION_VALUE, EP0_MAX_PACKET, INTERRUPT_IN_MAX_PACKET, USB_BCD_DEVICE, USB_HID_POLL_MS,
    USB_PID, USB_VID,
};
use crate::usb::standard::{
    DESCRIPTOR_CONFIGURATION, DESCRIPTOR_DEVICE, DESCRIPTOR_ENDPOINT, DESCRIPTOR_INTERFACE,
};
use crate::usb::Endpoint;

pub const DESCRIPTOR_HID: u8 = 0x21;
pub const DESCRIPTOR_REPORT: u8 = 0x22;

const HID_CLASS: u8 = 0x03;
const HID_SUBCLASS_NONE: u8 = 0x00;
const HID_PROTOCOL_NONE: u8 = 0x00;

const ENDPOINT_INTERRUPT: u8 = 0x03;
/// Bus powered bit (always set) + self powered.
const ATTRIBUTES_SELF_POWERED: u8 = 0xC0;

const REPORT_DESCRIPTOR_LEN: usize = KEYBOARD_COLLECTION.len() + MOUSE_COLLECTION.len();

/// Keyboard (report ID 1) followed by mouse (report ID 2).
pub static REPORT_DESCRIPTOR: [u8; REPORT_DESCRIPTOR_LEN] =
    concat(&[KEYBOARD_COLLECTION, MOUSE_COLLECTION]);

#[rustfmt::skip]
pub static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,                         // bLength
    DESCRIPTOR_DEVICE,          // bDescriptorType
    0x00, 0x02,                 // bcdUSB 2.00
    0x00,                       // bDeviceClass (per interface)
    0x00,                       // bDeviceSubClass
    0x00,                       // bDeviceProtocol
    EP0_MAX_PACKET as u8,       // bMaxPacketSize0
    USB_VID as u8, (USB_VID >> 8) as u8,
    USB_PID as u8, (USB_PID >> 8) as u8,
    USB_BCD_DEVICE as u8, (USB_BCD_DEVICE >> 8) as u8,
    0x00,                       // iManufacturer
    0x00,                       // iProduct
    0x00,                       // iSerialNumber
    0x01,                       // bNumConfigurations
];

#[rustfmt::skip]
const INTERFACE: [u8; 9] = [
    9,                          // bLength
    DESCRIPTOR_INTERFACE,       // bDescriptorType
    0x00,                       // bInterfaceNumber
    0x00,                       // bAlternateSetting
    0x01,                       // bNumEndpoints
    HID_CLASS,
    HID_SUBCLASS_NONE,
    HID_PROTOCOL_NONE,
    0x00,                       // iInterface
];

#[rustfmt::skip]
pub const HID_DESCRIPTOR: [u8; 9] = [
    9,                          // bLength
    DESCRIPTOR_HID,             // bDescriptorType
    0x11, 0x01,                 // bcdHID 1.11
    0x00,                       // bCountryCode
    0x01,                       // bNumDescriptors
    DESCRIPTOR_REPORT,          // bDescriptorType
    REPORT_DESCRIPTOR_LEN as u8, (REPORT_DESCRIPTOR_LEN >> 8) as u8,
];

#[rustfmt::skip]
const ENDPOINT: [u8; 7] = [
    7,                          // bLength
    DESCRIPTOR_ENDPOINT,        // bDescriptorType
    0x80 | Endpoint::InterruptIn.logical(), // bEndpointAddress (EP1 IN)
    ENDPOINT_INTERRUPT,         // bmAttributes
    INTERRUPT_IN_MAX_PACKET as u8, (INTERRUPT_IN_MAX_PACKET >> 8) as u8,
    USB_HID_POLL_MS,            // bInterval
];

const CONFIGURATION_LEN: usize = 9 + INTERFACE.len() + HID_DESCRIPTOR.len() + ENDPOINT.len();

#[rustfmt::skip]
const CONFIGURATION_HEADER: [u8; 9] = [
    9,                          // bLength
    DESCRIPTOR_CONFIGURATION,   // bDescriptorType
    CONFIGURATION_LEN as u8, (CONFIGURATION_LEN >> 8) as u8,
    0x01,                       // bNumInterfaces
    CONFIGURATION_VALUE,
    0x00,                       // iConfiguration
    ATTRIBUTES_SELF_POWERED,
    0x00,                       // bMaxPower
];

/// Configuration + interface + HID + endpoint descriptors.
pub static CONFIGURATION_DESCRIPTOR: [u8; CONFIGURATION_LEN] = concat(&[
    &CONFIGURATION_HEADER,
    &INTERFACE,
    &HID_DESCRIPTOR,
    &ENDPOINT,
]);

/// Position of the HID descriptor inside [`CONFIGURATION_DESCRIPTOR`].
pub const HID_DESCRIPTOR_OFFSET: usize = CONFIGURATION_HEADER.len() + INTERFACE.len();

/// The HID descriptor as embedded in the configuration bundle.
pub fn hid_descriptor() -> &'static [u8] {
    &CONFIGURATION_DESCRIPTOR[HID_DESCRIPTOR_OFFSET..HID_DESCRIPTOR_OFFSET + HID_DESCRIPTOR.len()]
}

const fn concat<const N: usize>(parts: &[&[u8]]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut at = 0;
    let mut p = 0;
    while p < parts.len() {
        let part = parts[p];
        let mut i = 0;
        while i < part.len() {
            out[at] = part[i];
            at += 1;
            i += 1;
        }
        p += 1;
    }
    assert!(at == N, "descriptor blocks do not fill the table");
    out
}
