//! Control request header (the 8-byte SETUP packet).
//!
//! Layout:
//! ```text
//! Byte 0  : bmRequestType - bit 7 direction, bits 6..5 type, bits 4..0 recipient
//! Byte 1  : bRequest
//! Byte 2-3: wValue  (little-endian)
//! Byte 4-5: wIndex  (little-endian)
//! Byte 6-7: wLength (little-endian)
//! ```

use crate::error::Error;

/// SETUP packet size in bytes.
pub const SETUP_PACKET_SIZE: usize = 8;

/// Data stage direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device.
    Out,
    /// Device to host.
    In,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
    Reserved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    /// Recipient codes 4..=31.
    Reserved(u8),
}

/// Decoded control request header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub direction: Direction,
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Decode a SETUP packet; anything but exactly 8 bytes is a protocol error.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() != SETUP_PACKET_SIZE {
            return Err(Error::Protocol);
        }

        let bm = data[0];
        Ok(Self {
            direction: if bm & 0x80 != 0 {
                Direction::In
            } else {
                Direction::Out
            },
            request_type: match (bm >> 5) & 0x03 {
                0 => RequestType::Standard,
                1 => RequestType::Class,
                2 => RequestType::Vendor,
                _ => RequestType::Reserved,
            },
            recipient: match bm & 0x1F {
                0 => Recipient::Device,
                1 => Recipient::Interface,
                2 => Recipient::Endpoint,
                3 => Recipient::Other,
                other => Recipient::Reserved(other),
            },
            request: data[1],
            value: u16::from_le_bytes([data[2], data[3]]),
            index: u16::from_le_bytes([data[4], data[5]]),
            length: u16::from_le_bytes([data[6], data[7]]),
        })
    }

    /// Descriptor type of a GET_DESCRIPTOR request (high byte of `wValue`).
    pub const fn descriptor_type(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Descriptor index of a GET_DESCRIPTOR request (low byte of `wValue`).
    pub const fn descriptor_index(&self) -> u8 {
        self.value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_device_descriptor() {
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]).unwrap();
        assert_eq!(setup.direction, Direction::In);
        assert_eq!(setup.request_type, RequestType::Standard);
        assert_eq!(setup.recipient, Recipient::Device);
        assert_eq!(setup.request, 6);
        assert_eq!(setup.value, 0x0100);
        assert_eq!(setup.descriptor_type(), 1);
        assert_eq!(setup.descriptor_index(), 0);
        assert_eq!(setup.index, 0);
        assert_eq!(setup.length, 18);
    }

    #[test]
    fn parses_class_interface_out_request() {
        // SET_REPORT(Output, id 1) to interface 0
        let setup = SetupPacket::parse(&[0x21, 0x09, 0x01, 0x02, 0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(setup.direction, Direction::Out);
        assert_eq!(setup.request_type, RequestType::Class);
        assert_eq!(setup.recipient, Recipient::Interface);
        assert_eq!(setup.value, 0x0201);
        assert_eq!(setup.length, 1);
    }

    #[test]
    fn parses_reserved_type_and_recipient() {
        let setup = SetupPacket::parse(&[0x7F, 0, 0, 0, 0x81, 0x00, 0, 0]).unwrap();
        assert_eq!(setup.request_type, RequestType::Reserved);
        assert_eq!(setup.recipient, Recipient::Reserved(31));
        assert_eq!(setup.index, 0x0081);
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(SetupPacket::parse(&[0x80, 6, 0, 1, 0, 0, 18]), Err(Error::Protocol));
        assert_eq!(SetupPacket::parse(&[0; 9]), Err(Error::Protocol));
        assert_eq!(SetupPacket::parse(&[]), Err(Error::Protocol));
    }
}
