//! The fixed binary request/response record exchanged with the device-model process.
//! Six native-endian `u32`/`i32` fields, no padding, no framing beyond "exactly
//! `MESSAGE_SIZE` bytes".

use std::mem::size_of;

/// `command` value for a register read.
pub const CMD_READ: u32 = 1;
/// `command` value for a register write.
pub const CMD_WRITE: u32 = 2;

/// One request or response record. Request and response share this layout; which fields
/// are meaningful depends on `command` and on whether this is the outbound or inbound
/// half of the exchange (see module docs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Message {
    pub device_id: u32,
    pub command: u32,
    pub address: u32,
    pub data: u32,
    pub length: u32,
    pub result: i32,
}

/// Size in bytes of the wire encoding of a [`Message`]. Six `u32`-sized fields.
pub const MESSAGE_SIZE: usize = size_of::<u32>() * 5 + size_of::<i32>();

impl Message {
    pub fn read_request(device_id: u32, address: u32, length: u32) -> Self {
        Message {
            device_id,
            command: CMD_READ,
            address,
            data: 0,
            length,
            result: 0,
        }
    }

    pub fn write_request(device_id: u32, address: u32, length: u32, data: u32) -> Self {
        Message {
            device_id,
            command: CMD_WRITE,
            address,
            data,
            length,
            result: 0,
        }
    }

    /// Encode in native byte order, matching the reference implementation's plain
    /// `send(fd, &msg, sizeof(msg), 0)` of an in-memory C struct.
    pub fn to_bytes(self) -> [u8; MESSAGE_SIZE] {
        let mut buf = [0u8; MESSAGE_SIZE];
        buf[0..4].copy_from_slice(&self.device_id.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.command.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.address.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.data.to_ne_bytes());
        buf[16..20].copy_from_slice(&self.length.to_ne_bytes());
        buf[20..24].copy_from_slice(&self.result.to_ne_bytes());
        buf
    }

    pub fn from_bytes(buf: [u8; MESSAGE_SIZE]) -> Self {
        Message {
            device_id: u32::from_ne_bytes(buf[0..4].try_into().unwrap()),
            command: u32::from_ne_bytes(buf[4..8].try_into().unwrap()),
            address: u32::from_ne_bytes(buf[8..12].try_into().unwrap()),
            data: u32::from_ne_bytes(buf[12..16].try_into().unwrap()),
            length: u32::from_ne_bytes(buf[16..20].try_into().unwrap()),
            result: i32::from_ne_bytes(buf[20..24].try_into().unwrap()),
        }
    }

    pub fn is_write(&self) -> bool {
        self.command == CMD_WRITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let msg = Message::write_request(3, 0x4000_0008, 4, 1);
        let decoded = Message::from_bytes(msg.to_bytes());
        assert_eq!(msg, decoded);
    }

    #[test]
    fn message_size_matches_six_32_bit_fields() {
        assert_eq!(MESSAGE_SIZE, 24);
    }

    #[test]
    fn read_request_has_zero_data_and_result() {
        let msg = Message::read_request(0, 0x4000_0004, 4);
        assert_eq!(msg.command, CMD_READ);
        assert_eq!(msg.data, 0);
        assert_eq!(msg.result, 0);
        assert!(!msg.is_write());
    }
}
