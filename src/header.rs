//! The fixed 36-byte header that precedes every LAN protocol payload.
//!
//! Layout (all fields little-endian):
//!
//! | bytes | field |
//! |---|---|
//! | 0..2 | size of the whole datagram |
//! | 2..4 | origin:2, tagged:1, addressable:1, protocol:12 |
//! | 4..8 | source |
//! | 8..16 | target (MAC in the low six bytes) |
//! | 16..22 | reserved |
//! | 22 | reserved:6, ack_required:1, res_required:1 |
//! | 23 | sequence |
//! | 24..32 | reserved |
//! | 32..34 | message type |
//! | 34..36 | reserved |

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::Error;
use crate::types::TargetAddress;

type Result<T> = std::result::Result<T, Error>;

/// Size of the packed header in bytes.
pub const HEADER_SIZE: usize = 36;

/// The only protocol number devices understand.
pub const PROTOCOL: u16 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total datagram length, header included.
    pub size: u16,
    pub origin: u8,
    /// Set for messages addressed to every device.
    pub tagged: bool,
    pub addressable: bool,
    pub source: u32,
    pub target: TargetAddress,
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub message_type: u16,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            size: HEADER_SIZE as u16,
            origin: 0,
            tagged: false,
            addressable: true,
            source: 0,
            target: TargetAddress::BROADCAST,
            ack_required: false,
            res_required: false,
            sequence: 0,
            message_type: 0,
        }
    }
}

impl Header {
    /// Header for a request to `target`; a broadcast target sets `tagged`.
    pub fn for_target(source: u32, target: TargetAddress, sequence: u8) -> Self {
        Header {
            source,
            target,
            tagged: target.is_broadcast(),
            sequence,
            ..Default::default()
        }
    }

    pub fn pack(&self, v: &mut Vec<u8>) -> std::io::Result<()> {
        v.write_u16::<LittleEndian>(self.size)?;

        let mut d: u16 = (u16::from(self.origin) & 0b11) << 14;
        d |= u16::from(self.tagged) << 13;
        d |= u16::from(self.addressable) << 12;
        d |= PROTOCOL & 0x0FFF;
        v.write_u16::<LittleEndian>(d)?;

        v.write_u32::<LittleEndian>(self.source)?;
        v.write_u64::<LittleEndian>(self.target.to_wire())?;
        v.extend_from_slice(&[0; 6]);

        let flags = u8::from(self.ack_required) << 1 | u8::from(self.res_required);
        v.write_u8(flags)?;
        v.write_u8(self.sequence)?;

        v.write_u64::<LittleEndian>(0)?;
        v.write_u16::<LittleEndian>(self.message_type)?;
        v.write_u16::<LittleEndian>(0)?;
        Ok(())
    }

    /// Parse the header at the start of `bytes`.
    ///
    /// Only the header itself is validated here; the datagram length check
    /// lives in [`crate::message::decode`].
    pub fn unpack(bytes: &[u8]) -> Result<Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::malformed(format!(
                "datagram of {} bytes is shorter than the header",
                bytes.len()
            )));
        }
        Self::read(&mut Cursor::new(bytes))
            .map_err(|e| Error::malformed(format!("unreadable header: {e}")))
    }

    fn read(c: &mut Cursor<&[u8]>) -> std::io::Result<Header> {
        let size = c.read_u16::<LittleEndian>()?;

        let d = c.read_u16::<LittleEndian>()?;
        let protocol = d & 0x0FFF;
        if protocol != PROTOCOL {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("protocol {protocol}"),
            ));
        }

        let source = c.read_u32::<LittleEndian>()?;
        let target = TargetAddress::from_wire(c.read_u64::<LittleEndian>()?);
        let mut reserved = [0u8; 6];
        c.read_exact(&mut reserved)?;
        let flags = c.read_u8()?;
        let sequence = c.read_u8()?;
        c.read_u64::<LittleEndian>()?;
        let message_type = c.read_u16::<LittleEndian>()?;
        c.read_u16::<LittleEndian>()?;

        Ok(Header {
            size,
            origin: ((d >> 14) & 0b11) as u8,
            tagged: d & (1 << 13) != 0,
            addressable: d & (1 << 12) != 0,
            source,
            target,
            ack_required: flags & 0b10 != 0,
            res_required: flags & 0b01 != 0,
            sequence,
            message_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_layout() {
        let header = Header {
            size: 0x1122,
            tagged: true,
            source: 1234567,
            target: TargetAddress::new([0xD0, 0x73, 0xD5, 0x01, 0x02, 0x03]),
            ack_required: true,
            res_required: false,
            sequence: 7,
            message_type: 2,
            ..Default::default()
        };
        let mut v = Vec::new();
        header.pack(&mut v).unwrap();

        assert_eq!(v.len(), HEADER_SIZE);
        assert_eq!(&v[0..2], &[0x22, 0x11]);
        // protocol 1024 | addressable | tagged
        assert_eq!(&v[2..4], &[0x00, 0x34]);
        assert_eq!(&v[8..14], &[0xD0, 0x73, 0xD5, 0x01, 0x02, 0x03]);
        assert_eq!(v[22], 0b10);
        assert_eq!(v[23], 7);
        assert_eq!(&v[32..34], &[2, 0]);
        assert!(v[16..22].iter().all(|b| *b == 0));
        assert!(v[24..32].iter().all(|b| *b == 0));

        assert_eq!(Header::unpack(&v).unwrap(), header);
    }

    #[test]
    fn test_reserved_bits_ignored() {
        let mut v = Vec::new();
        Header::for_target(9, TargetAddress::BROADCAST, 1)
            .pack(&mut v)
            .unwrap();
        v[16] = 0xFF;
        v[22] |= 0b1111_0000;
        v[30] = 0xAB;
        let header = Header::unpack(&v).unwrap();
        assert_eq!(header.source, 9);
        assert!(header.tagged);
        assert!(!header.ack_required);
    }

    #[test]
    fn test_rejects_short_and_wrong_protocol() {
        assert!(matches!(
            Header::unpack(&[0; 35]),
            Err(Error::MalformedPacket(_))
        ));

        let mut v = Vec::new();
        Header::default().pack(&mut v).unwrap();
        v[2] = 0x01;
        assert!(matches!(Header::unpack(&v), Err(Error::MalformedPacket(_))));
    }
}
