// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The 12-byte packet header shared by data, DV, and control packets.
//!
//! | Offset | Size | Field    | Wire encoding                                |
//! |--------|------|----------|-----------------------------------------------|
//! | 0      | 4    | `src`    | 32-bit big-endian IPv4                        |
//! | 4      | 4    | `dst`    | 32-bit big-endian IPv4 (DV: advertised count) |
//! | 8      | 1    | `type`   | `0x00` DV, `0x01` DATA, `0x02` CONTROL         |
//! | 9      | 2    | `length` | payload length, **not** byte-swapped           |
//! | 11     | 1    | —        | unused padding                                |
//!
//! `length` is read and written with an explicit little-endian conversion
//! rather than the host's native endianness. The reference implementation
//! this protocol was distilled from only ever ran on a little-endian
//! platform and left the field unswapped; encoding it explicitly as
//! little-endian here keeps this crate bit-compatible with that reference
//! on any host, rather than merely reproducing the quirk on whichever
//! platform happens to build this crate.

/// Size in bytes of the fixed header present at the start of every packet.
pub const HEADER_LEN: usize = 12;

/// The three packet kinds distinguished by the header's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// A distance-vector routing update.
    Dv,
    /// An ordinary data packet to be forwarded or NAT-rewritten.
    Data,
    /// A control-plane command.
    Control,
}

impl PacketType {
    fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PacketType::Dv),
            0x01 => Some(PacketType::Data),
            0x02 => Some(PacketType::Control),
            _ => None,
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            PacketType::Dv => 0x00,
            PacketType::Data => 0x01,
            PacketType::Control => 0x02,
        }
    }
}

/// A view of the 12-byte header at the start of a packet buffer.
///
/// All getters/setters operate on `src`/`dst` in host byte order; the
/// byte-swap to/from the wire's big-endian representation happens inside
/// this type so callers never have to think about it. `length` is the one
/// field that is deliberately *not* treated as "host order" -- see the
/// module docs.
#[derive(Debug)]
pub struct Header;

impl Header {
    /// Read `src` (host byte order) from `buf`.
    ///
    /// Returns `None` if `buf` is shorter than [`HEADER_LEN`].
    #[must_use]
    pub fn src(buf: &[u8]) -> Option<u32> {
        Some(u32::from_be_bytes(buf.get(0..4)?.try_into().ok()?))
    }

    /// Read `dst` (host byte order) from `buf`.
    #[must_use]
    pub fn dst(buf: &[u8]) -> Option<u32> {
        Some(u32::from_be_bytes(buf.get(4..8)?.try_into().ok()?))
    }

    /// Read the packet type byte, or `None` if the value is not one of the
    /// three known types.
    #[must_use]
    pub fn packet_type(buf: &[u8]) -> Option<PacketType> {
        PacketType::from_wire(*buf.get(8)?)
    }

    /// Read the `length` field. See module docs for its endianness.
    #[must_use]
    pub fn length(buf: &[u8]) -> Option<u16> {
        Some(u16::from_le_bytes(buf.get(9..11)?.try_into().ok()?))
    }

    /// Overwrite `src` in place, given a host-byte-order address.
    pub fn set_src(buf: &mut [u8], src: u32) -> Option<()> {
        buf.get_mut(0..4)?.copy_from_slice(&src.to_be_bytes());
        Some(())
    }

    /// Overwrite `dst` in place, given a host-byte-order address.
    pub fn set_dst(buf: &mut [u8], dst: u32) -> Option<()> {
        buf.get_mut(4..8)?.copy_from_slice(&dst.to_be_bytes());
        Some(())
    }

    /// Write a complete header into `buf[0..HEADER_LEN]`, zeroing the
    /// unused padding octet.
    ///
    /// Returns `None` if `buf` is shorter than [`HEADER_LEN`].
    pub fn make_header(
        buf: &mut [u8],
        src: u32,
        dst: u32,
        packet_type: PacketType,
        length: u16,
    ) -> Option<()> {
        let header = buf.get_mut(0..HEADER_LEN)?;
        header[0..4].copy_from_slice(&src.to_be_bytes());
        header[4..8].copy_from_slice(&dst.to_be_bytes());
        header[8] = packet_type.to_wire();
        header[9..11].copy_from_slice(&length.to_le_bytes());
        header[11] = 0;
        Some(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_arbitrary_fields() {
        let cases = [
            (0x0A00_0001, 0x0A00_0005, PacketType::Data, 0u16),
            (0x0102_0304, 0x0506_0708, PacketType::Dv, 360u16),
            (0xFFFF_FFFF, 0x0000_0000, PacketType::Control, 5u16),
        ];
        for (src, dst, ty, length) in cases {
            let mut buf = [0u8; HEADER_LEN];
            Header::make_header(&mut buf, src, dst, ty, length).expect("buffer big enough");
            assert_eq!(Header::src(&buf), Some(src));
            assert_eq!(Header::dst(&buf), Some(dst));
            assert_eq!(Header::packet_type(&buf), Some(ty));
            assert_eq!(Header::length(&buf), Some(length));
        }
    }

    #[test]
    fn src_dst_are_big_endian_on_the_wire() {
        let mut buf = [0u8; HEADER_LEN];
        Header::make_header(&mut buf, 0x0A00_0001, 0, PacketType::Data, 0)
            .expect("buffer big enough");
        assert_eq!(&buf[0..4], &[0x0A, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn length_is_little_endian_on_the_wire() {
        let mut buf = [0u8; HEADER_LEN];
        Header::make_header(&mut buf, 0, 0, PacketType::Dv, 0x0102).expect("buffer big enough");
        assert_eq!(&buf[9..11], &[0x02, 0x01]);
    }

    #[test]
    fn unknown_type_byte_decodes_to_none() {
        let mut buf = [0u8; HEADER_LEN];
        buf[8] = 0x7F;
        assert_eq!(Header::packet_type(&buf), None);
    }

    #[test]
    fn setters_rewrite_in_place_without_disturbing_other_fields() {
        let mut buf = [0u8; HEADER_LEN];
        Header::make_header(&mut buf, 1, 2, PacketType::Data, 42).expect("buffer big enough");
        Header::set_src(&mut buf, 9).expect("buffer big enough");
        Header::set_dst(&mut buf, 10).expect("buffer big enough");
        assert_eq!(Header::src(&buf), Some(9));
        assert_eq!(Header::dst(&buf), Some(10));
        assert_eq!(Header::packet_type(&buf), Some(PacketType::Data));
        assert_eq!(Header::length(&buf), Some(42));
    }

    #[test]
    fn truncated_buffer_is_rejected_not_panicked() {
        let buf = [0u8; 4];
        assert_eq!(Header::src(&buf), None);
        assert_eq!(Header::dst(&buf), None);
        assert_eq!(Header::packet_type(&buf), None);
        assert_eq!(Header::length(&buf), None);
    }
}
