//! Payload length.

use bytes::BufMut;

/// Payload length, in the shortest of its three wire forms.
///
/// The low 7 bits of the second head byte carry either the length itself
/// (`0..=125`), or `126`/`127` for a 16/64-bit big endian length that
/// follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    Standard(u8),
    Extended1(u16),
    Extended2(u64),
}

impl PayloadLen {
    /// Pick the shortest encoding for a number.
    #[inline]
    pub const fn from_num(n: u64) -> Self {
        match n {
            0..=125 => PayloadLen::Standard(n as u8),
            126..=0xffff => PayloadLen::Extended1(n as u16),
            _ => PayloadLen::Extended2(n),
        }
    }

    #[inline]
    pub const fn to_num(self) -> u64 {
        match self {
            PayloadLen::Standard(v) => v as u64,
            PayloadLen::Extended1(v) => v as u64,
            PayloadLen::Extended2(v) => v,
        }
    }

    /// 7-bit length field of the second head byte.
    #[inline]
    pub const fn to_flag(&self) -> u8 {
        match self {
            PayloadLen::Standard(v) => *v,
            PayloadLen::Extended1(_) => 126,
            PayloadLen::Extended2(_) => 127,
        }
    }

    /// Bytes following the second head byte for a given length field.
    #[inline]
    pub const fn extended_len_of(flag: u8) -> usize {
        match flag & 0x7f {
            126 => 2,
            127 => 8,
            _ => 0,
        }
    }

    #[inline]
    pub const fn extended_len(&self) -> usize { Self::extended_len_of(self.to_flag()) }

    /// Read the length announced by `flag`, `buf` starts right after the
    /// second head byte.
    ///
    /// Returns `None` if `buf` is too short for the extended length.
    pub fn read(flag: u8, buf: &[u8]) -> Option<Self> {
        let n = Self::extended_len_of(flag);
        let ext = buf.get(..n)?;

        let length = match n {
            0 => PayloadLen::Standard(flag & 0x7f),
            2 => PayloadLen::Extended1(u16::from_be_bytes([ext[0], ext[1]])),
            _ => {
                let mut b8 = [0_u8; 8];
                b8.copy_from_slice(ext);
                PayloadLen::Extended2(u64::from_be_bytes(b8))
            }
        };
        Some(length)
    }

    /// Append the extended length, if any.
    pub fn put_extended<B: BufMut>(&self, buf: &mut B) {
        match *self {
            PayloadLen::Standard(_) => {}
            PayloadLen::Extended1(v) => buf.put_u16(v),
            PayloadLen::Extended2(v) => buf.put_u64(v),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn shortest_form() {
        assert_eq!(PayloadLen::from_num(125), PayloadLen::Standard(125));
        assert_eq!(PayloadLen::from_num(126), PayloadLen::Extended1(126));
        assert_eq!(PayloadLen::from_num(65535).extended_len(), 2);
        assert_eq!(PayloadLen::from_num(65536), PayloadLen::Extended2(65536));
        assert_eq!(PayloadLen::from_num(65536).to_flag(), 127);
    }

    #[test]
    fn read_extended() {
        for n in [0_u64, 64, 125, 126, 4096, 65535, 65536, 1 << 40] {
            let length = PayloadLen::from_num(n);
            let mut buf = Vec::new();
            length.put_extended(&mut buf);
            assert_eq!(buf.len(), length.extended_len());

            let flag = length.to_flag() | 0x80;
            assert_eq!(PayloadLen::read(flag, &buf), Some(length));
            assert_eq!(PayloadLen::read(flag, &buf).map(PayloadLen::to_num), Some(n));

            if !buf.is_empty() {
                assert_eq!(PayloadLen::read(flag, &buf[..buf.len() - 1]), None);
            }
        }
    }
}
