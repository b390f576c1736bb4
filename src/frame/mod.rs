//! Websocket data frame.
//!
//! [RFC-6455 Section5](https://datatracker.ietf.org/doc/html/rfc6455#section-5)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! :                     Payload Data continued ...                :
//! + - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - +
//! |                     Payload Data continued ...                |
//! +---------------------------------------------------------------+
//! ```
//!

pub mod flag;
pub mod length;
pub mod mask;
mod extract;

pub use flag::{Fin, OpCode};
pub use length::PayloadLen;
pub use mask::Mask;
pub use extract::{Frame, extract_frame, encode_frame};

use bytes::BufMut;

use crate::error::FrameError;

/// Longest possible frame head: 2 + 8 + 4.
pub const MAX_FRAME_HEAD_LEN: usize = 14;

/// Websocket frame head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub fin: Fin,
    pub opcode: OpCode,
    pub mask: Mask,
    pub length: PayloadLen,
}

impl FrameHead {
    /// Constructor.
    #[inline]
    pub const fn new(fin: Fin, opcode: OpCode, mask: Mask, length: PayloadLen) -> Self {
        Self {
            fin,
            opcode,
            mask,
            length,
        }
    }

    /// Number of bytes this head occupies on the wire.
    #[inline]
    pub const fn encoded_len(&self) -> usize { 2 + self.length.extended_len() + self.mask.key_len() }

    /// Append the encoded head to `buf`, returns the count of written bytes.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> usize {
        buf.put_u8(self.fin as u8 | self.opcode as u8);
        buf.put_u8(self.mask.to_flag() | self.length.to_flag());
        self.length.put_extended(buf);
        self.mask.put_key(buf);

        self.encoded_len()
    }

    /// Parse a head off the front of `buf`, returns it with its length.
    ///
    /// [`FrameError::NotEnoughData`] means the head is incomplete; nothing
    /// is consumed in that case.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        let (b1, b2) = match buf {
            [b1, b2, ..] => (*b1, *b2),
            _ => return Err(FrameError::NotEnoughData),
        };

        let fin = Fin::from_flag(b1)?;
        let opcode = OpCode::from_flag(b1)?;

        let length = PayloadLen::read(b2, &buf[2..]).ok_or(FrameError::NotEnoughData)?;
        let key_at = 2 + length.extended_len();
        let mask = Mask::read(b2, &buf[key_at..]).ok_or(FrameError::NotEnoughData)?;

        let head = FrameHead::new(fin, opcode, mask, length);
        let n = head.encoded_len();
        Ok((head, n))
    }
}
