//! Fin flag and opcode.

use crate::error::FrameError;

/// Whether a frame ends its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fin {
    Y = 0x80,
    N = 0x00,
}

/// Frame opcode, the low nibble of the first head byte.
///
/// Data frames are `Continue`, `Text` and `Binary`; the rest are control
/// frames, which may arrive between the fragments of a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Continue = 0x00,
    Text = 0x01,
    Binary = 0x02,
    Close = 0x08,
    Ping = 0x09,
    Pong = 0x0a,
}

impl Fin {
    /// Parse from the first head byte.
    /// Reserved bits must be clear since no extension is negotiated.
    #[inline]
    pub const fn from_flag(b: u8) -> Result<Self, FrameError> {
        let fin = match b & 0xf0 {
            0x80 => Fin::Y,
            0x00 => Fin::N,
            _ => return Err(FrameError::IllegalFin),
        };
        Ok(fin)
    }

    #[inline]
    pub const fn is_final(self) -> bool { matches!(self, Fin::Y) }
}

impl From<bool> for Fin {
    #[inline]
    fn from(is_final: bool) -> Self {
        if is_final {
            Fin::Y
        } else {
            Fin::N
        }
    }
}

impl OpCode {
    /// Parse from the first head byte.
    #[inline]
    pub const fn from_flag(b: u8) -> Result<Self, FrameError> {
        use OpCode::*;
        let opcode = match b & 0x0f {
            0x00 => Continue,
            0x01 => Text,
            0x02 => Binary,
            0x08 => Close,
            0x09 => Ping,
            0x0a => Pong,
            _ => return Err(FrameError::IllegalOpCode),
        };
        Ok(opcode)
    }

    /// Close, ping and pong.
    #[inline]
    pub const fn is_control(self) -> bool { (self as u8) & 0x08 != 0 }
}
