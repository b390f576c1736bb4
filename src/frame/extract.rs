//! Whole-frame extraction and encoding.

use bytes::{Bytes, BytesMut};

use super::{FrameHead, Fin, OpCode, Mask, PayloadLen};
use super::mask::apply_mask4;
use crate::error::FrameError;

/// One complete websocket frame taken off the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: OpCode,
    pub is_final: bool,
    /// Unmasked payload.
    pub payload: Vec<u8>,
    /// Head plus payload bytes consumed from the stream.
    pub frame_len: usize,
}

/// Try to take one frame from the front of `buf`.
///
/// Returns `Ok(None)` if `buf` does not hold a whole frame yet.
/// A payload longer than `max_payload` is refused so that a peer
/// cannot make the receive buffer wait for bytes that never fit.
pub fn extract_frame(buf: &[u8], max_payload: usize) -> Result<Option<Frame>, FrameError> {
    let (head, head_len) = match FrameHead::decode(buf) {
        Ok(x) => x,
        Err(FrameError::NotEnoughData) => return Ok(None),
        Err(e) => return Err(e),
    };

    let payload_len = head.length.to_num();
    if payload_len > max_payload as u64 {
        return Err(FrameError::TooLarge(payload_len, max_payload));
    }

    let payload_len = payload_len as usize;
    let frame_len = head_len + payload_len;
    if buf.len() < frame_len {
        return Ok(None);
    }

    let mut payload = buf[head_len..frame_len].to_vec();
    if let Mask::Key(key) = head.mask {
        apply_mask4(key, &mut payload);
    }

    Ok(Some(Frame {
        opcode: head.opcode,
        is_final: head.fin.is_final(),
        payload,
        frame_len,
    }))
}

/// Encode one frame, masking the payload if a key is given.
pub fn encode_frame(fin: Fin, opcode: OpCode, mask: Mask, payload: &[u8]) -> Bytes {
    let head = FrameHead::new(fin, opcode, mask, PayloadLen::from_num(payload.len() as u64));

    let mut buf = BytesMut::with_capacity(head.encoded_len() + payload.len());
    let head_len = head.encode(&mut buf);
    buf.extend_from_slice(payload);

    if let Mask::Key(key) = mask {
        apply_mask4(key, &mut buf[head_len..]);
    }

    buf.freeze()
}
