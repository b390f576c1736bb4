//! Payload masking.

use bytes::BufMut;

const MASK_BIT: u8 = 0x80;

/// How a payload is masked.
///
/// `Mask::Skip` is an all-zero key: the mask bit is set but the payload is
/// left as is on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    Key([u8; 4]),
    Skip,
    None,
}

impl Mask {
    /// Read the mask bit of the second head byte and the key, if set.
    /// `buf` starts where the key would be.
    ///
    /// Returns `None` if the key is cut short.
    pub fn read(flag: u8, buf: &[u8]) -> Option<Self> {
        if flag & MASK_BIT == 0 {
            return Some(Mask::None);
        }

        let key: [u8; 4] = buf.get(..4)?.try_into().ok()?;
        Some(if key == [0; 4] { Mask::Skip } else { Mask::Key(key) })
    }

    #[inline]
    pub const fn to_flag(&self) -> u8 {
        match self {
            Mask::None => 0,
            _ => MASK_BIT,
        }
    }

    #[inline]
    pub const fn key_len(&self) -> usize {
        match self {
            Mask::None => 0,
            _ => 4,
        }
    }

    pub fn put_key<B: BufMut>(&self, buf: &mut B) {
        match self {
            Mask::Key(key) => buf.put_slice(key),
            Mask::Skip => buf.put_bytes(0, 4),
            Mask::None => {}
        }
    }
}

/// Generate a new random key.
#[inline]
pub fn new_rand_key() -> [u8; 4] { rand::random::<[u8; 4]>() }

/// Mask the buffer, byte by byte.
#[inline]
pub fn apply_mask(key: [u8; 4], buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= key[i & 0x03];
    }
}

/// Mask the buffer, 4 bytes at a time.
#[inline]
pub fn apply_mask4(key: [u8; 4], buf: &mut [u8]) {
    let mut chunks = buf.chunks_exact_mut(4);
    let key4 = u32::from_ne_bytes(key);

    for chunk in &mut chunks {
        let mut word = [0_u8; 4];
        word.copy_from_slice(chunk);
        let masked = u32::from_ne_bytes(word) ^ key4;
        chunk.copy_from_slice(&masked.to_ne_bytes());
    }

    // the tail starts at a multiple of 4, so the key is not rotated
    apply_mask(key, chunks.into_remainder());
}
