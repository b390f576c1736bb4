//! Client or server side of a connection.
//!
//! The side decides how outgoing websocket frames are masked,
//! and which half of the opening handshake a session performs.

use crate::frame::Mask;
use crate::frame::mask::new_rand_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Answers upgrade requests, never masks.
    Server,
    /// Sends upgrade requests, masks with a random key.
    Client,
    /// Client using an empty(fake) mask key.
    ///
    /// With an empty mask key, the sender/receiver
    /// does not need to mask/unmask the payload.
    LightClient,
}

impl Role {
    /// Mask for the next outgoing frame.
    #[inline]
    pub fn new_write_mask(self) -> Mask {
        match self {
            Role::Server => Mask::None,
            Role::Client => Mask::Key(new_rand_key()),
            Role::LightClient => Mask::Skip,
        }
    }

    #[inline]
    pub const fn is_server(self) -> bool { matches!(self, Role::Server) }
}
