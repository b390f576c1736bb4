//! Pending send queue, the only state shared with foreign threads.

use bytes::Bytes;

use super::SendCallback;

/// Default unsent-byte threshold, 16 MiB.
pub const DEFAULT_HIGH_WATER: usize = 16 * 1024 * 1024;

pub(crate) struct PendingSend {
    pub msg: Bytes,
    pub callback: Option<SendCallback>,
}

/// What the caller of [`SendQueue::push`] has to schedule.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Pushed {
    /// No batch is in flight, the driver has to be woken.
    pub flush: bool,
    /// Unsent bytes just rose above the high water mark.
    pub high_water: bool,
}

pub(crate) struct SendQueue {
    pending: Vec<PendingSend>,
    sending: bool,
    unsent: usize,
    high_water: usize,
    above_high_water: bool,
}

impl SendQueue {
    pub fn new(high_water: usize) -> Self {
        Self {
            pending: Vec::new(),
            sending: false,
            unsent: 0,
            high_water,
            above_high_water: false,
        }
    }

    pub fn push(&mut self, msg: Bytes, callback: Option<SendCallback>) -> Pushed {
        self.unsent += msg.len();
        self.pending.push(PendingSend { msg, callback });

        let mut pushed = Pushed::default();

        if self.unsent > self.high_water && !self.above_high_water {
            self.above_high_water = true;
            pushed.high_water = true;
        }

        if !self.sending {
            self.sending = true;
            pushed.flush = true;
        }

        pushed
    }

    /// Swap every pending message into `batch`.
    /// Clears the sending flag if there is nothing left to send.
    pub fn take_batch(&mut self, batch: &mut Vec<PendingSend>) -> bool {
        debug_assert!(batch.is_empty());

        if self.pending.is_empty() {
            self.sending = false;
            return false;
        }

        std::mem::swap(&mut self.pending, batch);
        self.sending = true;
        true
    }

    /// `n` bytes have been written by the transport.
    pub fn complete(&mut self, n: usize) {
        self.unsent = self.unsent.saturating_sub(n);
        if self.unsent <= self.high_water {
            self.above_high_water = false;
        }
    }

    pub fn set_high_water(&mut self, high_water: usize) {
        self.high_water = high_water;
        self.above_high_water = self.unsent > high_water;
    }

    #[inline]
    pub const fn unsent(&self) -> usize { self.unsent }

    #[inline]
    pub fn has_pending(&self) -> bool { !self.pending.is_empty() }

    /// Forget everything, callbacks are dropped without being called.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.unsent = 0;
        self.above_high_water = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flush_once_while_sending() {
        let mut queue = SendQueue::new(DEFAULT_HIGH_WATER);
        assert!(queue.push(Bytes::from_static(b"a"), None).flush);
        assert!(!queue.push(Bytes::from_static(b"b"), None).flush);

        let mut batch = Vec::new();
        assert!(queue.take_batch(&mut batch));
        assert_eq!(batch.len(), 2);
        assert_eq!(&batch[0].msg[..], b"a");

        // still sending, a new push does not wake the driver again
        assert!(!queue.push(Bytes::from_static(b"c"), None).flush);

        queue.complete(2);
        batch.clear();
        assert!(queue.take_batch(&mut batch));
        queue.complete(1);
        batch.clear();
        assert!(!queue.take_batch(&mut batch));

        // idle again
        assert!(queue.push(Bytes::from_static(b"d"), None).flush);
    }

    #[test]
    fn high_water_once_per_crossing() {
        let mut queue = SendQueue::new(10);
        let crossings = |queue: &mut SendQueue, len: usize| {
            queue.push(Bytes::from(vec![0_u8; len]), None).high_water
        };

        assert!(!crossings(&mut queue, 10));
        assert!(crossings(&mut queue, 1));
        assert!(!crossings(&mut queue, 5));

        queue.complete(16);
        assert_eq!(queue.unsent(), 0);
        assert!(crossings(&mut queue, 11));
    }
}
