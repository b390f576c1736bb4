//! Receive buffer.
//!
//! ```text
//! 0          consumed              commit              capacity   max_size
//! |--discard--|-----handed out-----|------read slot------|..........|
//! ```
//!
//! Bytes in `[consumed, commit)` were read but not yet accepted by the
//! data handler. The next read appends at `commit`. The window grows along
//! an S-curve when reads saturate it, and only up to `max_size`.

/// Smallest window, also the smallest growth step.
pub const MIN_RECEIVE_PREPARE_SIZE: usize = 1024;

/// Growth step of the tanh accumulator.
const TANH_X_STEP: f64 = 0.2;

#[derive(Debug)]
pub(crate) struct RecvBuffer {
    buf: Vec<u8>,
    max_size: usize,
    consumed: usize,
    commit: usize,
    tanh_x: f64,
}

impl RecvBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            buf: vec![0; MIN_RECEIVE_PREPARE_SIZE],
            max_size: std::cmp::max(MIN_RECEIVE_PREPARE_SIZE, max_size),
            consumed: 0,
            commit: 0,
            tanh_x: 0.0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize { self.buf.len() }

    #[inline]
    pub const fn max_size(&self) -> usize { self.max_size }

    /// Unconsumed bytes.
    #[inline]
    pub fn data(&self) -> &[u8] { &self.buf[self.consumed..self.commit] }

    #[inline]
    pub const fn len(&self) -> usize { self.commit - self.consumed }

    #[inline]
    pub const fn is_empty(&self) -> bool { self.commit == self.consumed }

    /// Drop `n` bytes from the head of [`data`](Self::data).
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.consumed += std::cmp::min(n, self.len());

        if self.consumed == self.commit {
            self.consumed = 0;
            self.commit = 0;
        }
    }

    /// Make room at the tail and return the slot the next read fills.
    ///
    /// An empty slot means the window is full of unconsumed bytes and
    /// already at `max_size`.
    pub fn prepare(&mut self) -> &mut [u8] {
        if self.is_empty() {
            self.consumed = 0;
            self.commit = 0;
        }

        if self.commit == self.capacity() {
            if self.consumed == 0 {
                // nothing to reclaim by sliding
                self.grow();
            } else {
                self.buf.copy_within(self.consumed..self.commit, 0);
                self.commit -= self.consumed;
                self.consumed = 0;
            }
        }

        let commit = self.commit;
        &mut self.buf[commit..]
    }

    /// Mark `n` bytes of the prepared slot as filled.
    #[inline]
    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.commit + n <= self.capacity());
        self.commit += n;
    }

    /// Widen the window, fast at first and slower as it nears `max_size`.
    /// Returns false if the window is already at `max_size`.
    pub fn grow(&mut self) -> bool {
        let window = self.capacity();
        if window >= self.max_size {
            return false;
        }

        let old_tanh = self.tanh_x.tanh();
        self.tanh_x += TANH_X_STEP;
        let new_tanh = self.tanh_x.tanh();

        let step = ((self.max_size - window) as f64 * (new_tanh - old_tanh)) as usize;
        let step = std::cmp::max(step, MIN_RECEIVE_PREPARE_SIZE);
        let new_capacity = std::cmp::min(window + step, self.max_size);

        self.buf.resize(new_capacity, 0);
        true
    }

    /// Move unconsumed bytes into a fresh, minimal window.
    pub fn shrink(&mut self) {
        let len = self.len();
        let mut fresh = vec![0; std::cmp::max(MIN_RECEIVE_PREPARE_SIZE, len)];
        fresh[..len].copy_from_slice(self.data());

        self.buf = fresh;
        self.consumed = 0;
        self.commit = len;
        self.tanh_x = 0.0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fill(buffer: &mut RecvBuffer) -> usize {
        let slot = buffer.prepare();
        let n = slot.len();
        slot.fill(0xab);
        buffer.commit(n);
        n
    }

    #[test]
    fn growth_converges() {
        let mut buffer = RecvBuffer::new(1 << 20);
        let mut last = buffer.capacity();
        let mut steps = Vec::new();

        // saturated reads, nothing consumed
        while buffer.capacity() < buffer.max_size() {
            fill(&mut buffer);
            assert!(buffer.grow());
            assert!(buffer.capacity() >= last);
            assert!(buffer.capacity() <= buffer.max_size());
            steps.push(buffer.capacity() - last);
            last = buffer.capacity();
        }

        assert_eq!(buffer.capacity(), 1 << 20);
        assert!(!buffer.grow());
        // early steps are larger than late ones
        assert!(steps[1] > *steps.last().unwrap());
    }

    #[test]
    fn slide_instead_of_grow() {
        let mut buffer = RecvBuffer::new(8192);
        let n = fill(&mut buffer);
        assert_eq!(n, MIN_RECEIVE_PREPARE_SIZE);

        buffer.consume(1000);
        assert_eq!(buffer.len(), 24);

        // window is full but the consumed head can be reclaimed
        let slot_len = buffer.prepare().len();
        assert_eq!(buffer.capacity(), MIN_RECEIVE_PREPARE_SIZE);
        assert_eq!(slot_len, MIN_RECEIVE_PREPARE_SIZE - 24);
        assert_eq!(buffer.data(), &[0xab; 24][..]);
    }

    #[test]
    fn grow_when_nothing_consumed() {
        let mut buffer = RecvBuffer::new(8192);
        fill(&mut buffer);

        let slot_len = buffer.prepare().len();
        assert!(buffer.capacity() > MIN_RECEIVE_PREPARE_SIZE);
        assert_eq!(slot_len, buffer.capacity() - MIN_RECEIVE_PREPARE_SIZE);
    }

    #[test]
    fn exhausted_at_max() {
        let mut buffer = RecvBuffer::new(0);
        assert_eq!(buffer.max_size(), MIN_RECEIVE_PREPARE_SIZE);

        fill(&mut buffer);
        assert!(buffer.prepare().is_empty());

        buffer.consume(1);
        assert_eq!(buffer.prepare().len(), 1);
    }

    #[test]
    fn shrink_keeps_data() {
        let mut buffer = RecvBuffer::new(1 << 16);
        for _ in 0..8 {
            fill(&mut buffer);
            buffer.grow();
        }
        let big = buffer.capacity();
        buffer.consume(buffer.len() - 10);

        buffer.shrink();
        assert!(buffer.capacity() < big);
        assert_eq!(buffer.capacity(), MIN_RECEIVE_PREPARE_SIZE);
        assert_eq!(buffer.data(), &[0xab; 10][..]);
    }

    #[test]
    fn consume_all_resets() {
        let mut buffer = RecvBuffer::new(4096);
        let slot = buffer.prepare();
        slot[..5].copy_from_slice(b"hello");
        buffer.commit(5);
        assert_eq!(buffer.data(), b"hello");

        buffer.consume(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.prepare().len(), MIN_RECEIVE_PREPARE_SIZE);
    }
}
