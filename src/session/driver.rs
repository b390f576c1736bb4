//! The task behind every session.
//!
//! Each turn of the loop services at most one command, one write and one
//! read, so a busy peer cannot starve marshaled operations and a flood of
//! commands cannot starve I/O. After `YIELD_BUDGET` productive turns the
//! task yields back to the executor.

use std::io::{self, IoSlice};
use std::net::Shutdown;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

use super::buffer::RecvBuffer;
use super::queue::PendingSend;
use super::{ClosedHandler, Command, DataHandler, EofHandler, HighWaterHandler};
use super::{Session, Transport};

const YIELD_BUDGET: usize = 32;

/// Upper bound of buffers handed to one vectored write.
const MAX_IOV: usize = 64;

pub(crate) struct Driver<T> {
    session: Session,
    io: Option<T>,
    commands: mpsc::UnboundedReceiver<Command>,

    recv: RecvBuffer,
    stall_warned: bool,
    shrink_requested: bool,
    read_eof: bool,
    read_shut: bool,

    // in-flight batch, resumed at batch[batch_pos][msg_offset..]
    batch: Vec<PendingSend>,
    batch_pos: usize,
    msg_offset: usize,
    writing: bool,
    shutdown_write: bool,
    close_after_flush: bool,

    data_handler: Option<DataHandler>,
    closed_handler: Option<ClosedHandler>,
    eof_handler: Option<EofHandler>,
    high_water_handler: Option<HighWaterHandler>,

    done: bool,
}

impl<T: Transport> Driver<T> {
    pub fn new(
        session: Session,
        io: T,
        commands: mpsc::UnboundedReceiver<Command>,
        recv: RecvBuffer,
    ) -> Self {
        Self {
            session,
            io: Some(io),
            commands,
            recv,
            stall_warned: false,
            shrink_requested: false,
            read_eof: false,
            read_shut: false,
            batch: Vec::new(),
            batch_pos: 0,
            msg_offset: 0,
            writing: false,
            shutdown_write: false,
            close_after_flush: false,
            data_handler: None,
            closed_handler: None,
            eof_handler: None,
            high_water_handler: None,
            done: false,
        }
    }

    pub async fn run(mut self) {
        std::future::poll_fn(|cx| self.poll_drive(cx)).await;
        log::debug!("session {} driver exited", self.session.id());
    }

    fn poll_drive(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        for _ in 0..YIELD_BUDGET {
            let mut progress = false;

            match self.commands.poll_recv(cx) {
                Poll::Ready(Some(cmd)) => {
                    self.handle_command(cmd);
                    progress = true;
                }
                // the driver's own handle keeps a sender
                Poll::Ready(None) | Poll::Pending => {}
            }

            if !self.done {
                progress |= self.poll_write(cx);
            }

            if !self.done {
                progress |= self.poll_read(cx);
            }

            if self.done {
                return Poll::Ready(());
            }

            if !progress {
                return Poll::Pending;
            }
        }

        cx.waker().wake_by_ref();
        Poll::Pending
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetDataHandler(handler) => {
                self.data_handler = Some(handler);
                self.deliver();
            }
            Command::SetClosedHandler(handler) => self.closed_handler = Some(handler),
            Command::SetEofHandler(handler) => self.eof_handler = Some(handler),
            Command::SetHighWaterHandler(handler) => self.high_water_handler = Some(handler),
            Command::HighWater => {
                if let Some(handler) = self.high_water_handler.as_mut() {
                    handler(&self.session);
                }
            }
            Command::Flush => self.writing = true,
            Command::Shrink => self.shrink_requested = true,
            Command::Shutdown(how) => self.shutdown(how),
            Command::Close => self.close(),
            Command::Dispatch(f) => f(&self.session),
            Command::Released => {
                // nobody could ever install a data handler now
                if self.data_handler.is_none() {
                    log::debug!("session {} released before reading", self.session.id());
                    self.cause_closed();
                }
            }
        }
    }

    fn close(&mut self) {
        let unflushed = self.batch_pos < self.batch.len()
            || self.writing
            || self.session.with_queue(|queue| queue.has_pending());

        if self.read_eof && unflushed {
            log::debug!("session {} closes after flushing", self.session.id());
            self.close_after_flush = true;
            self.writing = true;
            return;
        }

        self.cause_closed();
    }

    fn shutdown(&mut self, how: Shutdown) {
        if matches!(how, Shutdown::Read | Shutdown::Both) {
            if let Some(io) = self.io.as_mut() {
                if let Err(e) = io.shutdown_read() {
                    log::debug!("session {} shutdown read: {}", self.session.id(), e);
                }
            }
            self.read_shut = true;
        }

        // after the in-flight batch
        if matches!(how, Shutdown::Write | Shutdown::Both) {
            self.shutdown_write = true;
        }
    }

    /// Close the transport and release every handler, exactly once.
    fn cause_closed(&mut self) {
        self.done = true;
        if !self.session.mark_closed() {
            return;
        }

        self.io = None;
        self.data_handler = None;
        self.eof_handler = None;
        self.high_water_handler = None;

        // unsent messages are dropped with their callbacks
        self.batch.clear();
        self.batch_pos = 0;
        self.session.with_queue(|queue| queue.clear());

        log::debug!("session {} closed", self.session.id());

        if let Some(handler) = self.closed_handler.take() {
            handler(&self.session);
        }
    }

    /// Offer `[consumed, commit)` to the data handler.
    fn deliver(&mut self) {
        if self.done || self.recv.is_empty() {
            return;
        }

        let handler = match self.data_handler.as_mut() {
            Some(handler) => handler,
            None => return,
        };

        let view_len = self.recv.len();
        let accepted = handler(&self.session, self.recv.data());

        if accepted > view_len {
            log::error!(
                "session {} handler accepted {} bytes out of {}",
                self.session.id(),
                accepted,
                view_len
            );
            self.cause_closed();
            return;
        }

        self.recv.consume(accepted);

        if self.shrink_requested {
            self.shrink_requested = false;
            self.recv.shrink();
        }
    }

    fn on_eof(&mut self) {
        self.read_eof = true;

        match self.eof_handler.take() {
            Some(handler) => {
                log::debug!("session {} reached eof", self.session.id());
                handler(&self.session);
            }
            None => self.cause_closed(),
        }
    }

    fn poll_read(&mut self, cx: &mut Context<'_>) -> bool {
        if self.data_handler.is_none() || self.read_eof || self.read_shut {
            return false;
        }

        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return false,
        };

        if self.shrink_requested && self.recv.is_empty() {
            self.shrink_requested = false;
            self.recv.shrink();
        }

        let slot = self.recv.prepare();
        if slot.is_empty() {
            if !self.stall_warned {
                self.stall_warned = true;
                log::warn!(
                    "session {} receive buffer exhausted at {} bytes, reading paused",
                    self.session.id(),
                    self.recv.max_size()
                );
            }
            return false;
        }
        self.stall_warned = false;

        let slot_len = slot.len();
        let mut buf = ReadBuf::new(slot);

        match Pin::new(io).poll_read(cx, &mut buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len();
                if n == 0 {
                    self.on_eof();
                    return true;
                }

                self.recv.commit(n);
                let shrink_pending = self.shrink_requested;
                self.deliver();

                // a saturated read means the window is too small
                if n == slot_len && !shrink_pending && !self.done {
                    self.recv.grow();
                }
                true
            }
            Poll::Ready(Err(e)) => {
                log::debug!("session {} read error: {}", self.session.id(), e);
                self.cause_closed();
                true
            }
            Poll::Pending => false,
        }
    }

    fn poll_write(&mut self, cx: &mut Context<'_>) -> bool {
        if self.io.is_none() {
            return false;
        }

        let mut progress = false;

        if self.batch_pos >= self.batch.len() {
            self.batch.clear();
            self.batch_pos = 0;
            self.msg_offset = 0;

            if !self.writing {
                return self.poll_write_shutdown(cx);
            }

            let batch = &mut self.batch;
            if !self.session.with_queue(|queue| queue.take_batch(batch)) {
                self.writing = false;

                if self.close_after_flush {
                    self.cause_closed();
                    return true;
                }

                return self.poll_write_shutdown(cx);
            }

            progress = true;
        }

        // zero length messages complete without touching the transport
        self.advance(0);
        if self.batch_pos >= self.batch.len() {
            return true;
        }

        let mut slices = [IoSlice::new(&[]); MAX_IOV];
        let mut count = 0;
        for pending in self.batch[self.batch_pos..].iter().take(MAX_IOV) {
            let start = if count == 0 { self.msg_offset } else { 0 };
            slices[count] = IoSlice::new(&pending.msg[start..]);
            count += 1;
        }

        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return progress,
        };

        match Pin::new(io).poll_write_vectored(cx, &slices[..count]) {
            Poll::Ready(Ok(0)) => {
                let e = io::Error::from(io::ErrorKind::WriteZero);
                log::debug!("session {} write error: {}", self.session.id(), e);
                self.cause_closed();
                true
            }
            Poll::Ready(Ok(n)) => {
                self.advance(n);
                true
            }
            Poll::Ready(Err(e)) => {
                log::debug!("session {} write error: {}", self.session.id(), e);
                self.cause_closed();
                true
            }
            Poll::Pending => progress,
        }
    }

    fn poll_write_shutdown(&mut self, cx: &mut Context<'_>) -> bool {
        if !self.shutdown_write {
            return false;
        }

        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return false,
        };

        match Pin::new(io).poll_shutdown(cx) {
            Poll::Ready(Ok(())) => {
                self.shutdown_write = false;
                true
            }
            Poll::Ready(Err(e)) => {
                log::debug!("session {} shutdown write: {}", self.session.id(), e);
                self.cause_closed();
                true
            }
            Poll::Pending => false,
        }
    }

    /// Account `n` written bytes, completing messages in order.
    fn advance(&mut self, mut n: usize) {
        if n > 0 {
            self.session.with_queue(|queue| queue.complete(n));
        }

        while self.batch_pos < self.batch.len() {
            let pending = &mut self.batch[self.batch_pos];
            let remaining = pending.msg.len() - self.msg_offset;

            if n < remaining {
                self.msg_offset += n;
                break;
            }

            n -= remaining;
            self.msg_offset = 0;
            self.batch_pos += 1;

            if let Some(callback) = pending.callback.take() {
                callback();
            }
        }
    }
}
