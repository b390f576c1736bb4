//! Where sessions run.
//!
//! An executor is a tokio runtime [`Handle`]; every session is driven by one
//! task on one executor. Accepted or connected streams are handed to the
//! executor an [`ExecutorProvider`] picks.

mod pool;

pub use pool::ExecutorPool;

use tokio::runtime::Handle;

/// Pick the executor for the next connection.
pub trait ExecutorProvider: Send + Sync + 'static {
    fn pick(&self) -> Handle;
}

/// Always the same executor.
#[derive(Debug, Clone)]
pub struct FixedExecutor(Handle);

impl FixedExecutor {
    #[inline]
    pub const fn new(handle: Handle) -> Self { Self(handle) }

    /// Executor of the runtime the caller runs on.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[inline]
    pub fn current() -> Self { Self(Handle::current()) }
}

impl ExecutorProvider for FixedExecutor {
    #[inline]
    fn pick(&self) -> Handle { self.0.clone() }
}

impl<T: ExecutorProvider + ?Sized> ExecutorProvider for std::sync::Arc<T> {
    #[inline]
    fn pick(&self) -> Handle { (**self).pick() }
}
