use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::{Builder, Handle, Runtime};

use super::ExecutorProvider;

/// A fixed set of runtimes, picked round-robin.
///
/// Each runtime owns `threads_per_executor` worker threads, so sessions on
/// different executors run in parallel while a single session's work stays
/// on one runtime.
pub struct ExecutorPool {
    runtimes: Vec<Runtime>,
    handles: Vec<Handle>,
    next: AtomicUsize,
}

impl ExecutorPool {
    /// Start `size` runtimes with `threads_per_executor` workers each.
    pub fn new(size: usize, threads_per_executor: usize) -> io::Result<Self> {
        if size == 0 || threads_per_executor == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "executor pool needs at least one runtime and one thread",
            ));
        }

        let mut runtimes = Vec::with_capacity(size);
        for i in 0..size {
            let runtime = Builder::new_multi_thread()
                .worker_threads(threads_per_executor)
                .thread_name(format!("tidewire-executor-{}", i))
                .enable_all()
                .build()?;
            runtimes.push(runtime);
        }

        let handles = runtimes.iter().map(|rt| rt.handle().clone()).collect();
        log::debug!("executor pool started: {} x {} threads", size, threads_per_executor);

        Ok(Self {
            runtimes,
            handles,
            next: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn len(&self) -> usize { self.handles.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.handles.is_empty() }
}

impl ExecutorProvider for ExecutorPool {
    fn pick(&self) -> Handle {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.handles[index % self.handles.len()].clone()
    }
}

impl Drop for ExecutorPool {
    fn drop(&mut self) {
        // dropping a runtime blocks, which is not allowed inside another runtime
        for runtime in self.runtimes.drain(..) {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for ExecutorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorPool")
            .field("size", &self.handles.len())
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_robin() {
        let pool = ExecutorPool::new(3, 1).unwrap();
        assert_eq!(pool.len(), 3);

        let names: Vec<String> = (0..6)
            .map(|_| {
                let handle = pool.pick();
                let task = handle.spawn(async {
                    std::thread::current().name().unwrap_or_default().to_string()
                });
                handle.block_on(task).unwrap()
            })
            .collect();

        assert_eq!(names[0], "tidewire-executor-0");
        assert_eq!(names[1], "tidewire-executor-1");
        assert_eq!(names[2], "tidewire-executor-2");
        assert_eq!(names[0], names[3]);
        assert_eq!(names[1], names[4]);
    }

    #[test]
    fn empty_pool() {
        assert!(ExecutorPool::new(0, 1).is_err());
    }
}
