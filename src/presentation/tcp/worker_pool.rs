//! I/O worker pool.
//!
//! A fixed set of threads, each driving its own single-threaded tokio
//! runtime. Connections are handed out round-robin; everything a connection
//! does afterwards runs on the worker it was given.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Worker {
    handle: Handle,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

pub struct IoWorkerPool {
    workers: Vec<Worker>,
    next: AtomicUsize,
}

impl IoWorkerPool {
    /// Start `size` worker threads (at least one).
    pub fn new(size: usize) -> io::Result<Self> {
        let mut workers = Vec::with_capacity(size.max(1));

        for index in 0..size.max(1) {
            let runtime = Builder::new_current_thread().enable_all().build()?;
            let handle = runtime.handle().clone();
            let (stop, stopped) = oneshot::channel::<()>();

            let thread = thread::Builder::new()
                .name(format!("chat-io-{}", index))
                .spawn(move || {
                    runtime.block_on(async {
                        let _ = stopped.await;
                    });
                    debug!(worker = index, "I/O worker stopped");
                })?;

            workers.push(Worker {
                handle,
                stop: Some(stop),
                thread: Some(thread),
            });
        }

        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Runtime handle of the next worker in rotation.
    pub fn next_handle(&self) -> &Handle {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        &self.workers[index].handle
    }

    /// Run `future` on the next worker.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.next_handle().spawn(future)
    }

    /// Stop every worker and wait for its thread. Tasks still running on a
    /// worker are dropped with its runtime.
    pub fn shutdown(&mut self) {
        for worker in &mut self.workers {
            if let Some(stop) = worker.stop.take() {
                let _ = stop.send(());
            }
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!("I/O worker thread panicked");
                }
            }
        }
    }
}

impl Drop for IoWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
