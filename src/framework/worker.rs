//! Worker threads.
//!
//! Each worker owns one flume mailbox and one [`HardwareAccessLayer`].
//! Task groups are pinned to a worker the first time they are used, so
//! tasks in a group run in submission order.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::hal::HardwareAccessLayer;
use super::FrameworkShared;
use crate::errors::Result;

pub(crate) type Job = Box<dyn FnOnce(&mut HardwareAccessLayer) + Send>;

#[derive(Default)]
pub(crate) struct WorkerPool {
    senders: Mutex<Vec<flume::Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    groups: Mutex<FxHashMap<String, usize>>,
    next: AtomicUsize,
}

impl WorkerPool {
    /// Spawns `count` workers that run jobs against `shared`.
    pub(crate) fn spawn(&self, shared: &Arc<FrameworkShared>, count: usize, name: &str) -> Result<()> {
        for index in 0..count.max(1) {
            let (sender, receiver) = flume::unbounded::<Job>();
            let worker_shared = Arc::clone(shared);
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || run_worker(index, &worker_shared, &receiver))?;
            self.senders.lock().push(sender);
            self.handles.lock().push(handle);
        }
        Ok(())
    }

    #[must_use]
    pub(crate) fn worker_count(&self) -> usize {
        self.senders.lock().len()
    }

    fn pick(&self, workers: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % workers
    }

    /// Queues `job` on the worker owning `group`. Returns false, dropping
    /// the job, once the pool is shut down.
    pub(crate) fn submit(&self, group: &str, job: Job) -> bool {
        let senders = self.senders.lock();
        if senders.is_empty() {
            return false;
        }
        let index = {
            let mut groups = self.groups.lock();
            match groups.get(group) {
                Some(&index) => index,
                None => {
                    let index = self.pick(senders.len());
                    log::debug!("Task group '{group}' pinned to worker {index}");
                    groups.insert(group.to_owned(), index);
                    index
                }
            }
        };
        senders[index].send(job).is_ok()
    }

    /// Queues one job per worker, each built by `make`.
    pub(crate) fn broadcast(&self, mut make: impl FnMut() -> Job) -> usize {
        let senders = self.senders.lock();
        senders.iter().filter(|sender| sender.send(make()).is_ok()).count()
    }

    /// Closes every mailbox and joins the workers. A worker calling this
    /// is not joined with itself.
    pub(crate) fn shutdown(&self) {
        self.senders.lock().clear();
        let handles = std::mem::take(&mut *self.handles.lock());
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::warn!("A worker thread panicked during shutdown");
            }
        }
    }
}

fn run_worker(index: usize, shared: &Arc<FrameworkShared>, receiver: &flume::Receiver<Job>) {
    log::debug!("Worker {index} started");
    let mut hal = HardwareAccessLayer::new(Arc::clone(shared));
    let mut cancelled = 0_usize;
    for job in receiver.iter() {
        if shared.is_closed() {
            // Dropping the job drops its promise, which cancels the future.
            drop(job);
            cancelled += 1;
            continue;
        }
        shared.resources.lock().collect_orphans();
        job(&mut hal);
        hal.release_surface();
    }
    drop(hal);
    if cancelled > 0 {
        log::warn!("Worker {index} cancelled {cancelled} pending tasks");
    }
    log::debug!("Worker {index} stopped");
}
