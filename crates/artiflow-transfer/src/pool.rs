//! Bounded worker pool fed by one producer.
//!
//! A [`Runner`] drives `threads` workers over an unbounded task channel while
//! the producer future pushes tasks into the runner's [`TaskQueue`]. Tasks may
//! enqueue follow-up tasks themselves. The run ends once the producer has
//! returned and no queued or running task is left.
//!
//! Every worker owns its [`Tally`] and its handler-defined slot; both are
//! handed back in worker order when the run ends. Errors a handler reports as
//! fatal go to the run's [`ErrorsQueue`].
//!
//! Workers are futures joined on the caller's task, not spawned tasks: their
//! I/O overlaps, but CPU work inside a handler runs on one runtime thread at
//! a time. Handlers move heavy hashing or archive work onto
//! `spawn_blocking`.

use std::future::Future;
use std::ops::AddAssign;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::future::join_all;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::errors_queue::ErrorsQueue;

/// Prefix for per-task log lines.
///
/// ```
/// use artiflow_transfer::log_prefix;
///
/// assert_eq!(log_prefix(2, false), "[Thread 2] ");
/// assert_eq!(log_prefix(0, true), "[Thread 0] [Dry run] ");
/// ```
pub fn log_prefix(worker: usize, dry_run: bool) -> String {
    let mut prefix = format!("[Thread {worker}] ");
    if dry_run {
        prefix.push_str("[Dry run] ");
    }
    prefix
}

/// Performs one kind of task.
pub trait Handler: Sync {
    type Task;
    /// Per-worker results, merged by the caller after the run.
    type Slot: Default;

    fn handle(
        &self,
        task: Self::Task,
        worker: &mut Worker<'_, Self::Task, Self::Slot>,
    ) -> impl Future<Output = Result<()>>;

    /// Whether `error` is recorded in the errors queue. Non-fatal errors
    /// still count the task as failed.
    fn is_fatal(&self, _error: &Error) -> bool { true }
}

/// The worker running a task.
pub struct Worker<'a, T, S> {
    id:    usize,
    slot:  &'a mut S,
    queue: &'a TaskQueue<T>,
}

impl<T, S> Worker<'_, T, S> {
    pub fn id(&self) -> usize { self.id }

    pub fn slot(&mut self) -> &mut S { self.slot }

    /// Queues a follow-up task.
    pub fn push(&self, task: T) -> Result<()> { self.queue.push(task) }
}

/// Sending side of a run.
#[derive(Debug)]
pub struct TaskQueue<T> {
    sender:        Mutex<Option<UnboundedSender<T>>>,
    pending:       AtomicUsize,
    producer_done: AtomicBool,
    stopped:       AtomicBool,
}

impl<T> TaskQueue<T> {
    fn new(sender: UnboundedSender<T>) -> Self {
        Self {
            sender:        Mutex::new(Some(sender)),
            pending:       AtomicUsize::new(0),
            producer_done: AtomicBool::new(false),
            stopped:       AtomicBool::new(false),
        }
    }

    /// Fails with [`Error::Stopped`] once the run no longer accepts tasks.
    pub fn push(&self, task: T) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::Stopped);
        }
        let guard = self.sender.lock().map_err(|_| Error::Stopped)?;
        let sender = guard.as_ref().ok_or(Error::Stopped)?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::Stopped);
        }
        Ok(())
    }

    pub fn is_stopped(&self) -> bool { self.stopped.load(Ordering::SeqCst) }

    /// Tasks queued or running.
    pub fn pending(&self) -> usize { self.pending.load(Ordering::SeqCst) }

    fn stop(&self) { self.stopped.store(true, Ordering::SeqCst); }

    fn task_finished(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 && self.producer_done.load(Ordering::SeqCst) {
            self.close();
        }
    }

    fn producer_finished(&self) {
        self.producer_done.store(true, Ordering::SeqCst);
        if self.pending.load(Ordering::SeqCst) == 0 {
            self.close();
        }
    }

    fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

/// Task outcomes of one worker, or of a whole run once summed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed:    usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.attempted += rhs.attempted;
        self.succeeded += rhs.succeeded;
        self.failed += rhs.failed;
    }
}

/// Outcome of [`Runner::run`].
#[derive(Debug)]
pub struct RunReport<S> {
    pub tally: Tally,
    /// Per-worker tallies, indexed by worker id.
    pub per_worker: Vec<Tally>,
    /// Per-worker slots, indexed by worker id.
    pub slots: Vec<S>,
    /// First fatal error of the run.
    pub error: Option<Error>,
}

pub struct Runner<T> {
    threads:   usize,
    fail_fast: bool,
    queue:     TaskQueue<T>,
    receiver:  tokio::sync::Mutex<UnboundedReceiver<T>>,
    errors:    ErrorsQueue,
}

impl<T> Runner<T> {
    pub fn new(threads: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            threads:   threads.max(1),
            fail_fast: false,
            queue:     TaskQueue::new(sender),
            receiver:  tokio::sync::Mutex::new(receiver),
            errors:    ErrorsQueue::new(1),
        }
    }

    /// Stop taking tasks after the first fatal error. Tasks already running
    /// finish; queued ones are discarded.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn threads(&self) -> usize { self.threads }

    pub fn queue(&self) -> &TaskQueue<T> { &self.queue }

    /// Runs `producer` next to the workers until everything queued is done.
    ///
    /// A producer error is recorded like a fatal task error; its
    /// [`Error::Stopped`] is not, since the error that stopped the run is
    /// already recorded.
    pub async fn run<H>(&self, handler: &H, producer: impl Future<Output = Result<()>>) -> RunReport<H::Slot>
    where
        H: Handler<Task = T>,
    {
        let produce = async {
            let result = producer.await;
            self.queue.producer_finished();
            match result {
                Ok(()) | Err(Error::Stopped) => {}
                Err(e) => {
                    tracing::error!("{e}");
                    self.errors.add_error(e);
                }
            }
        };
        let workers = join_all((0..self.threads).map(|id| self.work(id, handler)));
        let ((), outcomes) = futures_util::join!(produce, workers);

        let mut tally = Tally::default();
        let mut per_worker = Vec::with_capacity(outcomes.len());
        let mut slots = Vec::with_capacity(outcomes.len());
        for (worker_tally, slot) in outcomes {
            tally += worker_tally;
            per_worker.push(worker_tally);
            slots.push(slot);
        }
        RunReport {
            tally,
            per_worker,
            slots,
            error: self.errors.get_error(),
        }
    }

    async fn work<H>(&self, id: usize, handler: &H) -> (Tally, H::Slot)
    where
        H: Handler<Task = T>,
    {
        let mut tally = Tally::default();
        let mut slot = H::Slot::default();
        loop {
            let task = self.receiver.lock().await.recv().await;
            let Some(task) = task else {
                break;
            };
            if self.queue.is_stopped() {
                self.queue.task_finished();
                continue;
            }

            tally.attempted += 1;
            let mut worker = Worker {
                id,
                slot: &mut slot,
                queue: &self.queue,
            };
            match handler.handle(task, &mut worker).await {
                Ok(()) => tally.succeeded += 1,
                Err(e) => {
                    tally.failed += 1;
                    if handler.is_fatal(&e) {
                        tracing::error!("{}{e}", log_prefix(id, false));
                        if self.fail_fast {
                            self.queue.stop();
                        }
                        self.errors.add_error(e);
                    } else {
                        tracing::warn!("{}{e}", log_prefix(id, false));
                    }
                }
            }
            self.queue.task_finished();
        }
        (tally, slot)
    }
}
