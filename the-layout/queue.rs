//! Background work for asynchronous layout.
//!
//! Tasks are plain units of work with no result and no cancellation. A task
//! whose target went away while it was queued is expected to do nothing
//! when it finally runs.

use std::{
  collections::VecDeque,
  fmt,
  panic::{
    self,
    AssertUnwindSafe,
  },
  sync::Arc,
  thread::{
    self,
    JoinHandle,
  },
};

use crossbeam::channel::{
  self,
  Receiver,
  Sender,
};
use parking_lot::{
  Condvar,
  Mutex,
};
use thiserror::Error;
use tracing::{
  debug,
  warn,
};

pub trait LayoutTask: Send + Sync {
  fn run(self: Arc<Self>);
}

/// FIFO of layout tasks. Implementations may run tasks on any thread.
pub trait TaskQueue: Send + Sync + fmt::Debug {
  fn enqueue(&self, task: Arc<dyn LayoutTask>);
}

#[derive(Debug, Error)]
pub enum QueueError {
  #[error("failed to spawn layout worker thread")]
  FailedToSpawnWorker(#[source] std::io::Error),
  #[error("layout worker thread panicked")]
  WorkerPanicked,
}

/// Tasks enqueued and not finished yet.
#[derive(Default)]
struct Pending {
  count: Mutex<usize>,
  idle:  Condvar,
}

impl Pending {
  fn add(&self) {
    *self.count.lock() += 1;
  }

  fn done(&self) {
    let mut count = self.count.lock();
    *count = count.saturating_sub(1);
    if *count == 0 {
      self.idle.notify_all();
    }
  }
}

/// Worker threads draining a shared channel.
pub struct LayoutQueue {
  sender:  Option<Sender<Arc<dyn LayoutTask>>>,
  workers: Vec<JoinHandle<()>>,
  pending: Arc<Pending>,
}

impl LayoutQueue {
  pub fn new(workers: usize) -> Result<Self, QueueError> {
    let (sender, receiver) = channel::unbounded();
    let pending = Arc::new(Pending::default());
    let mut queue = Self {
      sender: Some(sender),
      workers: Vec::new(),
      pending,
    };
    for index in 0..workers.max(1) {
      let receiver = receiver.clone();
      let pending = Arc::clone(&queue.pending);
      let worker = thread::Builder::new()
        .name(format!("the-layout-worker-{index}"))
        .spawn(move || run_worker(index, receiver, pending))
        .map_err(QueueError::FailedToSpawnWorker)?;
      queue.workers.push(worker);
    }
    Ok(queue)
  }

  pub fn worker_count(&self) -> usize {
    self.workers.len()
  }

  /// Block until every task enqueued so far, and every task those enqueued,
  /// has run.
  pub fn wait_idle(&self) {
    let mut count = self.pending.count.lock();
    while *count > 0 {
      self.pending.idle.wait(&mut count);
    }
  }

  /// Stop accepting tasks and join the workers once the channel is drained.
  pub fn shutdown(&mut self) -> Result<(), QueueError> {
    self.sender = None;
    let mut result = Ok(());
    let current = thread::current().id();
    for worker in self.workers.drain(..) {
      // Dropped from one of its own tasks.
      if worker.thread().id() == current {
        continue;
      }
      if worker.join().is_err() {
        result = Err(QueueError::WorkerPanicked);
      }
    }
    result
  }
}

impl TaskQueue for LayoutQueue {
  fn enqueue(&self, task: Arc<dyn LayoutTask>) {
    let Some(sender) = &self.sender else {
      warn!("layout task enqueued after shutdown");
      return;
    };
    self.pending.add();
    if sender.send(task).is_err() {
      self.pending.done();
      warn!("layout queue channel is closed");
    }
  }
}

impl fmt::Debug for LayoutQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LayoutQueue")
      .field("workers", &self.workers.len())
      .field("pending", &*self.pending.count.lock())
      .finish()
  }
}

impl Drop for LayoutQueue {
  fn drop(&mut self) {
    let _ = self.shutdown();
  }
}

fn run_worker(index: usize, receiver: Receiver<Arc<dyn LayoutTask>>, pending: Arc<Pending>) {
  debug!(worker = index, "layout worker started");
  while let Ok(task) = receiver.recv() {
    if panic::catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
      warn!(worker = index, "layout task panicked");
    }
    pending.done();
  }
  debug!(worker = index, "layout worker stopped");
}

/// Queue run on the calling thread, on demand.
#[derive(Default)]
pub struct ManualQueue {
  tasks: Mutex<VecDeque<Arc<dyn LayoutTask>>>,
}

impl ManualQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.tasks.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Run the oldest task. Returns false if there was none.
  pub fn run_next(&self) -> bool {
    // The lock must not be held while the task runs, it may enqueue more.
    let task = self.tasks.lock().pop_front();
    match task {
      Some(task) => {
        task.run();
        true
      },
      None => false,
    }
  }

  /// Run tasks until the queue is empty. Returns how many ran.
  pub fn drain(&self) -> usize {
    let mut count = 0;
    while self.run_next() {
      count += 1;
    }
    count
  }
}

impl TaskQueue for ManualQueue {
  fn enqueue(&self, task: Arc<dyn LayoutTask>) {
    self.tasks.lock().push_back(task);
  }
}

impl fmt::Debug for ManualQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManualQueue").field("tasks", &self.len()).finish()
  }
}
