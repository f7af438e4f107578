//! Parity-grouped chunk scheduler with a fixed worker pool.
//!
//! Chunks are queued into four [`ParityGroup`]s. A [`Scheduler::run`] drains
//! the groups one after another; within a group every worker (plus the
//! calling thread) pops chunks concurrently, and a barrier waits for all of
//! them to go idle before the next group starts. Chunks of one group never
//! touch, so the chunk data itself needs no locking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, info};

use super::load::LoadTracker;
use super::queue::ChunkQueue;
use crate::coords::{ChunkPos, ParityGroup};

/// What a run does with each chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
  /// Clear per-particle update flags.
  Prepare,
  /// Run the material rules.
  Update,
  /// Repaint stale pixels.
  Render,
}

/// Work performed on one chunk by one worker.
///
/// Implementations are shared by every worker of a run, so they must be
/// `Sync`. The scheduler guarantees that two chunks processed at the same
/// time belong to the same parity group.
pub trait ChunkProcessor: Sync {
  fn process(&self, mode: Mode, chunk: ChunkPos, worker: usize);
}

impl<F> ChunkProcessor for F
where
  F: Fn(Mode, ChunkPos, usize) + Sync,
{
  fn process(&self, mode: Mode, chunk: ChunkPos, worker: usize) {
    self(mode, chunk, worker)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
  Working,
  Paused,
  Stopped,
}

/// Type-erased pointer to the processor of the current run.
#[derive(Clone, Copy)]
struct Job(*const (dyn ChunkProcessor + 'static));

// SAFETY: the pointee is `Sync`, and `run` keeps it alive until every worker
// has gone idle.
unsafe impl Send for Job {}

struct Control {
  status: Status,
  mode: Mode,
  group: usize,
  /// Bumped every time a group is published.
  generation: u64,
  job: Option<Job>,
  /// Workers currently out of the wait loop.
  busy: usize,
}

type PanicPayload = Box<dyn Any + Send + 'static>;

struct Shared {
  groups: [ChunkQueue; 4],
  control: Mutex<Control>,
  wake: Condvar,
  done: Condvar,
  /// Chunks processed in the current run, per worker. The caller is last.
  processed: Vec<AtomicU64>,
  /// Times a worker left the wait loop in the current run.
  wakeups: AtomicU64,
  panic: Mutex<Option<PanicPayload>>,
}

impl Shared {
  fn control(&self) -> MutexGuard<'_, Control> {
    self.control.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Pops and processes chunks of `group` until the queue runs dry.
  fn drain(&self, group: usize, mode: Mode, processor: &dyn ChunkProcessor, worker: usize) {
    while let Some(chunk) = self.groups[group].pop() {
      processor.process(mode, chunk, worker);
      self.processed[worker].fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Like [`Shared::drain`], but stashes a panic instead of unwinding, so the
  /// barrier still completes.
  fn drain_catching(&self, group: usize, mode: Mode, processor: &dyn ChunkProcessor, worker: usize) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
      self.drain(group, mode, processor, worker)
    }));
    if let Err(payload) = result {
      let mut slot = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
      if slot.is_none() {
        *slot = Some(payload);
      }
    }
  }
}

/// Fixed pool of worker threads processing chunks group by group.
pub struct Scheduler {
  shared: Arc<Shared>,
  threads: Vec<JoinHandle<()>>,
  load_balance: Vec<LoadTracker>,
}

impl Scheduler {
  /// Spawns `workers` threads. The thread calling [`Scheduler::run`] works
  /// too, as worker index `workers`.
  pub fn new(workers: usize) -> Self {
    let shared = Arc::new(Shared {
      groups: Default::default(),
      control: Mutex::new(Control {
        status: Status::Paused,
        mode: Mode::Prepare,
        group: 0,
        generation: 0,
        job: None,
        busy: workers,
      }),
      wake: Condvar::new(),
      done: Condvar::new(),
      processed: (0..=workers).map(|_| AtomicU64::new(0)).collect(),
      wakeups: AtomicU64::new(0),
      panic: Mutex::new(None),
    });

    let threads = (0..workers)
      .map(|worker| {
        let shared = Arc::clone(&shared);
        thread::Builder::new()
          .name(format!("chunk-worker-{worker}"))
          .spawn(move || worker_loop(&shared, worker))
      })
      .collect::<Result<Vec<_>, _>>()
      .unwrap_or_else(|err| panic!("failed to spawn chunk worker: {err}"));

    info!("Chunk scheduler started with {workers} worker thread(s)");

    Self {
      shared,
      threads,
      load_balance: vec![LoadTracker::new(); workers + 1],
    }
  }

  /// Worker threads, not counting the caller.
  pub fn num_workers(&self) -> usize {
    self.threads.len()
  }

  /// Queues a chunk into the group matching its coordinate parity.
  pub fn push_chunk(&self, chunk: ChunkPos) {
    self.shared.groups[ParityGroup::of(chunk).index()].push(chunk);
  }

  /// Empties every group.
  pub fn clear(&self) {
    for group in &self.shared.groups {
      group.clear();
    }
  }

  /// Chunks currently queued in a group.
  pub fn group(&self, group: ParityGroup) -> Vec<ChunkPos> {
    self.shared.groups[group.index()].snapshot()
  }

  /// Processes every queued chunk with `processor`, group by group.
  ///
  /// Returns once all four groups are drained. A panic inside the processor
  /// is re-raised here after the barrier.
  pub fn run(&mut self, mode: Mode, processor: &dyn ChunkProcessor) {
    let shared = &*self.shared;
    let caller = self.threads.len();
    for counter in &shared.processed {
      counter.store(0, Ordering::Relaxed);
    }
    shared.wakeups.store(0, Ordering::Relaxed);

    // SAFETY: only the lifetime is erased. The pointer is published for the
    // duration of this call and cleared before returning, and the barrier at
    // the end of every group guarantees no worker still uses it.
    let job = Job(unsafe {
      std::mem::transmute::<&dyn ChunkProcessor, &'static dyn ChunkProcessor>(processor)
    });

    for group in 0..4 {
      {
        let mut control = shared.control();
        shared.groups[group].reset();
        control.group = group;
        control.generation = control.generation.wrapping_add(1);
        control.mode = mode;
        control.job = Some(job);
        control.status = Status::Working;
      }
      shared.wake.notify_all();

      shared.drain_catching(group, mode, processor, caller);

      let mut control = shared.control();
      control.status = Status::Paused;
      while control.busy > 0 {
        control = shared
          .done
          .wait(control)
          .unwrap_or_else(PoisonError::into_inner);
      }
      control.job = None;
    }

    let payload = shared
      .panic
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(payload) = payload {
      panic::resume_unwind(payload);
    }

    if mode == Mode::Update {
      let counts: Vec<u64> = shared
        .processed
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .collect();
      let total = counts.iter().sum::<u64>().max(1);
      for (tracker, count) in self.load_balance.iter_mut().zip(&counts) {
        tracker.push(*count as f32 / total as f32);
      }
      debug!(
        "Update run processed {:?} chunks per worker, {} worker wakeup(s)",
        counts,
        shared.wakeups.load(Ordering::Relaxed)
      );
    }
  }

  /// Rolling per-worker share of chunks processed by update runs. The last
  /// entry is the calling thread.
  pub fn load_balance(&self) -> &[LoadTracker] {
    &self.load_balance
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    self.shared.control().status = Status::Stopped;
    self.shared.wake.notify_all();
    for handle in self.threads.drain(..) {
      let _ = handle.join();
    }
  }
}

fn worker_loop(shared: &Shared, worker: usize) {
  let mut drained = 0;
  loop {
    let (mode, group, job) = {
      let mut control = shared.control();
      control.busy -= 1;
      shared.done.notify_one();
      // A drained group stays `Working` until the caller finishes its share.
      while control.status == Status::Paused
        || (control.status == Status::Working && control.generation == drained)
      {
        control = shared
          .wake
          .wait(control)
          .unwrap_or_else(PoisonError::into_inner);
      }
      control.busy += 1;
      if control.status == Status::Stopped {
        return;
      }
      drained = control.generation;
      shared.wakeups.fetch_add(1, Ordering::Relaxed);
      (control.mode, control.group, control.job)
    };

    if let Some(Job(processor)) = job {
      // SAFETY: `run` keeps the processor alive while any worker is busy.
      let processor = unsafe { &*processor };
      shared.drain_catching(group, mode, processor, worker);
    }
  }
}
