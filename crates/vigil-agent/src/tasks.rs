//! Cooperative time-ordered queue for deferred work.
//!
//! Chest raids, pattern playback, dodge cancels and furnace rechecks are
//! [`DeferredTask`] state machines in a single queue, drained at the top of
//! every cycle on the main thread instead of running as detached
//! sleep-threads: same timing semantics, no shared-state races, fully
//! drivable with a synthetic clock in tests.
//!
//! A task runs when its deadline passes and either finishes or asks to be
//! rescheduled after a delay.  Tasks are never cancelled once scheduled;
//! each one is responsible for no-opping when the world moved on underneath
//! it (UI closed, link disconnected).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::trace;
use vigil_world::WorldLink;

/// What a task wants after one step of work.
pub enum TaskOutcome {
    /// The task is finished and is dropped.
    Done,
    /// Run again after the given delay.
    Reschedule(Duration),
}

/// One unit of deferred, resumable work.  Tasks travel with the agent, which
/// may be driven from another thread, so they must be [`Send`].
pub trait DeferredTask: Send {
    /// Short label for logging.
    fn label(&self) -> &'static str;

    /// Perform one step of work against the live world.
    fn run(&mut self, link: &mut dyn WorldLink) -> TaskOutcome;
}

// ────────────────────────────────────────────────────────────────────────────
// Queue
// ────────────────────────────────────────────────────────────────────────────

struct Scheduled {
    due: Instant,
    /// Tie-breaker preserving schedule order for equal deadlines.
    seq: u64,
    task: Box<dyn DeferredTask>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest deadline surfaces.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of deferred tasks keyed by deadline.
#[derive(Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Scheduled>,
    seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to first run after `delay`.
    pub fn schedule(&mut self, delay: Duration, task: Box<dyn DeferredTask>) {
        self.schedule_at(Instant::now() + delay, task);
    }

    fn schedule_at(&mut self, due: Instant, task: Box<dyn DeferredTask>) {
        trace!(task = task.label(), "scheduling deferred task");
        self.seq += 1;
        self.heap.push(Scheduled {
            due,
            seq: self.seq,
            task,
        });
    }

    /// Run every task whose deadline has passed.  Returns how many steps ran.
    pub fn drain_due(&mut self, link: &mut dyn WorldLink) -> usize {
        self.drain_due_at(Instant::now(), link)
    }

    /// Same as [`drain_due`][Self::drain_due] with an explicit clock, so
    /// tests and deterministic harnesses can step virtual time.
    pub fn drain_due_at(&mut self, now: Instant, link: &mut dyn WorldLink) -> usize {
        let mut ran = 0;
        // Rescheduled tasks re-enter the heap only after the sweep, so a
        // zero-delay reschedule cannot spin within one drain.
        let mut pending = Vec::new();
        while let Some(next) = self.heap.peek() {
            if next.due > now {
                break;
            }
            let Some(mut entry) = self.heap.pop() else { break };
            ran += 1;
            match entry.task.run(link) {
                TaskOutcome::Done => {
                    trace!(task = entry.task.label(), "deferred task finished");
                }
                TaskOutcome::Reschedule(delay) => {
                    entry.due = now + delay;
                    pending.push(entry);
                }
            }
        }
        for entry in pending {
            self.heap.push(entry);
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
