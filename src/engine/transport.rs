// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport clock with a priority queue of scheduled callbacks.
//!
//! The transport owns a tick position and a min-heap of one-shot tasks.
//! `advance_to` pops every task due at or before the target tick and invokes
//! it with the transport borrowed mutably, so tasks can schedule follow-up
//! tasks (looping sequences do exactly that). Equal-tick tasks fire in
//! insertion order.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::engine::PPQ;

/// A scheduled one-shot callback. Receives the transport (for rescheduling)
/// and the tick it was scheduled for.
pub type Task = Box<dyn FnOnce(&mut Transport, u64) + Send>;

/// Handle for cancelling a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Transport shared across channels; the only cross-channel resource
pub type SharedTransport = Arc<Mutex<Transport>>;

struct Scheduled {
    tick: u64,
    // Insertion sequence breaks ties so equal-tick tasks fire in
    // schedule order.
    seq: u64,
    id: TaskId,
    task: Task,
}

impl Eq for Scheduled {}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.seq == other.seq
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reverse ordering for min-heap behavior
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// The shared musical clock: tempo, tick position, and scheduled callbacks
pub struct Transport {
    bpm: f64,
    position: u64,
    started: bool,
    queue: BinaryHeap<Scheduled>,
    cancelled: HashSet<TaskId>,
    next_seq: u64,
}

impl Transport {
    /// Create a stopped transport at tick 0
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            position: 0,
            started: false,
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Create a transport wrapped for sharing across channels
    pub fn shared(bpm: f64) -> SharedTransport {
        Arc::new(Mutex::new(Transport::new(bpm)))
    }

    /// Current tempo in beats per minute
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo; already-scheduled tick positions are unaffected
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    /// Current position in ticks
    pub fn ticks(&self) -> u64 {
        self.position
    }

    /// Current position in seconds at the current tempo
    pub fn seconds(&self) -> f64 {
        self.ticks_to_seconds(self.position)
    }

    /// Convert a tick count to seconds at the current tempo
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        ticks as f64 / PPQ as f64 * 60.0 / self.bpm
    }

    /// Convert seconds to ticks at the current tempo
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        (seconds * self.bpm / 60.0 * PPQ as f64).round() as u64
    }

    /// Whether the transport is running
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start the transport; advancing is a no-op while stopped
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Stop the transport. Pending tasks stay queued; use
    /// [`Transport::cancel_pending`] to drop them.
    pub fn stop(&mut self) {
        self.started = false;
    }

    /// Drop every pending task
    pub fn cancel_pending(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.cancelled.clear();
        if dropped > 0 {
            debug!(dropped, "cancelled pending transport tasks");
        }
    }

    /// Number of pending tasks
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedule a one-shot task at an absolute tick. Ticks already in the
    /// past fire on the next advance.
    pub fn schedule_once(
        &mut self,
        tick: u64,
        task: impl FnOnce(&mut Transport, u64) + Send + 'static,
    ) -> TaskId {
        let id = TaskId(self.next_seq);
        self.queue.push(Scheduled {
            tick,
            seq: self.next_seq,
            id,
            task: Box::new(task),
        });
        self.next_seq += 1;
        id
    }

    /// Cancel a scheduled task; unknown or already-fired ids are ignored
    pub fn cancel(&mut self, id: TaskId) {
        self.cancelled.insert(id);
    }

    /// Advance the clock to an absolute tick, firing every due task in
    /// (tick, insertion) order. Tasks run with the transport borrowed
    /// mutably and may schedule further tasks, including at ticks within
    /// the window still being advanced.
    pub fn advance_to(&mut self, tick: u64) {
        if !self.started {
            return;
        }
        // Re-peek each iteration: a fired task may have pushed an earlier
        // task than the previous head.
        while let Some(head) = self.queue.peek() {
            if head.tick > tick {
                break;
            }
            let scheduled = self.queue.pop().expect("peeked above");
            self.position = self.position.max(scheduled.tick);
            if self.cancelled.remove(&scheduled.id) {
                continue;
            }
            (scheduled.task)(self, scheduled.tick);
        }
        self.position = self.position.max(tick);
    }

    /// Advance the clock by a relative number of ticks
    pub fn advance_by(&mut self, ticks: u64) {
        self.advance_to(self.position + ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collect_order(transport: &mut Transport, log: &Arc<Mutex<Vec<u32>>>, tick: u64, tag: u32) {
        let log = Arc::clone(log);
        transport.schedule_once(tick, move |_, _| log.lock().unwrap().push(tag));
    }

    #[test]
    fn test_tasks_fire_in_tick_order() {
        let mut transport = Transport::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));

        collect_order(&mut transport, &log, 300, 3);
        collect_order(&mut transport, &log, 100, 1);
        collect_order(&mut transport, &log, 200, 2);

        transport.start();
        transport.advance_to(400);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(transport.ticks(), 400);
    }

    #[test]
    fn test_equal_ticks_fire_in_insertion_order() {
        let mut transport = Transport::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));

        collect_order(&mut transport, &log, 100, 1);
        collect_order(&mut transport, &log, 100, 2);
        collect_order(&mut transport, &log, 100, 3);

        transport.start();
        transport.advance_to(100);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut transport = Transport::new(120.0);
        let fired = Arc::new(AtomicUsize::new(0));

        let fired2 = Arc::clone(&fired);
        let id = transport.schedule_once(100, move |_, _| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });
        transport.cancel(id);

        transport.start();
        transport.advance_to(200);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_task_can_reschedule_within_window() {
        let mut transport = Transport::new(120.0);
        let log = Arc::new(Mutex::new(Vec::new()));

        let log2 = Arc::clone(&log);
        transport.schedule_once(100, move |t, tick| {
            log2.lock().unwrap().push(tick);
            let log3 = Arc::clone(&log2);
            t.schedule_once(tick + 50, move |_, tick| {
                log3.lock().unwrap().push(tick);
            });
        });

        transport.start();
        transport.advance_to(200);
        assert_eq!(*log.lock().unwrap(), vec![100, 150]);
    }

    #[test]
    fn test_stopped_transport_does_not_advance() {
        let mut transport = Transport::new(120.0);
        let fired = Arc::new(AtomicUsize::new(0));

        let fired2 = Arc::clone(&fired);
        transport.schedule_once(0, move |_, _| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        transport.advance_to(100);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(transport.ticks(), 0);

        transport.start();
        transport.advance_to(100);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_pending_clears_queue() {
        let mut transport = Transport::new(120.0);
        transport.schedule_once(100, |_, _| {});
        transport.schedule_once(200, |_, _| {});
        assert_eq!(transport.pending(), 2);

        transport.cancel_pending();
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_tick_second_conversions() {
        let transport = Transport::new(120.0);
        // One quarter note at 120 BPM is half a second.
        assert!((transport.ticks_to_seconds(PPQ) - 0.5).abs() < 1e-9);
        assert_eq!(transport.seconds_to_ticks(0.5), PPQ);
    }
}
