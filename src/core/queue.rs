/// Output queue: every in-flight sequence, and the single place they are
/// completed, cancelled, and removed.
///
/// Only one narrative thread of output is live at a time. Enqueuing new output
/// force-completes whatever is still animating first.
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, trace};

use crate::core::animator::{CancelToken, Outcome};
use crate::core::runner::{RunState, SequenceRunner};
use crate::core::scheduler::{Scheduler, TimerId};
use crate::core::screen::{Screen, SurfaceId};
use crate::schema::line::Sequence;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("sequence has {lines} lines but {surfaces} surfaces")]
    SurfaceMismatch { lines: usize, surfaces: usize },
}

/// Stable identity of one queue entry. Never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Returned by `enqueue`; cancels that one entry through its token.
#[derive(Debug, Clone)]
pub struct EntryHandle {
    id: EntryId,
    token: CancelToken,
}

impl EntryHandle {
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Request cancellation. The entry is resolved on the next
    /// `poll_cancelled` or timer tick.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Emitted exactly once per entry when it leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished<P> {
    pub entry: EntryId,
    pub outcome: Outcome,
    pub payload: P,
}

#[derive(Debug)]
struct QueueEntry<P> {
    id: EntryId,
    runner: SequenceRunner,
    token: CancelToken,
    payload: P,
}

#[derive(Debug)]
pub struct OutputQueue<P> {
    entries: Vec<QueueEntry<P>>,
    next_id: u64,
    finished: VecDeque<Finished<P>>,
}

impl<P> Default for OutputQueue<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            finished: VecDeque::new(),
        }
    }
}

impl<P> OutputQueue<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start animating `lines` into `surfaces`, superseding any live output.
    pub fn enqueue(
        &mut self,
        sched: &mut Scheduler,
        screen: &mut dyn Screen,
        lines: Sequence,
        surfaces: Vec<SurfaceId>,
        payload: P,
    ) -> Result<EntryHandle, OutputError> {
        if lines.len() != surfaces.len() {
            return Err(OutputError::SurfaceMismatch {
                lines: lines.len(),
                surfaces: surfaces.len(),
            });
        }
        if !self.entries.is_empty() {
            self.force_complete_all(sched, screen);
        }

        self.next_id += 1;
        let id = EntryId(self.next_id);
        let token = CancelToken::default();
        debug!(entry = id.0, lines = lines.len(), "enqueue output");

        self.entries.push(QueueEntry {
            id,
            runner: SequenceRunner::new(id, lines, surfaces, token.clone()),
            token: token.clone(),
            payload,
        });
        let state = match self.entries.last_mut() {
            Some(entry) => entry.runner.start(sched, screen),
            None => RunState::Running,
        };
        self.settle(id, state);
        Ok(EntryHandle { id, token })
    }

    /// Create one surface per line through the screen, then enqueue.
    pub fn emit(
        &mut self,
        sched: &mut Scheduler,
        screen: &mut dyn Screen,
        lines: Sequence,
        payload: P,
    ) -> Result<EntryHandle, OutputError> {
        let surfaces = lines
            .iter()
            .map(|line| screen.create_surface(line.persistent))
            .collect();
        self.enqueue(sched, screen, lines, surfaces, payload)
    }

    /// Cancel every live entry: stop its timers, show every line in full, and
    /// empty the queue. Returns how many entries were cancelled.
    pub fn force_complete_all(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let mut cancelled = 0;
        for mut entry in entries {
            entry.token.cancel();
            entry.runner.cancel(sched, screen);
            trace!(entry = entry.id.0, "force-completed");
            self.finished.push_back(Finished {
                entry: entry.id,
                outcome: Outcome::Cancelled,
                payload: entry.payload,
            });
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!(cancelled, "force-complete output");
        }
        cancelled
    }

    /// Resolve entries whose handle was cancelled since the last call.
    pub fn poll_cancelled(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) {
        let flagged: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|e| e.token.is_cancelled())
            .map(|e| e.id)
            .collect();
        for id in flagged {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
                entry.runner.cancel(sched, screen);
            }
            self.retire(id, Outcome::Cancelled);
        }
    }

    /// Route a fired timer to its entry. Timers of entries that already left
    /// the queue are ignored.
    pub fn on_timer(
        &mut self,
        entry: EntryId,
        timer: TimerId,
        sched: &mut Scheduler,
        screen: &mut dyn Screen,
    ) {
        let state = match self.entries.iter_mut().find(|e| e.id == entry) {
            Some(e) => e.runner.on_timer(timer, sched, screen),
            None => {
                trace!(entry = entry.0, "timer for retired entry");
                return;
            }
        };
        self.settle(entry, state);
    }

    /// Nothing is animating.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, entry: EntryId) -> bool {
        self.entries.iter().any(|e| e.id == entry)
    }

    /// Timers owned by live entries.
    pub fn live_timers(&self) -> Vec<TimerId> {
        self.entries
            .iter()
            .filter_map(|e| e.runner.live_timer())
            .collect()
    }

    /// (line index, byte offset) of a live entry.
    pub fn cursor(&self, entry: EntryId) -> Option<(usize, usize)> {
        self.entries
            .iter()
            .find(|e| e.id == entry)
            .map(|e| e.runner.cursor())
    }

    /// Next completion signal, oldest first.
    pub fn pop_finished(&mut self) -> Option<Finished<P>> {
        self.finished.pop_front()
    }

    fn settle(&mut self, entry: EntryId, state: RunState) {
        if let RunState::Finished(outcome) = state {
            self.retire(entry, outcome);
        }
    }

    /// Remove an entry by identity. A second removal of the same entry finds
    /// nothing and emits nothing.
    fn retire(&mut self, entry: EntryId, outcome: Outcome) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == entry) else {
            trace!(entry = entry.0, "already retired");
            return false;
        };
        let removed = self.entries.remove(pos);
        trace!(entry = entry.0, ?outcome, "retired");
        self.finished.push_back(Finished {
            entry,
            outcome,
            payload: removed.payload,
        });
        true
    }
}
