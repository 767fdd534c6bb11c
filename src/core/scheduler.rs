/// Virtual-clock scheduler for delayed and periodic work.
///
/// Everything in the engine runs on one logical thread. Timers are plain data
/// (`Task`) so the owner dispatches them with full `&mut` access once they
/// come due, instead of holding closures that borrow the engine.
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::core::queue::EntryId;
use crate::schema::line::Millis;

/// Handle to one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Work a timer performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Step the animation of an output entry.
    Output(EntryId),
    /// Tick the game countdown.
    Countdown,
}

#[derive(Debug)]
struct Timer {
    key: (Millis, u64),
    period: Option<Millis>,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Millis,
    seq: u64,
    due: BTreeMap<(Millis, u64), TimerId>,
    timers: FxHashMap<TimerId, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Fire `task` once, `delay` from now.
    pub fn after(&mut self, delay: Millis, task: Task) -> TimerId {
        self.arm(delay, None, task)
    }

    /// Fire `task` every `period`, first one `period` from now.
    pub fn every(&mut self, period: Millis, task: Task) -> TimerId {
        let period = period.max(1);
        self.arm(period, Some(period), task)
    }

    /// Cancel a timer. Returns false when it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(timer) => {
                self.due.remove(&timer.key);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.due.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Take the earliest timer due at or before `until`, moving the clock to
    /// its deadline. Periodic timers are re-armed before being returned.
    pub fn pop_due(&mut self, until: Millis) -> Option<(TimerId, Task)> {
        let (&key, &id) = self.due.iter().next()?;
        if key.0 > until {
            return None;
        }
        self.due.remove(&key);
        self.now = self.now.max(key.0);

        let timer = self.timers.get(&id)?;
        let (task, period) = (timer.task, timer.period);
        match period {
            Some(period) => {
                self.seq += 1;
                let next = (key.0.saturating_add(period), self.seq);
                if let Some(timer) = self.timers.get_mut(&id) {
                    timer.key = next;
                }
                self.due.insert(next, id);
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some((id, task))
    }

    /// Move the clock to `until` once nothing earlier is due.
    pub fn settle(&mut self, until: Millis) {
        self.now = self.now.max(until);
    }

    fn arm(&mut self, delay: Millis, period: Option<Millis>, task: Task) -> TimerId {
        self.seq += 1;
        let id = TimerId(self.seq);
        let key = (self.now.saturating_add(delay), self.seq);
        self.due.insert(key, id);
        self.timers.insert(id, Timer { key, period, task });
        id
    }
}
