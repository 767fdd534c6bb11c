/// Line animator: types one line into one surface.
use std::cell::Cell;
use std::rc::Rc;

use crate::core::markup::next_reveal;
use crate::core::queue::EntryId;
use crate::core::scheduler::{Scheduler, Task, TimerId};
use crate::core::screen::{Screen, SurfaceId};
use crate::schema::line::{Line, Millis};

/// How an animation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Shared cancellation flag, checked by the animator on every tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Revealing,
    Done,
    Cancelled,
}

#[derive(Debug)]
pub struct LineAnimator {
    text: String,
    pre_delay: Millis,
    char_delay: Millis,
    surface: SurfaceId,
    owner: EntryId,
    token: CancelToken,
    cursor: usize,
    phase: Phase,
    timer: Option<TimerId>,
}

impl LineAnimator {
    pub fn new(line: &Line, surface: SurfaceId, owner: EntryId, token: CancelToken) -> Self {
        Self {
            text: line.text.clone(),
            pre_delay: line.pre_delay,
            char_delay: line.char_delay,
            surface,
            owner,
            token,
            cursor: 0,
            phase: Phase::Waiting,
            timer: None,
        }
    }

    /// Begin the pre-delay. A zero pre-delay starts revealing right away, and an
    /// instant line can finish before this returns.
    pub fn start(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> Option<Outcome> {
        if self.phase != Phase::Waiting || self.timer.is_some() {
            return None;
        }
        if self.token.is_cancelled() {
            return self.cancel(sched, screen);
        }
        if self.pre_delay == 0 {
            self.begin(sched, screen)
        } else {
            self.timer = Some(sched.after(self.pre_delay, Task::Output(self.owner)));
            None
        }
    }

    /// Handle a fired timer. Timers other than the current one are ignored.
    pub fn tick(
        &mut self,
        timer: TimerId,
        sched: &mut Scheduler,
        screen: &mut dyn Screen,
    ) -> Option<Outcome> {
        if self.timer != Some(timer) {
            return None;
        }
        if self.token.is_cancelled() {
            return self.cancel(sched, screen);
        }
        match self.phase {
            Phase::Waiting => {
                self.timer = None;
                self.begin(sched, screen)
            }
            Phase::Revealing => {
                self.cursor = next_reveal(&self.text, self.cursor);
                screen.write(self.surface, &self.text[..self.cursor]);
                if self.cursor >= self.text.len() {
                    self.stop_timer(sched);
                    self.phase = Phase::Done;
                    Some(Outcome::Completed)
                } else {
                    None
                }
            }
            Phase::Done | Phase::Cancelled => None,
        }
    }

    /// Stop animating and show the full line. Returns `None` when the
    /// animation already ended, so each animator reports exactly one outcome.
    pub fn cancel(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> Option<Outcome> {
        match self.phase {
            Phase::Done | Phase::Cancelled => None,
            Phase::Waiting | Phase::Revealing => {
                self.stop_timer(sched);
                self.cursor = self.text.len();
                screen.write(self.surface, &self.text);
                self.phase = Phase::Cancelled;
                Some(Outcome::Cancelled)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Cancelled)
    }

    /// Bytes of the text revealed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    fn begin(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> Option<Outcome> {
        if self.char_delay == 0 || self.text.is_empty() {
            self.cursor = self.text.len();
            screen.write(self.surface, &self.text);
            self.phase = Phase::Done;
            return Some(Outcome::Completed);
        }
        self.phase = Phase::Revealing;
        self.timer = Some(sched.every(self.char_delay, Task::Output(self.owner)));
        None
    }

    fn stop_timer(&mut self, sched: &mut Scheduler) {
        if let Some(timer) = self.timer.take() {
            sched.cancel(timer);
        }
    }
}
