/// Game countdown: a single pausable timer that forces the story onward when
/// the player idles.
use tracing::debug;

use crate::core::scheduler::{Scheduler, Task, TimerId};
use crate::schema::line::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent<E> {
    /// Time left after this tick, for the countdown display.
    Tick { remaining: Millis },
    /// The countdown ran out; carries the expiry action.
    Expired(E),
}

#[derive(Debug)]
pub struct GameTimer<E> {
    state: TimerState,
    remaining: Millis,
    tick: Millis,
    handle: Option<TimerId>,
    on_expire: Option<E>,
}

impl<E> GameTimer<E> {
    /// A stopped timer that decrements by `tick` on each tick.
    pub fn new(tick: Millis) -> Self {
        Self {
            state: TimerState::Idle,
            remaining: 0,
            tick: tick.max(1),
            handle: None,
            on_expire: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining(&self) -> Millis {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.state != TimerState::Idle
    }

    /// Start counting down. Does nothing unless the timer is idle, so a
    /// countdown already running or paused is never restarted.
    pub fn start(&mut self, sched: &mut Scheduler, duration: Millis, on_expire: E) -> bool {
        if self.state != TimerState::Idle {
            debug!(remaining = self.remaining, "countdown already active, start ignored");
            return false;
        }
        self.remaining = duration;
        self.on_expire = Some(on_expire);
        self.state = TimerState::Running;
        self.arm(sched);
        debug!(duration, "countdown started");
        true
    }

    pub fn pause(&mut self, sched: &mut Scheduler) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.disarm(sched);
        self.state = TimerState::Paused;
        true
    }

    pub fn resume(&mut self, sched: &mut Scheduler) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        self.arm(sched);
        self.state = TimerState::Running;
        true
    }

    /// Back to idle from any state, dropping the remaining time.
    pub fn stop(&mut self, sched: &mut Scheduler) {
        self.disarm(sched);
        self.remaining = 0;
        self.on_expire = None;
        if self.state != TimerState::Idle {
            debug!("countdown stopped");
        }
        self.state = TimerState::Idle;
    }

    /// Handle a fired countdown timer.
    pub fn on_tick(&mut self, sched: &mut Scheduler, timer: TimerId) -> Option<CountdownEvent<E>> {
        if self.state != TimerState::Running || self.handle != Some(timer) {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(self.tick);
        if self.remaining > 0 {
            if self.remaining < self.tick {
                self.disarm(sched);
                self.arm(sched);
            }
            return Some(CountdownEvent::Tick {
                remaining: self.remaining,
            });
        }
        self.disarm(sched);
        self.state = TimerState::Idle;
        debug!("countdown expired");
        self.on_expire.take().map(CountdownEvent::Expired)
    }

    /// Tick every `tick`, or once for the remainder when less than a tick is left.
    fn arm(&mut self, sched: &mut Scheduler) {
        self.handle = Some(if self.remaining < self.tick {
            sched.after(self.remaining, Task::Countdown)
        } else {
            sched.every(self.tick, Task::Countdown)
        });
    }

    fn disarm(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.handle.take() {
            sched.cancel(handle);
        }
    }
}
