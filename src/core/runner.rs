/// Sequence runner: drives the lines of one entry through the animator in order.
use crate::core::animator::{CancelToken, LineAnimator, Outcome};
use crate::core::queue::EntryId;
use crate::core::scheduler::{Scheduler, TimerId};
use crate::core::screen::{Screen, SurfaceId};
use crate::schema::line::Sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Finished(Outcome),
}

#[derive(Debug)]
pub struct SequenceRunner {
    owner: EntryId,
    lines: Sequence,
    surfaces: Vec<SurfaceId>,
    token: CancelToken,
    index: usize,
    current: Option<LineAnimator>,
    finished: bool,
}

impl SequenceRunner {
    /// `lines` and `surfaces` are paired by position; the caller checks lengths.
    pub fn new(
        owner: EntryId,
        lines: Sequence,
        surfaces: Vec<SurfaceId>,
        token: CancelToken,
    ) -> Self {
        debug_assert_eq!(lines.len(), surfaces.len());
        Self {
            owner,
            lines,
            surfaces,
            token,
            index: 0,
            current: None,
            finished: false,
        }
    }

    pub fn start(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> RunState {
        if self.finished || self.current.is_some() {
            return RunState::Running;
        }
        self.start_line(sched, screen)
    }

    /// Forward a fired timer to the line being animated.
    pub fn on_timer(
        &mut self,
        timer: TimerId,
        sched: &mut Scheduler,
        screen: &mut dyn Screen,
    ) -> RunState {
        if self.finished {
            return RunState::Running;
        }
        let step = match self.current.as_mut() {
            Some(animator) => animator.tick(timer, sched, screen),
            None => None,
        };
        match step {
            None => RunState::Running,
            Some(Outcome::Completed) => {
                self.index += 1;
                self.start_line(sched, screen)
            }
            Some(Outcome::Cancelled) => self.finish_cancelled(screen),
        }
    }

    /// Cancel the sequence, leaving every surface with its full line.
    /// Returns `None` when the sequence had already finished.
    pub fn cancel(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> Option<Outcome> {
        if self.finished {
            return None;
        }
        match self.current.as_mut() {
            Some(animator) => {
                animator.cancel(sched, screen);
            }
            None => {
                if let (Some(line), Some(surface)) =
                    (self.lines.get(self.index), self.surfaces.get(self.index))
                {
                    screen.write(*surface, &line.text);
                }
            }
        }
        match self.finish_cancelled(screen) {
            RunState::Finished(outcome) => Some(outcome),
            RunState::Running => None,
        }
    }

    /// Timer currently owned by this sequence.
    pub fn live_timer(&self) -> Option<TimerId> {
        self.current.as_ref().and_then(LineAnimator::timer)
    }

    /// (line index, byte offset within that line).
    pub fn cursor(&self) -> (usize, usize) {
        let chars = self.current.as_ref().map_or(0, LineAnimator::cursor);
        (self.index, chars)
    }

    pub fn surfaces(&self) -> &[SurfaceId] {
        &self.surfaces
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn start_line(&mut self, sched: &mut Scheduler, screen: &mut dyn Screen) -> RunState {
        loop {
            let (line, surface) = match (self.lines.get(self.index), self.surfaces.get(self.index))
            {
                (Some(line), Some(surface)) => (line, *surface),
                _ => {
                    self.current = None;
                    self.finished = true;
                    return RunState::Finished(Outcome::Completed);
                }
            };
            let mut animator = LineAnimator::new(line, surface, self.owner, self.token.clone());
            let step = animator.start(sched, screen);
            self.current = Some(animator);
            match step {
                None => return RunState::Running,
                Some(Outcome::Completed) => self.index += 1,
                Some(Outcome::Cancelled) => return self.finish_cancelled(screen),
            }
        }
    }

    /// Snap the lines that never started and mark the run terminal.
    fn finish_cancelled(&mut self, screen: &mut dyn Screen) -> RunState {
        let rest = (self.index + 1).min(self.lines.len());
        for (line, surface) in self.lines[rest..].iter().zip(&self.surfaces[rest..]) {
            screen.write(*surface, &line.text);
        }
        self.finished = true;
        RunState::Finished(Outcome::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::MemoryScreen;
    use crate::schema::line::{Line, Millis};

    struct Rig {
        sched: Scheduler,
        screen: MemoryScreen,
        token: CancelToken,
        runner: SequenceRunner,
    }

    impl Rig {
        fn new(lines: Vec<Line>) -> Self {
            let mut screen = MemoryScreen::new();
            let surfaces = lines.iter().map(|_| screen.create_surface(false)).collect();
            let token = CancelToken::default();
            let runner = SequenceRunner::new(EntryId::from_raw(7), lines, surfaces, token.clone());
            Self {
                sched: Scheduler::new(),
                screen,
                token,
                runner,
            }
        }

        fn start(&mut self) -> RunState {
            self.runner.start(&mut self.sched, &mut self.screen)
        }

        fn run(&mut self, until: Millis) -> Vec<RunState> {
            let mut states = Vec::new();
            while let Some((id, _)) = self.sched.pop_due(until) {
                let state = self.runner.on_timer(id, &mut self.sched, &mut self.screen);
                if state != RunState::Running {
                    states.push(state);
                }
            }
            self.sched.settle(until);
            states
        }
    }

    #[test]
    fn empty_sequence_completes_immediately() {
        let mut rig = Rig::new(Vec::new());
        assert_eq!(rig.start(), RunState::Finished(Outcome::Completed));
    }

    #[test]
    fn lines_run_strictly_in_order() {
        let mut rig = Rig::new(vec![Line::typed("ab", 10), Line::typed("cd", 10).after(50)]);
        let ids = rig.runner.surfaces().to_vec();
        assert_eq!(rig.start(), RunState::Running);

        rig.run(20);
        assert_eq!(rig.screen.content(ids[0]), Some("ab"));
        assert_eq!(rig.screen.content(ids[1]), Some(""));

        // Second line waits its pre-delay after the first finished at t=20.
        rig.run(69);
        assert_eq!(rig.screen.content(ids[1]), Some(""));
        assert_eq!(rig.run(90), vec![RunState::Finished(Outcome::Completed)]);
        assert_eq!(rig.screen.writes(ids[1]), vec!["c", "cd"]);
        assert_eq!(rig.sched.live_count(), 0);
    }

    #[test]
    fn instant_lines_chain_without_timers() {
        let mut rig = Rig::new(vec![Line::instant("Hi"), Line::instant("Yo")]);
        assert_eq!(rig.start(), RunState::Finished(Outcome::Completed));
        assert_eq!(rig.screen.contents(), vec!["Hi", "Yo"]);
    }

    #[test]
    fn cancel_snaps_current_and_pending_lines() {
        let mut rig = Rig::new(vec![
            Line::typed("first", 10),
            Line::typed("second", 10).after(100),
            Line::typed("third", 10).after(100),
        ]);
        rig.start();
        rig.run(20);
        assert_eq!(rig.runner.cursor(), (0, 2));

        let outcome = rig.runner.cancel(&mut rig.sched, &mut rig.screen);
        assert_eq!(outcome, Some(Outcome::Cancelled));
        assert_eq!(rig.screen.contents(), vec!["first", "second", "third"]);
        assert_eq!(rig.sched.live_count(), 0);
        assert_eq!(rig.runner.cancel(&mut rig.sched, &mut rig.screen), None);
        assert!(rig.run(10_000).is_empty());
    }

    #[test]
    fn token_cancel_stops_at_next_tick() {
        let mut rig = Rig::new(vec![Line::typed("abc", 10), Line::instant("after")]);
        rig.start();
        rig.run(10);
        rig.token.cancel();
        assert_eq!(rig.run(20), vec![RunState::Finished(Outcome::Cancelled)]);
        assert_eq!(rig.screen.contents(), vec!["abc", "after"]);
        assert!(rig.runner.is_finished());
    }
}
