/// Output integration tests: the queue, runner and animator driven by the
/// virtual clock.

use pretty_assertions::assert_eq;
use ultimo_engine::core::animator::Outcome;
use ultimo_engine::core::queue::{EntryHandle, Finished, OutputQueue};
use ultimo_engine::core::scheduler::{Scheduler, Task};
use ultimo_engine::core::screen::MemoryScreen;
use ultimo_engine::schema::line::{Line, Millis};

struct Harness {
    sched: Scheduler,
    screen: MemoryScreen,
    queue: OutputQueue<&'static str>,
}

impl Harness {
    fn new() -> Self {
        Self {
            sched: Scheduler::new(),
            screen: MemoryScreen::new(),
            queue: OutputQueue::new(),
        }
    }

    fn emit(&mut self, lines: Vec<Line>, tag: &'static str) -> EntryHandle {
        self.queue
            .emit(&mut self.sched, &mut self.screen, lines, tag)
            .unwrap()
    }

    fn run(&mut self, until: Millis) {
        self.queue.poll_cancelled(&mut self.sched, &mut self.screen);
        while let Some((timer, task)) = self.sched.pop_due(until) {
            if let Task::Output(entry) = task {
                self.queue
                    .on_timer(entry, timer, &mut self.sched, &mut self.screen);
            }
        }
        self.sched.settle(until);
    }

    fn force_complete(&mut self) -> usize {
        self.queue
            .force_complete_all(&mut self.sched, &mut self.screen)
    }

    fn finished(&mut self) -> Vec<Finished<&'static str>> {
        std::iter::from_fn(|| self.queue.pop_finished()).collect()
    }
}

#[test]
fn instant_lines_never_show_partial_text() {
    let mut h = Harness::new();
    h.emit(vec![Line::instant("Hi"), Line::instant("Yo").after(10)], "a");
    assert_eq!(h.screen.contents(), vec!["Hi", ""]);

    h.run(10);
    assert_eq!(h.screen.contents(), vec!["Hi", "Yo"]);
    let ids = h.screen.surface_ids();
    assert_eq!(h.screen.writes(ids[0]), vec!["Hi"]);
    assert_eq!(h.screen.writes(ids[1]), vec!["Yo"]);

    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, Outcome::Completed);
    assert!(h.queue.is_empty());
}

#[test]
fn cancelling_mid_tag_shows_the_whole_line() {
    let mut h = Harness::new();
    h.emit(vec![Line::typed("<b>Go</b>", 5)], "a");
    h.run(5);
    let id = h.screen.surface_ids()[0];
    assert_eq!(h.screen.writes(id), vec!["<b>"]);

    assert_eq!(h.force_complete(), 1);
    assert_eq!(h.screen.content(id), Some("<b>Go</b>"));
    assert_eq!(h.screen.writes(id), vec!["<b>", "<b>Go</b>"]);
    assert_eq!(h.sched.live_count(), 0);
}

#[test]
fn reveals_never_split_a_tag() {
    let mut h = Harness::new();
    h.emit(
        vec![Line::typed("<u>start</u> the <i>long</i> day", 3)],
        "a",
    );
    h.run(1_000);
    let id = h.screen.surface_ids()[0];
    let writes = h.screen.writes(id);
    assert_eq!(writes.last().copied(), Some("<u>start</u> the <i>long</i> day"));
    for prefix in writes {
        assert_eq!(
            prefix.matches('<').count(),
            prefix.matches('>').count(),
            "split tag in {prefix:?}"
        );
    }
}

#[test]
fn new_output_resolves_the_old_before_starting() {
    let mut h = Harness::new();
    let a = h.emit(vec![Line::typed("abcdef", 10), Line::typed("ghi", 10)], "a");
    h.run(20);
    assert_eq!(h.screen.contents(), vec!["ab", ""]);

    let b = h.emit(vec![Line::typed("xyz", 10)], "b");
    assert_eq!(h.screen.contents(), vec!["abcdef", "ghi", ""]);
    assert!(!h.queue.contains(a.id()));
    assert!(h.queue.contains(b.id()));
    assert_eq!(h.queue.live_timers().len(), 1);
    assert_eq!(h.sched.live_count(), 1);

    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].payload, "a");
    assert_eq!(finished[0].outcome, Outcome::Cancelled);

    h.run(50);
    assert_eq!(h.screen.contents(), vec!["abcdef", "ghi", "xyz"]);
    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].payload, "b");
    assert_eq!(finished[0].outcome, Outcome::Completed);
}

#[test]
fn force_complete_after_natural_completion_is_quiet() {
    let mut h = Harness::new();
    let handle = h.emit(vec![Line::typed("ok", 5)], "a");
    h.run(10);
    assert_eq!(h.finished().len(), 1);

    handle.cancel();
    assert_eq!(h.force_complete(), 0);
    h.run(100);
    assert!(h.finished().is_empty());
    assert!(h.queue.is_empty());
}

#[test]
fn cancel_then_timer_resolves_once() {
    let mut h = Harness::new();
    let handle = h.emit(vec![Line::typed("slow", 5)], "a");
    handle.cancel();
    // A timer fires before any poll sees the flag.
    while let Some((timer, task)) = h.sched.pop_due(5) {
        if let Task::Output(entry) = task {
            h.queue.on_timer(entry, timer, &mut h.sched, &mut h.screen);
        }
    }
    h.run(100);
    h.force_complete();

    let finished = h.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome, Outcome::Cancelled);
    assert_eq!(h.screen.contents(), vec!["slow"]);
}

#[test]
fn every_cut_point_reports_exactly_once() {
    let lines = || {
        vec![
            Line::typed("one", 4),
            Line::instant(""),
            Line::typed("<b>two</b>", 4).after(6),
        ]
    };
    for cut in 0..40 {
        let mut h = Harness::new();
        h.emit(lines(), "a");
        h.run(cut);
        h.force_complete();
        h.run(cut + 100);
        let finished = h.finished();
        assert_eq!(finished.len(), 1, "cut at {cut}");
        assert_eq!(h.screen.contents(), vec!["one", "", "<b>two</b>"], "cut at {cut}");
        assert_eq!(h.sched.live_count(), 0, "cut at {cut}");
    }
}
