/// The game: scene transitions, input handling, and the clock, wired around
/// the output queue.
///
/// Scenes never call each other through nested callbacks. Finishing output,
/// an accepted command, or an expired countdown only queue the next scene
/// name; `settle` enters queued scenes one at a time.
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::core::config::{ConfigError, EngineConfig};
use crate::core::context::StoryContext;
use crate::core::markup::escape_markup;
use crate::core::queue::{EntryHandle, OutputError, OutputQueue};
use crate::core::router::{normalize_arg, ArgViolation, RouterOutcome};
use crate::core::scheduler::{Scheduler, Task};
use crate::core::screen::Screen;
use crate::core::story::{Story, StoryError};
use crate::core::timer::{CountdownEvent, GameTimer, TimerState};
use crate::schema::command::Action;
use crate::schema::line::{Line, Millis, Sequence};
use crate::schema::scene::{ClearMode, Countdown};

/// Scene transitions allowed in one `settle` before the story is
/// considered stuck in a loop of instant scenes.
const MAX_CHAINED_SCENES: usize = 256;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("story error: {0}")]
    Story(#[from] StoryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("output error: {0}")]
    Output(#[from] OutputError),
    #[error("unknown scene '{0}'")]
    UnknownScene(String),
    #[error("no story given to the builder")]
    MissingStory,
    #[error("scene '{0}' keeps chaining without waiting")]
    TransitionLoop(String),
}

/// Notifications for the countdown display and other outer UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    SceneEntered { scene: String },
    CountdownStarted { duration: Millis },
    CountdownTick { remaining: Millis },
    CountdownExpired { scene: String },
}

/// What a scene's output asks for once it finishes.
#[derive(Debug, Clone, PartialEq)]
struct Beat {
    countdown: Option<Countdown>,
    then: Option<String>,
}

enum Dispatch {
    Fail {
        message: String,
        silent: bool,
    },
    Run {
        command: String,
        action: Action,
        argument: String,
        bound: Vec<String>,
        silent: bool,
    },
}

pub struct Game {
    story: Story,
    config: EngineConfig,
    context: StoryContext,
    scheduler: Scheduler,
    output: OutputQueue<Option<Beat>>,
    countdown: GameTimer<String>,
    pending: VecDeque<String>,
    events: VecDeque<GameEvent>,
}

/// Builder for constructing a `Game`.
#[derive(Default)]
pub struct GameBuilder {
    story: Option<Story>,
    story_path: Option<PathBuf>,
    config: Option<EngineConfig>,
    config_path: Option<PathBuf>,
}

impl Game {
    pub fn builder() -> GameBuilder {
        GameBuilder::default()
    }

    /// Enter the story's start scene.
    pub fn start(&mut self, screen: &mut dyn Screen) -> Result<(), GameError> {
        let start = self.story.start().to_string();
        self.enter(&start, screen)
    }

    /// Enter a scene by name.
    pub fn enter(&mut self, scene: &str, screen: &mut dyn Screen) -> Result<(), GameError> {
        if self.story.scene(scene).is_none() {
            return Err(GameError::UnknownScene(scene.to_string()));
        }
        self.pending.push_back(scene.to_string());
        self.settle(screen)
    }

    /// Handle one submitted line of input.
    ///
    /// Any animating output is completed first. Empty input stops there, so
    /// pressing enter skips the typewriter.
    pub fn submit(&mut self, raw: &str, screen: &mut dyn Screen) -> Result<(), GameError> {
        let skipped = self.output.force_complete_all(&mut self.scheduler, screen);
        self.settle(screen)?;

        let input = raw.trim();
        if input.is_empty() {
            trace!(skipped, "empty input");
            return Ok(());
        }

        let dispatch = match self.context.route(input) {
            RouterOutcome::Empty => return Ok(()),
            RouterOutcome::NotFound { .. } => Dispatch::Fail {
                message: self.config.not_found.clone(),
                silent: false,
            },
            RouterOutcome::Rejected { spec, violation } => Dispatch::Fail {
                message: violation.to_string(),
                silent: spec.silent,
            },
            RouterOutcome::Accepted(call) => Dispatch::Run {
                command: call.spec.name.clone(),
                action: call.handler().clone(),
                argument: call.argument.clone(),
                bound: call.bound().to_vec(),
                silent: call.spec.silent,
            },
        };

        let echo = Line::instant(self.config.echo(&escape_markup(input)));
        match dispatch {
            Dispatch::Fail { message, silent } => {
                let mut lines = Vec::with_capacity(2);
                if self.config.echo_input && !silent {
                    lines.push(echo);
                }
                lines.push(Line::instant(self.config.error(&message)));
                self.print(lines, screen)?;
            }
            Dispatch::Run {
                command,
                action,
                argument,
                bound,
                silent,
            } => {
                if self.config.echo_input && !silent {
                    self.print(vec![echo], screen)?;
                }
                self.perform(&command, &action, &argument, &bound, screen)?;
            }
        }
        self.settle(screen)
    }

    /// Move the clock forward, firing every timer that comes due on the way.
    pub fn advance(&mut self, elapsed: Millis, screen: &mut dyn Screen) -> Result<(), GameError> {
        let until = self.scheduler.now().saturating_add(elapsed);
        self.output.poll_cancelled(&mut self.scheduler, screen);
        self.settle(screen)?;

        while let Some((timer, task)) = self.scheduler.pop_due(until) {
            match task {
                Task::Output(entry) => {
                    self.output
                        .on_timer(entry, timer, &mut self.scheduler, screen);
                }
                Task::Countdown => match self.countdown.on_tick(&mut self.scheduler, timer) {
                    Some(CountdownEvent::Tick { remaining }) => {
                        self.events.push_back(GameEvent::CountdownTick { remaining });
                    }
                    Some(CountdownEvent::Expired(scene)) => {
                        debug!(%scene, "countdown expired");
                        self.events.push_back(GameEvent::CountdownExpired {
                            scene: scene.clone(),
                        });
                        self.pending.push_back(scene);
                    }
                    None => {}
                },
            }
            self.settle(screen)?;
        }
        self.scheduler.settle(until);
        Ok(())
    }

    /// Output is still animating.
    pub fn is_animating(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// When the next timer fires, if any is armed.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    pub fn scene(&self) -> Option<&str> {
        self.context.scene()
    }

    pub fn countdown_state(&self) -> TimerState {
        self.countdown.state()
    }

    pub fn countdown_remaining(&self) -> Millis {
        self.countdown.remaining()
    }

    pub fn context(&self) -> &StoryContext {
        &self.context
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    fn enter_now(&mut self, name: &str, screen: &mut dyn Screen) -> Result<(), GameError> {
        let scene = self
            .story
            .scene(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownScene(name.to_string()))?;
        debug!(scene = %scene.name, "enter scene");

        // Old output must not be mistaken for this scene's.
        self.countdown.stop(&mut self.scheduler);
        self.context.set_output(None);
        self.output.force_complete_all(&mut self.scheduler, screen);
        match scene.clear {
            ClearMode::Keep => {}
            ClearMode::Transient => screen.clear(true),
            ClearMode::All => screen.clear(false),
        }

        self.context.set_local_commands(&scene.commands);
        if scene.reset_globals {
            self.context.reset_global_commands();
        }
        self.context.set_scene(&scene.name);
        self.events.push_back(GameEvent::SceneEntered {
            scene: scene.name.clone(),
        });

        let beat = Beat {
            countdown: scene.countdown,
            then: scene.then,
        };
        let handle = self
            .output
            .emit(&mut self.scheduler, screen, scene.lines, Some(beat))?;
        self.context.set_output(Some(handle.id()));
        Ok(())
    }

    /// Route finished output to its continuation, then enter queued scenes
    /// until nothing is left to do without waiting.
    fn settle(&mut self, screen: &mut dyn Screen) -> Result<(), GameError> {
        let mut chained = 0;
        loop {
            self.collect_finished();
            let Some(next) = self.pending.pop_front() else {
                return Ok(());
            };
            chained += 1;
            if chained > MAX_CHAINED_SCENES {
                warn!(scene = %next, "scene chain did not settle");
                self.pending.clear();
                return Err(GameError::TransitionLoop(next));
            }
            self.enter_now(&next, screen)?;
        }
    }

    fn collect_finished(&mut self) {
        while let Some(finished) = self.output.pop_finished() {
            if !self.context.take_output_if(finished.entry) {
                continue;
            }
            let Some(beat) = finished.payload else {
                continue;
            };
            trace!(outcome = ?finished.outcome, "scene output finished");
            if let Some(countdown) = beat.countdown {
                let duration = countdown.duration;
                if self
                    .countdown
                    .start(&mut self.scheduler, duration, countdown.expire)
                {
                    self.events
                        .push_back(GameEvent::CountdownStarted { duration });
                }
            }
            if let Some(next) = beat.then {
                self.pending.push_back(next);
            }
        }
    }

    fn print(
        &mut self,
        lines: Sequence,
        screen: &mut dyn Screen,
    ) -> Result<EntryHandle, GameError> {
        Ok(self.output.emit(&mut self.scheduler, screen, lines, None)?)
    }

    fn perform(
        &mut self,
        command: &str,
        action: &Action,
        argument: &str,
        bound: &[String],
        screen: &mut dyn Screen,
    ) -> Result<(), GameError> {
        match action {
            Action::Goto(scene) => self.pending.push_back(scene.clone()),
            Action::Branch { routes, default } => {
                let routed = routes
                    .iter()
                    .find(|(key, _)| normalize_arg(key) == argument)
                    .map(|(_, scene)| scene);
                match routed.or(default.as_ref()) {
                    Some(scene) => self.pending.push_back(scene.clone()),
                    None => {
                        let mut valid: Vec<String> =
                            routes.keys().map(|key| normalize_arg(key)).collect();
                        valid.sort_unstable();
                        valid.dedup();
                        let violation = ArgViolation::Invalid {
                            command: command.to_string(),
                            given: argument.to_string(),
                            valid,
                        };
                        let line = Line::instant(self.config.error(&violation.to_string()));
                        self.print(vec![line], screen)?;
                    }
                }
            }
            Action::Say(lines) => {
                let lines = lines.iter().map(|l| substitute(l, argument, bound)).collect();
                self.print(lines, screen)?;
            }
            Action::Unlock { command, lines } => {
                debug!(command = %command.name, "unlock global command");
                self.context.add_global_command(command);
                if !lines.is_empty() {
                    let lines = lines.iter().map(|l| substitute(l, argument, bound)).collect();
                    self.print(lines, screen)?;
                }
            }
            Action::Jump => match self.story.resolve(argument) {
                Some(scene) => self.pending.push_back(scene.name.clone()),
                None => {
                    let lines = self.scene_listing();
                    self.print(lines, screen)?;
                }
            },
            Action::Help => {
                let lines = self.command_listing();
                self.print(lines, screen)?;
            }
            Action::PauseCountdown => {
                self.countdown.pause(&mut self.scheduler);
            }
            Action::ResumeCountdown => {
                self.countdown.resume(&mut self.scheduler);
            }
        }
        Ok(())
    }

    fn scene_listing(&self) -> Sequence {
        std::iter::once(Line::instant(self.config.scene_list_heading.clone()))
            .chain(
                self.story
                    .scenes()
                    .iter()
                    .enumerate()
                    .map(|(i, scene)| Line::instant(format!("{i}: {}", scene.name))),
            )
            .collect()
    }

    fn command_listing(&self) -> Sequence {
        let router = self.context.router();
        let local: Vec<&str> = router.local().names().collect();
        let global = router.global().names().filter(|name| !local.contains(name));
        std::iter::once(Line::instant(self.config.help_heading.clone()))
            .chain(local.iter().copied().chain(global).map(Line::instant))
            .collect()
    }
}

/// Fill `{arg}` with the (escaped) typed argument and `{0}`, `{1}` … with the
/// bound arguments.
fn substitute(line: &Line, argument: &str, bound: &[String]) -> Line {
    let mut text = line.text.replace("{arg}", &escape_markup(argument));
    for (i, value) in bound.iter().enumerate() {
        text = text.replace(&format!("{{{i}}}"), value);
    }
    Line {
        text,
        ..line.clone()
    }
}

impl GameBuilder {
    pub fn story(mut self, story: Story) -> Self {
        self.story = Some(story);
        self
    }

    pub fn story_file(mut self, path: impl AsRef<Path>) -> Self {
        self.story_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<Game, GameError> {
        let story = match (self.story, self.story_path) {
            (Some(story), _) => story,
            (None, Some(path)) => Story::load_from_ron(&path)?,
            (None, None) => return Err(GameError::MissingStory),
        };
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };
        config.validate()?;
        story.validate()?;

        Ok(Game {
            context: StoryContext::new(story.globals()),
            countdown: GameTimer::new(config.countdown_tick),
            story,
            config,
            scheduler: Scheduler::new(),
            output: OutputQueue::new(),
            pending: VecDeque::new(),
            events: VecDeque::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::MemoryScreen;
    use crate::schema::command::{ArityMode, CommandDef};
    use crate::schema::scene::Scene;

    fn game(scenes: Vec<Scene>) -> Game {
        let start = scenes[0].name.clone();
        let story = Story::new(start, vec![CommandDef::new("help", Action::Help)], scenes);
        Game::builder().story(story).build().unwrap()
    }

    #[test]
    fn builder_requires_a_story() {
        assert!(matches!(Game::builder().build(), Err(GameError::MissingStory)));
    }

    #[test]
    fn builder_rejects_broken_story() {
        let story = Story::new("a", Vec::new(), vec![Scene::new("a").then("nowhere")]);
        assert!(matches!(
            Game::builder().story(story).build(),
            Err(GameError::Story(StoryError::UnknownTarget { .. }))
        ));
    }

    #[test]
    fn substitute_fills_argument_and_bound() {
        let line = Line::typed("{arg} meets {0} at {1}", 5);
        let out = substitute(&line, "<you>", &["Ana".to_string(), "noon".to_string()]);
        assert_eq!(out.text, "&lt;you&gt; meets Ana at noon");
        assert_eq!(out.char_delay, 5);
    }

    #[test]
    fn instant_then_chain_settles_in_one_call() {
        let mut g = game(vec![
            Scene::new("a").lines(vec![Line::instant("A")]).then("b"),
            Scene::new("b").lines(vec![Line::instant("B")]).clear(ClearMode::Keep),
        ]);
        let mut screen = MemoryScreen::new();
        g.start(&mut screen).unwrap();
        assert_eq!(g.scene(), Some("b"));
        assert_eq!(screen.contents(), vec!["A", "B"]);
    }

    #[test]
    fn instant_then_loop_is_reported() {
        let mut g = game(vec![
            Scene::new("a").lines(vec![Line::instant("A")]).then("b"),
            Scene::new("b").lines(vec![Line::instant("B")]).then("a"),
        ]);
        let mut screen = MemoryScreen::new();
        assert!(matches!(
            g.start(&mut screen),
            Err(GameError::TransitionLoop(_))
        ));
    }

    #[test]
    fn branch_without_match_prints_choices() {
        let routes = [("left".to_string(), "b".to_string())].into_iter().collect();
        let mut g = game(vec![
            Scene::new("a").command(
                CommandDef::new("turn", Action::Branch { routes, default: None })
                    .arity(ArityMode::OptionalFree),
            ),
            Scene::new("b"),
        ]);
        let mut screen = MemoryScreen::new();
        g.start(&mut screen).unwrap();
        g.submit("turn right", &mut screen).unwrap();
        assert_eq!(g.scene(), Some("a"));
        assert_eq!(
            screen.contents().last().copied(),
            Some("<err>'right' is not valid for turn (one of: left)</err>")
        );
        g.submit("turn LEFT", &mut screen).unwrap();
        assert_eq!(g.scene(), Some("b"));
    }

    #[test]
    fn branch_keys_match_like_typed_arguments() {
        let routes = [("North".to_string(), "b".to_string())].into_iter().collect();
        let mut g = game(vec![
            Scene::new("a").command(
                CommandDef::new("go", Action::Branch { routes, default: None })
                    .arity(ArityMode::RequiredConstrained)
                    .valid_args(&["North"]),
            ),
            Scene::new("b"),
        ]);
        let mut screen = MemoryScreen::new();
        g.start(&mut screen).unwrap();
        g.submit("go North", &mut screen).unwrap();
        assert_eq!(g.scene(), Some("b"));
    }

    #[test]
    fn advancing_past_end_of_clock_saturates() {
        let mut g = game(vec![
            Scene::new("a")
                .lines(vec![Line::typed("tick tock", 10)])
                .countdown(3_000, "b"),
            Scene::new("b").lines(vec![Line::typed("after", 10)]),
        ]);
        let mut screen = MemoryScreen::new();
        g.start(&mut screen).unwrap();
        g.advance(10, &mut screen).unwrap();
        g.advance(Millis::MAX, &mut screen).unwrap();
        assert_eq!(g.now(), Millis::MAX);
        assert_eq!(g.scene(), Some("b"));
        assert!(!g.is_animating());
        assert_eq!(screen.contents(), vec!["after"]);

        g.advance(Millis::MAX, &mut screen).unwrap();
        assert_eq!(g.now(), Millis::MAX);
    }
}
