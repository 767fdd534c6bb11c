use serde::{Deserialize, Serialize};

use super::command::CommandDef;
use super::line::{Millis, Sequence};

/// What a scene does to the screen before printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClearMode {
    /// Leave everything in place.
    Keep,
    /// Remove every surface except persistent ones.
    #[default]
    Transient,
    /// Remove every surface.
    All,
}

/// A countdown armed once a scene finishes printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub duration: Millis,
    /// Scene entered when the countdown runs out.
    pub expire: String,
}

/// One narrative state: its output, its local commands, and where it goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub clear: ClearMode,
    #[serde(default)]
    pub lines: Sequence,
    #[serde(default)]
    pub commands: Vec<CommandDef>,
    /// Drop commands unlocked since the last reset.
    #[serde(default = "default_true")]
    pub reset_globals: bool,
    #[serde(default)]
    pub countdown: Option<Countdown>,
    /// Scene entered as soon as this one finishes printing.
    #[serde(default)]
    pub then: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clear: ClearMode::default(),
            lines: Vec::new(),
            commands: Vec::new(),
            reset_globals: true,
            countdown: None,
            then: None,
        }
    }

    pub fn lines(mut self, lines: Sequence) -> Self {
        self.lines = lines;
        self
    }

    pub fn command(mut self, command: CommandDef) -> Self {
        self.commands.push(command);
        self
    }

    pub fn countdown(mut self, duration: Millis, expire: impl Into<String>) -> Self {
        self.countdown = Some(Countdown {
            duration,
            expire: expire.into(),
        });
        self
    }

    pub fn then(mut self, next: impl Into<String>) -> Self {
        self.then = Some(next.into());
        self
    }

    pub fn clear(mut self, clear: ClearMode) -> Self {
        self.clear = clear;
        self
    }

    /// Every scene this one can lead to, through commands, countdown or `then`.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.commands.iter().flat_map(CommandDef::targets).collect();
        if let Some(countdown) = &self.countdown {
            targets.push(&countdown.expire);
        }
        if let Some(next) = &self.then {
            targets.push(next);
        }
        targets
    }
}
