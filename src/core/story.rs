/// Story graph: the ordered scene registry, RON loading and integrity checks.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::command::CommandDef;
use crate::schema::scene::Scene;

/// Label used for the global command table in diagnostics.
pub const GLOBAL_SCOPE: &str = "<global>";

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("start scene '{0}' does not exist")]
    MissingStart(String),
    #[error("scene '{0}' is defined more than once")]
    DuplicateScene(String),
    #[error("command '{command}' is defined more than once in {scope}")]
    DuplicateCommand { scope: String, command: String },
    #[error("{from} leads to unknown scene '{target}'")]
    UnknownTarget { from: String, target: String },
}

#[derive(Debug, Deserialize, Serialize)]
struct RonStory {
    start: String,
    #[serde(default)]
    globals: Vec<CommandDef>,
    scenes: Vec<Scene>,
}

#[derive(Debug, Clone)]
pub struct Story {
    start: String,
    globals: Vec<CommandDef>,
    scenes: Vec<Scene>,
    index: FxHashMap<String, usize>,
}

impl Story {
    pub fn new(start: impl Into<String>, globals: Vec<CommandDef>, scenes: Vec<Scene>) -> Self {
        let mut index = FxHashMap::default();
        for (i, scene) in scenes.iter().enumerate() {
            index.entry(scene.name.to_lowercase()).or_insert(i);
        }
        Self {
            start: start.into(),
            globals,
            scenes,
            index,
        }
    }

    pub fn load_from_ron(path: &Path) -> Result<Story, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a story. Integrity is checked separately by `lint`/`validate`.
    pub fn parse_ron(input: &str) -> Result<Story, StoryError> {
        let raw: RonStory = ron::from_str(input)?;
        Ok(Self::new(raw.start, raw.globals, raw.scenes))
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn globals(&self) -> &[CommandDef] {
        &self.globals
    }

    /// Scenes in registry order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| self.scenes.get(i))
    }

    /// Look a scene up by name, or by its position in the registry.
    pub fn resolve(&self, token: &str) -> Option<&Scene> {
        let token = token.trim();
        self.scene(token)
            .or_else(|| token.parse::<usize>().ok().and_then(|i| self.scenes.get(i)))
    }

    /// Every integrity problem in the story.
    pub fn lint(&self) -> Vec<StoryError> {
        let mut issues = Vec::new();

        if self.scene(&self.start).is_none() {
            issues.push(StoryError::MissingStart(self.start.clone()));
        }

        let mut seen = FxHashSet::default();
        for scene in &self.scenes {
            if !seen.insert(scene.name.to_lowercase()) {
                issues.push(StoryError::DuplicateScene(scene.name.clone()));
            }
        }

        issues.extend(duplicate_commands(GLOBAL_SCOPE, &self.globals));
        for def in &self.globals {
            let from = format!("global command '{}'", def.name);
            self.check_targets(&from, def.targets(), &mut issues);
        }

        for scene in &self.scenes {
            issues.extend(duplicate_commands(&scene.name, &scene.commands));
            let from = format!("scene '{}'", scene.name);
            self.check_targets(&from, scene.targets(), &mut issues);
        }
        issues
    }

    /// The first integrity problem, if any.
    pub fn validate(&self) -> Result<(), StoryError> {
        match self.lint().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    fn check_targets(&self, from: &str, targets: Vec<&str>, issues: &mut Vec<StoryError>) {
        for target in targets {
            if self.scene(target).is_none() {
                issues.push(StoryError::UnknownTarget {
                    from: from.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
}

fn duplicate_commands(scope: &str, defs: &[CommandDef]) -> Vec<StoryError> {
    let mut seen = FxHashSet::default();
    defs.iter()
        .filter(|def| !seen.insert(def.name.trim().to_lowercase()))
        .map(|def| StoryError::DuplicateCommand {
            scope: scope.to_string(),
            command: def.name.clone(),
        })
        .collect()
}
