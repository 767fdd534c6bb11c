use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::line::Sequence;

/// How a command treats the text after its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArityMode {
    /// The argument must be empty.
    #[default]
    NoArgs,
    /// Anything goes, including nothing.
    OptionalFree,
    /// Optional, but when given it must be one of `valid_args`.
    OptionalConstrained,
    /// Required and must be one of `valid_args`.
    RequiredConstrained,
    /// Required, any value.
    RequiredFree,
}

/// A command as written in a story file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDef {
    pub name: String,
    #[serde(default)]
    pub arity: ArityMode,
    #[serde(default)]
    pub valid_args: Vec<String>,
    /// Extra arguments handed to the action after the typed argument.
    #[serde(default)]
    pub bound: Vec<String>,
    /// Skip echoing the typed input.
    #[serde(default)]
    pub silent: bool,
    pub action: Action,
}

/// What a command does once its argument has been accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Enter the named scene.
    Goto(String),
    /// Enter the scene the argument maps to, or `default` when nothing matches.
    Branch {
        routes: FxHashMap<String, String>,
        #[serde(default)]
        default: Option<String>,
    },
    /// Print lines. `{arg}` becomes the argument, `{0}`, `{1}` … the bound arguments.
    Say(Sequence),
    /// Add a command to the global table, then print `lines`.
    Unlock {
        command: Box<CommandDef>,
        #[serde(default)]
        lines: Sequence,
    },
    /// Enter a scene by name or index; list every scene when that fails.
    Jump,
    /// List the commands available right now.
    Help,
    PauseCountdown,
    ResumeCountdown,
}

impl CommandDef {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            arity: ArityMode::NoArgs,
            valid_args: Vec::new(),
            bound: Vec::new(),
            silent: false,
            action,
        }
    }

    pub fn arity(mut self, arity: ArityMode) -> Self {
        self.arity = arity;
        self
    }

    pub fn valid_args(mut self, args: &[&str]) -> Self {
        self.valid_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn bound(mut self, args: &[&str]) -> Self {
        self.bound = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Scene names this command can lead to.
    pub fn targets(&self) -> Vec<&str> {
        match &self.action {
            Action::Goto(scene) => vec![scene.as_str()],
            Action::Branch { routes, default } => routes
                .values()
                .map(String::as_str)
                .chain(default.as_deref())
                .collect(),
            Action::Unlock { command, .. } => command.targets(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_from_ron() {
        let def: CommandDef = ron::from_str(
            r#"(
                name: "go",
                arity: RequiredConstrained,
                valid_args: ["north", "south"],
                action: Branch(routes: {"north": "cliff", "south": "beach"}),
            )"#,
        )
        .unwrap();
        assert_eq!(def.arity, ArityMode::RequiredConstrained);
        assert_eq!(def.valid_args, vec!["north", "south"]);
        assert!(!def.silent);
        let mut targets = def.targets();
        targets.sort_unstable();
        assert_eq!(targets, vec!["beach", "cliff"]);
    }

    #[test]
    fn arity_defaults_to_no_args() {
        let def: CommandDef = ron::from_str(r#"(name: "look", action: Help)"#).unwrap();
        assert_eq!(def.arity, ArityMode::NoArgs);
        assert!(def.targets().is_empty());
    }

    #[test]
    fn unlock_targets_follow_the_unlocked_command() {
        let def = CommandDef::new(
            "read",
            Action::Unlock {
                command: Box::new(CommandDef::new("hints", Action::Goto("hints".into()))),
                lines: Vec::new(),
            },
        );
        assert_eq!(def.targets(), vec!["hints"]);
    }
}
