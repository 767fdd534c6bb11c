/// Command router: parses typed input and resolves it against the scene-local
/// table, then the global table.
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

use crate::schema::command::{ArityMode, CommandDef};

/// Why an argument was refused. `Display` is the line shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgViolation {
    #[error("{command} takes no arguments")]
    Unexpected { command: String },
    #[error("{command} requires an argument{}", one_of(.valid))]
    Missing { command: String, valid: Vec<String> },
    #[error("'{given}' is not valid for {command}{}", one_of(.valid))]
    Invalid {
        command: String,
        given: String,
        valid: Vec<String>,
    },
}

fn one_of(valid: &[String]) -> String {
    if valid.is_empty() {
        String::new()
    } else {
        format!(" (one of: {})", valid.join(", "))
    }
}

/// Lowercase and trim, then split into a command name and the remaining
/// tokens joined by single spaces.
pub fn normalize(raw: &str) -> (String, String) {
    let lowered = raw.trim().to_lowercase();
    let mut tokens = lowered.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let argument = tokens.collect::<Vec<_>>().join(" ");
    (name, argument)
}

/// Normalize a stored argument (valid set, branch key) the way typed
/// arguments are normalized.
pub fn normalize_arg(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A recognized command bound to a handler of type `H`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec<H> {
    pub name: String,
    pub handler: H,
    pub valid_args: Vec<String>,
    pub arity: ArityMode,
    /// Passed to the handler after the typed argument.
    pub bound: Vec<String>,
    pub silent: bool,
}

impl<H> CommandSpec<H> {
    pub fn new(name: &str, handler: H) -> Self {
        Self {
            name: normalize(name).0,
            handler,
            valid_args: Vec::new(),
            arity: ArityMode::NoArgs,
            bound: Vec::new(),
            silent: false,
        }
    }

    pub fn arity(mut self, arity: ArityMode) -> Self {
        self.arity = arity;
        self
    }

    pub fn valid_args<S: AsRef<str>>(mut self, args: &[S]) -> Self {
        self.valid_args = args.iter().map(|a| normalize_arg(a.as_ref())).collect();
        self
    }

    pub fn bound(mut self, args: Vec<String>) -> Self {
        self.bound = args;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Check a normalized argument against the arity mode. An empty
    /// `valid_args` set places no restriction on constrained modes.
    pub fn check(&self, argument: &str) -> Result<(), ArgViolation> {
        let present = !argument.is_empty();
        let in_set = self.valid_args.is_empty() || self.valid_args.iter().any(|a| a == argument);
        let invalid = || ArgViolation::Invalid {
            command: self.name.clone(),
            given: argument.to_string(),
            valid: self.valid_args.clone(),
        };
        let missing = || ArgViolation::Missing {
            command: self.name.clone(),
            valid: self.valid_args.clone(),
        };
        match self.arity {
            ArityMode::NoArgs if present => Err(ArgViolation::Unexpected {
                command: self.name.clone(),
            }),
            ArityMode::NoArgs | ArityMode::OptionalFree => Ok(()),
            ArityMode::OptionalConstrained if present && !in_set => Err(invalid()),
            ArityMode::OptionalConstrained => Ok(()),
            ArityMode::RequiredConstrained | ArityMode::RequiredFree if !present => Err(missing()),
            ArityMode::RequiredConstrained if !in_set => Err(invalid()),
            ArityMode::RequiredConstrained | ArityMode::RequiredFree => Ok(()),
        }
    }
}

impl From<&CommandDef> for CommandSpec<crate::schema::command::Action> {
    fn from(def: &CommandDef) -> Self {
        CommandSpec::new(&def.name, def.action.clone())
            .arity(def.arity)
            .valid_args(&def.valid_args)
            .bound(def.bound.clone())
            .silent(def.silent)
    }
}

/// Commands keyed by normalized name, listed in insertion order.
#[derive(Debug, Clone)]
pub struct CommandTable<H> {
    specs: FxHashMap<String, CommandSpec<H>>,
    order: Vec<String>,
}

impl<H> Default for CommandTable<H> {
    fn default() -> Self {
        Self {
            specs: FxHashMap::default(),
            order: Vec::new(),
        }
    }
}

impl<H> CommandTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a command.
    pub fn insert(&mut self, spec: CommandSpec<H>) {
        if !self.specs.contains_key(&spec.name) {
            self.order.push(spec.name.clone());
        }
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec<H>> {
        self.specs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<H> FromIterator<CommandSpec<H>> for CommandTable<H> {
    fn from_iter<I: IntoIterator<Item = CommandSpec<H>>>(iter: I) -> Self {
        let mut table = Self::new();
        for spec in iter {
            table.insert(spec);
        }
        table
    }
}

/// Result of routing one line of input.
#[derive(Debug)]
pub enum RouterOutcome<'a, H> {
    /// Nothing but whitespace was typed.
    Empty,
    NotFound { name: String },
    Rejected {
        spec: &'a CommandSpec<H>,
        violation: ArgViolation,
    },
    Accepted(Invocation<'a, H>),
}

/// An accepted command, ready to call.
#[derive(Debug)]
pub struct Invocation<'a, H> {
    pub spec: &'a CommandSpec<H>,
    pub argument: String,
}

impl<'a, H> Invocation<'a, H> {
    pub fn handler(&self) -> &'a H {
        &self.spec.handler
    }

    pub fn bound(&self) -> &'a [String] {
        &self.spec.bound
    }

    /// Call a function handler with the argument, then the bound arguments.
    pub fn call<R>(&self) -> R
    where
        H: Fn(&str, &[String]) -> R,
    {
        (self.spec.handler)(&self.argument, &self.spec.bound)
    }
}

/// Scene-local and global command tables.
///
/// The local table is replaced wholesale on every scene change. The global
/// table grows through `add_global` and returns to its base set on
/// `reset_global`.
#[derive(Debug, Clone)]
pub struct Router<H> {
    local: CommandTable<H>,
    global: CommandTable<H>,
    base: CommandTable<H>,
}

impl<H: Clone> Router<H> {
    pub fn new(base: CommandTable<H>) -> Self {
        Self {
            local: CommandTable::new(),
            global: base.clone(),
            base,
        }
    }

    pub fn set_local(&mut self, table: CommandTable<H>) {
        self.local = table;
    }

    pub fn add_global(&mut self, spec: CommandSpec<H>) {
        self.global.insert(spec);
    }

    pub fn reset_global(&mut self) {
        self.global = self.base.clone();
    }

    pub fn local(&self) -> &CommandTable<H> {
        &self.local
    }

    pub fn global(&self) -> &CommandTable<H> {
        &self.global
    }

    /// First match by name: local table, then global.
    pub fn resolve(&self, name: &str) -> Option<&CommandSpec<H>> {
        self.local.get(name).or_else(|| self.global.get(name))
    }

    pub fn route(&self, raw: &str) -> RouterOutcome<'_, H> {
        let (name, argument) = normalize(raw);
        if name.is_empty() {
            return RouterOutcome::Empty;
        }
        let Some(spec) = self.resolve(&name) else {
            trace!(%name, "command not found");
            return RouterOutcome::NotFound { name };
        };
        match spec.check(&argument) {
            Ok(()) => {
                trace!(%name, %argument, "command accepted");
                RouterOutcome::Accepted(Invocation { spec, argument })
            }
            Err(violation) => {
                trace!(%name, %violation, "command rejected");
                RouterOutcome::Rejected { spec, violation }
            }
        }
    }
}
