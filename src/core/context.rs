/// Story context: the state a scene transition reads and replaces.

use crate::core::queue::EntryId;
use crate::core::router::{CommandSpec, CommandTable, Router, RouterOutcome};
use crate::schema::command::{Action, CommandDef};

/// Command tables, the current scene, and which output belongs to it.
#[derive(Debug, Clone)]
pub struct StoryContext {
    router: Router<Action>,
    scene: Option<String>,
    output: Option<EntryId>,
}

impl StoryContext {
    pub fn new(globals: &[CommandDef]) -> Self {
        let base: CommandTable<Action> = globals.iter().map(CommandSpec::from).collect();
        Self {
            router: Router::new(base),
            scene: None,
            output: None,
        }
    }

    /// Replace the scene-local commands.
    pub fn set_local_commands(&mut self, commands: &[CommandDef]) {
        self.router
            .set_local(commands.iter().map(CommandSpec::from).collect());
    }

    pub fn add_global_command(&mut self, command: &CommandDef) {
        self.router.add_global(CommandSpec::from(command));
    }

    pub fn reset_global_commands(&mut self) {
        self.router.reset_global();
    }

    pub fn route(&self, raw: &str) -> RouterOutcome<'_, Action> {
        self.router.route(raw)
    }

    pub fn router(&self) -> &Router<Action> {
        &self.router
    }

    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn set_scene(&mut self, scene: &str) {
        self.scene = Some(scene.to_string());
    }

    /// Output entry whose completion continues the current scene.
    pub fn output(&self) -> Option<EntryId> {
        self.output
    }

    pub fn set_output(&mut self, entry: Option<EntryId>) {
        self.output = entry;
    }

    /// Clear the current output if it is `entry`. Returns whether it was.
    pub fn take_output_if(&mut self, entry: EntryId) -> bool {
        if self.output == Some(entry) {
            self.output = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_commands_are_replaced_and_globals_reset() {
        let mut ctx = StoryContext::new(&[CommandDef::new("help", Action::Help)]);
        ctx.set_local_commands(&[CommandDef::new("start", Action::Goto("day".into()))]);
        assert!(ctx.router().resolve("start").is_some());

        ctx.set_local_commands(&[]);
        assert!(ctx.router().resolve("start").is_none());

        ctx.add_global_command(&CommandDef::new("hints", Action::Help));
        assert!(ctx.router().resolve("hints").is_some());
        ctx.reset_global_commands();
        assert!(ctx.router().resolve("hints").is_none());
        assert!(ctx.router().resolve("help").is_some());
    }

    #[test]
    fn output_is_claimed_by_identity() {
        let mut ctx = StoryContext::new(&[]);
        let a = EntryId::from_raw(1);
        let b = EntryId::from_raw(2);
        ctx.set_output(Some(b));
        assert!(!ctx.take_output_if(a));
        assert!(ctx.take_output_if(b));
        assert!(!ctx.take_output_if(b));
    }
}
