//! Shell commands and their dispatch table.
//!
//! Every builtin implements [`Command`]. A command gets a read-only view of
//! the session and returns a [`CommandResult`]; the only way it can change
//! the session is by handing back a complete replacement.

use std::collections::HashMap;
use std::sync::Arc;

use protocol::OutputLine;

use crate::fs::{FsError, ReadError};
use crate::session::SessionState;

pub mod fs;
pub mod misc;
pub mod net;

/// Engine limits visible to commands.
#[derive(Clone, Copy)]
pub struct CommandEnv<'a> {
    /// Longest file `cat`/`read` will display.
    pub max_read_lines: usize,
    /// The registry the command was dispatched from, for `help`.
    pub registry: &'a CommandRegistry,
}

/// What a command produced.
#[derive(Debug, Default)]
pub struct CommandResult {
    pub lines: Vec<OutputLine>,
    pub is_error: bool,
    /// Output should go through a pager.
    pub requires_paging: bool,
    /// The session was replaced.
    pub state_changed: bool,
    /// Presentation layer should clear the screen.
    pub clear_screen: bool,
    /// New session to install, when `state_changed` is set.
    pub replacement: Option<Box<SessionState>>,
}

impl CommandResult {
    /// Successful result with no output.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Successful result with plain output lines.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(OutputLine::info).collect(),
            ..Self::default()
        }
    }

    /// Successful result with pre-styled output.
    pub fn styled(lines: Vec<OutputLine>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    /// Failed result with one error line.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            lines: vec![OutputLine::error(message)],
            is_error: true,
            ..Self::default()
        }
    }

    /// Successful result that installs `session`.
    pub fn replace(session: SessionState) -> Self {
        Self {
            state_changed: true,
            replacement: Some(Box::new(session)),
            ..Self::default()
        }
    }

    pub fn paged(mut self) -> Self {
        self.requires_paging = true;
        self
    }
}

/// A shell builtin.
pub trait Command: Send + Sync {
    /// Name the user types.
    fn name(&self) -> &'static str;

    /// Alternative names.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// One-line description for `help`.
    fn summary(&self) -> &'static str;

    /// Usage string, e.g. `cat <file>`.
    fn usage(&self) -> &'static str;

    fn execute(&self, session: &SessionState, args: &[String], env: &CommandEnv<'_>)
        -> CommandResult;
}

/// Lowercased name and alias lookup for builtins.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    /// Primary names in registration order.
    order: Vec<String>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with every builtin command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(fs::Ls));
        registry.register(Arc::new(fs::Cd));
        registry.register(Arc::new(fs::Cat));
        registry.register(Arc::new(fs::Read));
        registry.register(Arc::new(fs::Pwd));
        registry.register(Arc::new(misc::Echo));
        registry.register(Arc::new(misc::Clear));
        registry.register(Arc::new(misc::Help));
        registry.register(Arc::new(misc::Whoami));
        registry.register(Arc::new(misc::Sudo));
        registry.register(Arc::new(net::Ifconfig));
        registry.register(Arc::new(net::Ping));
        registry.register(Arc::new(net::Nmap));
        registry
    }

    /// Register a command under its name and aliases. Replaces any existing
    /// command with the same name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_lowercase();
        if !self.order.contains(&name) {
            self.order.push(name.clone());
        }
        for alias in command.aliases() {
            self.commands.insert(alias.to_lowercase(), Arc::clone(&command));
        }
        self.commands.insert(name, command);
    }

    /// Look up a command by name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase())
    }

    /// Registered commands in registration order, aliases excluded.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<dyn Command>> {
        self.order.iter().filter_map(|name| self.commands.get(name))
    }

    /// Number of primary commands.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Run `name` against the session.
    pub fn dispatch(
        &self,
        session: &SessionState,
        name: &str,
        args: &[String],
        max_read_lines: usize,
    ) -> CommandResult {
        let Some(command) = self.get(name) else {
            return CommandResult::error(format!("{name}: command not found"));
        };

        tracing::debug!(command = command.name(), args = args.len(), "Dispatching command");
        let env = CommandEnv {
            max_read_lines,
            registry: self,
        };
        command.execute(session, args, &env)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Shell-style message for a navigation failure, e.g.
/// `cd: docs: No such file or directory`.
pub(crate) fn describe_fs_error(command: &str, arg: &str, err: &FsError) -> String {
    let reason = match err {
        FsError::NotFound(_) => "No such file or directory",
        FsError::NotADirectory(_) => "Not a directory",
        FsError::InvalidName(_) => "Invalid name",
        FsError::DuplicateName(_) => "File exists",
    };
    format!("{command}: {arg}: {reason}")
}

/// Shell-style message for a read failure.
pub(crate) fn describe_read_error(command: &str, arg: &str, err: &ReadError) -> String {
    match err {
        ReadError::IsADirectory => format!("{command}: {arg}: Is a directory"),
        ReadError::Executable => format!("{command}: {arg}: cannot display binary file"),
        ReadError::TooLarge { lines, limit } => {
            format!("{command}: {arg}: file too large ({lines} lines, limit {limit})")
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{args, player_session};
    use super::*;
    use crate::fs::MAX_READ_LINES;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(registry.get("LS").unwrap().name(), "ls");
        assert_eq!(registry.get("Dir").unwrap().name(), "ls");
        assert!(registry.get("rm").is_none());
    }

    #[test]
    fn test_commands_excludes_aliases() {
        let registry = CommandRegistry::with_builtins();
        let names: Vec<&str> = registry.commands().map(|c| c.name()).collect();
        assert_eq!(names.len(), registry.len());
        assert!(names.contains(&"ls"));
        assert!(!names.contains(&"dir"));
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::with_builtins();
        let result = registry.dispatch(&player_session(), "rm", &args(&["-rf"]), MAX_READ_LINES);
        assert!(result.is_error);
        assert_eq!(result.lines[0].text, "rm: command not found");
        assert!(result.replacement.is_none());
    }

    #[test]
    fn test_register_replaces() {
        struct Fake;
        impl Command for Fake {
            fn name(&self) -> &'static str {
                "pwd"
            }
            fn summary(&self) -> &'static str {
                "fake"
            }
            fn usage(&self) -> &'static str {
                "pwd"
            }
            fn execute(&self, _: &SessionState, _: &[String], _: &CommandEnv<'_>) -> CommandResult {
                CommandResult::lines(["fake"])
            }
        }

        let mut registry = CommandRegistry::with_builtins();
        let before = registry.len();
        registry.register(Arc::new(Fake));
        assert_eq!(registry.len(), before);

        let result = registry.dispatch(&player_session(), "pwd", &[], MAX_READ_LINES);
        assert_eq!(result.lines[0].text, "fake");
    }

    #[test]
    fn test_describe_errors() {
        let err = FsError::NotFound("x".to_string());
        assert_eq!(
            describe_fs_error("cd", "x", &err),
            "cd: x: No such file or directory"
        );
        assert_eq!(
            describe_read_error("cat", "bin", &ReadError::IsADirectory),
            "cat: bin: Is a directory"
        );
    }
}
