//! Small builtins: `echo`, `clear`, `help`, `whoami`, `sudo`.

use protocol::OutputLine;

use super::{Command, CommandEnv, CommandResult};
use crate::session::SessionState;

/// Commands the engine handles itself, listed by `help` after the builtins.
const SESSION_COMMANDS: &[(&str, &str, &str)] = &[
    ("ssh", "ssh [user@]host", "Open a session on a reachable device"),
    ("exit", "exit", "Close the current SSH session"),
];

/// Print arguments.
pub struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn summary(&self) -> &'static str {
        "Print arguments"
    }

    fn usage(&self) -> &'static str {
        "echo [words...]"
    }

    fn execute(
        &self,
        _session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        CommandResult::lines([args.join(" ")])
    }
}

/// Ask the presentation layer to clear the screen.
pub struct Clear;

impl Command for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["cls"]
    }

    fn summary(&self) -> &'static str {
        "Clear the screen"
    }

    fn usage(&self) -> &'static str {
        "clear"
    }

    fn execute(
        &self,
        _session: &SessionState,
        _args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        CommandResult {
            clear_screen: true,
            ..CommandResult::empty()
        }
    }
}

/// List commands or describe one.
pub struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn summary(&self) -> &'static str {
        "Show available commands"
    }

    fn usage(&self) -> &'static str {
        "help [command]"
    }

    fn execute(
        &self,
        _session: &SessionState,
        args: &[String],
        env: &CommandEnv<'_>,
    ) -> CommandResult {
        match args {
            [] => {
                let mut lines = vec![OutputLine::success("Available commands:")];
                let builtins = env
                    .registry
                    .commands()
                    .map(|cmd| (cmd.usage(), cmd.summary()));
                let session = SESSION_COMMANDS
                    .iter()
                    .map(|(_, usage, summary)| (*usage, *summary));
                lines.extend(builtins.chain(session).map(|(usage, summary)| {
                    OutputLine::info(format!("  {usage:<18} {summary}"))
                }));
                CommandResult::styled(lines)
            }
            [name] => {
                let lowered = name.to_lowercase();
                if let Some(cmd) = env.registry.get(&lowered) {
                    return CommandResult::lines([
                        format!("usage: {}", cmd.usage()),
                        cmd.summary().to_string(),
                    ]);
                }
                match SESSION_COMMANDS.iter().find(|(n, _, _)| *n == lowered) {
                    Some((_, usage, summary)) => {
                        CommandResult::lines([format!("usage: {usage}"), summary.to_string()])
                    }
                    None => CommandResult::error(format!("help: no help topics match '{name}'")),
                }
            }
            _ => CommandResult::error(format!("usage: {}", self.usage())),
        }
    }
}

/// Print the session username.
pub struct Whoami;

impl Command for Whoami {
    fn name(&self) -> &'static str {
        "whoami"
    }

    fn summary(&self) -> &'static str {
        "Print the current user"
    }

    fn usage(&self) -> &'static str {
        "whoami"
    }

    fn execute(
        &self,
        session: &SessionState,
        _args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        CommandResult::lines([session.username()])
    }
}

/// Always refuses.
pub struct Sudo;

impl Command for Sudo {
    fn name(&self) -> &'static str {
        "sudo"
    }

    fn summary(&self) -> &'static str {
        "Run a command as root"
    }

    fn usage(&self) -> &'static str {
        "sudo <command>"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        if args.is_empty() {
            return CommandResult::error(format!("usage: {}", self.usage()));
        }
        if session.identity().is_root() {
            return CommandResult::lines(["You are already root."]);
        }
        CommandResult::error(format!(
            "{} is not in the sudoers file. This incident will be reported.",
            session.username()
        ))
    }
}
