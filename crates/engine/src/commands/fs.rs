//! Filesystem builtins: `ls`, `cd`, `cat`, `read`, `pwd`.

use protocol::OutputLine;

use super::{describe_fs_error, describe_read_error, Command, CommandEnv, CommandResult};
use crate::fs::{EntryKind, NodeId};
use crate::session::SessionState;

fn usage_error(usage: &str) -> CommandResult {
    CommandResult::error(format!("usage: {usage}"))
}

/// List a directory.
pub struct Ls;

impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["dir"]
    }

    fn summary(&self) -> &'static str {
        "List directory contents"
    }

    fn usage(&self) -> &'static str {
        "ls [path]"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        let (target, label) = match args {
            [] => (session.cwd(), "."),
            [path] => match session.resolve(path) {
                Ok(id) => (id, path.as_str()),
                Err(err) => return CommandResult::error(describe_fs_error("ls", path, &err)),
            },
            _ => return usage_error(self.usage()),
        };

        let fs = session.filesystem();
        if !fs.is_dir(target) {
            let name = fs.get(target).map(|node| node.name()).unwrap_or(label);
            return CommandResult::lines([name]);
        }

        match fs.entries(target) {
            Ok(entries) => CommandResult::styled(
                entries
                    .into_iter()
                    .map(|entry| match entry.kind {
                        EntryKind::Directory => OutputLine::info(format!("{}/", entry.name)),
                        EntryKind::Executable => OutputLine::success(format!("{}*", entry.name)),
                        EntryKind::File => OutputLine::info(entry.name),
                    })
                    .collect(),
            ),
            Err(err) => CommandResult::error(describe_fs_error("ls", label, &err)),
        }
    }
}

/// Change the working directory.
pub struct Cd;

impl Command for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn summary(&self) -> &'static str {
        "Change the working directory"
    }

    fn usage(&self) -> &'static str {
        "cd [path]"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        let (target, label): (Result<NodeId, _>, &str) = match args {
            [] => (Ok(session.filesystem().home_for(session.username())), "~"),
            [path] => (session.resolve(path), path.as_str()),
            _ => return usage_error(self.usage()),
        };

        match target.and_then(|id| session.with_cwd(id)) {
            Ok(moved) => CommandResult::replace(moved),
            Err(err) => CommandResult::error(describe_fs_error("cd", label, &err)),
        }
    }
}

/// Shared body of `cat` and `read`.
fn display_file(
    command: &str,
    session: &SessionState,
    path: &str,
    env: &CommandEnv<'_>,
) -> Result<Vec<String>, CommandResult> {
    let id = session
        .resolve(path)
        .map_err(|err| CommandResult::error(describe_fs_error(command, path, &err)))?;
    let content = session
        .filesystem()
        .read(id, env.max_read_lines)
        .map_err(|err| CommandResult::error(describe_read_error(command, path, &err)))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Print a file.
pub struct Cat;

impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn summary(&self) -> &'static str {
        "Print the contents of a file"
    }

    fn usage(&self) -> &'static str {
        "cat <file>"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        env: &CommandEnv<'_>,
    ) -> CommandResult {
        let [path] = args else {
            return usage_error(self.usage());
        };
        match display_file("cat", session, path, env) {
            Ok(lines) => CommandResult::lines(lines),
            Err(result) => result,
        }
    }
}

/// Show a file through the pager.
pub struct Read;

impl Command for Read {
    fn name(&self) -> &'static str {
        "read"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["less", "more"]
    }

    fn summary(&self) -> &'static str {
        "View a file page by page"
    }

    fn usage(&self) -> &'static str {
        "read <file>"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        env: &CommandEnv<'_>,
    ) -> CommandResult {
        let [path] = args else {
            return usage_error(self.usage());
        };
        match display_file("read", session, path, env) {
            Ok(lines) => CommandResult::lines(lines).paged(),
            Err(result) => result,
        }
    }
}

/// Print the working directory.
pub struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn summary(&self) -> &'static str {
        "Print the working directory"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn execute(
        &self,
        session: &SessionState,
        _args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        CommandResult::lines([session.current_path()])
    }
}
