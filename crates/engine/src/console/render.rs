//! Building render snapshots.

use protocol::{OutputLine, Phase, RenderSnapshot};

use super::state::{EngineState, LoginStep};
use crate::world::World;

/// Boot banner shown on the first call after initialization.
pub const BOOT_BANNER: &[&str] = &[
    "HopOS 4.2.0 (tty1)",
    "",
    "[  OK  ] Mounted virtual filesystems.",
    "[  OK  ] Started network interfaces.",
    "[  OK  ] Started OpenSSH client.",
    "[  OK  ] Reached target Multi-User System.",
    "",
    "Press ENTER to continue...",
];

/// Everything one `execute` call produced besides the state change.
#[derive(Debug, Default)]
pub struct Reply {
    pub boot_lines: Vec<String>,
    pub lines: Vec<OutputLine>,
    pub motd: Option<String>,
    pub requires_paging: bool,
    pub clear_screen: bool,
}

impl Reply {
    pub fn push(&mut self, line: OutputLine) {
        self.lines.push(line);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(OutputLine::info(text));
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(OutputLine::success(text));
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(OutputLine::warning(text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(OutputLine::error(text));
    }

    /// Show a message of the day and remember it for the snapshot.
    pub fn motd(&mut self, motd: Option<&str>) {
        if let Some(text) = motd {
            self.lines.extend(text.lines().map(OutputLine::info));
            self.motd = Some(text.to_string());
        }
    }
}

/// Prompt for the next input line.
pub fn prompt(state: &EngineState, world: &World) -> String {
    match state {
        EngineState::Booting { .. } => String::new(),
        EngineState::LoggingIn(LoginStep::LocalUsername) => {
            format!("{} login: ", world.local().hostname())
        }
        EngineState::LoggingIn(LoginStep::LocalPassword { .. }) => "Password: ".to_string(),
        EngineState::LoggingIn(LoginStep::SshUsername { .. }) => "login as: ".to_string(),
        EngineState::LoggingIn(LoginStep::SshPassword {
            target, username, ..
        }) => format!("{username}@{}'s password: ", target.hostname()),
        EngineState::Shell(session) => session.prompt(),
    }
}

/// Assemble the snapshot for the current state.
pub fn snapshot(state: &EngineState, world: &World, reply: Reply) -> RenderSnapshot {
    let mut snapshot = RenderSnapshot::new(state.phase());
    snapshot.prompt = prompt(state, world);
    snapshot.boot_lines = reply.boot_lines;
    snapshot.extend_output(reply.lines);
    snapshot.motd = reply.motd;
    snapshot.requires_paging = reply.requires_paging;
    snapshot.clear_screen = reply.clear_screen;

    match state.session() {
        Some(session) => {
            snapshot.current_path = session.current_path().to_string();
            snapshot.directory_listing = session.listing();
            snapshot.hop_depth = session.hops().depth();
            snapshot.hop_chain = session.hops().views();
            snapshot.device = session.device().info();
        }
        None => snapshot.device = world.local().info(),
    }

    snapshot
}

/// Debug lines describing the state behind a snapshot.
pub fn debug_lines(session_id: &str, snapshot: &RenderSnapshot) -> Vec<OutputLine> {
    let phase = match snapshot.phase {
        Phase::Booting => "booting".to_string(),
        Phase::LoggingIn(prompt) => format!("logging_in/{prompt:?}"),
        Phase::Shell => "shell".to_string(),
    };
    vec![
        OutputLine::debug(format!("[debug] session={session_id} phase={phase}")),
        OutputLine::debug(format!(
            "[debug] host={} hops={} cwd={}",
            snapshot.device.hostname,
            snapshot.hop_depth,
            if snapshot.current_path.is_empty() {
                "-"
            } else {
                snapshot.current_path.as_str()
            }
        )),
    ]
}
