//! The session engine.
//!
//! [`SessionEngine`] owns one simulated terminal: boot banner, local login,
//! the shell, and any chain of SSH hops. Callers feed it one line at a time
//! through [`SessionEngine::execute`] and get back a complete
//! [`RenderSnapshot`] describing what to draw.
//!
//! # Phases
//!
//! ```text
//! Booting ──▶ LoggingIn(LocalUsername) ──▶ LoggingIn(LocalPassword) ──▶ Shell
//!                                                                        │  ▲
//!                     ssh [user@]host ─▶ LoggingIn(SshUsername/Password) ┘  │
//!                                        success / abort / failure ─────────┘
//! ```
//!
//! Errors never change the phase. Every failure inside `execute` becomes an
//! error line in the snapshot.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use protocol::RenderSnapshot;
use thiserror::Error;
use uuid::Uuid;

use crate::commands::CommandRegistry;
use crate::config::{check_limits, Config, ConfigError};
use crate::session::{HopStack, SessionState};
use crate::world::World;

pub mod render;
pub mod shared;
mod ssh;
pub mod state;

use render::Reply;
use state::{EngineState, LoginStep};

pub use shared::SharedEngine;

/// Errors returned by [`SessionEngine::initialize`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine settings: {0}")]
    InvalidSettings(#[from] ConfigError),

    #[error("local device {0} is missing from the network map")]
    MissingNetwork(String),
}

/// Limits the engine enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_hops: usize,
    pub max_auth_attempts: u32,
    pub max_input_length: usize,
    pub max_read_lines: usize,
    /// Debug mode after each `initialize`.
    pub debug: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_hops: config.session.max_hops,
            max_auth_attempts: config.session.max_auth_attempts,
            max_input_length: config.session.max_input_length,
            max_read_lines: config.filesystem.max_read_lines,
            debug: config.engine.debug,
        }
    }

    /// Check the limits against the same ranges as the configuration file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_limits(
            self.max_hops,
            self.max_auth_attempts,
            self.max_input_length,
            self.max_read_lines,
        )
    }
}

/// Strip control characters; tabs become spaces.
fn sanitize(line: &str) -> String {
    line.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// One simulated terminal session.
pub struct SessionEngine {
    world: Arc<World>,
    settings: EngineSettings,
    commands: CommandRegistry,
    state: EngineState,
    session_id: Option<Uuid>,
    debug: bool,
}

impl SessionEngine {
    /// Create an engine over `world`. Call [`initialize`](Self::initialize)
    /// before the first [`execute`](Self::execute).
    pub fn new(world: Arc<World>, settings: EngineSettings) -> Self {
        let debug = settings.debug;
        Self {
            world,
            settings,
            commands: CommandRegistry::with_builtins(),
            state: EngineState::boot(),
            session_id: None,
            debug,
        }
    }

    /// Build an engine from configuration.
    ///
    /// The configured world file is loaded when it exists; otherwise the
    /// built-in world is used.
    pub fn from_config(config: &Config) -> Result<Self> {
        let world = load_world(&config.engine.world_file)?;
        Ok(Self::new(Arc::new(world), EngineSettings::from_config(config)))
    }

    /// Reset to a freshly booted terminal.
    ///
    /// Safe to call any number of times. Each call discards the previous
    /// session, hop chain and login progress and starts a new session id.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.settings.validate()?;
        if self.world.network_for(self.world.local()).is_none() {
            return Err(EngineError::MissingNetwork(
                self.world.local().hostname().to_string(),
            ));
        }

        let id = Uuid::new_v4();
        self.state = EngineState::boot();
        self.session_id = Some(id);
        self.debug = self.settings.debug;
        tracing::info!(
            session_id = %id,
            host = %self.world.local().hostname(),
            "Session initialized"
        );
        Ok(())
    }

    /// Process one input line.
    ///
    /// # Panics
    ///
    /// Panics if [`initialize`](Self::initialize) has not been called.
    pub fn execute(&mut self, line: &str) -> RenderSnapshot {
        assert!(
            self.session_id.is_some(),
            "SessionEngine::execute called before initialize"
        );

        let mut reply = Reply::default();
        // Work on a copy so a panicking transition leaves the last state intact.
        let state = self.state.clone();
        let before = state.phase();

        self.state = match state {
            EngineState::Booting { banner_shown } => self.boot(banner_shown, &mut reply),
            state => {
                let input = sanitize(line);
                let length = input.chars().count();
                if length > self.settings.max_input_length {
                    tracing::warn!(length, "Input rejected as too long");
                    reply.error(format!(
                        "input too long: {length} characters (limit {})",
                        self.settings.max_input_length
                    ));
                    state
                } else {
                    self.advance(state, &input, &mut reply)
                }
            }
        };

        if self.state.phase() != before {
            tracing::debug!(
                session_id = %self.session_label(),
                from = ?before,
                to = ?self.state.phase(),
                "Phase transition"
            );
        }

        let mut snapshot = render::snapshot(&self.state, &self.world, reply);
        if self.debug {
            snapshot.debug = true;
            let lines = render::debug_lines(&self.session_label(), &snapshot);
            snapshot.extend_output(lines);
        }
        snapshot
    }

    /// Turn debug output on or off.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        tracing::debug!(enabled, "Debug mode changed");
        self.debug = enabled;
    }

    pub fn debug_mode(&self) -> bool {
        self.debug
    }

    /// Current phase tag.
    pub fn phase(&self) -> protocol::Phase {
        self.state.phase()
    }

    /// Depth of the hop chain; 0 before login.
    pub fn hop_depth(&self) -> usize {
        self.state.session().map_or(0, |s| s.hops().depth())
    }

    /// The logged-in session, if any.
    pub fn session(&self) -> Option<&SessionState> {
        self.state.session()
    }

    /// Identifier assigned by the last `initialize`.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn session_label(&self) -> String {
        self.session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    fn boot(&self, banner_shown: bool, reply: &mut Reply) -> EngineState {
        if banner_shown {
            return EngineState::LoggingIn(LoginStep::LocalUsername);
        }
        reply.boot_lines = render::BOOT_BANNER.iter().map(|l| l.to_string()).collect();
        EngineState::Booting { banner_shown: true }
    }

    fn advance(&self, state: EngineState, input: &str, reply: &mut Reply) -> EngineState {
        match state {
            EngineState::Booting { banner_shown } => self.boot(banner_shown, reply),
            EngineState::LoggingIn(LoginStep::LocalUsername) => self.local_username(input, reply),
            EngineState::LoggingIn(LoginStep::LocalPassword { username }) => {
                self.local_password(username, input, reply)
            }
            EngineState::LoggingIn(LoginStep::SshUsername { session, target }) => {
                self.ssh_username(session, target, input, reply)
            }
            EngineState::LoggingIn(LoginStep::SshPassword {
                session,
                target,
                username,
                attempts,
            }) => self.ssh_password(session, target, username, attempts, input, reply),
            EngineState::Shell(session) => self.shell(session, input, reply),
        }
    }

    fn local_username(&self, input: &str, reply: &mut Reply) -> EngineState {
        let username = input.trim();
        if username.is_empty() {
            reply.warning("A username is required. Even hackers need a name.");
            return EngineState::LoggingIn(LoginStep::LocalUsername);
        }
        EngineState::LoggingIn(LoginStep::LocalPassword {
            username: username.to_string(),
        })
    }

    fn local_password(&self, username: String, input: &str, reply: &mut Reply) -> EngineState {
        if input.trim().is_empty() {
            reply.warning("Warning: logging in with an empty password.");
        }

        let local = self.world.local();
        let Some(network) = self.world.network_for(local) else {
            reply.error("Login failed: local network unavailable.");
            return EngineState::LoggingIn(LoginStep::LocalUsername);
        };

        let hops = HopStack::new(self.settings.max_hops);
        let session = SessionState::login(&username, network, hops);
        tracing::info!(
            session_id = %self.session_label(),
            user = %username,
            host = %local.hostname(),
            "Local login"
        );
        reply.success(format!("Welcome to {}, {username}.", local.hostname()));
        reply.motd(local.motd());
        EngineState::Shell(session)
    }

    fn shell(&self, session: SessionState, input: &str, reply: &mut Reply) -> EngineState {
        let mut words = input.split_whitespace();
        let Some(name) = words.next() else {
            return EngineState::Shell(session);
        };
        let name = name.to_lowercase();
        let args: Vec<String> = words.map(str::to_string).collect();

        match name.as_str() {
            "ssh" => self.begin_ssh(session, &args, reply),
            "exit" | "logout" => self.exit(session, reply),
            _ => {
                let max_read_lines = self.settings.max_read_lines;
                let result = self.commands.dispatch(&session, &name, &args, max_read_lines);
                reply.lines.extend(result.lines);
                reply.requires_paging = result.requires_paging;
                reply.clear_screen = result.clear_screen;
                match result.replacement {
                    Some(next) if result.state_changed => EngineState::Shell(*next),
                    _ => EngineState::Shell(session),
                }
            }
        }
    }
}

/// Load the world file at `path`, or the built-in world when it is absent.
pub fn load_world(path: &Path) -> Result<World> {
    if path.exists() {
        return World::load(path);
    }
    tracing::debug!("World file not found at {:?}, using built-in world", path);
    Ok(World::builtin()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{LoginPrompt, Phase, Severity};

    fn engine() -> SessionEngine {
        let world = Arc::new(World::builtin().unwrap());
        let mut engine = SessionEngine::new(world, EngineSettings::default());
        engine.initialize().unwrap();
        engine
    }

    fn logged_in(username: &str) -> SessionEngine {
        let mut engine = engine();
        engine.execute("");
        engine.execute("");
        engine.execute(username);
        engine.execute("secret");
        engine
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("ls\t-a\r\n"), "ls -a");
        assert_eq!(sanitize("c\u{1b}[2Jat"), "c[2Jat");
        assert_eq!(sanitize("héllo"), "héllo");
    }

    #[test]
    fn test_boot_sequence() {
        let mut engine = engine();
        let first = engine.execute("");
        assert_eq!(first.phase, Phase::Booting);
        assert_eq!(first.boot_lines.len(), render::BOOT_BANNER.len());

        let second = engine.execute("ignored");
        assert_eq!(second.phase, Phase::LoggingIn(LoginPrompt::LocalUsername));
        assert!(second.boot_lines.is_empty());
        assert_eq!(second.prompt, "kali login: ");
    }

    #[test]
    fn test_blank_username_stays() {
        let mut engine = engine();
        engine.execute("");
        engine.execute("");
        let snapshot = engine.execute("   ");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::LocalUsername));
        assert_eq!(snapshot.output[0].severity, Severity::Warning);
        assert!(!snapshot.is_error);
    }

    #[test]
    fn test_local_login() {
        let mut engine = engine();
        engine.execute("");
        engine.execute("");
        let snapshot = engine.execute("  player ");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::LocalPassword));
        assert!(snapshot.phase.masks_input());

        let snapshot = engine.execute("pw");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert_eq!(snapshot.prompt, "player@kali:/home/player$ ");
        assert_eq!(snapshot.current_path, "/home/player");
        assert_eq!(snapshot.directory_listing, vec!["notes.txt"]);
        assert!(snapshot.motd.is_some());
    }

    #[test]
    fn test_empty_password_warns() {
        let mut engine = engine();
        engine.execute("");
        engine.execute("");
        engine.execute("alice");
        let snapshot = engine.execute("");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert!(snapshot
            .output
            .iter()
            .any(|l| l.severity == Severity::Warning));
    }

    #[test]
    fn test_empty_shell_line_is_noop() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("   ");
        assert!(snapshot.output.is_empty());
        assert_eq!(snapshot.phase, Phase::Shell);
    }

    #[test]
    fn test_command_name_case_insensitive() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("PWD");
        assert_eq!(snapshot.output_text(), vec!["/home/player"]);
    }

    #[test]
    fn test_cd_updates_session() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("cd /usr/bin");
        assert!(!snapshot.is_error);
        assert_eq!(snapshot.current_path, "/usr/bin");
        assert_eq!(snapshot.prompt, "player@kali:/usr/bin$ ");
        assert_eq!(engine.session().unwrap().current_path(), "/usr/bin");
    }

    #[test]
    fn test_failed_cd_keeps_path() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("cd nowhere");
        assert!(snapshot.is_error);
        assert_eq!(snapshot.current_path, "/home/player");
        assert_eq!(snapshot.phase, Phase::Shell);
    }

    #[test]
    fn test_input_too_long() {
        let world = Arc::new(World::builtin().unwrap());
        let settings = EngineSettings {
            max_input_length: 8,
            ..EngineSettings::default()
        };
        let mut engine = SessionEngine::new(world, settings);
        engine.initialize().unwrap();
        engine.execute("");
        engine.execute("");
        let snapshot = engine.execute("a-very-long-username");
        assert!(snapshot.is_error);
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::LocalUsername));
    }

    #[test]
    fn test_paging_and_clear_forwarded() {
        let mut engine = logged_in("player");
        assert!(engine.execute("read notes.txt").requires_paging);
        assert!(engine.execute("clear").clear_screen);
        let snapshot = engine.execute("pwd");
        assert!(!snapshot.requires_paging);
        assert!(!snapshot.clear_screen);
    }

    #[test]
    fn test_ssh_with_user_and_exit() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("ssh admin@gateway");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::SshPassword));
        assert_eq!(snapshot.prompt, "admin@gateway's password: ");

        let snapshot = engine.execute("admin");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert_eq!(snapshot.hop_depth, 1);
        assert_eq!(snapshot.prompt, "admin@gateway:/$ ");
        assert_eq!(snapshot.device.hostname, "gateway");
        assert_eq!(snapshot.hop_chain[0].username, "p*****");
        assert!(snapshot.motd.unwrap().contains("RouterOS"));

        let snapshot = engine.execute("exit");
        assert_eq!(snapshot.output_text(), vec!["Connection to gateway closed."]);
        assert_eq!(snapshot.hop_depth, 0);
        assert_eq!(snapshot.prompt, "player@kali:/home/player$ ");
    }

    #[test]
    fn test_ssh_username_prompt() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("ssh webserver");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::SshUsername));
        assert_eq!(snapshot.prompt, "login as: ");
        assert_eq!(snapshot.current_path, "/home/player");

        let snapshot = engine.execute("deploy");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::SshPassword));

        let snapshot = engine.execute("summer2019");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert_eq!(snapshot.current_path, "/home/deploy");
    }

    #[test]
    fn test_ssh_wrong_username_and_password() {
        let mut engine = logged_in("player");
        engine.execute("ssh webserver");
        engine.execute("nobody");
        let snapshot = engine.execute("whatever");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::SshUsername));
        assert_eq!(snapshot.error_message.as_deref(), Some(PERMISSION_DENIED_TEXT));

        engine.execute("deploy");
        let snapshot = engine.execute("winter2019");
        assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::SshPassword));
        assert_eq!(snapshot.error_message.as_deref(), Some(PERMISSION_DENIED_TEXT));
    }

    const PERMISSION_DENIED_TEXT: &str = "Permission denied, please try again.";

    #[test]
    fn test_ssh_too_many_failures() {
        let mut engine = logged_in("player");
        engine.execute("ssh deploy@webserver");
        engine.execute("one");
        engine.execute("two");
        let snapshot = engine.execute("three");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert!(snapshot.error_message.unwrap().contains("Too many authentication failures"));
        assert_eq!(snapshot.hop_depth, 0);
    }

    #[test]
    fn test_ssh_abort() {
        let mut engine = logged_in("player");
        engine.execute("ssh webserver");
        let snapshot = engine.execute("abort");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert_eq!(snapshot.prompt, "player@kali:/home/player$ ");

        engine.execute("ssh deploy@webserver");
        let snapshot = engine.execute("abort");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert_eq!(snapshot.hop_depth, 0);
    }

    #[test]
    fn test_ssh_rejections_stay_in_shell() {
        let mut engine = logged_in("player");
        let cases = [
            ("ssh", "usage: ssh [user@]host"),
            ("ssh a b", "usage: ssh [user@]host"),
            ("ssh @gateway", "usage: ssh [user@]host"),
            ("ssh atlantis", "Could not resolve hostname"),
            ("ssh vault", "No route to host"),
            ("ssh printer", "Connection refused"),
            ("ssh kali", "already connected"),
            ("ssh 10.0.0.2", "already connected"),
        ];
        for (line, expected) in cases {
            let snapshot = engine.execute(line);
            assert_eq!(snapshot.phase, Phase::Shell, "{line}");
            assert!(snapshot.is_error, "{line}");
            assert!(
                snapshot.error_message.as_deref().unwrap_or_default().contains(expected),
                "{line}: {:?}",
                snapshot.error_message
            );
        }
    }

    #[test]
    fn test_cyclic_ssh_rejected() {
        let mut engine = logged_in("player");
        engine.execute("ssh deploy@webserver");
        engine.execute("summer2019");
        engine.execute("ssh admin@gateway");
        engine.execute("admin");
        assert_eq!(engine.hop_depth(), 2);

        let snapshot = engine.execute("ssh deploy@webserver");
        assert!(snapshot.error_message.unwrap().contains("hop chain"));
        assert_eq!(snapshot.phase, Phase::Shell);

        engine.execute("ssh webserver");
        let snapshot = engine.execute("deploy");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert!(snapshot.is_error);
        assert_eq!(engine.hop_depth(), 2);
    }

    #[test]
    fn test_exit_at_depth_zero() {
        let mut engine = logged_in("player");
        let snapshot = engine.execute("exit");
        assert_eq!(snapshot.phase, Phase::Shell);
        assert!(snapshot.output_text()[0].contains("already local"));
        assert_eq!(snapshot.hop_depth, 0);
    }

    #[test]
    fn test_debug_mode() {
        let mut engine = logged_in("player");
        engine.set_debug_mode(true);
        let snapshot = engine.execute("pwd");
        assert!(snapshot.debug);
        assert!(snapshot.output.iter().any(|l| l.severity == Severity::Debug));
        assert!(!snapshot.is_error);

        engine.set_debug_mode(false);
        let snapshot = engine.execute("pwd");
        assert!(!snapshot.debug);
        assert_eq!(snapshot.output.len(), 1);
    }

    #[test]
    fn test_initialize_resets() {
        let mut engine = logged_in("player");
        engine.execute("ssh admin@gateway");
        engine.execute("admin");
        let first_id = engine.session_id();
        engine.set_debug_mode(true);

        engine.initialize().unwrap();
        assert_eq!(engine.phase(), Phase::Booting);
        assert_eq!(engine.hop_depth(), 0);
        assert!(engine.session().is_none());
        assert!(!engine.debug_mode());
        assert_ne!(engine.session_id(), first_id);
    }

    #[test]
    fn test_initialize_rejects_bad_settings() {
        let world = Arc::new(World::builtin().unwrap());
        let settings = EngineSettings {
            max_hops: 0,
            ..EngineSettings::default()
        };
        let mut engine = SessionEngine::new(world, settings);
        assert!(matches!(
            engine.initialize(),
            Err(EngineError::InvalidSettings(ConfigError::InvalidMaxHops(0)))
        ));
    }

    #[test]
    fn test_settings_share_config_limits() {
        use crate::config::{AUTH_ATTEMPTS_LIMIT, INPUT_LENGTH_LIMIT};

        let mut config = Config::default();
        config.session.max_auth_attempts = AUTH_ATTEMPTS_LIMIT;
        config.session.max_input_length = INPUT_LENGTH_LIMIT;
        assert!(config.validate().is_ok());
        assert!(EngineSettings::from_config(&config).validate().is_ok());

        config.session.max_auth_attempts = AUTH_ATTEMPTS_LIMIT + 1;
        let expected = Err(ConfigError::InvalidMaxAuthAttempts(AUTH_ATTEMPTS_LIMIT + 1));
        assert_eq!(config.validate(), expected);
        assert_eq!(EngineSettings::from_config(&config).validate(), expected);

        config.session.max_auth_attempts = AUTH_ATTEMPTS_LIMIT;
        config.session.max_input_length = INPUT_LENGTH_LIMIT + 1;
        let expected = Err(ConfigError::InvalidMaxInputLength(INPUT_LENGTH_LIMIT + 1));
        assert_eq!(config.validate(), expected);
        assert_eq!(EngineSettings::from_config(&config).validate(), expected);
    }

    #[test]
    #[should_panic(expected = "before initialize")]
    fn test_execute_before_initialize_panics() {
        let world = Arc::new(World::builtin().unwrap());
        let mut engine = SessionEngine::new(world, EngineSettings::default());
        engine.execute("");
    }

    #[test]
    fn test_load_world_falls_back_to_builtin() {
        let world = load_world(Path::new("/nonexistent/world.json")).unwrap();
        assert_eq!(world.local().hostname(), "kali");
    }
}
