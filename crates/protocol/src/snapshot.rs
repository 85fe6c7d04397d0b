//! Render snapshot definitions for HopShell.
//!
//! A [`RenderSnapshot`] is the complete, self-sufficient response the session
//! engine returns after every input line. Presentation layers (console, GUI)
//! render it without keeping any state of their own.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Severity attached to every output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Ordinary command output.
    #[default]
    Info,
    /// Positive confirmation (login, connection established).
    Success,
    /// Something worth noticing that did not fail.
    Warning,
    /// A recoverable failure.
    Error,
    /// Diagnostic line emitted only in debug mode.
    Debug,
}

/// One line of rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Line text without trailing newline.
    pub text: String,
    /// How the line should be styled.
    pub severity: Severity,
}

impl OutputLine {
    /// Create a line with an explicit severity.
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Success)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Warning)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Error)
    }

    pub fn debug(text: impl Into<String>) -> Self {
        Self::new(text, Severity::Debug)
    }

    /// Returns true if this line reports a failure.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Which credential field a login prompt is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPrompt {
    /// Local console username.
    LocalUsername,
    /// Local console password.
    LocalPassword,
    /// Username for a remote device.
    SshUsername,
    /// Password for a remote device.
    SshPassword,
}

impl LoginPrompt {
    /// Returns true if the input for this prompt must be masked.
    pub fn is_password(self) -> bool {
        matches!(self, Self::LocalPassword | Self::SshPassword)
    }

    /// Returns true if this prompt belongs to an SSH login.
    pub fn is_remote(self) -> bool {
        matches!(self, Self::SshUsername | Self::SshPassword)
    }
}

/// Top-level engine mode as seen by a presentation layer.
///
/// The login prompt lives inside the `LoggingIn` variant so that a snapshot
/// can never claim to be in the shell and at a password prompt at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "prompt", rename_all = "snake_case")]
pub enum Phase {
    Booting,
    LoggingIn(LoginPrompt),
    Shell,
}

impl Phase {
    /// The active login prompt, if any.
    pub fn login_prompt(self) -> Option<LoginPrompt> {
        match self {
            Self::LoggingIn(prompt) => Some(prompt),
            _ => None,
        }
    }

    /// Returns true if the caller should mask the next input line.
    pub fn masks_input(self) -> bool {
        self.login_prompt().is_some_and(LoginPrompt::is_password)
    }
}

/// Redacted view of one saved hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopView {
    /// Username with everything after the first character masked.
    pub username: String,
    /// Hostname of the saved device.
    pub hostname: String,
}

/// Network interface of the active device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: String,
    pub netmask: String,
}

/// Snapshot of the device the session is currently on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfo {
    pub hostname: String,
    pub ip: String,
    pub interfaces: Vec<InterfaceInfo>,
    pub open_ports: Vec<u16>,
}

/// Complete render state returned by every engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Snapshot format version.
    pub version: u8,
    /// Current engine phase.
    pub phase: Phase,
    /// Boot banner lines (only populated while booting).
    pub boot_lines: Vec<String>,
    /// Prompt to display before the next input.
    pub prompt: String,
    /// Output produced by the last input, in order.
    pub output: Vec<OutputLine>,
    /// Working directory of the active session (empty before login).
    pub current_path: String,
    /// Names in the working directory, directories first.
    pub directory_listing: Vec<String>,
    /// Number of saved hops.
    pub hop_depth: usize,
    /// Saved hops from oldest to newest.
    pub hop_chain: Vec<HopView>,
    /// Whether the last input failed.
    pub is_error: bool,
    /// First error message of the last input.
    pub error_message: Option<String>,
    /// Message of the day shown after a successful login or hop.
    pub motd: Option<String>,
    /// Device the session is on (the local machine before login).
    pub device: DeviceInfo,
    /// Output should be shown through a pager.
    pub requires_paging: bool,
    /// Presentation layer should clear its scrollback first.
    pub clear_screen: bool,
    /// Debug mode is active.
    pub debug: bool,
}

impl RenderSnapshot {
    /// Create an empty snapshot for the given phase.
    pub fn new(phase: Phase) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            phase,
            boot_lines: Vec::new(),
            prompt: String::new(),
            output: Vec::new(),
            current_path: String::new(),
            directory_listing: Vec::new(),
            hop_depth: 0,
            hop_chain: Vec::new(),
            is_error: false,
            error_message: None,
            motd: None,
            device: DeviceInfo::default(),
            requires_paging: false,
            clear_screen: false,
            debug: false,
        }
    }

    /// Append output lines, updating the error flag and message.
    pub fn extend_output(&mut self, lines: impl IntoIterator<Item = OutputLine>) {
        for line in lines {
            if line.is_error() {
                self.is_error = true;
                if self.error_message.is_none() {
                    self.error_message = Some(line.text.clone());
                }
            }
            self.output.push(line);
        }
    }

    /// Plain text of all output lines, for logging and tests.
    pub fn output_text(&self) -> Vec<&str> {
        self.output.iter().map(|line| line.text.as_str()).collect()
    }

    /// Serialize the snapshot to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize the snapshot to MessagePack bytes.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize a snapshot from MessagePack bytes.
    ///
    /// Snapshots written by a different format version are rejected.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = rmp_serde::from_slice(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ProtocolError::UnsupportedVersion {
                expected: SNAPSHOT_VERSION,
                got: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}
