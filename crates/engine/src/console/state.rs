//! Internal engine phases.

use std::sync::Arc;

use protocol::{LoginPrompt, Phase};

use crate::session::SessionState;
use crate::world::Device;

/// Where a login currently stands.
///
/// SSH steps own the session they were started from, so cancelling or
/// failing a login hands it back untouched.
#[derive(Debug, Clone)]
pub enum LoginStep {
    LocalUsername,
    LocalPassword {
        username: String,
    },
    SshUsername {
        session: SessionState,
        target: Arc<Device>,
    },
    SshPassword {
        session: SessionState,
        target: Arc<Device>,
        username: String,
        /// Wrong passwords entered so far for `username`.
        attempts: u32,
    },
}

impl LoginStep {
    pub fn prompt_kind(&self) -> LoginPrompt {
        match self {
            Self::LocalUsername => LoginPrompt::LocalUsername,
            Self::LocalPassword { .. } => LoginPrompt::LocalPassword,
            Self::SshUsername { .. } => LoginPrompt::SshUsername,
            Self::SshPassword { .. } => LoginPrompt::SshPassword,
        }
    }
}

/// The engine's whole mutable state.
#[derive(Debug, Clone)]
pub enum EngineState {
    Booting { banner_shown: bool },
    LoggingIn(LoginStep),
    Shell(SessionState),
}

impl EngineState {
    /// Fresh state after initialization.
    pub fn boot() -> Self {
        Self::Booting {
            banner_shown: false,
        }
    }

    /// Public tag for this state.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Booting { .. } => Phase::Booting,
            Self::LoggingIn(step) => Phase::LoggingIn(step.prompt_kind()),
            Self::Shell(_) => Phase::Shell,
        }
    }

    /// The logged-in session, including one waiting on an SSH login.
    pub fn session(&self) -> Option<&SessionState> {
        match self {
            Self::Shell(session)
            | Self::LoggingIn(LoginStep::SshUsername { session, .. })
            | Self::LoggingIn(LoginStep::SshPassword { session, .. }) => Some(session),
            _ => None,
        }
    }
}
