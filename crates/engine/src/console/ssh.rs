//! The `ssh` and `exit` commands and the remote login steps.

use std::sync::Arc;

use super::render::Reply;
use super::state::{EngineState, LoginStep};
use super::SessionEngine;
use crate::session::SessionState;
use crate::world::{AuthOutcome, Device};

/// Typed at any SSH login prompt to give up.
const ABORT: &str = "abort";

const SSH_USAGE: &str = "usage: ssh [user@]host";
const PERMISSION_DENIED: &str = "Permission denied, please try again.";

/// Split `[user@]host`. `None` when either side is empty or there is more
/// than one `@`.
fn parse_target(arg: &str) -> Option<(Option<&str>, &str)> {
    match arg.split_once('@') {
        None if !arg.is_empty() => Some((None, arg)),
        Some((user, host)) if !user.is_empty() && !host.is_empty() && !host.contains('@') => {
            Some((Some(user), host))
        }
        _ => None,
    }
}

fn cyclic_message(username: &str, target: &Device) -> String {
    format!(
        "ssh: {username}@{}: already part of the current hop chain",
        target.hostname()
    )
}

impl SessionEngine {
    /// Handle `ssh [user@]host` typed at the shell.
    pub(super) fn begin_ssh(
        &self,
        session: SessionState,
        args: &[String],
        reply: &mut Reply,
    ) -> EngineState {
        let [arg] = args else {
            reply.error(SSH_USAGE);
            return EngineState::Shell(session);
        };
        let Some((user, host)) = parse_target(arg) else {
            reply.error(SSH_USAGE);
            return EngineState::Shell(session);
        };

        let Some(target) = self.world.find_device(host).cloned() else {
            reply.error(format!(
                "ssh: Could not resolve hostname {host}: Name or service not known"
            ));
            return EngineState::Shell(session);
        };

        if target.is_same(session.device()) {
            reply.error(format!("ssh: {host}: already connected to this host"));
            return EngineState::Shell(session);
        }
        if !session.network().can_reach(&target) {
            reply.error(format!("ssh: connect to host {host} port 22: No route to host"));
            return EngineState::Shell(session);
        }
        if !target.accepts_ssh() {
            reply.error(format!("ssh: connect to host {host} port 22: Connection refused"));
            return EngineState::Shell(session);
        }

        tracing::debug!(host = %target.hostname(), user = ?user, "SSH target accepted");
        match user {
            Some(username) => {
                if session.hops().contains(target.hostname(), username) {
                    reply.error(cyclic_message(username, &target));
                    return EngineState::Shell(session);
                }
                EngineState::LoggingIn(LoginStep::SshPassword {
                    session,
                    target,
                    username: username.to_string(),
                    attempts: 0,
                })
            }
            None => EngineState::LoggingIn(LoginStep::SshUsername { session, target }),
        }
    }

    /// Username typed at `login as:`.
    pub(super) fn ssh_username(
        &self,
        session: SessionState,
        target: Arc<Device>,
        input: &str,
        reply: &mut Reply,
    ) -> EngineState {
        let username = input.trim();
        if username == ABORT {
            reply.warning("Connection aborted.");
            return EngineState::Shell(session);
        }
        if username.is_empty() {
            return EngineState::LoggingIn(LoginStep::SshUsername { session, target });
        }
        if session.hops().contains(target.hostname(), username) {
            reply.error(cyclic_message(username, &target));
            return EngineState::Shell(session);
        }

        EngineState::LoggingIn(LoginStep::SshPassword {
            session,
            target,
            username: username.to_string(),
            attempts: 0,
        })
    }

    /// Password typed at `user@host's password:`.
    pub(super) fn ssh_password(
        &self,
        session: SessionState,
        target: Arc<Device>,
        username: String,
        attempts: u32,
        input: &str,
        reply: &mut Reply,
    ) -> EngineState {
        if input.trim() == ABORT {
            reply.warning("Connection aborted.");
            return EngineState::Shell(session);
        }

        match target.authenticate(&username, input) {
            AuthOutcome::Accepted => self.hop_in(session, target, username, reply),
            AuthOutcome::UnknownUser => {
                tracing::warn!(host = %target.hostname(), "SSH login rejected");
                reply.error(PERMISSION_DENIED);
                EngineState::LoggingIn(LoginStep::SshUsername { session, target })
            }
            AuthOutcome::WrongPassword => {
                let attempts = attempts + 1;
                tracing::warn!(host = %target.hostname(), attempts, "SSH login rejected");
                if attempts >= self.settings.max_auth_attempts {
                    reply.error(format!(
                        "Received disconnect from {}: Too many authentication failures",
                        target.ip()
                    ));
                    return EngineState::Shell(session);
                }
                reply.error(PERMISSION_DENIED);
                EngineState::LoggingIn(LoginStep::SshPassword {
                    session,
                    target,
                    username,
                    attempts,
                })
            }
        }
    }

    /// Save the current session and log into `target`.
    fn hop_in(
        &self,
        mut session: SessionState,
        target: Arc<Device>,
        username: String,
        reply: &mut Reply,
    ) -> EngineState {
        let Some(network) = self.world.network_for(&target) else {
            reply.error(format!(
                "ssh: connect to host {} port 22: No route to host",
                target.hostname()
            ));
            return EngineState::Shell(session);
        };

        let frame = session.to_frame();
        let mut hops = session.take_hops();
        if let Err(err) = hops.push(frame) {
            reply.error(format!("ssh: {err}"));
            return EngineState::Shell(session);
        }

        let next = SessionState::login(&username, network, hops);
        tracing::info!(
            session_id = %self.session_label(),
            host = %target.hostname(),
            depth = next.hops().depth(),
            "SSH hop established"
        );
        reply.success(format!("Connected to {} ({}).", target.hostname(), target.ip()));
        reply.motd(target.motd());
        EngineState::Shell(next)
    }

    /// Handle `exit` typed at the shell.
    pub(super) fn exit(&self, mut session: SessionState, reply: &mut Reply) -> EngineState {
        if session.hops().is_empty() {
            reply.warning("exit: already local; logout is not available");
            return EngineState::Shell(session);
        }

        let mut hops = session.take_hops();
        let Some(frame) = hops.pop() else {
            return EngineState::Shell(session);
        };
        let left = session.hostname().to_string();
        let restored = SessionState::restore(frame, hops);
        tracing::info!(
            session_id = %self.session_label(),
            host = %left,
            depth = restored.hops().depth(),
            "SSH hop closed"
        );
        reply.info(format!("Connection to {left} closed."));
        EngineState::Shell(restored)
    }
}
