//! # HopShell Engine
//!
//! This crate provides the session engine for HopShell, a simulated UNIX
//! terminal for hacking games.
//!
//! ## Overview
//!
//! A player boots a fake machine, logs in, explores its filesystem and hops
//! from device to device over simulated SSH. The engine provides:
//!
//! - **Virtual Filesystem**: Per-device trees with case-insensitive lookup
//! - **World Loading**: Devices, credentials and networks from JSON
//! - **Session Engine**: Boot, login, shell and SSH hop state machine
//! - **Commands**: `ls`, `cd`, `cat`, `nmap` and friends
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionEngine                          │
//! │        Booting ─▶ LoggingIn ─▶ Shell ◀─▶ SSH login steps     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐  │
//! │  │  SessionState  │  │    Command     │  │     World      │  │
//! │  │  + HopStack    │  │    Registry    │  │ Devices + nets │  │
//! │  └────────────────┘  └────────────────┘  └────────────────┘  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              FileSystem (Arc, read-only)               │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                         RenderSnapshot
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use engine::console::{EngineSettings, SessionEngine};
//! use engine::world::World;
//! use protocol::Phase;
//!
//! let world = Arc::new(World::builtin()?);
//! let mut engine = SessionEngine::new(world, EngineSettings::default());
//! engine.initialize()?;
//!
//! engine.execute("");          // boot banner
//! engine.execute("");          // login prompt
//! engine.execute("player");
//! let snapshot = engine.execute("hunter2");
//!
//! assert_eq!(snapshot.phase, Phase::Shell);
//! assert!(snapshot.prompt.starts_with("player@kali"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`fs`]: Virtual filesystem tree
//! - [`world`]: Devices, networks and world files
//! - [`session`]: Session state and the SSH hop stack
//! - [`commands`]: Shell builtins
//! - [`console`]: The session engine and its shared handle

pub mod commands;
pub mod config;
pub mod console;
pub mod fs;
pub mod session;
pub mod world;

pub use config::Config;
pub use console::{EngineError, EngineSettings, SessionEngine, SharedEngine};
pub use world::World;
