//! End-to-end integration tests for HopShell.
//!
//! These tests drive complete flows through the public API:
//! - Boot and local login
//! - Filesystem navigation from the shell
//! - SSH hops, exits and the hop limit
//! - Configuration and world files on disk
//! - Shared access from several threads

use std::fs;
use std::sync::Arc;
use std::thread;

use engine::config::Config;
use engine::console::{EngineSettings, SessionEngine, SharedEngine};
use engine::world::World;
use protocol::{LoginPrompt, Phase, RenderSnapshot, Severity};
use tempfile::TempDir;

/// Engine over the built-in world, initialized.
fn create_engine() -> SessionEngine {
    let world = Arc::new(World::builtin().unwrap());
    let mut engine = SessionEngine::new(world, EngineSettings::default());
    engine.initialize().unwrap();
    engine
}

/// Boot and log in locally.
fn login(engine: &mut SessionEngine, username: &str, password: &str) -> RenderSnapshot {
    engine.execute("");
    engine.execute("");
    engine.execute(username);
    engine.execute(password)
}

/// A world where every device can reach every other one.
fn flat_world(count: usize) -> String {
    let device = |i: usize| {
        format!(
            r#"{{
                "hostname": "h{i}",
                "ip": "10.1.0.{}",
                "credentials": [{{"username": "u", "password": "p"}}],
                "filesystem": "shared",
                "ports": [22],
                "motd": "host {i}",
                "interfaces": [{{"name": "eth0", "ip": "10.1.0.{}", "network": "lan"}}]
            }}"#,
            i + 1,
            i + 1
        )
    };
    let devices: Vec<String> = (1..count).map(device).collect();
    format!(
        r#"{{
            "local": {},
            "devices": [{}],
            "filesystems": {{"shared": {{"children": {{"home": {{"children": {{}}}}}}}}}}
        }}"#,
        device(0),
        devices.join(",")
    )
}

// =============================================================================
// Boot and Login Tests
// =============================================================================

#[test]
fn test_boot_then_username_prompt() {
    let mut engine = create_engine();

    let snapshot = engine.execute("");
    assert_eq!(snapshot.phase, Phase::Booting);
    assert!(!snapshot.boot_lines.is_empty());

    let snapshot = engine.execute("");
    assert_eq!(snapshot.phase, Phase::LoggingIn(LoginPrompt::LocalUsername));
}

#[test]
fn test_login_reaches_shell() {
    let mut engine = create_engine();
    let snapshot = login(&mut engine, "alice", "hunter2");

    assert_eq!(snapshot.phase, Phase::Shell);
    assert!(snapshot.prompt.starts_with("alice@"));
    assert_eq!(snapshot.current_path, "/");
    assert_eq!(snapshot.device.hostname, "kali");
}

#[test]
fn test_every_snapshot_is_complete() {
    let mut engine = create_engine();
    let inputs = ["", "", "player", "pw", "ls", "ssh admin@gateway", "admin", "exit"];
    for input in inputs {
        let snapshot = engine.execute(input);
        assert!(!snapshot.device.hostname.is_empty(), "{input:?}");
        assert_eq!(snapshot.hop_chain.len(), snapshot.hop_depth, "{input:?}");
        assert_eq!(snapshot.is_error, snapshot.error_message.is_some(), "{input:?}");
        let decoded = RenderSnapshot::from_msgpack(&snapshot.to_msgpack().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
    }
}

#[test]
fn test_initialize_twice_is_idempotent() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");
    engine.execute("ssh admin@gateway");
    engine.execute("admin");

    engine.initialize().unwrap();
    let first = engine.session_id();
    engine.initialize().unwrap();
    assert_ne!(engine.session_id(), first);
    assert_eq!(engine.phase(), Phase::Booting);
    assert_eq!(engine.hop_depth(), 0);

    let snapshot = engine.execute("");
    assert_eq!(snapshot.phase, Phase::Booting);
    assert!(!snapshot.boot_lines.is_empty());
}

// =============================================================================
// Filesystem Tests
// =============================================================================

#[test]
fn test_cat_executable_is_refused() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    let snapshot = engine.execute("cat /usr/bin/nmap");
    assert!(snapshot.is_error);
    assert_eq!(snapshot.output.len(), 1);
    assert_eq!(snapshot.output[0].severity, Severity::Error);
    assert!(!snapshot.output_text().contains(&"ELF"));
}

#[test]
fn test_cd_parent_from_root_ten_times() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");
    engine.execute("cd /");

    for _ in 0..10 {
        let snapshot = engine.execute("cd ..");
        assert!(!snapshot.is_error);
        assert_eq!(snapshot.current_path, "/");
    }
}

#[test]
fn test_case_insensitive_navigation() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    let snapshot = engine.execute("CD /HOME/Player");
    assert_eq!(snapshot.current_path, "/home/player");

    let snapshot = engine.execute("cat NOTES.txt");
    assert!(!snapshot.is_error);
    assert!(snapshot.output_text()[0].starts_with("Target"));
}

#[test]
fn test_listing_follows_directory() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    let snapshot = engine.execute("cd /");
    assert_eq!(snapshot.directory_listing, vec!["etc", "home", "tmp", "usr"]);
}

// =============================================================================
// SSH Tests
// =============================================================================

#[test]
fn test_self_ssh_rejected_before_prompt() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    let snapshot = engine.execute("ssh kali");
    assert_eq!(snapshot.phase, Phase::Shell);
    assert!(snapshot.is_error);

    let snapshot = engine.execute("ssh player@kali");
    assert_eq!(snapshot.phase, Phase::Shell);
    assert!(snapshot.is_error);
}

#[test]
fn test_multi_hop_chain_and_unwind() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    engine.execute("ssh deploy@webserver");
    engine.execute("summer2019");
    engine.execute("cd /var/www");

    engine.execute("ssh fileserver");
    engine.execute("root");
    let snapshot = engine.execute("correcthorse");
    assert_eq!(snapshot.hop_depth, 2);
    assert_eq!(snapshot.prompt, "root@fileserver:/root# ");

    engine.execute("ssh root@vault");
    let snapshot = engine.execute("0xDEADBEEF");
    assert_eq!(snapshot.hop_depth, 3);
    let snapshot = engine.execute("cat flag.txt");
    assert_eq!(snapshot.output_text(), vec!["FLAG{hop_hop_hooray}"]);

    engine.execute("exit");
    let snapshot = engine.execute("exit");
    assert_eq!(snapshot.hop_depth, 1);
    assert_eq!(snapshot.current_path, "/var/www");
    assert_eq!(snapshot.prompt, "deploy@webserver:/var/www$ ");

    let snapshot = engine.execute("exit");
    assert_eq!(snapshot.hop_depth, 0);
    assert_eq!(snapshot.current_path, "/home/player");
}

#[test]
fn test_exit_at_depth_zero_reports_already_local() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");

    let snapshot = engine.execute("exit");
    assert_eq!(snapshot.phase, Phase::Shell);
    assert!(snapshot.output_text()[0].contains("already local"));
    assert_eq!(snapshot.hop_depth, 0);
}

#[test]
fn test_hop_overflow_resets_stack() {
    let world = Arc::new(World::from_json(&flat_world(12)).unwrap());
    let mut engine = SessionEngine::new(world, EngineSettings::default());
    engine.initialize().unwrap();
    login(&mut engine, "u", "p");

    for i in 1..=10 {
        engine.execute(&format!("ssh u@h{i}"));
        let snapshot = engine.execute("p");
        assert_eq!(snapshot.hop_depth, i);
        assert!(!snapshot.is_error);
    }

    engine.execute("ssh u@h11");
    let snapshot = engine.execute("p");
    assert!(snapshot.is_error);
    assert!(snapshot.error_message.unwrap().contains("hop limit"));
    assert_eq!(snapshot.hop_depth, 0);
    assert_eq!(snapshot.phase, Phase::Shell);
    assert_eq!(snapshot.device.hostname, "h10");

    let snapshot = engine.execute("exit");
    assert!(snapshot.output_text()[0].contains("already local"));
}

#[test]
fn test_hop_chain_is_redacted() {
    let mut engine = create_engine();
    login(&mut engine, "player", "pw");
    engine.execute("ssh admin@gateway");
    let snapshot = engine.execute("admin");

    assert_eq!(snapshot.hop_chain.len(), 1);
    assert_eq!(snapshot.hop_chain[0].hostname, "kali");
    assert_eq!(snapshot.hop_chain[0].username, "p*****");
    let json = snapshot.to_json().unwrap();
    assert!(!json.contains("\"player\""));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_engine_from_config_with_world_file() {
    let temp_dir = TempDir::new().unwrap();
    let world_path = temp_dir.path().join("world.json");
    fs::write(&world_path, flat_world(3)).unwrap();

    let mut config = Config::default();
    config.engine.world_file = world_path;
    config.session.max_hops = 1;

    let mut engine = SessionEngine::from_config(&config).unwrap();
    engine.initialize().unwrap();
    let snapshot = login(&mut engine, "u", "p");
    assert_eq!(snapshot.device.hostname, "h0");

    engine.execute("ssh u@h1");
    assert_eq!(engine.execute("p").hop_depth, 1);

    engine.execute("ssh u@h2");
    let snapshot = engine.execute("p");
    assert!(snapshot.is_error);
    assert_eq!(snapshot.hop_depth, 0);
}

#[test]
fn test_engine_from_config_rejects_invalid_world() {
    let temp_dir = TempDir::new().unwrap();
    let world_path = temp_dir.path().join("world.json");
    let world = r#"{
        "local": {"hostname": "h", "ip": "10.0.0.1", "filesystem": "missing"},
        "filesystems": {}
    }"#;
    fs::write(&world_path, world).unwrap();

    let mut config = Config::default();
    config.engine.world_file = world_path;

    let result = SessionEngine::from_config(&config);
    assert!(result.is_err());
    let err = format!("{:#}", result.err().unwrap());
    assert!(err.contains("Failed to parse world file"));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_shared_engine_serializes_callers() {
    let engine = SharedEngine::new(create_engine());
    engine.execute("");
    engine.execute("");
    engine.execute("player");
    engine.execute("pw");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let snapshot = engine.execute("pwd");
                    assert_eq!(snapshot.phase, Phase::Shell);
                    assert_eq!(snapshot.output_text(), vec!["/home/player"]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.hop_depth(), 0);
}

#[test]
fn test_shared_engine_hops_from_threads() {
    let engine = SharedEngine::new(create_engine());
    engine.execute("");
    engine.execute("");
    engine.execute("player");
    engine.execute("pw");

    let worker = engine.clone();
    thread::spawn(move || {
        worker.execute("ssh admin@gateway");
        worker.execute("admin");
    })
    .join()
    .unwrap();

    assert_eq!(engine.hop_depth(), 1);
    let snapshot = engine.execute("whoami");
    assert_eq!(snapshot.output_text(), vec!["admin"]);
}
