//! Network builtins: `ifconfig`, `ping`, `nmap`.
//!
//! Nothing here touches a real network. Targets are looked up in the
//! session's [`NetworkContext`](crate::world::NetworkContext) and timings
//! are random.

use std::net::IpAddr;
use std::sync::Arc;

use protocol::OutputLine;
use rand::Rng;

use super::{Command, CommandEnv, CommandResult};
use crate::session::SessionState;
use crate::world::Device;

/// Number of echo requests `ping` sends.
const PING_COUNT: usize = 4;

/// Well-known service names for `nmap` output.
fn service_name(port: u16) -> &'static str {
    match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "domain",
        80 => "http",
        110 => "pop3",
        139 => "netbios-ssn",
        143 => "imap",
        443 => "https",
        445 => "microsoft-ds",
        3306 => "mysql",
        3389 => "ms-wbt-server",
        5432 => "postgresql",
        6379 => "redis",
        8080 => "http-proxy",
        9100 => "jetdirect",
        _ => "unknown",
    }
}

/// Resolve `target` to the current device or one of its neighbors.
fn lookup<'a>(session: &'a SessionState, target: &str) -> Option<&'a Arc<Device>> {
    if session.device().matches(target) {
        return Some(session.device());
    }
    session.network().find_neighbor(target)
}

/// Show the active device's interfaces.
pub struct Ifconfig;

impl Command for Ifconfig {
    fn name(&self) -> &'static str {
        "ifconfig"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ipconfig"]
    }

    fn summary(&self) -> &'static str {
        "Show network interfaces"
    }

    fn usage(&self) -> &'static str {
        "ifconfig"
    }

    fn execute(
        &self,
        session: &SessionState,
        _args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        let device = session.device();
        if device.interfaces().is_empty() {
            return CommandResult::lines([format!("eth0: inet {}", device.ip())]);
        }

        let mut lines = Vec::new();
        for iface in device.interfaces() {
            let flags = if iface.ip.is_loopback() {
                "flags=73<UP,LOOPBACK,RUNNING>"
            } else {
                "flags=4163<UP,BROADCAST,RUNNING,MULTICAST>"
            };
            lines.push(OutputLine::success(format!("{}: {flags}", iface.name)));
            lines.push(OutputLine::info(format!(
                "        inet {}  netmask {}",
                iface.ip, iface.netmask
            )));
            lines.push(OutputLine::info(""));
        }
        lines.pop();
        CommandResult::styled(lines)
    }
}

/// Send simulated echo requests.
pub struct Ping;

impl Command for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn summary(&self) -> &'static str {
        "Check whether a host is reachable"
    }

    fn usage(&self) -> &'static str {
        "ping <host>"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        let [target] = args else {
            return CommandResult::error(format!("usage: {}", self.usage()));
        };

        let Some(device) = lookup(session, target) else {
            return match target.parse::<IpAddr>() {
                Ok(_) => CommandResult::error(format!(
                    "From {} icmp_seq=1 Destination Host Unreachable",
                    session.device().ip()
                )),
                Err(_) => {
                    CommandResult::error(format!("ping: {target}: Name or service not known"))
                }
            };
        };

        let mut rng = rand::thread_rng();
        let local = session.device().is_same(device);
        let times: Vec<f64> = (0..PING_COUNT)
            .map(|_| {
                if local {
                    rng.gen_range(0.02..0.09)
                } else {
                    rng.gen_range(0.3..4.5)
                }
            })
            .collect();

        let mut lines = vec![OutputLine::info(format!(
            "PING {} ({}) 56(84) bytes of data.",
            device.hostname(),
            device.ip()
        ))];
        for (seq, time) in times.iter().enumerate() {
            lines.push(OutputLine::info(format!(
                "64 bytes from {}: icmp_seq={} ttl=64 time={time:.2} ms",
                device.ip(),
                seq + 1
            )));
        }

        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(0.0, f64::max);
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        lines.push(OutputLine::info(""));
        lines.push(OutputLine::info(format!(
            "--- {} ping statistics ---",
            device.hostname()
        )));
        lines.push(OutputLine::success(format!(
            "{PING_COUNT} packets transmitted, {PING_COUNT} received, 0% packet loss"
        )));
        lines.push(OutputLine::info(format!(
            "rtt min/avg/max = {min:.3}/{avg:.3}/{max:.3} ms"
        )));
        CommandResult::styled(lines)
    }
}

/// List a host's open ports.
pub struct Nmap;

impl Command for Nmap {
    fn name(&self) -> &'static str {
        "nmap"
    }

    fn summary(&self) -> &'static str {
        "Scan a host for open ports"
    }

    fn usage(&self) -> &'static str {
        "nmap <host>"
    }

    fn execute(
        &self,
        session: &SessionState,
        args: &[String],
        _env: &CommandEnv<'_>,
    ) -> CommandResult {
        let [target] = args else {
            return CommandResult::error(format!("usage: {}", self.usage()));
        };

        let Some(device) = lookup(session, target) else {
            return CommandResult::error(format!(
                "Failed to resolve \"{target}\". Note: Host seems down."
            ));
        };

        let mut rng = rand::thread_rng();
        let latency: f64 = rng.gen_range(0.0003..0.004);
        let elapsed: f64 = rng.gen_range(0.8..3.5);

        let mut lines = vec![
            OutputLine::info("Starting Nmap 7.94 ( https://nmap.org )"),
            OutputLine::info(format!(
                "Nmap scan report for {} ({})",
                device.hostname(),
                device.ip()
            )),
            OutputLine::info(format!("Host is up ({latency:.4}s latency).")),
        ];

        let mut ports = device.ports().to_vec();
        ports.sort_unstable();
        if ports.is_empty() {
            lines.push(OutputLine::warning(format!(
                "All 1000 scanned ports on {} are closed",
                device.hostname()
            )));
        } else {
            lines.push(OutputLine::info("PORT      STATE SERVICE"));
            for port in ports {
                lines.push(OutputLine::success(format!(
                    "{:<9} open  {}",
                    format!("{port}/tcp"),
                    service_name(port)
                )));
            }
        }

        lines.push(OutputLine::info(""));
        lines.push(OutputLine::info(format!(
            "Nmap done: 1 IP address (1 host up) scanned in {elapsed:.2} seconds"
        )));
        CommandResult::styled(lines)
    }
}
