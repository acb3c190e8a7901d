//! Running, tool-relevant processes.

use crate::detection::{CommandOutcome, CommandRunner};
use crate::InventoryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Executable base names that mark a process as development tooling.
const RELEVANT_PROCESSES: &[&str] = &[
    "node", "npm", "npx", "pnpm", "yarn", "python", "pip", "php", "php-fpm", "composer", "deno",
    "bun", "ruby", "rails", "java", "uvicorn", "gunicorn", "flask",
];

#[cfg(not(windows))]
const PROCESS_LIST_COMMAND: &str = "ps -eo pid=,pcpu=,pmem=,args=";
#[cfg(windows)]
const PROCESS_LIST_COMMAND: &str = "tasklist /FO CSV /NH";

#[cfg(not(windows))]
const LISTEN_PORTS_COMMAND: &str = "lsof -nP -iTCP -sTCP:LISTEN";
#[cfg(windows)]
const LISTEN_PORTS_COMMAND: &str = "netstat -ano -p TCP";

/// A running development process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub pid: u32,
    /// Executable name, without directories.
    pub name: String,
    /// First TCP port the process listens on, if any.
    pub port: Option<u16>,
    /// Full command line.
    pub command: String,
    /// CPU usage in percent, where the platform reports it.
    pub cpu: Option<f64>,
    /// Memory usage in percent, where the platform reports it.
    pub memory: Option<f64>,
}

/// List running tool-relevant processes with their listening ports.
///
/// Fails only when the process listing itself fails; a failing port lookup
/// just leaves every `port` empty.
pub async fn list_services(
    runner: &dyn CommandRunner,
    timeout: Duration,
) -> Result<Vec<ServiceRecord>, InventoryError> {
    let (processes, ports) = tokio::join!(
        runner.run(PROCESS_LIST_COMMAND, timeout),
        runner.run(LISTEN_PORTS_COMMAND, timeout),
    );

    if !processes.success {
        return Err(InventoryError::command_failed(PROCESS_LIST_COMMAND, &processes));
    }

    let mut services = if cfg!(windows) {
        parse_tasklist_csv(&processes.stdout)
    } else {
        parse_ps_output(&processes.stdout)
    };

    let ports = listening_ports(&ports);
    for service in &mut services {
        service.port = ports.get(&service.pid).copied();
    }

    debug!(count = services.len(), "listed services");
    Ok(services)
}

/// Kill a process. Returns `true` only when the kill command succeeded.
pub async fn kill_service(runner: &dyn CommandRunner, pid: u32, timeout: Duration) -> bool {
    if pid == 0 {
        return false;
    }
    let command = if cfg!(windows) {
        format!("taskkill /PID {pid} /F")
    } else {
        format!("kill -9 {pid}")
    };
    let outcome = runner.run(&command, timeout).await;
    debug!(pid, success = outcome.success, "kill requested");
    outcome.success
}

fn listening_ports(outcome: &CommandOutcome) -> HashMap<u32, u16> {
    // lsof exits 1 when nothing is listening
    if outcome.stdout.is_empty() {
        return HashMap::new();
    }
    if cfg!(windows) {
        parse_netstat_ports(&outcome.stdout)
    } else {
        parse_lsof_ports(&outcome.stdout)
    }
}

fn executable_name(comm: &str) -> &str {
    comm.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(comm)
}

/// Lower-cased name without `.exe` and without a trailing version
/// (`python3.11` -> `python`).
fn base_name(name: &str) -> String {
    let name = name.to_ascii_lowercase();
    let name = name.strip_suffix(".exe").unwrap_or(&name);
    name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.')
        .to_string()
}

fn is_relevant(name: &str) -> bool {
    RELEVANT_PROCESSES.contains(&base_name(name).as_str())
}

/// Split off the next whitespace-delimited field, returning it and the rest.
fn next_field(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    if line.is_empty() {
        return None;
    }
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    Some(line.split_at(end))
}

fn port_of(address: &str) -> Option<u16> {
    address.rsplit_once(':')?.1.parse().ok()
}

/// Parse `ps -eo pid=,pcpu=,pmem=,args=` output, keeping relevant
/// processes only.
///
/// The name comes from the first word of the command line, so processes
/// that retitle themselves (`npm run dev`) keep their whole command.
pub(crate) fn parse_ps_output(output: &str) -> Vec<ServiceRecord> {
    output.lines().filter_map(parse_ps_line).collect()
}

fn parse_ps_line(line: &str) -> Option<ServiceRecord> {
    let (pid, rest) = next_field(line)?;
    let pid: u32 = pid.parse().ok()?;
    let (cpu, rest) = next_field(rest)?;
    let (memory, rest) = next_field(rest)?;
    let command = rest.trim();
    let (program, _) = next_field(command)?;

    // php-fpm retitles itself to `php-fpm: master process`
    let name = executable_name(program).trim_end_matches(':');
    if !is_relevant(name) {
        return None;
    }

    Some(ServiceRecord {
        pid,
        name: name.to_string(),
        port: None,
        command: command.to_string(),
        cpu: cpu.parse().ok(),
        memory: memory.parse().ok(),
    })
}

/// Parse `tasklist /FO CSV /NH` output, keeping relevant processes only.
pub(crate) fn parse_tasklist_csv(output: &str) -> Vec<ServiceRecord> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim().strip_prefix('"')?.strip_suffix('"')?;
            let mut fields = line.split("\",\"");
            let name = fields.next()?;
            let pid: u32 = fields.next()?.parse().ok()?;
            is_relevant(name).then(|| ServiceRecord {
                pid,
                name: name.to_string(),
                port: None,
                command: name.to_string(),
                cpu: None,
                memory: None,
            })
        })
        .collect()
}

/// Map pid to its first listening port from `lsof -nP -iTCP -sTCP:LISTEN`.
pub(crate) fn parse_lsof_ports(output: &str) -> HashMap<u32, u16> {
    let mut ports = HashMap::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(pid) = fields.get(1).and_then(|p| p.parse::<u32>().ok()) else {
            continue;
        };
        if let Some(port) = fields.iter().rev().find_map(|f| port_of(f)) {
            ports.entry(pid).or_insert(port);
        }
    }
    ports
}

/// Map pid to its first listening port from `netstat -ano -p TCP`.
pub(crate) fn parse_netstat_ports(output: &str) -> HashMap<u32, u16> {
    let mut ports = HashMap::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[3] != "LISTENING" {
            continue;
        }
        if let (Some(port), Ok(pid)) = (port_of(fields[1]), fields[4].parse::<u32>()) {
            ports.entry(pid).or_insert(port);
        }
    }
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const PS_OUTPUT: &str = "    1  0.0  0.1 /sbin/init splash
  812  1.5  2.3 node /home/u/app/server.js --port 3000
  905  0.0  0.4 /usr/bin/python3 -m http.server 8000
 1001 12.0  5.1 php-fpm: master process (/etc/php/8.2/fpm/php-fpm.conf)
 1200  0.3  0.2 -bash
";

    const LSOF_OUTPUT: &str = "COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
node      812 u      23u  IPv6 123456      0t0  TCP *:3000 (LISTEN)
node      812 u      24u  IPv6 123457      0t0  TCP *:9229 (LISTEN)
python3   905 u      3u   IPv4 123458      0t0  TCP 127.0.0.1:8000 (LISTEN)
";

    #[test]
    fn test_parse_ps_filters_relevant() {
        let services = parse_ps_output(PS_OUTPUT);
        let pids: Vec<_> = services.iter().map(|s| s.pid).collect();
        assert_eq!(pids, vec![812, 905, 1001]);

        assert_eq!(services[0].name, "node");
        assert_eq!(services[0].command, "node /home/u/app/server.js --port 3000");
        assert_eq!(services[0].cpu, Some(1.5));
        assert_eq!(services[0].memory, Some(2.3));
        assert_eq!(services[1].name, "python3");
        assert_eq!(services[1].command, "/usr/bin/python3 -m http.server 8000");
        assert_eq!(services[2].name, "php-fpm");
    }

    #[test]
    fn test_parse_ps_retitled_process() {
        let services = parse_ps_output("  812  1.5  2.3 npm run dev\n");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "npm");
        assert_eq!(services[0].command, "npm run dev");
        assert_eq!(services[0].cpu, Some(1.5));
        assert_eq!(services[0].memory, Some(2.3));
    }

    #[test]
    fn test_parse_ps_ignores_lookalike_names() {
        let output = " 1500  0.4  0.6 /usr/bin/pipewire
 1501  0.2  0.9 /usr/bin/pipewire-pulse
 1502 40.0  0.1 bunzip2 -k archive.tar.bz2
 1503  0.0  0.1 /usr/bin/nodejs-helper --daemon
";
        assert!(parse_ps_output(output).is_empty());
    }

    #[test]
    fn test_parse_ps_skips_garbage() {
        assert!(parse_ps_output("PID %CPU\nnot a line\n\n").is_empty());
    }

    #[test]
    fn test_parse_lsof_first_port_wins() {
        let ports = parse_lsof_ports(LSOF_OUTPUT);
        assert_eq!(ports.get(&812), Some(&3000));
        assert_eq!(ports.get(&905), Some(&8000));
        assert_eq!(ports.len(), 2);
    }

    #[test]
    fn test_parse_netstat() {
        let output = "
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1040
  TCP    127.0.0.1:5173         0.0.0.0:0              LISTENING       4242
  TCP    10.0.0.2:50211         1.2.3.4:443            ESTABLISHED     4242
";
        let ports = parse_netstat_ports(output);
        assert_eq!(ports.get(&4242), Some(&5173));
        assert_eq!(ports.get(&1040), Some(&135));
    }

    #[test]
    fn test_parse_tasklist() {
        let output = "\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"
\"node.exe\",\"4242\",\"Console\",\"1\",\"45,120 K\"
\"python.exe\",\"5000\",\"Console\",\"1\",\"12,000 K\"
\"explorer.exe\",\"6000\",\"Console\",\"1\",\"99,000 K\"
";
        let services = parse_tasklist_csv(output);
        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["node.exe", "python.exe"]);
        assert!(services[0].cpu.is_none());
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant("node"));
        assert!(is_relevant("Python3.11"));
        assert!(is_relevant("NODE.EXE"));
        assert!(is_relevant("pip3"));
        assert!(is_relevant("php-fpm8.2"));
        assert!(!is_relevant("systemd"));
        assert!(!is_relevant("pipewire"));
        assert!(!is_relevant("pipewire-pulse"));
        assert!(!is_relevant("bunzip2"));
        assert!(!is_relevant("javac"));
        assert!(!is_relevant("12345"));
    }

    struct FixedRunner {
        processes: CommandOutcome,
        ports: CommandOutcome,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, command_line: &str, _timeout: Duration) -> CommandOutcome {
            self.calls.lock().unwrap().push(command_line.to_string());
            if command_line == PROCESS_LIST_COMMAND {
                self.processes.clone()
            } else if command_line == LISTEN_PORTS_COMMAND {
                self.ports.clone()
            } else if command_line.contains("4242") {
                CommandOutcome::ok("")
            } else {
                CommandOutcome::failure("no such process")
            }
        }

        async fn tool_path(&self, _command: &str) -> Option<PathBuf> {
            None
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_services_attaches_ports() {
        let runner = FixedRunner {
            processes: CommandOutcome::ok(PS_OUTPUT),
            ports: CommandOutcome::ok(LSOF_OUTPUT),
            calls: Mutex::new(Vec::new()),
        };
        let services = list_services(&runner, Duration::from_secs(1)).await.unwrap();
        assert_eq!(services[0].port, Some(3000));
        assert_eq!(services[1].port, Some(8000));
        assert_eq!(services[2].port, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_services_without_lsof() {
        let runner = FixedRunner {
            processes: CommandOutcome::ok(PS_OUTPUT),
            ports: CommandOutcome::failure("lsof: not found"),
            calls: Mutex::new(Vec::new()),
        };
        let services = list_services(&runner, Duration::from_secs(1)).await.unwrap();
        assert_eq!(services.len(), 3);
        assert!(services.iter().all(|s| s.port.is_none()));
    }

    #[tokio::test]
    async fn test_list_services_fails_when_listing_fails() {
        let runner = FixedRunner {
            processes: CommandOutcome::failure("ps: not found"),
            ports: CommandOutcome::ok(""),
            calls: Mutex::new(Vec::new()),
        };
        let result = list_services(&runner, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(InventoryError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn test_kill_service() {
        let runner = FixedRunner {
            processes: CommandOutcome::ok(""),
            ports: CommandOutcome::ok(""),
            calls: Mutex::new(Vec::new()),
        };
        assert!(kill_service(&runner, 4242, Duration::from_secs(1)).await);
        assert!(!kill_service(&runner, 7, Duration::from_secs(1)).await);
        assert!(!kill_service(&runner, 0, Duration::from_secs(1)).await);
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }
}
