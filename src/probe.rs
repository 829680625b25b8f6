//! TCP port reachability probe.
//!
//! Attempts a direct connection instead of shelling out to `nc`, so the
//! probe works on hosts without network utilities installed.

use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::execution::CommandResult;

/// Default connection budget for a probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default destination when none is given.
pub const DEFAULT_PROBE_HOST: &str = "localhost";

/// Classification of a probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortStatus {
    /// A TCP connection was established.
    Reachable(SocketAddr),
    /// Every address actively refused the connection.
    Refused,
    /// The budget ran out before any address answered.
    TimedOut,
    /// The host name did not resolve to any address.
    Unresolved(String),
    /// Some other network error (unreachable network, permission, ...).
    Unreachable(String),
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reachable(addr) => write!(f, "connected to {}", addr),
            Self::Refused => write!(f, "connection refused"),
            Self::TimedOut => write!(f, "connection timed out"),
            Self::Unresolved(reason) => write!(f, "could not resolve host: {}", reason),
            Self::Unreachable(reason) => write!(f, "unreachable: {}", reason),
        }
    }
}

/// Outcome of probing one `host:port`.
#[derive(Debug, Clone)]
pub struct PortProbe {
    pub host: String,
    pub port: u16,
    pub status: PortStatus,
    pub elapsed: Duration,
}

impl PortProbe {
    pub fn is_reachable(&self) -> bool {
        matches!(self.status, PortStatus::Reachable(_))
    }

    /// Report the probe in the executor's result shape.
    ///
    /// Exit code 0 means reachable, 1 means anything else.
    pub fn into_command_result(self) -> CommandResult {
        let command = format!("connect {}:{}", self.host, self.port);
        if self.is_reachable() {
            let stdout = format!("{}:{} is open ({})\n", self.host, self.port, self.status);
            CommandResult::exited(command, 0, stdout, String::new(), self.elapsed)
        } else {
            let stderr = format!("{}:{} is not reachable: {}\n", self.host, self.port, self.status);
            CommandResult::exited(command, 1, String::new(), stderr, self.elapsed)
        }
    }
}

/// Probe `host:port`, spending at most `timeout` on connection attempts.
///
/// Name resolution uses the system resolver and is not covered by the
/// budget.
pub fn check_port(host: &str, port: u16, timeout: Duration) -> PortProbe {
    let start = Instant::now();
    let status = probe(host, port, timeout, start);
    debug!(host, port, status = %status, "port probe finished");

    PortProbe {
        host: host.to_string(),
        port,
        status,
        elapsed: start.elapsed(),
    }
}

/// [`check_port`] on tokio's blocking pool.
pub async fn check_port_async(host: String, port: u16, timeout: Duration) -> PortProbe {
    let fallback_host = host.clone();
    match tokio::task::spawn_blocking(move || check_port(&host, port, timeout)).await {
        Ok(probe) => probe,
        Err(e) => PortProbe {
            host: fallback_host,
            port,
            status: PortStatus::Unreachable(e.to_string()),
            elapsed: Duration::ZERO,
        },
    }
}

fn probe(host: &str, port: u16, timeout: Duration, start: Instant) -> PortStatus {
    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(e) => return PortStatus::Unresolved(e.to_string()),
    };
    if addrs.is_empty() {
        return PortStatus::Unresolved(format!("no addresses for {}", host));
    }

    let deadline = start.checked_add(timeout);
    let mut refused = 0usize;
    let mut timed_out = false;
    let mut other_error = None;

    for (i, addr) in addrs.iter().enumerate() {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => timeout,
        };
        if remaining.is_zero() {
            timed_out = true;
            break;
        }
        // Split what is left evenly across the addresses not yet tried.
        let attempt = (remaining / (addrs.len() - i) as u32).max(Duration::from_millis(1));

        match TcpStream::connect_timeout(addr, attempt) {
            Ok(_) => return PortStatus::Reachable(*addr),
            Err(e) => match e.kind() {
                ErrorKind::ConnectionRefused => refused += 1,
                ErrorKind::TimedOut | ErrorKind::WouldBlock => timed_out = true,
                _ => other_error = Some(e.to_string()),
            },
        }
    }

    if refused == addrs.len() {
        PortStatus::Refused
    } else if timed_out {
        PortStatus::TimedOut
    } else if let Some(reason) = other_error {
        PortStatus::Unreachable(reason)
    } else {
        PortStatus::Refused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> u16 {
        // Bind then drop to get a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_open_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = check_port("127.0.0.1", port, Duration::from_secs(2));
        assert!(probe.is_reachable());

        let result = probe.into_command_result();
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout_trimmed().contains("is open"));
    }

    #[test]
    fn test_closed_port_is_refused_quickly() {
        let port = closed_port();
        let start = Instant::now();
        let probe = check_port("127.0.0.1", port, DEFAULT_PROBE_TIMEOUT);

        assert!(start.elapsed() <= DEFAULT_PROBE_TIMEOUT);
        assert_eq!(probe.status, PortStatus::Refused);

        let result = probe.into_command_result();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("refused"));
        assert_eq!(result.command, format!("connect 127.0.0.1:{}", port));
    }

    #[test]
    fn test_unresolvable_host() {
        let probe = check_port("no-such-host.invalid", 80, Duration::from_secs(2));
        assert!(matches!(probe.status, PortStatus::Unresolved(_)));
        assert_eq!(probe.into_command_result().exit_code, 1);
    }

    #[test]
    fn test_exhausted_budget_is_timed_out() {
        let port = closed_port();
        let probe = check_port("127.0.0.1", port, Duration::ZERO);
        assert_eq!(probe.status, PortStatus::TimedOut);

        let result = probe.into_command_result();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("connection timed out"));
    }

    #[test]
    fn test_silent_host_stays_within_budget() {
        // Reserved address that drops SYNs, or has no route at all.
        let budget = Duration::from_millis(300);
        let start = Instant::now();
        let probe = check_port("10.255.255.1", 9, budget);

        assert!(start.elapsed() <= budget + Duration::from_secs(1), "took {:?}", start.elapsed());
        assert!(!probe.is_reachable());
        assert!(matches!(
            probe.status,
            PortStatus::TimedOut | PortStatus::Unreachable(_)
        ));
        assert_eq!(probe.into_command_result().exit_code, 1);
    }

    #[test]
    fn test_huge_budget_does_not_overflow() {
        let port = closed_port();
        let probe = check_port("127.0.0.1", port, Duration::from_secs(u64::MAX));
        assert_eq!(probe.status, PortStatus::Refused);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PortStatus::Refused.to_string(), "connection refused");
        assert_eq!(PortStatus::TimedOut.to_string(), "connection timed out");
    }

    #[tokio::test]
    async fn test_check_port_async() {
        let port = closed_port();
        let probe = check_port_async("127.0.0.1".into(), port, Duration::from_secs(2)).await;
        assert!(!probe.is_reachable());
    }
}
