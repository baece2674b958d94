// Host-side view of exposed ports: mapping lookup and reachability polling

use crate::clock::Clock;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Per-attempt connect timeout when probing a port
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Parse the output of `compose port`, e.g. "0.0.0.0:49153" or "[::]:49153".
/// Compose may print one line per address family; the last mapping wins.
pub fn parse_port_output(output: &str) -> Option<u16> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.rsplit_once(':'))
        .filter_map(|(_, port)| port.parse::<u16>().ok())
        .filter(|port| *port != 0)
        .last()
}

/// Host on which published container ports are reachable.
/// A tcp:// DOCKER_HOST points at a remote daemon; everything else is local.
pub fn docker_host() -> String {
    docker_host_from(std::env::var("DOCKER_HOST").ok().as_deref())
}

pub fn docker_host_from(docker_host: Option<&str>) -> String {
    docker_host
        .and_then(|value| value.strip_prefix("tcp://"))
        .and_then(|rest| {
            let authority = rest.split('/').next().unwrap_or(rest);
            let host = match authority.strip_prefix('[') {
                Some(bracketed) => bracketed.split(']').next().unwrap_or(bracketed),
                None => authority
                    .rsplit_once(':')
                    .map_or(authority, |(host, _port)| host),
            };
            (!host.is_empty()).then(|| host.to_string())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// True if a TCP connection to host:port can be opened
pub fn tcp_reachable(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };

    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}

/// Wait until host:port accepts TCP connections or `timeout` elapses
pub fn wait_for_tcp(
    clock: &dyn Clock,
    host: &str,
    port: u16,
    timeout: Duration,
    poll: Duration,
) -> bool {
    wait_until(clock, timeout, poll, || tcp_reachable(host, port))
}

/// Poll `check` every `poll` until it returns true or `timeout` elapses.
/// The check always runs at least once.
pub fn wait_until<F>(clock: &dyn Clock, timeout: Duration, poll: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = clock.now();

    loop {
        if check() {
            return true;
        }

        let elapsed = clock.elapsed_since(start);
        if elapsed >= timeout {
            return false;
        }

        clock.sleep(poll.min(timeout - elapsed));
    }
}
