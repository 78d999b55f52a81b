//! Connectivity checks used to decide whether fetch and push are worth trying.

use crate::config::NetworkSettings;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const SCP_DEFAULT_PORT: u16 = 22;

/// Where a remote lives, as far as connectivity is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// Reached over the network at `host:port`.
    Host { host: String, port: u16 },
    /// A path on the local filesystem; always reachable.
    Local,
}

impl RemoteTarget {
    fn host(host: &str, port: u16) -> Self {
        RemoteTarget::Host {
            host: host.to_string(),
            port,
        }
    }
}

/// Something that can tell whether `host:port` accepts connections.
pub trait Probe {
    fn reachable(&self, host: &str, port: u16) -> bool;
}

/// Probe that opens, then immediately drops, a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for TcpProbe {
    fn reachable(&self, host: &str, port: u16) -> bool {
        let addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!("Could not resolve {}:{}: {}", host, port, e);
                return false;
            }
        };

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return true,
                Err(e) => tracing::debug!("Connection to {} failed: {}", addr, e),
            }
        }
        false
    }
}

/// Whether the remote for an entry can be reached right now.
pub fn remote_reachable<P: Probe + ?Sized>(
    probe: &P,
    remote: Option<&str>,
    defaults: &NetworkSettings,
) -> bool {
    match resolve_target(remote, defaults) {
        RemoteTarget::Local => true,
        RemoteTarget::Host { host, port } => probe.reachable(&host, port),
    }
}

/// Derive the connectivity target for a remote URL, falling back to the
/// configured default when the remote is absent or unparsable.
pub fn resolve_target(remote: Option<&str>, defaults: &NetworkSettings) -> RemoteTarget {
    let fallback = || RemoteTarget::host(&defaults.host, defaults.port);

    let Some(remote) = remote.map(str::trim).filter(|r| !r.is_empty()) else {
        return fallback();
    };

    if remote.starts_with("file://") || is_local_path(remote) {
        return RemoteTarget::Local;
    }

    if let Some((scheme, rest)) = remote.split_once("://") {
        return parse_url_authority(scheme, rest, defaults.port).unwrap_or_else(fallback);
    }

    parse_scp_like(remote).unwrap_or_else(fallback)
}

/// Absolute, explicitly relative (`./`, `../`, `~/`), or already present on
/// disk. Checked before the scp-like form so `../a:b` stays a path.
fn is_local_path(remote: &str) -> bool {
    const PREFIXES: [&str; 4] = ["/", "./", "../", "~/"];
    PREFIXES.iter().any(|prefix| remote.starts_with(prefix))
        || remote == "."
        || remote == ".."
        || Path::new(remote).exists()
}

/// `scheme://[user@]host[:port]/path`
fn parse_url_authority(scheme: &str, rest: &str, default_port: u16) -> Option<RemoteTarget> {
    let authority = rest.split('/').next()?;
    let host_port = authority.rsplit('@').next()?;

    // Bracketed IPv6 literal, e.g. [::1]:2222
    if let Some(stripped) = host_port.strip_prefix('[') {
        let (host, after) = stripped.split_once(']')?;
        let port = match after.strip_prefix(':') {
            Some(port) => port.parse().ok()?,
            None => scheme_port(scheme).unwrap_or(default_port),
        };
        return non_empty_host(host, port);
    }

    match host_port.split_once(':') {
        Some((host, port)) => non_empty_host(host, port.parse().ok()?),
        None => non_empty_host(host_port, scheme_port(scheme).unwrap_or(default_port)),
    }
}

/// `[user@]host:path`, the scp-like syntax git accepts for SSH.
fn parse_scp_like(remote: &str) -> Option<RemoteTarget> {
    let (before_colon, path) = remote.split_once(':')?;
    if path.is_empty() || before_colon.contains('/') {
        return None;
    }
    let host = before_colon.rsplit('@').next()?;
    non_empty_host(host, SCP_DEFAULT_PORT)
}

fn non_empty_host(host: &str, port: u16) -> Option<RemoteTarget> {
    if host.is_empty() {
        None
    } else {
        Some(RemoteTarget::host(host, port))
    }
}

fn scheme_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "ssh" | "git+ssh" | "ssh+git" => Some(22),
        "git" => Some(9418),
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn defaults() -> NetworkSettings {
        NetworkSettings {
            host: "fallback.example".to_string(),
            port: 8443,
        }
    }

    #[rstest]
    #[case("git@github.com:user/repo.git", "github.com", 22)]
    #[case("github.com:user/repo.git", "github.com", 22)]
    #[case("ssh://git@example.org:2222/srv/repo.git", "example.org", 2222)]
    #[case("ssh://example.org/srv/repo.git", "example.org", 22)]
    #[case("https://gitlab.com/group/repo.git", "gitlab.com", 443)]
    #[case("http://user@intranet:8080/repo", "intranet", 8080)]
    #[case("git://mirror.local/repo", "mirror.local", 9418)]
    #[case("ssh://[::1]:2200/repo", "::1", 2200)]
    #[case("custom://host.example/repo", "host.example", 8443)]
    fn test_resolve_target_hosts(#[case] remote: &str, #[case] host: &str, #[case] port: u16) {
        assert_eq!(
            resolve_target(Some(remote), &defaults()),
            RemoteTarget::Host {
                host: host.to_string(),
                port
            }
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("not a url"))]
    #[case(Some("https:///nohost"))]
    #[case(Some("ssh://host:notaport/repo"))]
    #[case(Some("relative/path/repo.git"))]
    fn test_resolve_target_falls_back(#[case] remote: Option<&str>) {
        assert_eq!(
            resolve_target(remote, &defaults()),
            RemoteTarget::Host {
                host: "fallback.example".to_string(),
                port: 8443
            }
        );
    }

    #[rstest]
    #[case("/srv/git/notes.git")]
    #[case("file:///srv/git/notes.git")]
    #[case("../backup.git")]
    #[case("./mirror")]
    #[case("../odd:name.git")]
    #[case("~/git/notes.git")]
    #[case("..")]
    fn test_resolve_target_local(#[case] remote: &str) {
        assert_eq!(resolve_target(Some(remote), &defaults()), RemoteTarget::Local);
    }

    #[test]
    fn test_existing_relative_directory_is_local() {
        let cwd = std::env::current_dir().unwrap();
        let temp = tempfile::TempDir::new_in(&cwd).unwrap();
        let name = temp.path().file_name().unwrap().to_str().unwrap().to_string();

        assert_eq!(resolve_target(Some(&name), &defaults()), RemoteTarget::Local);
        assert!(remote_reachable(&Unreachable, Some(&name), &defaults()));
    }

    #[test]
    fn test_relative_sibling_remote_is_reachable_offline() {
        assert!(remote_reachable(
            &Unreachable,
            Some("../backup.git"),
            &defaults()
        ));
    }

    struct Unreachable;

    impl Probe for Unreachable {
        fn reachable(&self, _host: &str, _port: u16) -> bool {
            false
        }
    }

    #[test]
    fn test_local_remote_skips_probe() {
        assert!(remote_reachable(
            &Unreachable,
            Some("/srv/git/notes.git"),
            &defaults()
        ));
        assert!(!remote_reachable(
            &Unreachable,
            Some("git@github.com:user/repo.git"),
            &defaults()
        ));
    }

    #[test]
    fn test_tcp_probe_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new(Duration::from_millis(500));
        assert!(probe.reachable("127.0.0.1", port));

        drop(listener);
        assert!(!probe.reachable("127.0.0.1", port));
    }

    #[test]
    fn test_tcp_probe_unresolvable_host() {
        let probe = TcpProbe::new(Duration::from_millis(200));
        assert!(!probe.reachable("host.invalid", 443));
    }

    proptest! {
        #[test]
        fn resolve_target_never_yields_empty_host(remote in ".{0,64}") {
            if let RemoteTarget::Host { host, .. } = resolve_target(Some(&remote), &defaults()) {
                prop_assert!(!host.is_empty());
            }
        }
    }
}
