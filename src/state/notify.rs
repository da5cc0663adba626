//! Readiness notification towards the service manager

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Environment variable systemd uses to hand out its notification socket
pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

const READY_MESSAGE: &[u8] = b"READY=1";

/// Tells the init system that the cluster is usable
pub trait ReadinessNotifier: Send + Sync + fmt::Debug {
    fn notify_ready(&self) -> io::Result<()>;
}

/// Notifier for environments without a service manager
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn notify_ready(&self) -> io::Result<()> {
        Ok(())
    }
}

/// sd_notify(3) style notifier sending `READY=1` to `$NOTIFY_SOCKET`
///
/// When no socket is configured, notifying is a successful no-op. Socket paths
/// starting with `@` address the Linux abstract namespace.
#[derive(Clone, Debug, Default)]
pub struct SystemdNotifier {
    socket: Option<PathBuf>,
}

impl SystemdNotifier {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    /// Build a notifier from `$NOTIFY_SOCKET`
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var_os(NOTIFY_SOCKET_ENV)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn socket(&self) -> Option<&PathBuf> {
        self.socket.as_ref()
    }
}

impl ReadinessNotifier for SystemdNotifier {
    fn notify_ready(&self) -> io::Result<()> {
        match &self.socket {
            Some(path) => send_datagram(path, READY_MESSAGE),
            None => Ok(()),
        }
    }
}

#[cfg(unix)]
fn send_datagram(path: &std::path::Path, message: &[u8]) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::net::UnixDatagram;

    let socket = UnixDatagram::unbound()?;
    let raw = path.as_os_str().as_bytes();

    if let Some(name) = raw.strip_prefix(b"@") {
        return send_abstract(&socket, name, message);
    }

    socket.send_to(message, path)?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn send_abstract(
    socket: &std::os::unix::net::UnixDatagram,
    name: &[u8],
    message: &[u8],
) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name)?;
    socket.send_to_addr(message, &addr)?;
    Ok(())
}

#[cfg(all(unix, not(target_os = "linux")))]
fn send_abstract(
    _socket: &std::os::unix::net::UnixDatagram,
    _name: &[u8],
    _message: &[u8],
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract notification sockets are only available on Linux",
    ))
}

#[cfg(not(unix))]
fn send_datagram(_path: &std::path::Path, _message: &[u8]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "service manager notification requires unix sockets",
    ))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixDatagram;

    use super::*;

    #[test]
    fn test_sends_ready_to_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.sock");
        let listener = UnixDatagram::bind(&path).unwrap();

        SystemdNotifier::new(&path).notify_ready().unwrap();

        let mut buf = [0u8; 64];
        let n = listener.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1");
    }

    #[test]
    fn test_without_socket_is_noop() {
        let notifier = SystemdNotifier::default();
        assert!(notifier.socket().is_none());
        assert!(notifier.notify_ready().is_ok());
    }

    #[test]
    fn test_missing_socket_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = SystemdNotifier::new(dir.path().join("absent.sock"));
        assert!(notifier.notify_ready().is_err());
    }
}
