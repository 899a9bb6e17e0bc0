use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::state::ConnectionState;

/// Receive buffer size requested from the kernel by default: 256 KiB.
pub const DEFAULT_RECV_BUFFER: usize = 256 * 1024;

/// Socket options applied while establishing a connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Disable Nagle's algorithm on the connected socket.
    pub nodelay: bool,
    /// Requested `SO_RCVBUF` size in bytes. `None` keeps the kernel default.
    pub recv_buffer_size: Option<usize>,
    /// Read timeout for blocking receives. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            nodelay: true,
            recv_buffer_size: Some(DEFAULT_RECV_BUFFER),
            read_timeout: None,
        }
    }
}

/// Blocking TCP client for one digitizer stream.
///
/// Tracks the [`ConnectionState`] machine; once a terminal state is reached
/// the client refuses further receives and the run is over.
pub struct TcpClient {
    stream: Option<TcpStream>,
    state: ConnectionState,
}

impl TcpClient {
    /// Create an unconnected client.
    pub fn new() -> Self {
        Self {
            stream: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Connect to `host:port` and apply socket options.
    ///
    /// Socket tuning failures (`TCP_NODELAY`, `SO_RCVBUF`) are logged and
    /// ignored; the connection is still usable without them.
    pub fn connect(&mut self, host: &str, port: u16, options: &ConnectOptions) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(TransportError::InvalidState(
                self.state,
                ConnectionState::Disconnected,
            ));
        }

        self.state = ConnectionState::Connecting;
        debug!(host, port, "connecting");

        let stream = match TcpStream::connect((host, port)) {
            Ok(stream) => stream,
            Err(source) => {
                self.state = ConnectionState::IoError;
                return Err(TransportError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                });
            }
        };

        if options.nodelay {
            if let Err(err) = stream.set_nodelay(true) {
                warn!(%err, "failed to set TCP_NODELAY");
            }
        }
        if let Some(bytes) = options.recv_buffer_size {
            if let Err(err) = set_recv_buffer(&stream, bytes) {
                warn!(%err, bytes, "failed to set receive buffer size");
            }
        }
        stream.set_read_timeout(options.read_timeout)?;

        info!(host, port, "connected");
        self.stream = Some(stream);
        self.state = ConnectionState::Streaming;
        Ok(())
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns true while bytes can still be received.
    pub fn is_streaming(&self) -> bool {
        self.state == ConnectionState::Streaming
    }

    /// Receive up to `buf.len()` bytes (blocking).
    ///
    /// `Ok(0)` means the peer performed an orderly close; the state moves to
    /// `ClosedByPeer`. I/O errors move the state to `IoError`. Interrupted
    /// reads are retried.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// Receive exactly `buf.len()` bytes or fail.
    ///
    /// Loops the basic receive until the buffer is filled. A peer close or
    /// I/O error before that is a hard failure.
    pub fn receive_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let expected = buf.len();
        let mut filled = 0usize;
        while filled < expected {
            match self.receive(&mut buf[filled..])? {
                0 => {
                    return Err(TransportError::ClosedMidRead {
                        received: filled,
                        expected,
                    })
                }
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Set the read timeout on the connected socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.stream {
            Some(stream) => {
                stream.set_read_timeout(timeout)?;
                Ok(())
            }
            None => Err(TransportError::InvalidState(
                self.state,
                ConnectionState::Streaming,
            )),
        }
    }

    /// Request local shutdown: mark the terminal state and close the socket.
    ///
    /// No-op if the connection already reached a terminal state.
    pub fn shutdown(&mut self) {
        if self.state == ConnectionState::Streaming {
            if let Some(stream) = &self.stream {
                let _ = stream.shutdown(Shutdown::Both);
            }
            info!("connection shut down locally");
            self.state = ConnectionState::Shutdown;
        }
    }
}

impl Default for TcpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for TcpClient {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.state != ConnectionState::Streaming {
            return Err(std::io::Error::new(
                ErrorKind::NotConnected,
                format!("connection is {}", self.state),
            ));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "no socket"))?;

        match stream.read(buf) {
            Ok(0) => {
                info!("connection closed by peer");
                self.state = ConnectionState::ClosedByPeer;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::Interrupted => Err(err),
            Err(err) => {
                self.state = ConnectionState::IoError;
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for TcpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClient")
            .field("state", &self.state)
            .finish()
    }
}

/// Ask the kernel for a larger socket receive buffer.
#[cfg(unix)]
fn set_recv_buffer(stream: &TcpStream, bytes: usize) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let value = bytes as libc::c_int;
    // SAFETY: `value` is a valid readable pointer for the provided size, and
    // `fd` is an open socket descriptor owned by this process.
    let rc = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            (&value as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_recv_buffer(_stream: &TcpStream, _bytes: usize) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use super::*;

    fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn connect_receive_close() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(b"hello").unwrap();
        });

        let mut client = TcpClient::new();
        client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Streaming);

        let mut buf = [0u8; 16];
        let mut total = 0;
        loop {
            let n = client.receive(&mut buf[total..]).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(&buf[..total], b"hello");
        assert_eq!(client.state(), ConnectionState::ClosedByPeer);

        server.join().unwrap();
    }

    #[test]
    fn receive_exact_fills_buffer_across_chunks() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            // Two separate writes force the client to loop.
            peer.write_all(b"abcd").unwrap();
            peer.flush().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            peer.write_all(b"efgh").unwrap();
        });

        let mut client = TcpClient::new();
        client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap();

        let mut buf = [0u8; 8];
        client.receive_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abcdefgh");

        server.join().unwrap();
    }

    #[test]
    fn receive_exact_fails_on_peer_close() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(b"abc").unwrap();
            // Dropping the stream closes the connection mid-read.
        });

        let mut client = TcpClient::new();
        client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap();

        let mut buf = [0u8; 8];
        let err = client.receive_exact(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ClosedMidRead {
                received: 3,
                expected: 8
            }
        ));
        assert_eq!(client.state(), ConnectionState::ClosedByPeer);

        server.join().unwrap();
    }

    #[test]
    fn connect_refused_is_terminal() {
        let (listener, port) = local_listener();
        drop(listener);

        let mut client = TcpClient::new();
        let err = client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(client.state(), ConnectionState::IoError);
    }

    #[test]
    fn receive_after_terminal_state_rejected() {
        let mut client = TcpClient::new();
        let mut buf = [0u8; 4];
        let err = client.receive(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == ErrorKind::NotConnected));
    }

    #[test]
    fn connect_twice_rejected() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let _peer = listener.accept().unwrap();
        });

        let mut client = TcpClient::new();
        client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap();
        let err = client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidState(..)));

        server.join().unwrap();
    }

    #[test]
    fn shutdown_marks_terminal_state() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let _peer = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(20));
        });

        let mut client = TcpClient::new();
        client
            .connect("127.0.0.1", port, &ConnectOptions::default())
            .unwrap();
        client.shutdown();
        assert_eq!(client.state(), ConnectionState::Shutdown);

        // Idempotent.
        client.shutdown();
        assert_eq!(client.state(), ConnectionState::Shutdown);

        server.join().unwrap();
    }

    #[test]
    fn read_timeout_applies() {
        let (listener, port) = local_listener();

        let server = std::thread::spawn(move || {
            let (_peer, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(200));
        });

        let options = ConnectOptions {
            read_timeout: Some(Duration::from_millis(20)),
            ..ConnectOptions::default()
        };
        let mut client = TcpClient::new();
        client.connect("127.0.0.1", port, &options).unwrap();

        let mut buf = [0u8; 4];
        let err = client.receive(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Io(e)
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut
        ));

        server.join().unwrap();
    }
}
