//! A local StatsD collector for asserting on emitted metrics.
//!
//! ```
//! use s3bench_test::statsd::TestCollector;
//!
//! let collector = TestCollector::new();
//! let host = collector.addr().to_string();
//! // point the metrics client at `host`, emit, then:
//! assert!(collector.received().is_empty());
//! ```

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// How long [`TestCollector::received`] waits for the next datagram before giving up.
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// A UDP socket on localhost that collects StatsD lines.
#[derive(Debug)]
pub struct TestCollector {
    socket: UdpSocket,
}

impl TestCollector {
    /// Binds a new collector to a random free port on localhost.
    pub fn new() -> Self {
        let socket = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
        socket.set_read_timeout(Some(RECV_TIMEOUT)).unwrap();
        Self { socket }
    }

    /// The address metrics clients should send to.
    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Drains all lines received so far.
    ///
    /// Datagrams may carry several newline-separated metrics; each one is returned as a separate
    /// line. Returns once no datagram arrives within a short timeout.
    pub fn received(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut buf = [0; 65536];

        while let Ok(len) = self.socket.recv(&mut buf) {
            let datagram = String::from_utf8_lossy(&buf[..len]);
            lines.extend(
                datagram
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned),
            );
        }

        lines
    }
}

impl Default for TestCollector {
    fn default() -> Self {
        Self::new()
    }
}
