//! StatsD reporting for a benchmark run.

use std::error::Error;
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::panic::RefUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use cadence::prelude::*;
use cadence::{DEFAULT_PORT, MetricError, MetricSink, StatsdClient, UdpMetricSink};

use crate::error::{MatrixError, MatrixResult};

/// Prefix for all metric keys when none is configured.
pub const DEFAULT_PREFIX: &str = "s3b";

/// Counter incremented once per agent to register it with the collector.
pub const AGENT_METRIC: &str = "agent_id";

type ErrorSlot = Arc<Mutex<Option<MetricError>>>;

/// A StatsD client whose transport errors are fatal to the run.
///
/// Errors from metrics sent with [`client`](Self::client) are logged and recorded. The benchmark
/// driver must call [`check`](Self::check) to surface them; once an error has been recorded the
/// collected metrics are no longer trustworthy.
pub struct MetricsReporter {
    client: StatsdClient,
    prefix: String,
    error: ErrorSlot,
}

impl MetricsReporter {
    /// Creates a reporter sending to `host` over UDP.
    ///
    /// `host` is `host:port`; without a port the StatsD default port is used.
    pub fn new(host: &str, prefix: &str) -> MatrixResult<Self> {
        let addr = resolve(host).map_err(MetricError::from)?;
        let local = match addr {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local).map_err(MetricError::from)?;
        socket.set_nonblocking(true).map_err(MetricError::from)?;
        let sink = UdpMetricSink::from(addr, socket)?;
        tracing::debug!(%addr, prefix, "created statsd client");

        Ok(Self::from_sink(sink, prefix))
    }

    /// Creates a reporter writing to an arbitrary sink.
    pub fn from_sink<T>(sink: T, prefix: &str) -> Self
    where
        T: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        let error = ErrorSlot::default();
        let slot = Arc::clone(&error);
        let client = StatsdClient::builder(prefix, sink)
            .with_error_handler(move |err| {
                tracing::error!(error = &err as &dyn Error, "statsd error");
                let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(err);
                }
            })
            .build();

        Self {
            client,
            prefix: prefix.to_owned(),
            error,
        }
    }

    /// Registers this agent with the collector by incrementing [`AGENT_METRIC`].
    pub fn register_agent(&self) -> MatrixResult<()> {
        self.client.incr(AGENT_METRIC)?;
        Ok(())
    }

    /// The underlying client, for reporting benchmark measurements.
    pub fn client(&self) -> &StatsdClient {
        &self.client
    }

    /// The prefix prepended to all metric keys.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the first transport error recorded since the last check, if any.
    pub fn check(&self) -> MatrixResult<()> {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(err) => Err(MatrixError::Metrics(err)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MetricsReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsReporter")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn resolve(host: &str) -> io::Result<SocketAddr> {
    statsd_addr(host)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "statsd host has no address"))
}

/// Appends the default StatsD port to `host` if it does not carry one.
fn statsd_addr(host: &str) -> String {
    if host.parse::<SocketAddr>().is_ok() {
        return host.to_owned();
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_PORT).to_string();
    }

    match host.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => host.to_owned(),
        _ => format!("{host}:{DEFAULT_PORT}"),
    }
}
