//! Port Probe Engine
//!
//! Concurrent TCP connect scanning with a per-scan bounded worker pool.
//! Every scan creates its own semaphore and `JoinSet`, dispatches one probe
//! per port, waits for all of them and tears the pool down again. Nothing is
//! shared between scans apart from the connector.

use super::connector::{Connector, TcpConnector};
use super::error::ScanError;
use super::ports::PortSet;
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default per-port connect budget
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of simultaneous probes
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Host to scan (hostname or literal IP address)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget(String);

impl ScanTarget {
    /// Create a target, rejecting empty or whitespace-only hosts
    pub fn new(host: impl Into<String>) -> Result<Self, ScanError> {
        let host = host.into();
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(ScanError::InvalidInput("target host is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ScanTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Result of a single connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The remote end accepted the connection
    Open,
    /// Refused, timed out, unreachable or otherwise failed
    Closed,
}

impl ProbeOutcome {
    fn label(self) -> &'static str {
        match self {
            ProbeOutcome::Open => "open",
            ProbeOutcome::Closed => "closed",
        }
    }
}

impl From<&io::Result<()>> for ProbeOutcome {
    fn from(result: &io::Result<()>) -> Self {
        match result {
            Ok(()) => ProbeOutcome::Open,
            Err(_) => ProbeOutcome::Closed,
        }
    }
}

/// Outcome of one scan invocation
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    target: ScanTarget,
    open_ports: Vec<u16>,
    ports_scanned: usize,
    started_at: DateTime<Utc>,
    duration_ms: f64,
}

impl ScanResult {
    pub fn target(&self) -> &ScanTarget {
        &self.target
    }

    /// Open ports, strictly ascending
    pub fn open_ports(&self) -> &[u16] {
        &self.open_ports
    }

    /// Number of ports probed
    pub fn ports_scanned(&self) -> usize {
        self.ports_scanned
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }
}

/// Tuning knobs for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Budget for each connection attempt
    pub timeout_per_port: Duration,

    /// Upper bound on simultaneous connection attempts
    pub max_concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout_per_port: DEFAULT_PROBE_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ScanOptions {
    pub fn new(timeout_per_port: Duration, max_concurrency: usize) -> Self {
        Self {
            timeout_per_port,
            max_concurrency,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.timeout_per_port.is_zero() {
            return Err(ScanError::InvalidInput(
                "per-port timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ScanError::InvalidInput(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Concurrent TCP port prober
#[derive(Debug)]
pub struct PortProbeEngine<C = TcpConnector> {
    connector: Arc<C>,
    options: ScanOptions,
}

impl<C> Clone for PortProbeEngine<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            options: self.options,
        }
    }
}

impl Default for PortProbeEngine<TcpConnector> {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl PortProbeEngine<TcpConnector> {
    /// Engine that probes real TCP sockets
    pub fn new(options: ScanOptions) -> Self {
        Self::with_connector(Arc::new(TcpConnector), options)
    }
}

impl<C: Connector> PortProbeEngine<C> {
    /// Engine with a custom connector
    pub fn with_connector(connector: Arc<C>, options: ScanOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Probe every port in `ports` and report which ones accepted a connection
    ///
    /// Only invalid input fails the scan. Per-port failures of any kind count
    /// as closed.
    pub async fn scan(&self, target: &ScanTarget, ports: &PortSet) -> Result<ScanResult, ScanError> {
        self.scan_until(target, ports, CancellationToken::new()).await
    }

    /// Like [`scan`](Self::scan), but tears the worker pool down as soon as
    /// `cancel` fires
    ///
    /// In-flight probes are aborted, which closes their sockets, and
    /// `ScanError::Cancelled` is returned instead of a partial result.
    pub async fn scan_until(
        &self,
        target: &ScanTarget,
        ports: &PortSet,
        cancel: CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        self.options.validate()?;
        if ports.is_empty() {
            return Err(ScanError::InvalidInput("port set is empty".to_string()));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let total = ports.len();

        info!(
            target = %target,
            ports = total,
            max_concurrency = self.options.max_concurrency,
            timeout_ms = self.options.timeout_per_port.as_millis() as u64,
            "starting port scan"
        );

        let host: Arc<str> = Arc::from(target.as_str());
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
        let mut workers: JoinSet<(usize, ProbeOutcome)> = JoinSet::new();
        let mut slots: Vec<Option<ProbeOutcome>> = vec![None; total];

        for (slot, port) in ports.iter().enumerate() {
            // Acquire before spawning so no more than `max_concurrency`
            // probe tasks exist at any time.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.tear_down(workers, &slots, target, total).await);
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Err(self.tear_down(workers, &slots, target, total).await),
                },
            };

            // Drain whatever already finished so slots fill in as we go.
            while let Some(joined) = workers.try_join_next() {
                record(&mut slots, joined);
            }

            let connector = Arc::clone(&self.connector);
            let host = Arc::clone(&host);
            let timeout = self.options.timeout_per_port;

            workers.spawn(async move {
                let outcome = probe(connector.as_ref(), &host, port, timeout).await;
                drop(permit);
                (slot, outcome)
            });
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.tear_down(workers, &slots, target, total).await);
                }
                joined = workers.join_next() => match joined {
                    Some(joined) => record(&mut slots, joined),
                    None => break,
                },
            }
        }

        let open_ports: Vec<u16> = ports
            .iter()
            .zip(slots.iter())
            .filter(|(_, outcome)| matches!(outcome, Some(ProbeOutcome::Open)))
            .map(|(port, _)| port)
            .collect();

        let duration = start.elapsed();
        metrics::SCANS_TOTAL.with_label_values(&["completed"]).inc();
        metrics::SCAN_DURATION_SECONDS.observe(duration.as_secs_f64());
        metrics::OPEN_PORTS_FOUND_TOTAL.inc_by(open_ports.len() as u64);

        info!(
            target = %target,
            open = open_ports.len(),
            scanned = total,
            duration_ms = duration.as_millis() as u64,
            "port scan complete"
        );

        Ok(ScanResult {
            target: target.clone(),
            open_ports,
            ports_scanned: total,
            started_at,
            duration_ms: duration.as_secs_f64() * 1000.0,
        })
    }

    async fn tear_down(
        &self,
        mut workers: JoinSet<(usize, ProbeOutcome)>,
        slots: &[Option<ProbeOutcome>],
        target: &ScanTarget,
        total: usize,
    ) -> ScanError {
        workers.abort_all();
        let mut completed = slots.iter().filter(|s| s.is_some()).count();
        while let Some(joined) = workers.join_next().await {
            if joined.is_ok() {
                completed += 1;
            }
        }

        metrics::SCANS_TOTAL.with_label_values(&["cancelled"]).inc();
        warn!(target = %target, completed, total, "port scan cancelled");

        ScanError::Cancelled {
            target: target.to_string(),
            completed,
            total,
        }
    }
}

/// One bounded connection attempt
///
/// The budget is enforced here as well as handed to the connector, so a
/// connector that ignores it still cannot hold a worker past `timeout`.
async fn probe<C: Connector>(connector: &C, host: &str, port: u16, timeout: Duration) -> ProbeOutcome {
    let result = match tokio::time::timeout(timeout, connector.connect(host, port, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "probe exceeded per-port timeout")),
    };
    let outcome = ProbeOutcome::from(&result);
    match &result {
        Ok(()) => debug!(host, port, "port open"),
        Err(e) => debug!(host, port, error = %e, "port closed"),
    }
    metrics::PROBES_TOTAL.with_label_values(&[outcome.label()]).inc();
    outcome
}

fn record(
    slots: &mut [Option<ProbeOutcome>],
    joined: Result<(usize, ProbeOutcome), tokio::task::JoinError>,
) {
    match joined {
        Ok((slot, outcome)) => slots[slot] = Some(outcome),
        // A panicking probe is still just a port that did not answer.
        Err(e) => warn!(error = %e, "probe task failed"),
    }
}
