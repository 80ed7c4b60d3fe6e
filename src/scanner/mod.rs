//! Port Scanning Subsystem
//!
//! TCP connect probing of a fixed port set against one host.
//!
//! # Architecture
//!
//! - `ports.rs`: validated, deduplicated port sets and well-known service names
//! - `connector.rs`: the socket seam (`Connector`) and its tokio implementation
//! - `engine.rs`: the bounded, per-scan worker pool that dispatches probes
//! - `error.rs`: scan-level errors
//!
//! # Example
//!
//! ```no_run
//! use netprobe::scanner::{PortProbeEngine, PortSet, ScanOptions, ScanTarget};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = PortProbeEngine::new(ScanOptions::default());
//!     let target = ScanTarget::new("scanme.example.org")?;
//!
//!     let result = engine.scan(&target, &PortSet::common()).await?;
//!     println!("open: {:?}", result.open_ports());
//!
//!     Ok(())
//! }
//! ```

mod connector;
mod engine;
mod error;
mod ports;

pub use connector::{Connector, TcpConnector};
pub use engine::{
    PortProbeEngine, ProbeOutcome, ScanOptions, ScanResult, ScanTarget, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_PROBE_TIMEOUT,
};
pub use error::ScanError;
pub use ports::{service_name, PortSet, DEFAULT_PORTS};
