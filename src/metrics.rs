// Prometheus metrics for the netprobe service
//
// Exposes metrics on the /metrics HTTP endpoint:
// - Scans and probes by outcome (counters)
// - Scan and command durations (histograms)
// - Open ports found (counter)
// - Guarded commands by outcome (counter)

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Scanner metrics
    pub static ref SCANS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("scans_total", "Total number of port scans by status"),
        &["status"]
    ).expect("Failed to create scans total metric");

    pub static ref SCAN_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("scan_duration_seconds", "Port scan duration in seconds"),
    ).expect("Failed to create scan duration metric");

    pub static ref PROBES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("probes_total", "Total number of TCP probes by outcome"),
        &["outcome"]
    ).expect("Failed to create probes total metric");

    pub static ref OPEN_PORTS_FOUND_TOTAL: IntCounter = IntCounter::new(
        "open_ports_found_total",
        "Total number of open ports reported by completed scans"
    ).expect("Failed to create open ports metric");

    // Command guard metrics
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("commands_total", "Total number of guarded commands by outcome"),
        &["outcome"]
    ).expect("Failed to create commands total metric");

    pub static ref COMMAND_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("command_duration_seconds", "Guarded command duration in seconds"),
    ).expect("Failed to create command duration metric");
}

/// Register all metrics - must be called once at server startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(SCANS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SCAN_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(PROBES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPEN_PORTS_FOUND_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMANDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMAND_DURATION_SECONDS.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
