// Netprobe - Main Entry Point
//
// Command line front end for the network diagnostics service:
// - HTTP API server
// - One-shot port scans, IP lookups and DNS queries
// - Allowlisted command execution

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netprobe::catalog;
use netprobe::config::Config;
use netprobe::dns::DnsResolver;
use netprobe::logging;
use netprobe::scanner::{service_name, PortProbeEngine, PortSet, ScanTarget};
use netprobe::server;
use netprobe::tools::{CommandError, CommandGuard};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Netprobe: network diagnostics over a small JSON API
#[derive(Parser, Debug)]
#[command(name = "netprobe")]
#[command(author = "Netprobe Contributors")]
#[command(version)]
#[command(about = "Port scanning, IP lookup, DNS and allowlisted diagnostics", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (default: ~/.config/netprobe/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Scan a host for open TCP ports
    Scan {
        /// Hostname or IP address
        host: String,

        /// Comma separated ports, e.g. 22,80,443 (default: configured set)
        #[arg(long, conflicts_with = "extended")]
        ports: Option<String>,

        /// Probe the extended well-known port list
        #[arg(long)]
        extended: bool,

        /// Per-port connect timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum simultaneous connection attempts
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Look up metadata for an IP address
    Lookup {
        ip: String,
    },
    /// Resolve A, MX and NS records for a domain
    Dns {
        domain: String,
    },
    /// Run an allowlisted command
    Exec {
        /// Full command line, e.g. "dig +short example.com"
        command: String,
    },
    /// List allowlisted commands
    Commands,
    /// List available tools
    Tools {
        /// Only show tools in this category
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Serialize)]
struct ScanReport<'a> {
    host: &'a str,
    open_ports: Vec<OpenPort>,
    total_scanned: usize,
    duration_ms: f64,
}

#[derive(Serialize)]
struct OpenPort {
    port: u16,
    service: Option<&'static str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    logging::init_logging(&config.logging, args.verbose)?;

    match args.command {
        Some(Commands::Serve { bind, port }) => serve(config, bind, port).await?,
        Some(Commands::Scan {
            host,
            ports,
            extended,
            timeout_ms,
            concurrency,
        }) => scan(&config, host, ports, extended, timeout_ms, concurrency).await?,
        Some(Commands::Lookup { ip }) => {
            let details = config.lookup_client().lookup(&ip).await?;
            print_json(&details)?;
        }
        Some(Commands::Dns { domain }) => {
            let records = DnsResolver::from_system_conf().resolve(&domain).await?;
            print_json(&records)?;
        }
        Some(Commands::Exec { command }) => exec(&config, &command).await?,
        Some(Commands::Commands) => {
            for (name, description) in config.commands.allowed.iter() {
                println!("{:<12} {}", name, description);
            }
        }
        Some(Commands::Tools { category }) => {
            let tools = match category.as_deref() {
                Some(category) => catalog::tools_by_category(category),
                None => catalog::all_tools().iter().collect(),
            };
            for tool in tools {
                println!("{:<16} {:<16} {:<10} {}", tool.id, tool.name, tool.category, tool.description);
            }
        }
        None => {
            info!("No command specified. Use \"netprobe --help\" for usage.");
        }
    }

    Ok(())
}

async fn serve(mut config: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    info!("netprobe v{} starting", env!("CARGO_PKG_VERSION"));
    server::start_server(config).await
}

async fn scan(
    config: &Config,
    host: String,
    ports: Option<String>,
    extended: bool,
    timeout_ms: Option<u64>,
    concurrency: Option<usize>,
) -> Result<()> {
    let target = ScanTarget::new(host)?;
    let ports = match ports {
        Some(list) => PortSet::parse_list(&list)?,
        None if extended => PortSet::extended(),
        None => config.scanner.ports.clone(),
    };

    let mut options = config.scan_options();
    if let Some(ms) = timeout_ms {
        options.timeout_per_port = Duration::from_millis(ms);
    }
    if let Some(n) = concurrency {
        options.max_concurrency = n;
    }

    let result = PortProbeEngine::new(options).scan(&target, &ports).await?;

    print_json(&ScanReport {
        host: result.target().as_str(),
        open_ports: result
            .open_ports()
            .iter()
            .map(|&port| OpenPort {
                port,
                service: service_name(port),
            })
            .collect(),
        total_scanned: result.ports_scanned(),
        duration_ms: result.duration_ms(),
    })
}

async fn exec(config: &Config, command: &str) -> Result<()> {
    let guard = CommandGuard::new(config.commands.allowed.clone(), config.guard_config());

    match guard.execute(command).await {
        Ok(outcome) => {
            print_json(&outcome)?;
            if !outcome.success() {
                warn!("{}", outcome.summary());
            }
            Ok(())
        }
        Err(CommandError::Timeout(outcome)) => {
            print_json(&outcome)?;
            anyhow::bail!("{}", CommandError::Timeout(outcome))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", text);
    Ok(())
}
