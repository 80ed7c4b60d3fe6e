//! DNS Record Lookup
//!
//! Resolves the A, MX and NS records of a domain through hickory's tokio
//! resolver. The three queries run concurrently; any one failing fails the
//! whole lookup.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, warn};

/// Error types for DNS lookups
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("Domain is empty")]
    InvalidInput,

    #[error("{record_type} lookup for {domain} failed: {message}")]
    Resolve {
        domain: String,
        record_type: &'static str,
        message: String,
    },
}

/// Records found for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DnsRecords {
    #[serde(rename = "A")]
    pub a: Vec<String>,

    /// Rendered as `<preference> <exchange>`
    #[serde(rename = "MX")]
    pub mx: Vec<String>,

    #[serde(rename = "NS")]
    pub ns: Vec<String>,
}

/// Async DNS resolver
#[derive(Clone)]
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").finish_non_exhaustive()
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::from_system_conf()
    }
}

impl DnsResolver {
    /// Use the host's resolver configuration, falling back to public defaults
    pub fn from_system_conf() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }

    /// Look up A, MX and NS records for `domain`
    pub async fn resolve(&self, domain: &str) -> Result<DnsRecords, DnsError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(DnsError::InvalidInput);
        }

        debug!(domain, "resolving A, MX and NS records");

        let (a, mx, ns) = tokio::try_join!(
            async {
                self.resolver
                    .ipv4_lookup(domain)
                    .await
                    .map(|lookup| lookup.iter().map(|r| r.to_string()).collect::<Vec<_>>())
                    .map_err(|e| resolve_error(domain, "A", e))
            },
            async {
                self.resolver
                    .mx_lookup(domain)
                    .await
                    .map(|lookup| {
                        lookup
                            .iter()
                            .map(|r| format_mx(r.preference(), r.exchange()))
                            .collect::<Vec<_>>()
                    })
                    .map_err(|e| resolve_error(domain, "MX", e))
            },
            async {
                self.resolver
                    .ns_lookup(domain)
                    .await
                    .map(|lookup| lookup.iter().map(|r| r.to_string()).collect::<Vec<_>>())
                    .map_err(|e| resolve_error(domain, "NS", e))
            },
        )?;

        Ok(DnsRecords { a, mx, ns })
    }
}

fn resolve_error(domain: &str, record_type: &'static str, error: impl Display) -> DnsError {
    DnsError::Resolve {
        domain: domain.to_string(),
        record_type,
        message: error.to_string(),
    }
}

fn format_mx(preference: u16, exchange: impl Display) -> String {
    format!("{} {}", preference, exchange)
}
