//! IP Metadata Lookup
//!
//! Thin client for an ipapi.co style geolocation service. The provider's JSON
//! document is returned as-is; nothing here interprets it.

use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Default lookup provider
pub const DEFAULT_LOOKUP_URL: &str = "https://ipapi.co";

/// Error types for IP lookups
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The address is missing or not an IP literal
    #[error("Invalid IP address: '{0}'")]
    InvalidInput(String),

    /// Transport, TLS or decode failure
    #[error("Lookup request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status
    #[error("Unable to lookup IP information (provider returned {0})")]
    Status(u16),
}

/// HTTP client for IP metadata lookups
#[derive(Debug, Clone)]
pub struct IpLookupClient {
    /// Reqwest HTTP client
    client: reqwest::Client,

    /// Provider base URL, without trailing slash
    base_url: String,
}

impl Default for IpLookupClient {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_URL, Duration::from_secs(5))
    }
}

impl IpLookupClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("netprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL queried for `ip`
    pub fn lookup_url(&self, ip: IpAddr) -> String {
        format!("{}/{}/json/", self.base_url, ip)
    }

    /// Fetch metadata for `ip`
    ///
    /// Only IP literals are accepted so caller input can never reshape the
    /// request path.
    pub async fn lookup(&self, ip: &str) -> Result<Value, LookupError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| LookupError::InvalidInput(ip.to_string()))?;

        let url = self.lookup_url(addr);
        debug!(%addr, %url, "looking up IP metadata");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(%addr, error = %e, "IP lookup request failed");
            LookupError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%addr, %status, "IP lookup provider returned error");
            return Err(LookupError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    /// Serve a fake provider on an ephemeral port and return its base URL
    async fn fake_provider() -> String {
        async fn details(Path(ip): Path<String>) -> Result<Json<Value>, StatusCode> {
            if ip == "10.0.0.1" {
                return Err(StatusCode::TOO_MANY_REQUESTS);
            }
            Ok(Json(json!({ "ip": ip, "country_name": "Testland" })))
        }

        let app = Router::new().route("/{ip}/json/", get(details));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_lookup_url() {
        let client = IpLookupClient::new("https://ipapi.co/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "https://ipapi.co");
        assert_eq!(
            client.lookup_url("8.8.8.8".parse().unwrap()),
            "https://ipapi.co/8.8.8.8/json/"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_ip_input() {
        let client = IpLookupClient::default();
        for input in ["", "   ", "example.com", "1.2.3.4/../admin", "8.8.8.8?x=1"] {
            let err = client.lookup(input).await.unwrap_err();
            assert!(matches!(err, LookupError::InvalidInput(_)), "input {:?}", input);
        }
    }

    #[tokio::test]
    async fn test_lookup_returns_provider_json() {
        let base = fake_provider().await;
        let client = IpLookupClient::new(base, Duration::from_secs(2));

        let value = client.lookup("1.1.1.1").await.unwrap();
        assert_eq!(value["ip"], "1.1.1.1");
        assert_eq!(value["country_name"], "Testland");
    }

    #[tokio::test]
    async fn test_lookup_surfaces_provider_status() {
        let base = fake_provider().await;
        let client = IpLookupClient::new(base, Duration::from_secs(2));

        let err = client.lookup("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, LookupError::Status(429)));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = IpLookupClient::new(format!("http://{}", addr), Duration::from_secs(1));
        let err = client.lookup("1.1.1.1").await.unwrap_err();
        assert!(matches!(err, LookupError::Request(_)));
    }
}
