//! Port Sets
//!
//! A `PortSet` is the fixed, validated list of TCP ports a scan dispatches.
//! Construction rejects values outside 1..=65535 and removes duplicates, so
//! the engine never probes the same port twice in one pass.

use super::error::ScanError;
use serde::{Deserialize, Serialize};

/// Ports scanned when no explicit list is configured
pub const DEFAULT_PORTS: [u16; 12] = [21, 22, 23, 25, 53, 80, 110, 143, 443, 445, 3306, 3389];

/// Well-known ports with the service usually found behind them
const WELL_KNOWN: [(u16, &str); 20] = [
    (20, "ftp-data"),
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "dns"),
    (80, "http"),
    (110, "pop3"),
    (143, "imap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (465, "smtps"),
    (587, "submission"),
    (993, "imaps"),
    (995, "pop3s"),
    (3306, "mysql"),
    (3389, "rdp"),
    (5432, "postgresql"),
    (8080, "http-alt"),
    (8443, "https-alt"),
];

/// Look up the conventional service name for a port
pub fn service_name(port: u16) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Ordered, deduplicated set of TCP ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u16>")]
pub struct PortSet {
    ports: Vec<u16>,
}

impl PortSet {
    /// Build a port set from raw values
    ///
    /// Values are sorted and deduplicated. An empty input, or any value
    /// outside 1..=65535, is rejected.
    pub fn new<I>(ports: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut validated = Vec::new();
        for raw in ports {
            let port = u16::try_from(raw)
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ScanError::InvalidInput(format!("port {raw} is out of range")))?;
            validated.push(port);
        }

        if validated.is_empty() {
            return Err(ScanError::InvalidInput("port set is empty".to_string()));
        }

        validated.sort_unstable();
        validated.dedup();

        Ok(Self { ports: validated })
    }

    /// The twelve ports probed by default
    pub fn common() -> Self {
        Self {
            ports: sorted(DEFAULT_PORTS.to_vec()),
        }
    }

    /// Broader list of well-known service ports
    pub fn extended() -> Self {
        Self {
            ports: sorted(WELL_KNOWN.iter().map(|(p, _)| *p).collect()),
        }
    }

    /// Parse a comma separated list such as `22,80,443`
    pub fn parse_list(input: &str) -> Result<Self, ScanError> {
        let mut raw = Vec::new();
        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let value = token
                .parse::<u32>()
                .map_err(|_| ScanError::InvalidInput(format!("'{token}' is not a port number")))?;
            raw.push(value);
        }
        Self::new(raw)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }
}

impl Default for PortSet {
    fn default() -> Self {
        Self::common()
    }
}

impl TryFrom<Vec<u32>> for PortSet {
    type Error = ScanError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PortSet> for Vec<u16> {
    fn from(set: PortSet) -> Self {
        set.ports
    }
}

fn sorted(mut ports: Vec<u16>) -> Vec<u16> {
    ports.sort_unstable();
    ports.dedup();
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_common_ports() {
        let set = PortSet::common();
        assert_eq!(set.len(), 12);
        assert_eq!(set.as_slice().first(), Some(&21));
        assert_eq!(set.as_slice().last(), Some(&3389));
    }

    #[test]
    fn test_extended_ports() {
        let set = PortSet::extended();
        assert_eq!(set.len(), WELL_KNOWN.len());
        assert!(set.iter().all(|p| service_name(p).is_some()));
        assert!(PortSet::common().iter().all(|p| set.as_slice().contains(&p)));
        assert!(set.as_slice().contains(&445));
        assert!(set.as_slice().contains(&8443));
    }

    #[test]
    fn test_duplicates_removed() {
        let set = PortSet::new([443, 80, 443, 22, 80]).unwrap();
        assert_eq!(set.as_slice(), &[22, 80, 443]);
    }

    #[test]
    fn test_zero_rejected() {
        let err = PortSet::new([0, 80]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn test_above_range_rejected() {
        let err = PortSet::new([80, 65536]).unwrap_err();
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(PortSet::new(Vec::<u32>::new()).is_err());
    }

    #[test]
    fn test_parse_list() {
        let set = PortSet::parse_list("443, 22,80,").unwrap();
        assert_eq!(set.as_slice(), &[22, 80, 443]);

        assert!(PortSet::parse_list("22,ssh").is_err());
        assert!(PortSet::parse_list("").is_err());
    }

    #[test]
    fn test_service_names() {
        assert_eq!(service_name(22), Some("ssh"));
        assert_eq!(service_name(445), Some("microsoft-ds"));
        assert_eq!(service_name(8443), Some("https-alt"));
        assert_eq!(service_name(31337), None);
    }

    #[test]
    fn test_deserialize_from_toml_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            ports: PortSet,
        }

        let parsed: Wrapper = toml::from_str("ports = [8080, 22, 22]").unwrap();
        assert_eq!(parsed.ports.as_slice(), &[22, 8080]);

        let invalid: Result<Wrapper, _> = toml::from_str("ports = [70000]");
        assert!(invalid.is_err());
    }

    proptest! {
        #[test]
        fn prop_port_set_is_strictly_ascending(raw in prop::collection::vec(1u32..=65535, 1..64)) {
            let set = PortSet::new(raw.clone()).unwrap();
            prop_assert!(set.as_slice().windows(2).all(|w| w[0] < w[1]));
            for port in &raw {
                prop_assert!(set.as_slice().contains(&(*port as u16)));
            }
        }
    }
}
