//! Tool Catalog
//!
//! Static description of the diagnostics this service offers, grouped by
//! category. Used by `/api/tools` and the `tools` subcommand.

use serde::Serialize;

/// One entry in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

const TOOLS: &[ToolInfo] = &[
    ToolInfo {
        id: "port_scanner",
        name: "Port Scanner",
        description: "Scan for open network ports on target systems",
        category: "network",
    },
    ToolInfo {
        id: "ip_lookup",
        name: "IP Lookup",
        description: "Retrieve detailed information about IP addresses",
        category: "network",
    },
    ToolInfo {
        id: "dns_lookup",
        name: "DNS Lookup",
        description: "Resolve A, MX and NS records for a domain",
        category: "web",
    },
    ToolInfo {
        id: "command_runner",
        name: "Command Runner",
        description: "Run allowlisted diagnostic commands on the server",
        category: "utilities",
    },
];

/// Every tool, in catalog order
pub fn all_tools() -> &'static [ToolInfo] {
    TOOLS
}

/// Look up a tool by id
pub fn tool_info(id: &str) -> Option<&'static ToolInfo> {
    TOOLS.iter().find(|tool| tool.id == id)
}

/// Tools in `category`; empty for an unknown category
pub fn tools_by_category(category: &str) -> Vec<&'static ToolInfo> {
    TOOLS.iter().filter(|tool| tool.category == category).collect()
}
