//! Command Validation Module
//!
//! Turns a raw command line into a `CommandSpec` and checks its base command
//! against the allowlist. Tokenization follows shell word-splitting rules
//! (quotes and escapes are honoured) but nothing is ever expanded: `;`, `|`,
//! `&&`, backticks and redirections stay literal characters inside arguments.

use super::error::{CommandError, RejectionReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only mapping from base command to a human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlist {
    entries: BTreeMap<String, String>,
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::with_default_commands()
    }
}

impl Allowlist {
    /// Build an allowlist from `(command, description)` pairs
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Read-only network diagnostics allowed out of the box
    ///
    /// Commands that can change system state or run other programs through
    /// their arguments (`ip netns exec`, `hostname <name>`, `date -s`) are
    /// left out; add them in config only for trusted callers.
    pub fn with_default_commands() -> Self {
        Self::new([
            ("ping", "Send ICMP echo requests to a host"),
            ("traceroute", "Trace the route packets take to a host"),
            ("nslookup", "Query internet name servers"),
            ("dig", "DNS lookup utility"),
            ("whois", "Query domain registration records"),
            ("netstat", "Show network connections and statistics"),
            ("ss", "Show socket statistics"),
            ("ifconfig", "Show network interface configuration"),
            ("uptime", "Show how long the system has been running"),
            ("whoami", "Show the current user"),
            ("echo", "Print arguments"),
            ("ls", "List directory contents"),
        ])
    }

    /// Exact, case-sensitive key lookup
    pub fn contains(&self, command: &str) -> bool {
        self.entries.contains_key(command)
    }

    pub fn description(&self, command: &str) -> Option<&str> {
        self.entries.get(command).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated argument vector
///
/// Only `CommandValidator` produces these, so holding one means the base
/// command passed the allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// The base command
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Remaining tokens, passed verbatim
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Split a command line into words without interpreting it
pub fn tokenize(raw: &str) -> Result<Vec<String>, CommandError> {
    let tokens = shlex::split(raw).ok_or(CommandError::Rejected(RejectionReason::Malformed))?;
    if tokens.is_empty() {
        return Err(CommandError::Rejected(RejectionReason::Empty));
    }
    Ok(tokens)
}

/// Command validator that enforces the allowlist
///
/// The base command is compared literally: `/bin/ls` and `ls` are different
/// keys, and no path lookup or alias expansion happens here.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    allowlist: Arc<Allowlist>,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new(Allowlist::default())
    }
}

impl CommandValidator {
    pub fn new(allowlist: Allowlist) -> Self {
        Self {
            allowlist: Arc::new(allowlist),
        }
    }

    /// Tokenize `raw` and check its base command
    pub fn validate(&self, raw: &str) -> Result<CommandSpec, CommandError> {
        let mut tokens = tokenize(raw)?.into_iter();
        let program = tokens
            .next()
            .ok_or(CommandError::Rejected(RejectionReason::Empty))?;

        if !self.allowlist.contains(&program) {
            return Err(CommandError::Rejected(RejectionReason::NotAllowed(program)));
        }

        Ok(CommandSpec {
            program,
            args: tokens.collect(),
        })
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }
}
