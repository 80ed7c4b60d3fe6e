//! Netprobe Library
//!
//! Network diagnostic primitives behind a small JSON API: a bounded
//! concurrent TCP port prober, an allowlisted command guard, IP metadata
//! lookup and DNS record resolution.

pub mod catalog;
pub mod config;
pub mod dns;
pub mod logging;
pub mod lookup;
pub mod metrics;
pub mod scanner;
pub mod server;
pub mod tools;
