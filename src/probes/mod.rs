//! Collaborator interfaces producing raw data for the snapshot.
//!
//! The check battery never talks to the network directly; everything goes
//! through these traits so regression tests can swap in canned fixtures.

use std::time::Duration;

use crate::core::error::PotcheckError;
use crate::core::snapshot::{Proto, ScanData};

pub mod nmap;
pub mod web;
pub mod wire;

/// Options for one reconnaissance pass.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Run OS fingerprinting (usually needs elevated privileges).
    pub os_scan: bool,
    /// Explicit port range, e.g. `20-100`; `None` scans the default set.
    pub port_range: Option<String>,
    /// Trade thoroughness for speed on local links.
    pub fast: bool,
}

/// Reconnaissance collaborator. Produces the structured scan data a
/// [`crate::core::snapshot::TargetSnapshot`] is populated with.
pub trait ReconScanner {
    fn scan(&self, address: &str, options: &ScanOptions) -> Result<ScanData, PotcheckError>;
}

/// Raw socket collaborator for banner grabs and tiny scripted exchanges.
pub trait Wire: Send + Sync {
    /// Open a fresh connection and return the first chunk the peer sends.
    fn connect_and_read(
        &self,
        address: &str,
        port: u16,
        proto: Proto,
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError>;

    /// Connect, read and discard the greeting, send `payload`, return the
    /// reply. TCP only.
    fn exchange(
        &self,
        address: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError>;
}

/// HTTP fetch collaborator used for website and stylesheet retrieval.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<String, PotcheckError>;
    fn head(&self, url: &str, timeout: Duration) -> Result<(), PotcheckError>;
}

/// Runs a named auxiliary probe script against one port and returns its
/// structured key/value output.
pub trait ScriptedProbe: Send + Sync {
    fn run_script(
        &self,
        address: &str,
        script: &str,
        port: u16,
    ) -> Result<Vec<(String, String)>, PotcheckError>;
}
