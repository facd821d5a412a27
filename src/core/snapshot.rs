use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::error::PotcheckError;
use crate::probes::{HttpFetch, ScriptedProbe, Wire};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

impl Proto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proto::Tcp => "tcp",
            Proto::Udp => "udp",
        }
    }
}

/// Identity of one service observed on an open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub product: String,
}

impl ServiceEntry {
    pub fn new(name: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: product.into(),
        }
    }
}

/// Structured result of one reconnaissance pass, as produced by the
/// [`crate::probes::ReconScanner`] collaborator.
#[derive(Debug, Clone, Default)]
pub struct ScanData {
    pub tcp: BTreeMap<u16, ServiceEntry>,
    pub udp: BTreeMap<u16, ServiceEntry>,
    pub os_family: Option<String>,
}

struct PageCache {
    scan_id: u64,
    pages: Vec<String>,
}

/// Everything known about one target.
///
/// Populated once per scan by the recon collaborator, then read many times
/// by the check battery. The website and stylesheet caches are scoped to
/// this instance and keyed by the scan identity: re-populating the snapshot
/// bumps the identity and invalidates both caches, so a check can never see
/// content fetched under a previous scan.
pub struct TargetSnapshot {
    address: String,
    scan_id: u64,
    data: ScanData,
    wire: Box<dyn Wire>,
    web: Box<dyn HttpFetch>,
    script: Box<dyn ScriptedProbe>,
    http_timeout: Duration,
    site_cache: Mutex<Option<PageCache>>,
    css_cache: Mutex<Option<PageCache>>,
}

impl TargetSnapshot {
    pub fn new(
        address: impl Into<String>,
        wire: Box<dyn Wire>,
        web: Box<dyn HttpFetch>,
        script: Box<dyn ScriptedProbe>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            scan_id: 0,
            data: ScanData::default(),
            wire,
            web,
            script,
            http_timeout,
            site_cache: Mutex::new(None),
            css_cache: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Identity of the scan the current facts belong to.
    pub fn scan_id(&self) -> u64 {
        self.scan_id
    }

    /// Install the results of a fresh reconnaissance pass. Assigns a new
    /// scan identity and drops any cached web content.
    pub fn populate(&mut self, data: ScanData) {
        self.scan_id += 1;
        self.data = data;
        *self.site_cache.lock().expect("cache poisoned") = None;
        *self.css_cache.lock().expect("cache poisoned") = None;
    }

    fn map(&self, proto: Proto) -> &BTreeMap<u16, ServiceEntry> {
        match proto {
            Proto::Tcp => &self.data.tcp,
            Proto::Udp => &self.data.udp,
        }
    }

    /// All ports observed open for the given protocol, ascending.
    pub fn open_ports(&self, proto: Proto) -> BTreeSet<u16> {
        self.map(proto).keys().copied().collect()
    }

    /// All ports whose identified service equals `name`, ascending.
    pub fn service_ports(&self, name: &str, proto: Proto) -> Vec<u16> {
        self.map(proto)
            .iter()
            .filter(|(_, entry)| entry.name == name)
            .map(|(port, _)| *port)
            .collect()
    }

    pub fn service_name(&self, port: u16, proto: Proto) -> Option<&str> {
        self.map(proto).get(&port).map(|e| e.name.as_str())
    }

    pub fn service_product(&self, port: u16, proto: Proto) -> Option<&str> {
        self.map(proto).get(&port).map(|e| e.product.as_str())
    }

    pub fn has_tcp(&self, port: u16) -> bool {
        self.data.tcp.contains_key(&port)
    }

    pub fn os_family(&self) -> Option<&str> {
        self.data.os_family.as_deref()
    }

    /// Open a fresh connection and grab the service greeting. Uncached,
    /// on-demand, fails on connect or timeout.
    pub fn banner(
        &self,
        port: u16,
        proto: Proto,
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        self.wire.connect_and_read(&self.address, port, proto, timeout)
    }

    /// Connect, swallow the greeting, send `payload` and return the reply.
    pub fn probe(
        &self,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        self.wire.exchange(&self.address, port, payload, timeout)
    }

    /// Minimal HTTP conformance probe, a HEAD request against the root.
    pub fn http_head(&self, port: u16, timeout: Duration) -> Result<(), PotcheckError> {
        let url = format!("http://{}:{}/", self.address, port);
        self.web.head(&url, timeout)
    }

    /// Fetch the root document over TLS with certificate verification on.
    pub fn https_get(&self, port: u16, timeout: Duration) -> Result<String, PotcheckError> {
        let url = format!("https://{}:{}/", self.address, port);
        self.web.get(&url, timeout)
    }

    /// Run a named scripted probe against one port.
    pub fn script_output(
        &self,
        script: &str,
        port: u16,
    ) -> Result<Vec<(String, String)>, PotcheckError> {
        self.script.run_script(&self.address, script, port)
    }

    /// Root documents of every http service on the target, cached for the
    /// current scan identity. A fetch failure on one port is logged and that
    /// port simply contributes nothing.
    pub fn websites(&self) -> Vec<String> {
        self.fetch_pages("/", &self.site_cache)
    }

    /// Conventional stylesheets of every http service, same cache policy as
    /// [`TargetSnapshot::websites`].
    pub fn stylesheets(&self) -> Vec<String> {
        self.fetch_pages("/style.css", &self.css_cache)
    }

    fn fetch_pages(&self, path: &str, cache: &Mutex<Option<PageCache>>) -> Vec<String> {
        let mut cache = cache.lock().expect("cache poisoned");

        if let Some(cached) = cache.as_ref() {
            if cached.scan_id == self.scan_id {
                return cached.pages.clone();
            }
        }

        let mut pages = Vec::new();
        for port in self.service_ports("http", Proto::Tcp) {
            let url = format!("http://{}:{}{}", self.address, port, path);
            match self.web.get(&url, self.http_timeout) {
                Ok(content) => pages.push(content),
                Err(err) => {
                    tracing::debug!("failed to fetch {}: {}", url, err);
                }
            }
        }

        *cache = Some(PageCache {
            scan_id: self.scan_id,
            pages: pages.clone(),
        });
        pages
    }
}
