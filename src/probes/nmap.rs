use std::process::Command;

use crate::core::error::PotcheckError;
use crate::core::snapshot::{ScanData, ServiceEntry};
use crate::probes::{ReconScanner, ScanOptions, ScriptedProbe};

/// Reconnaissance collaborator shelling out to nmap and parsing its
/// grepable output.
pub struct NmapRecon;

impl ReconScanner for NmapRecon {
    fn scan(&self, address: &str, options: &ScanOptions) -> Result<ScanData, PotcheckError> {
        let mut cmd = Command::new("nmap");
        cmd.args(["-sV", "-n", "-oG", "-"]);

        if options.fast {
            cmd.args(["-Pn", "-T5"]);
        }
        if let Some(range) = &options.port_range {
            cmd.arg("-p").arg(range);
        }
        if options.os_scan {
            cmd.arg("-O");
        }
        cmd.arg(address);

        tracing::info!("scanning {} with nmap", address);

        let output = cmd
            .output()
            .map_err(|e| PotcheckError::Scan(format!("failed to launch nmap: {}", e)))?;

        if !output.status.success() {
            return Err(PotcheckError::Scan(format!(
                "nmap exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_grepable(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the `-oG` host lines into structured scan data.
fn parse_grepable(text: &str) -> Result<ScanData, PotcheckError> {
    let mut data = ScanData::default();
    let mut saw_host = false;

    for line in text.lines() {
        if !line.starts_with("Host:") {
            continue;
        }
        saw_host = true;

        for field in line.split('\t') {
            if let Some(ports) = field.strip_prefix("Ports: ") {
                for entry in ports.split(", ") {
                    parse_port_entry(entry, &mut data);
                }
            } else if let Some(os) = field.strip_prefix("OS: ") {
                // keep the family only, "Linux 4.15" -> "Linux"
                data.os_family = os.split_whitespace().next().map(str::to_string);
            }
        }
    }

    if !saw_host {
        return Err(PotcheckError::Scan("requested host not available".into()));
    }

    Ok(data)
}

/// One entry is `port/state/proto/owner/service/rpcinfo/version/`.
fn parse_port_entry(entry: &str, data: &mut ScanData) {
    let parts: Vec<&str> = entry.splitn(7, '/').collect();
    if parts.len() < 5 {
        return;
    }

    let (port, state, proto, service) = (parts[0], parts[1], parts[2], parts[4]);
    if state != "open" {
        return;
    }
    let Ok(port) = port.trim().parse::<u16>() else {
        return;
    };

    let product = parts
        .get(6)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_default();
    let service = ServiceEntry::new(service, product);

    match proto {
        "tcp" => {
            data.tcp.insert(port, service);
        }
        "udp" => {
            data.udp.insert(port, service);
        }
        _ => {}
    }
}

/// Scripted-probe collaborator running a single NSE script and parsing the
/// indented script table from nmap's normal output.
pub struct NmapScriptProbe;

impl ScriptedProbe for NmapScriptProbe {
    fn run_script(
        &self,
        address: &str,
        script: &str,
        port: u16,
    ) -> Result<Vec<(String, String)>, PotcheckError> {
        let output = Command::new("nmap")
            .arg("--script")
            .arg(script)
            .arg("-p")
            .arg(port.to_string())
            .arg(address)
            .output()
            .map_err(|e| PotcheckError::Scan(format!("failed to launch nmap: {}", e)))?;

        let pairs = parse_script_output(&String::from_utf8_lossy(&output.stdout));
        if pairs.is_empty() {
            return Err(PotcheckError::Probe("script execution failed".into()));
        }
        Ok(pairs)
    }
}

fn parse_script_output(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for line in text.lines() {
        let Some(body) = line
            .strip_prefix("|_")
            .or_else(|| line.strip_prefix("| "))
        else {
            continue;
        };

        let body = body.trim();
        if let Some((key, value)) = body.split_once(": ") {
            // skip the "<script>:" header line, it carries no value
            if !value.trim().is_empty() {
                pairs.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
    }

    pairs
}
