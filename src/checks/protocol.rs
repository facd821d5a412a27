use std::time::Duration;

use anyhow::Result;

use crate::checks::Heuristic;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::{Proto, TargetSnapshot};

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Verifies that an advertised SMTP service actually greets like one.
///
/// The port is known open, so a connect failure or a missing 220 greeting
/// is a warning, not an unknown: something is listening but does not speak
/// the protocol. First failing port wins.
pub struct SmtpProbeCheck {
    timeout: Duration,
}

impl SmtpProbeCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Heuristic for SmtpProbeCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "SMTP Test",
            description: "Tests SMTP service implementation",
            weight: 60,
            doc_file: "implementation.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let ports = snapshot.service_ports("smtp", Proto::Tcp);
        if ports.is_empty() {
            return Ok(Outcome::not_applicable("Service not present"));
        }

        for port in ports {
            let greeting = match snapshot.banner(port, Proto::Tcp, self.timeout) {
                Ok(bytes) => bytes,
                Err(err) => {
                    return Ok(Outcome::warning(format!(
                        "failed to connect to smtp server on port {}: {}",
                        port, err
                    )))
                }
            };

            if !greeting.starts_with(b"220") {
                return Ok(Outcome::warning(format!(
                    "220 response not received from smtp server on port {}",
                    port
                )));
            }
        }

        Ok(Outcome::ok("SMTP server OK"))
    }
}

/// Minimal HTTP conformance probe: a HEAD request against every advertised
/// http port (https on 443 is handled by the certificate check). First
/// failing port wins.
pub struct HttpProbeCheck {
    timeout: Duration,
}

impl HttpProbeCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Heuristic for HttpProbeCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "HTTP Test",
            description: "Tests HTTP service implementation",
            weight: 60,
            doc_file: "implementation.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let ports = snapshot.service_ports("http", Proto::Tcp);
        if ports.is_empty() {
            return Ok(Outcome::not_applicable("Service not present"));
        }

        let mut probed = false;

        for port in ports {
            if port == 443 {
                continue;
            }
            probed = true;

            if let Err(err) = snapshot.http_head(port, self.timeout) {
                return Ok(Outcome::warning(format!(
                    "HTTP probe failed on port {}: {}",
                    port, err
                )));
            }
        }

        if !probed {
            return Ok(Outcome::unknown("Only https ports present, nothing probed"));
        }

        Ok(Outcome::ok("HTTP implemented"))
    }
}

/// Obsolete Kippo versions answer a burst of bare newlines with a telltale
/// error instead of the "Protocol mismatch" a real sshd sends.
///
/// Based on Andrew Morris' research, see e.g.
/// https://morris.sc/detecting-kippo-ssh-honeypots/ and the corresponding
/// rapid7 detect_kippo module. The first ssh port decides the verdict.
pub struct KippoBugCheck {
    timeout: Duration,
}

impl KippoBugCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Heuristic for KippoBugCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Kippo Error Message Bug Test",
            description: "Tests presence of an obsolete version of kippo",
            weight: 100,
            doc_file: "old_version_bugs.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let ports = snapshot.service_ports("ssh", Proto::Tcp);
        if ports.is_empty() {
            return Ok(Outcome::not_applicable("No open ports found!"));
        }

        let port = ports[0];
        let response = match snapshot.probe(port, b"\n\n\n\n\n\n\n\n", self.timeout) {
            Ok(bytes) => bytes,
            Err(err) => {
                // port is open but nothing speaks to us
                return Ok(Outcome::warning(format!(
                    "can't communicate with ssh port {}: {}",
                    port, err
                )));
            }
        };

        if contains(&response, b"168430090") || contains(&response, b"bad packet length") {
            return Ok(Outcome::warning(
                "Old unpatched version of Kippo detected, please update to the latest version",
            ));
        }

        if contains(&response, b"Protocol mismatch") {
            return Ok(Outcome::ok("SSH protocol OK!"));
        }

        Ok(Outcome::warning(
            "Reply is unknown, protocol not implemented correctly?",
        ))
    }
}

/// Honeypots tend to ship self-signed or broken TLS material on 443.
pub struct CertificateCheck {
    timeout: Duration,
}

impl CertificateCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Heuristic for CertificateCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Certificate Validation Test",
            description: "Check validity of SSL certificates",
            weight: 20,
            doc_file: "invalid_certificate.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        if !snapshot.has_tcp(443) {
            return Ok(Outcome::not_applicable("Port 443 not open"));
        }

        match snapshot.https_get(443, self.timeout) {
            Ok(_) => Ok(Outcome::ok("Certificates valid")),
            Err(err) => {
                let msg = err.to_string();
                if msg.to_lowercase().contains("certificate") {
                    Ok(Outcome::warning(format!(
                        "Certificate invalid for {}:443: {}",
                        snapshot.address(),
                        msg
                    )))
                } else {
                    Ok(Outcome::warning(format!(
                        "Connection to {}:443 failed: {}",
                        snapshot.address(),
                        msg
                    )))
                }
            }
        }
    }
}
