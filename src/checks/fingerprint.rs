use std::collections::BTreeMap;

use anyhow::Result;

use crate::checks::Heuristic;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::{Proto, TargetSnapshot};

/// Flags services whose product string the scanner already labelled as a
/// honeypot. First match wins.
pub struct DirectFingerprintCheck;

impl Heuristic for DirectFingerprintCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Direct Fingerprint Test",
            description: "Check if the scan directly fingerprints any service as a honeypot",
            weight: 100,
            doc_file: "direct_fingerprinting.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        for proto in [Proto::Tcp, Proto::Udp] {
            for port in snapshot.open_ports(proto) {
                let product = snapshot.service_product(port, proto).unwrap_or_default();
                if product.to_lowercase().contains("honeypot") {
                    return Ok(Outcome::warning(format!(
                        "Service on port {}/{} reported as honeypot directly by the scanner",
                        port,
                        proto.as_str()
                    )));
                }
            }
        }

        Ok(Outcome::ok(
            "No service was fingerprinted directly as a honeypot",
        ))
    }
}

const WINDOWS_EXCLUSIVE: &[&str] = &["ms-sql", "iis", "windows", "microsoft"];
const LINUX_EXCLUSIVE: &[&str] = &[];

/// Flags OS/service combinations that make no sense, e.g. Windows-exclusive
/// product signatures on a reported Linux host. Needs both an OS guess and
/// open ports; otherwise the verdict is unknown. First implausible
/// combination wins.
pub struct OsServiceCombinationCheck;

impl Heuristic for OsServiceCombinationCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "OS Service Combination Test",
            description: "Check if the OS and running services combination makes sense",
            weight: 90,
            doc_file: "os_service_combination.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let os = match snapshot.os_family() {
            Some(os) => os.to_lowercase(),
            None => return Ok(Outcome::unknown("Failed to retrieve OS")),
        };

        let ports = snapshot.open_ports(Proto::Tcp);
        if ports.is_empty() {
            return Ok(Outcome::unknown("No open ports to correlate with the OS"));
        }

        let exclusive: &[&str] = match os.as_str() {
            "linux" => WINDOWS_EXCLUSIVE,
            "windows" => LINUX_EXCLUSIVE,
            _ => &[],
        };

        for port in ports {
            let product = snapshot
                .service_product(port, Proto::Tcp)
                .unwrap_or_default()
                .to_lowercase();
            for marker in exclusive {
                if product.contains(marker) {
                    return Ok(Outcome::warning(format!(
                        "{} machine is running {}",
                        snapshot.os_family().unwrap_or_default(),
                        snapshot.service_product(port, Proto::Tcp).unwrap_or_default()
                    )));
                }
            }
        }

        Ok(Outcome::ok("Combination OK"))
    }
}

/// Default port layouts shipped by popular honeypots. Only meaningful for
/// products that open many ports out of the box.
const DEFAULT_PORT_SETS: &[(&str, &[u16])] = &[
    (
        "amun",
        &[
            21, 23, 25, 42, 80, 105, 110, 135, 139, 143, 443, 445, 554, 587, 617, 1023, 1025,
            1080, 1111, 1581, 1900, 2101, 2103, 2105, 2107, 2380, 2555, 2745, 2954, 2967, 2968,
            3127, 3128, 3268, 3372, 3389, 3628, 5000, 5168, 5554, 6070, 6101, 6129, 7144, 7547,
            8080, 9999, 10203, 27347, 38292, 41523,
        ],
    ),
    (
        "artillery",
        &[21, 22, 25, 53, 110, 1433, 1723, 5800, 5900, 8080, 10000, 16993, 44443],
    ),
    (
        "dionaea",
        &[21, 42, 80, 135, 443, 445, 1433, 1723, 3306, 5060, 5061],
    ),
    ("honeypy", &[7, 8, 23, 24, 2048, 4096, 10007, 10008, 10009, 10010]),
];

/// Any similarity percentage above this is reported.
const PORT_SET_THRESHOLD: f64 = 70.0;

/// Compares the set of all open ports against the default port layout of
/// known honeypots. Every reference above the threshold contributes to one
/// accumulated verdict.
pub struct DefaultPortSetCheck;

impl Heuristic for DefaultPortSetCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Default Service Combination Test",
            description: "Check if the running services combination is the default configuration \
                          for popular honeypots",
            weight: 50,
            doc_file: "default_service_combination.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let mut open = snapshot.open_ports(Proto::Tcp);
        open.extend(snapshot.open_ports(Proto::Udp));

        if open.is_empty() {
            return Ok(Outcome::not_applicable("No open ports found"));
        }

        let mut matches = Vec::new();

        for (product, reference) in DEFAULT_PORT_SETS {
            let found = reference.iter().filter(|p| open.contains(*p)).count();
            let percent = found as f64 / reference.len() as f64 * 100.0;

            if percent > PORT_SET_THRESHOLD {
                matches.push(format!("{} ({:.1}%)", product, percent));
            }
        }

        if matches.is_empty() {
            Ok(Outcome::ok(format!(
                "Target port configuration is below {} percent similar to all known honeypots",
                PORT_SET_THRESHOLD
            )))
        } else {
            Ok(Outcome::warning(format!(
                "Target port configuration is similar to: {}",
                matches.join(", ")
            )))
        }
    }
}

/// A genuine host rarely runs the same service on several ports; honeypots
/// emulating many products do it all the time.
pub struct DuplicateServicesCheck;

impl Heuristic for DuplicateServicesCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Duplicate Services Check",
            description: "Check if the machine is running duplicate services",
            weight: 30,
            doc_file: "duplicate_services.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let mut by_service: BTreeMap<&str, Vec<u16>> = BTreeMap::new();

        for port in snapshot.open_ports(Proto::Tcp) {
            if let Some(name) = snapshot.service_name(port, Proto::Tcp) {
                by_service.entry(name).or_default().push(port);
            }
        }

        let mut report = String::new();
        for (service, ports) in &by_service {
            if ports.len() > 1 {
                report.push_str(&format!("{}->{:?} ", service, ports));
            }
        }

        if report.is_empty() {
            Ok(Outcome::ok("No duplicate services found"))
        } else {
            Ok(Outcome::warning(format!(
                "The following services run on multiple ports: {}",
                report.trim_end()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::ResultKind;
    use crate::core::snapshot::fakes::snapshot;

    #[test]
    fn unique_services_pass() {
        let snap = snapshot(&[(21, "ftp", "vsftpd"), (80, "http", "nginx")], None);
        let outcome = DuplicateServicesCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Ok);
    }

    #[test]
    fn duplicated_ftp_is_flagged_with_its_ports() {
        let snap = snapshot(&[(21, "ftp", ""), (2121, "ftp", "")], None);
        let outcome = DuplicateServicesCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("ftp->[21, 2121]"));
    }

    #[test]
    fn honeypot_in_product_string_is_flagged() {
        let snap = snapshot(&[(2222, "ssh", "Kippo honeypot sshd")], None);
        let outcome = DirectFingerprintCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("2222"));
    }

    #[test]
    fn ordinary_products_pass_direct_fingerprint() {
        let snap = snapshot(&[(22, "ssh", "OpenSSH 8.9")], None);
        let outcome = DirectFingerprintCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Ok);
    }

    #[test]
    fn windows_service_on_linux_host_is_implausible() {
        let snap = snapshot(
            &[(1433, "ms-sql-s", "Microsoft SQL Server 2005")],
            Some("Linux"),
        );
        let outcome = OsServiceCombinationCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
    }

    #[test]
    fn missing_os_guess_is_unknown() {
        let snap = snapshot(&[(80, "http", "nginx")], None);
        let outcome = OsServiceCombinationCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Unknown);
    }

    #[test]
    fn dionaea_port_layout_exceeds_threshold() {
        let snap = snapshot(
            &[
                (21, "ftp", ""),
                (42, "nameserver", ""),
                (80, "http", ""),
                (135, "msrpc", ""),
                (443, "https", ""),
                (445, "microsoft-ds", ""),
                (1433, "ms-sql-s", ""),
                (1723, "pptp", ""),
                (3306, "mysql", ""),
            ],
            None,
        );
        let outcome = DefaultPortSetCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("dionaea"));
    }

    #[test]
    fn no_open_ports_is_not_applicable() {
        let snap = snapshot(&[], None);
        let outcome = DefaultPortSetCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::NotApplicable);
    }

    #[test]
    fn sparse_port_layout_passes() {
        let snap = snapshot(&[(22, "ssh", ""), (80, "http", "")], None);
        let outcome = DefaultPortSetCheck.run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Ok);
    }
}
