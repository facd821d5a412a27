use std::time::Duration;

use anyhow::Result;

use crate::checks::Heuristic;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::{Proto, TargetSnapshot};

/// Default banners shipped by well-known honeypots, exact bytes.
type BannerTable = &'static [(&'static [u8], &'static str)];

const FTP_BANNERS: BannerTable = &[
    (b"220 DiskStation FTP server ready.\r\n", "dionaea"),
    (b"220 Welcome to my FTP Server\r\n", "amun"),
    (b"220 BearTrap-ftpd Service ready\r\n", "beartrap"),
];

const IMAP_BANNERS: BannerTable = &[(b"a200 Lotus Domino 6.5.4 7.0.2 IMAP4\r\n", "amun")];

const SMTP_BANNERS: BannerTable = &[(b"220 mail.example.com SMTP Mailserver\r\n", "amun")];

const TELNET_BANNERS: BannerTable = &[
    (
        b"\xff\xfb\x03\xff\xfb\x01\xff\xfd\x1f\xff\xfd\x18\r\nlogin: ",
        "telnetlogger",
    ),
    (b"\xff\xfd\x1flogin: ", "cowrie"),
    (
        b"\xff\xfb\x01\xff\xfb\x03\xff\xfc'\xff\xfe\x01\xff\xfd\x03\xff\xfe\"\xff\xfd'\xff\xfd\x18\xff\xfe\x1f",
        "mtpot",
    ),
    (b"\xff\xfb\x01\xff\xfb\x03", "mtpot"),
    (b"\xff\xfb\x01", "mtpot"),
    (b"Debian GNU/Linux 7\r\nLogin: ", "honeypy"),
];

/// Grabs the greeting of every port serving one protocol and compares it
/// byte-for-byte against the default banners of known honeypots.
///
/// Match policy: the first matching banner wins and stops further ports; a
/// grab failure never hides a match found on another port and only counts
/// when no port matched at all.
pub struct BannerCheck {
    descriptor: Descriptor,
    service: &'static str,
    known: BannerTable,
    timeout: Duration,
}

impl BannerCheck {
    pub fn ftp(timeout: Duration) -> Self {
        Self {
            descriptor: Descriptor {
                name: "Default FTP Banner Test",
                description: "Tests usage of default service banners",
                weight: 100,
                doc_file: "default_banner.html",
            },
            service: "ftp",
            known: FTP_BANNERS,
            timeout,
        }
    }

    pub fn imap(timeout: Duration) -> Self {
        Self {
            descriptor: Descriptor {
                name: "Default IMAP Banner Test",
                description: "Tests usage of default IMAP banners",
                weight: 90,
                doc_file: "default_banner.html",
            },
            service: "imap",
            known: IMAP_BANNERS,
            timeout,
        }
    }

    pub fn smtp(timeout: Duration) -> Self {
        Self {
            descriptor: Descriptor {
                name: "Default SMTP Banner Test",
                description: "Tests usage of default SMTP banners",
                weight: 100,
                doc_file: "default_banner.html",
            },
            service: "smtp",
            known: SMTP_BANNERS,
            timeout,
        }
    }

    pub fn telnet(timeout: Duration) -> Self {
        Self {
            descriptor: Descriptor {
                name: "Default Telnet Banner Test",
                description: "Tests usage of default telnet banners",
                weight: 100,
                doc_file: "default_banner.html",
            },
            service: "telnet",
            known: TELNET_BANNERS,
            timeout,
        }
    }
}

impl Heuristic for BannerCheck {
    fn descriptor(&self) -> Descriptor {
        self.descriptor.clone()
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let ports = snapshot.service_ports(self.service, Proto::Tcp);

        if ports.is_empty() {
            return Ok(Outcome::not_applicable("No open ports found!"));
        }

        let mut grab_failure = None;

        for port in ports {
            let banner = match snapshot.banner(port, Proto::Tcp, self.timeout) {
                Ok(bytes) => bytes,
                Err(err) => {
                    grab_failure = Some(format!("Banner grab failed for port {}: {}", port, err));
                    continue;
                }
            };

            for (known, product) in self.known {
                if banner.as_slice() == *known {
                    return Ok(Outcome::warning(format!(
                        "Default {} banner used on port {}",
                        product, port
                    )));
                }
            }
        }

        if let Some(report) = grab_failure {
            return Ok(Outcome::unknown(report));
        }

        Ok(Outcome::ok("No default banners"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::ResultKind;
    use crate::core::snapshot::fakes::{snapshot, snapshot_with, StaticWeb, StaticWire};

    #[test]
    fn amun_ftp_banner_is_flagged() {
        let mut wire = StaticWire::default();
        wire.banners
            .insert(21, b"220 Welcome to my FTP Server\r\n".to_vec());
        let snap = snapshot_with(wire, StaticWeb::default(), &[(21, "ftp", "")], None);

        let outcome = BannerCheck::ftp(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("amun"));
    }

    #[test]
    fn custom_banner_passes() {
        let mut wire = StaticWire::default();
        wire.banners.insert(21, b"220 corp-ftp ready\r\n".to_vec());
        let snap = snapshot_with(wire, StaticWeb::default(), &[(21, "ftp", "")], None);

        let outcome = BannerCheck::ftp(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Ok);
    }

    #[test]
    fn missing_service_is_not_applicable() {
        let snap = snapshot(&[(80, "http", "nginx")], None);
        let outcome = BannerCheck::ftp(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::NotApplicable);
    }

    #[test]
    fn grab_failure_downgrades_to_unknown() {
        // no banner registered for port 21, the fake wire refuses to connect
        let snap = snapshot(&[(21, "ftp", "")], None);
        let outcome = BannerCheck::ftp(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Unknown);
    }

    #[test]
    fn match_on_second_port_beats_failure_on_first() {
        let mut wire = StaticWire::default();
        wire.banners
            .insert(2121, b"220 BearTrap-ftpd Service ready\r\n".to_vec());
        let snap = snapshot_with(
            wire,
            StaticWeb::default(),
            &[(21, "ftp", ""), (2121, "ftp", "")],
            None,
        );

        let outcome = BannerCheck::ftp(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("beartrap"));
    }

    #[test]
    fn cowrie_telnet_banner_is_flagged() {
        let mut wire = StaticWire::default();
        wire.banners.insert(23, b"\xff\xfd\x1flogin: ".to_vec());
        let snap = snapshot_with(wire, StaticWeb::default(), &[(23, "telnet", "")], None);

        let outcome = BannerCheck::telnet(Duration::from_secs(5)).run(&snap).unwrap();
        assert_eq!(outcome.kind, ResultKind::Warning);
        assert!(outcome.report.contains("cowrie"));
    }
}
