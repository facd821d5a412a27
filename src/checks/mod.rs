use anyhow::Result;

use crate::config::AppConfig;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::TargetSnapshot;

pub mod banner;
pub mod fingerprint;
pub mod protocol;
pub mod templates;
pub mod web;

/// One independent honeypot check.
///
/// `run` reads the snapshot and returns exactly one verdict. Collaborator
/// failures must be caught inside the check and downgraded to an `Unknown`
/// outcome; an `Err` means the check itself is broken and aborts the whole
/// battery.
pub trait Heuristic {
    fn descriptor(&self) -> Descriptor;
    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome>;
}

/// Assemble the battery for a scan level, mirroring the CLI contract:
/// level 1 runs the passive fingerprint family, level 2 adds the active
/// banner, web and protocol probes. The OS/service combination check only
/// joins when OS fingerprinting was requested.
pub fn battery(level: u8, os_scan: bool, config: &AppConfig) -> Vec<Box<dyn Heuristic>> {
    let banner_timeout = config.banner_timeout();
    let probe_timeout = config.probe_timeout();

    let mut checks: Vec<Box<dyn Heuristic>> = Vec::new();

    if level >= 1 {
        checks.push(Box::new(fingerprint::DirectFingerprintCheck));
        if os_scan {
            checks.push(Box::new(fingerprint::OsServiceCombinationCheck));
        }
        checks.push(Box::new(fingerprint::DefaultPortSetCheck));
        checks.push(Box::new(fingerprint::DuplicateServicesCheck));
    }

    if level >= 2 {
        checks.push(Box::new(banner::BannerCheck::ftp(banner_timeout)));

        checks.push(Box::new(protocol::HttpProbeCheck::new(banner_timeout)));
        checks.push(Box::new(web::DefaultWebsiteCheck));
        checks.push(Box::new(web::GlastopfContentCheck::new(
            config.reference_text_url.clone(),
            probe_timeout,
        )));
        checks.push(Box::new(web::DefaultStylesheetCheck));
        checks.push(Box::new(protocol::CertificateCheck::new(banner_timeout)));

        checks.push(Box::new(banner::BannerCheck::imap(banner_timeout)));

        checks.push(Box::new(banner::BannerCheck::smtp(banner_timeout)));
        checks.push(Box::new(protocol::SmtpProbeCheck::new(probe_timeout)));

        checks.push(Box::new(banner::BannerCheck::telnet(banner_timeout)));
        checks.push(Box::new(protocol::KippoBugCheck::new(banner_timeout)));

        checks.push(Box::new(templates::S7TemplateCheck));
    }

    checks
}
