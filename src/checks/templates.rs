use anyhow::Result;

use crate::checks::Heuristic;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::{Proto, TargetSnapshot};

/// Device identity conpot advertises out of the box.
const DEFAULT_S7_IDENTITY: &[(&str, &str)] = &[
    ("Version", "0.0"),
    ("System Name", "Technodrome"),
    ("Module Type", "Siemens, SIMATIC, S7-200"),
    ("Serial Number", "88111222"),
    ("Plant Identification", "Mouser Factory"),
    ("Copyright", "Original Siemens Equipment"),
];

/// Interrogates S7 PLC services with the scripted probe and compares the
/// reported device identity against the default template. Any overlap at
/// all is suspicious; the first overlapping port wins.
pub struct S7TemplateCheck;

impl Heuristic for S7TemplateCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Default Template File Test",
            description: "Tests usage of default running templates",
            weight: 100,
            doc_file: "default_template.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let mut ports = snapshot.service_ports("iso-tsap", Proto::Tcp);
        ports.extend(snapshot.service_ports("s7-comm", Proto::Tcp));

        if ports.is_empty() {
            return Ok(Outcome::not_applicable(
                "iso-tsap / s7-comm service not present in scan results",
            ));
        }

        for port in ports {
            let info = match snapshot.script_output("s7-info.nse", port) {
                Ok(pairs) => pairs,
                Err(_) => return Ok(Outcome::unknown("Failed to run s7-info.nse script")),
            };

            let matched = DEFAULT_S7_IDENTITY
                .iter()
                .filter(|(key, value)| {
                    info.iter().any(|(k, v)| k == key && v == value)
                })
                .count();

            if matched > 0 {
                let percent = matched as f64 / DEFAULT_S7_IDENTITY.len() as f64 * 100.0;
                return Ok(Outcome::warning(format!(
                    "Template used for s7-comm service matches default {:.1} percent",
                    percent
                )));
            }
        }

        Ok(Outcome::ok(
            "s7-comm service does not match any default configurations",
        ))
    }
}
