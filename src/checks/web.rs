use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::checks::Heuristic;
use crate::core::error::PotcheckError;
use crate::core::outcome::{Descriptor, Outcome};
use crate::core::snapshot::TargetSnapshot;

/// Digests of index pages shipped as-is by known honeypots.
const WEBSITE_HASHES: &[(&str, &str)] = &[
    (
        "c59e04f46e25c454e65544c236abd9d71705cc4e5c4b4b7dc3ff83fec0e9402f",
        "shockpot",
    ),
    (
        "d405fe3c5b902342565cbf5523bb44a78c6bfb15b38a40c81a5f7bf4d8eb7838",
        "honeything",
    ),
    (
        "351190a71ddca564e471600c3d403fd8042e6888c8c6abe9cdfe536cef005e82",
        "dionaea",
    ),
    (
        "576137c8755b80c0751baa18c8306465fa02c641c683caf8b6d19469a5b96b86",
        "amun",
    ),
];

const STYLESHEET_HASHES: &[(&str, &str)] = &[(
    "1118635ac91417296e67cd0f3e6f9927e5f502e328b92bb3888b3b789a49a257",
    "glastopf",
)];

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// First page whose digest appears in the table wins.
fn hash_verdict(
    pages: &[String],
    table: &[(&str, &str)],
    empty_report: &str,
    hit_what: &str,
    ok_report: &str,
) -> Outcome {
    if pages.is_empty() {
        return Outcome::not_applicable(empty_report);
    }

    for page in pages {
        let digest = sha256_hex(page.as_bytes());
        for (known, product) in table {
            if digest == *known {
                return Outcome::warning(format!("Default {} used for {}", hit_what, product));
            }
        }
    }

    Outcome::ok(ok_report)
}

/// Compares the digest of every fetched index page against pages known to
/// ship with honeypots out of the box.
pub struct DefaultWebsiteCheck;

impl Heuristic for DefaultWebsiteCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Default Website Test",
            description: "Test unchanged website content",
            weight: 60,
            doc_file: "default_website.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        Ok(hash_verdict(
            &snapshot.websites(),
            WEBSITE_HASHES,
            "No website found",
            "website",
            "No default website matched",
        ))
    }
}

/// Same policy as [`DefaultWebsiteCheck`] for the conventional stylesheet.
pub struct DefaultStylesheetCheck;

impl Heuristic for DefaultStylesheetCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Default Website Stylesheet Test",
            description: "Test unchanged website stylesheet",
            weight: 30,
            doc_file: "default_stylesheet.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        Ok(hash_verdict(
            &snapshot.stylesheets(),
            STYLESHEET_HASHES,
            "No stylesheet found",
            "stylesheet",
            "No default stylesheet matched",
        ))
    }
}

/// Fraction of page fragments that must be found verbatim in the reference
/// text before the page counts as generated from it.
const CONTENT_SIMILARITY_THRESHOLD: f64 = 0.2;

/// Glastopf generates its decoy pages from a public-domain literary text.
/// This check downloads that reference text, slices each fetched page into
/// paragraph fragments and measures how many appear verbatim in the text.
/// The first page above the threshold wins.
pub struct GlastopfContentCheck {
    reference_url: String,
    timeout: Duration,
}

impl GlastopfContentCheck {
    pub fn new(reference_url: String, timeout: Duration) -> Self {
        Self {
            reference_url,
            timeout,
        }
    }

    fn fetch_reference(&self) -> Result<String, PotcheckError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        // the mirror is flaky; one retry matches what it usually needs
        let response = match client.get(&self.reference_url).send() {
            Ok(resp) => resp,
            Err(_) => client.get(&self.reference_url).send()?,
        };

        Ok(response.error_for_status()?.text()?)
    }
}

impl Heuristic for GlastopfContentCheck {
    fn descriptor(&self) -> Descriptor {
        Descriptor {
            name: "Default Glastopf Website Content Test",
            description: "Test unchanged source for website content",
            weight: 60,
            doc_file: "default_glastopf_site.html",
        }
    }

    fn run(&self, snapshot: &TargetSnapshot) -> Result<Outcome> {
        let book = match self.fetch_reference() {
            Ok(text) => text,
            Err(err) => {
                return Ok(Outcome::unknown(format!(
                    "failed to download reference text: {}",
                    err
                )))
            }
        };

        let sites = snapshot.websites();
        if sites.is_empty() {
            return Ok(Outcome::not_applicable("No website found"));
        }

        let paragraph = Regex::new(r"(?s)<p.*?</p>")?;
        let p_tags = Regex::new(r"</?p>")?;
        let anchors = Regex::new(r"(?s)<a.*?/a>")?;

        for content in &sites {
            let Some(article) = paragraph.find(content) else {
                continue;
            };

            let article = p_tags.replace_all(article.as_str(), "");
            let article = anchors.replace_all(&article, "---search---");

            let items: Vec<&str> = article.split("---search---").collect();
            let total = items.len();
            let matched = items
                .iter()
                .filter(|item| item.len() > 15 && book.contains(item.trim_matches(' ')))
                .count();

            if matched as f64 > CONTENT_SIMILARITY_THRESHOLD * total as f64 {
                return Ok(Outcome::warning("Default Glastopf content source was used"));
            }
        }

        Ok(Outcome::ok("No default content found"))
    }
}
