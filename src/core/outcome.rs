use serde::Serialize;

/// Root of the online manuals, one page per check.
pub const DOC_ROOT: &str = "http://checkpot.readthedocs.io/en/master/test_manuals/";

/// Closed set of verdicts a check can reach.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ResultKind {
    /// No honeypot indicator found.
    Ok,
    /// Indicator found.
    Warning,
    /// The check could not complete (collaborator failure).
    Unknown,
    /// Preconditions absent, e.g. the required service is not running.
    NotApplicable,
}

/// Static per-check metadata, fixed at definition time.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Positive karma weight; the sign is applied by [`karma`].
    pub weight: u32,
    pub doc_file: &'static str,
}

impl Descriptor {
    pub fn doc_link(&self) -> String {
        format!("{}{}", DOC_ROOT, self.doc_file)
    }
}

/// The single verdict a check run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub kind: ResultKind,
    pub report: String,
}

impl Outcome {
    pub fn ok(report: impl Into<String>) -> Self {
        Self { kind: ResultKind::Ok, report: report.into() }
    }

    pub fn warning(report: impl Into<String>) -> Self {
        Self { kind: ResultKind::Warning, report: report.into() }
    }

    pub fn unknown(report: impl Into<String>) -> Self {
        Self { kind: ResultKind::Unknown, report: report.into() }
    }

    pub fn not_applicable(report: impl Into<String>) -> Self {
        Self { kind: ResultKind::NotApplicable, report: report.into() }
    }
}

/// Karma contribution of one verdict. Pure policy, applied once by the
/// platform when it records a check's outcome.
pub fn karma(kind: ResultKind, weight: u32) -> i64 {
    match kind {
        ResultKind::Ok => i64::from(weight),
        ResultKind::Warning => -i64::from(weight),
        ResultKind::Unknown | ResultKind::NotApplicable => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn karma_sign_follows_result_kind() {
        assert_eq!(karma(ResultKind::Ok, 100), 100);
        assert_eq!(karma(ResultKind::Warning, 100), -100);
        assert_eq!(karma(ResultKind::Unknown, 100), 0);
        assert_eq!(karma(ResultKind::NotApplicable, 100), 0);
    }

    #[test]
    fn doc_link_joins_root_and_file() {
        let desc = Descriptor {
            name: "Example",
            description: "",
            weight: 10,
            doc_file: "example.html",
        };
        assert_eq!(
            desc.doc_link(),
            "http://checkpot.readthedocs.io/en/master/test_manuals/example.html"
        );
    }
}
