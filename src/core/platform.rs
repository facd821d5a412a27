use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checks::Heuristic;
use crate::core::outcome::{karma, ResultKind};
use crate::core::output;
use crate::core::snapshot::TargetSnapshot;

/// One executed check, in battery order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TestRecord {
    pub name: String,
    pub report: String,
    pub kind: ResultKind,
    pub karma: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub target: String,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<TestRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub ok: usize,
    pub warnings: usize,
    pub unknown: usize,
    pub karma: i64,
}

impl AggregateReport {
    /// Tallies over all recorded outcomes. NotApplicable joins none of the
    /// three counts and contributes zero karma; the total is independent of
    /// battery order.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            ok: 0,
            warnings: 0,
            unknown: 0,
            karma: 0,
        };

        for record in &self.records {
            stats.karma += record.karma;
            match record.kind {
                ResultKind::Ok => stats.ok += 1,
                ResultKind::Warning => stats.warnings += 1,
                ResultKind::Unknown => stats.unknown += 1,
                ResultKind::NotApplicable => {}
            }
        }

        stats
    }
}

/// Runs an ordered battery of checks against one snapshot and aggregates
/// their verdicts.
pub struct TestPlatform<'a> {
    battery: Vec<Box<dyn Heuristic>>,
    snapshot: &'a TargetSnapshot,
}

impl<'a> TestPlatform<'a> {
    pub fn new(battery: Vec<Box<dyn Heuristic>>, snapshot: &'a TargetSnapshot) -> Self {
        Self { battery, snapshot }
    }

    /// Execute the battery in its fixed order.
    ///
    /// Every check gets a fresh outcome; duplicate names run twice and both
    /// count. A check returning `Err` aborts the remaining battery. When
    /// `verbose`, each verdict is rendered as it lands; `brief` suppresses
    /// NotApplicable rows from the rendering only, never from the report.
    pub fn run(&self, verbose: bool, brief: bool) -> Result<AggregateReport> {
        if verbose {
            output::print_header();
        }

        let mut records = Vec::with_capacity(self.battery.len());

        for check in &self.battery {
            let descriptor = check.descriptor();
            tracing::debug!("running check '{}'", descriptor.name);

            let outcome = check
                .run(self.snapshot)
                .with_context(|| format!("check '{}' crashed", descriptor.name))?;

            let record = TestRecord {
                name: descriptor.name.to_string(),
                report: outcome.report,
                kind: outcome.kind,
                karma: karma(outcome.kind, descriptor.weight),
            };

            if verbose && !(brief && record.kind == ResultKind::NotApplicable) {
                output::print_record(&record, &descriptor.doc_link());
            }

            records.push(record);
        }

        let report = AggregateReport {
            target: self.snapshot.address().to_string(),
            generated_at: Utc::now(),
            records,
        };

        if verbose {
            output::print_stats(&report.stats());
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::core::outcome::{Descriptor, Outcome};
    use crate::core::snapshot::fakes::snapshot;

    struct FixedCheck {
        name: &'static str,
        weight: u32,
        kind: ResultKind,
    }

    impl Heuristic for FixedCheck {
        fn descriptor(&self) -> Descriptor {
            Descriptor {
                name: self.name,
                description: "",
                weight: self.weight,
                doc_file: "fixed.html",
            }
        }

        fn run(&self, _snapshot: &TargetSnapshot) -> Result<Outcome> {
            Ok(Outcome {
                kind: self.kind,
                report: "fixed verdict".into(),
            })
        }
    }

    struct BrokenCheck;

    impl Heuristic for BrokenCheck {
        fn descriptor(&self) -> Descriptor {
            Descriptor {
                name: "Broken",
                description: "",
                weight: 10,
                doc_file: "broken.html",
            }
        }

        fn run(&self, _snapshot: &TargetSnapshot) -> Result<Outcome> {
            Err(anyhow!("index out of range"))
        }
    }

    fn fixed(name: &'static str, weight: u32, kind: ResultKind) -> Box<dyn Heuristic> {
        Box::new(FixedCheck { name, weight, kind })
    }

    #[test]
    fn battery_totals_follow_the_karma_table() {
        let snap = snapshot(&[], None);
        let platform = TestPlatform::new(
            vec![
                fixed("a", 100, ResultKind::Ok),
                fixed("b", 30, ResultKind::Warning),
            ],
            &snap,
        );

        let report = platform.run(false, false).unwrap();
        let stats = report.stats();
        assert_eq!(stats.karma, 70);
        assert_eq!(stats.ok, 1);
        assert_eq!(stats.warnings, 1);
        assert_eq!(stats.unknown, 0);
    }

    #[test]
    fn not_applicable_is_excluded_from_counts_but_kept_in_the_report() {
        let snap = snapshot(&[], None);
        let platform = TestPlatform::new(
            vec![
                fixed("a", 50, ResultKind::NotApplicable),
                fixed("b", 20, ResultKind::Unknown),
            ],
            &snap,
        );

        let report = platform.run(false, true).unwrap();
        assert_eq!(report.records.len(), 2);

        let stats = report.stats();
        assert_eq!((stats.ok, stats.warnings, stats.unknown), (0, 0, 1));
        assert_eq!(stats.karma, 0);
    }

    #[test]
    fn permuting_the_battery_changes_order_but_not_totals() {
        let snap = snapshot(&[], None);
        let forward = TestPlatform::new(
            vec![
                fixed("a", 100, ResultKind::Ok),
                fixed("b", 30, ResultKind::Warning),
                fixed("c", 90, ResultKind::Unknown),
            ],
            &snap,
        )
        .run(false, false)
        .unwrap();
        let backward = TestPlatform::new(
            vec![
                fixed("c", 90, ResultKind::Unknown),
                fixed("b", 30, ResultKind::Warning),
                fixed("a", 100, ResultKind::Ok),
            ],
            &snap,
        )
        .run(false, false)
        .unwrap();

        assert_eq!(forward.records[0].name, "a");
        assert_eq!(backward.records[0].name, "c");
        assert_eq!(forward.stats(), backward.stats());
    }

    #[test]
    fn duplicate_names_both_execute_and_both_count() {
        let snap = snapshot(&[], None);
        let platform = TestPlatform::new(
            vec![
                fixed("dup", 10, ResultKind::Ok),
                fixed("dup", 10, ResultKind::Ok),
            ],
            &snap,
        );

        let report = platform.run(false, false).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.stats().karma, 20);
    }

    #[test]
    fn rerunning_the_same_battery_yields_identical_records() {
        let snap = snapshot(&[], None);
        let platform = TestPlatform::new(
            vec![
                fixed("a", 100, ResultKind::Ok),
                fixed("b", 30, ResultKind::Warning),
            ],
            &snap,
        );

        let first = platform.run(false, false).unwrap();
        let second = platform.run(false, false).unwrap();
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn a_crashing_check_aborts_the_battery() {
        let snap = snapshot(&[], None);
        let platform = TestPlatform::new(
            vec![
                fixed("a", 100, ResultKind::Ok),
                Box::new(BrokenCheck),
                fixed("b", 30, ResultKind::Ok),
            ],
            &snap,
        );

        let err = platform.run(false, false).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }
}
