//! Member and optional member expression alignment, end to end.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use astalign::{AlignmentVerdict, DifferenceKind, FsSnapshotStore, Observed, SnapshotMode, SnapshotOutcome};
use astalign_conformance::{load_corpus, reference_runner, snapshot_dir, standard_runner};
use tempfile::TempDir;

const OPTIONAL_CASES: [(&str, usize); 4] = [
    ("optional_member_expression_non_computed", 5),
    ("optional_member_expression_computed", 6),
    ("optional_member_expression_parenthesized_non_computed", 6),
    ("optional_member_expression_parenthesized_computed", 6),
];

#[test]
fn corpus_passes_with_committed_snapshots() {
    let corpus = load_corpus().unwrap();
    let summary = standard_runner().run_corpus(&corpus, None);

    for case in &summary.cases {
        assert!(case.passed(), "{} failed: {:#?}", case.case_id, case);
        assert!(case.stale_expectations.is_empty(), "{} has stale expectations", case.case_id);
        assert!(
            matches!(
                case.snapshot_result,
                Some(SnapshotOutcome::Matched | SnapshotOutcome::Written { .. })
            ),
            "{}: {:?}",
            case.case_id,
            case.snapshot_result
        );
    }
    assert_eq!(summary.total, 6);
    assert_eq!(summary.expected_failures, 4);
    assert!(summary.all_passed());
}

#[test]
fn plain_members_align_exactly() {
    let corpus = load_corpus().unwrap();
    let runner = reference_runner();
    for name in ["member_expression_non_computed", "member_expression_computed"] {
        let report = runner.run(corpus.get(name).unwrap());
        assert_eq!(report.verdict, Some(AlignmentVerdict::Pass), "{name}");
        assert!(report.differences.values().all(Vec::is_empty), "{name}");
    }
}

#[test]
fn optional_chains_diverge_only_at_chain_tops() {
    let corpus = load_corpus().unwrap();
    let runner = reference_runner();
    for (name, statements) in OPTIONAL_CASES {
        let report = runner.run(corpus.get(name).unwrap());
        assert_eq!(report.per_reference_verdicts["espree"], AlignmentVerdict::ExpectedFail, "{name}");
        assert_eq!(report.per_reference_verdicts["babel"], AlignmentVerdict::Pass, "{name}");

        let diffs = &report.differences["espree"];
        assert_eq!(diffs.len(), statements, "{name}: {diffs:#?}");
        for diff in diffs {
            assert_eq!(diff.kind, DifferenceKind::TypeMismatch);
            assert_eq!(diff.reference, Some(Observed::Node("ChainExpression".into())));
        }
    }
}

#[test]
fn parenthesized_chain_tops_sit_under_the_outer_member() {
    let corpus = load_corpus().unwrap();
    let report = reference_runner().run(corpus.get("optional_member_expression_parenthesized_non_computed").unwrap());
    let paths: Vec<String> = report.differences["espree"].iter().map(|d| d.path.to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "body[0].expression",
            "body[1].expression.object",
            "body[2].expression",
            "body[3].expression.object",
            "body[4].expression",
            "body[5].expression.object",
        ]
    );
}

#[test]
fn every_snapshot_belongs_to_a_case() {
    let corpus = load_corpus().unwrap();
    let cases: BTreeSet<String> = corpus.iter().map(|case| format!("{}.snap", case.name)).collect();
    let files: BTreeSet<String> = fs::read_dir(snapshot_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(cases, files);
}

#[test]
fn updating_unchanged_baselines_writes_nothing() {
    let scratch = TempDir::new().unwrap();
    for entry in fs::read_dir(snapshot_dir()).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), scratch.path().join(entry.file_name())).unwrap();
    }

    let runner = reference_runner().snapshots(Arc::new(FsSnapshotStore::new(scratch.path())), SnapshotMode::Update);
    let summary = runner.run_corpus(&load_corpus().unwrap(), None);
    for case in &summary.cases {
        assert_eq!(case.snapshot_result, Some(SnapshotOutcome::Matched), "{}", case.case_id);
    }
}

#[test]
fn json_report_shape() {
    let corpus = load_corpus().unwrap();
    let summary = reference_runner().run_corpus(&corpus, Some("parenthesized_computed"));
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["total"], 1);
    let case = &value["cases"][0];
    assert_eq!(case["caseId"], "optional_member_expression_parenthesized_computed");
    assert_eq!(case["verdict"], "EXPECTED_FAIL");
    assert_eq!(case["snapshotResult"], serde_json::Value::Null);
    assert_eq!(case["differences"]["espree"][0]["path"], "body[0].expression");
    assert_eq!(case["differences"]["espree"][0]["primary"]["value"], "OptionalMemberExpression");
}
