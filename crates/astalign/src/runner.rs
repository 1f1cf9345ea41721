//! Alignment Case Runner: parse, normalize, compare, classify and snapshot
//! one case against every configured reference.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::category::CategoryRegistry;
use crate::classify::{AlignmentVerdict, ToleranceSpec, classify, is_stale};
use crate::compare::{DifferenceRecord, compare};
use crate::corpus::{AlignmentCase, Corpus};
use crate::dialect::Dialect;
use crate::normalize::{NormalizationError, NormalizeOptions, normalize, normalize_with};
use crate::parser::{ParserError, Reference, SourceParser, SyntaxError};
use crate::snapshot::{SnapshotMode, SnapshotOutcome, SnapshotStore, record, render};

/// A failure that ends one case without affecting its siblings.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaseError {
    #[error("primary parser rejected the source: {0}")]
    PrimaryParse(SyntaxError),

    #[error("{parser} produced a malformed tree: {source}")]
    Normalization {
        parser: String,
        source: NormalizationError,
    },

    #[error("reference `{reference}` declares unknown divergence category `{tag}`")]
    UnknownCategory { reference: String, tag: String },

    #[error("parser `{parser}` failed: {message}")]
    ParserFailure { parser: String, message: String },
}

impl CaseError {
    fn parser_failure(parser: &str, message: String) -> Self {
        Self::ParserFailure {
            parser: parser.to_string(),
            message,
        }
    }
}

/// Structured result of one case, in the shape the report sink consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub case_id: String,
    /// Overall verdict; `None` when the case errored.
    pub verdict: Option<AlignmentVerdict>,
    pub snapshot_result: Option<SnapshotOutcome>,
    pub per_reference_verdicts: BTreeMap<String, AlignmentVerdict>,
    pub differences: BTreeMap<String, Vec<DifferenceRecord>>,
    /// References whose declared failure no longer occurs.
    pub stale_expectations: Vec<String>,
    #[serde(serialize_with = "display_error")]
    pub error: Option<CaseError>,
}

fn display_error<S: Serializer>(error: &Option<CaseError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.collect_str(error),
        None => serializer.serialize_none(),
    }
}

impl CaseReport {
    fn new(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            verdict: None,
            snapshot_result: None,
            per_reference_verdicts: BTreeMap::new(),
            differences: BTreeMap::new(),
            stale_expectations: Vec::new(),
            error: None,
        }
    }

    /// No case error, no unexpected divergence, no failing snapshot.
    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self.verdict != Some(AlignmentVerdict::UnexpectedFail)
            && !self.snapshot_failed()
    }

    pub fn snapshot_failed(&self) -> bool {
        self.snapshot_result
            .as_ref()
            .is_some_and(SnapshotOutcome::is_failure)
    }
}

/// Aggregate of a corpus run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Cases whose overall verdict is `EXPECTED_FAIL`.
    pub expected_failures: usize,
    pub snapshot_failures: usize,
    pub errors: usize,
    pub stale_expectations: usize,
    #[serde(rename = "durationMs", serialize_with = "millis")]
    pub duration: Duration,
    pub cases: Vec<CaseReport>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

impl RunSummary {
    pub fn from_reports(cases: Vec<CaseReport>, duration: Duration) -> Self {
        let mut summary = Self {
            total: cases.len(),
            duration,
            ..Self::default()
        };
        for case in &cases {
            if case.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            if case.verdict == Some(AlignmentVerdict::ExpectedFail) {
                summary.expected_failures += 1;
            }
            if case.snapshot_failed() {
                summary.snapshot_failures += 1;
            }
            if case.error.is_some() {
                summary.errors += 1;
            }
            summary.stale_expectations += case.stale_expectations.len();
        }
        summary.cases = cases;
        summary
    }

    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|case| !case.passed())
    }
}

/// Runs alignment cases against a primary parser and its references.
pub struct AlignmentRunner {
    primary: Arc<dyn SourceParser>,
    snapshot_dialect: Dialect,
    references: Vec<Reference>,
    categories: CategoryRegistry,
    snapshots: Option<(Arc<dyn SnapshotStore>, SnapshotMode)>,
}

impl AlignmentRunner {
    /// A runner with no references, the built-in categories and no snapshots.
    pub fn new(primary: Arc<dyn SourceParser>) -> Self {
        Self {
            primary,
            snapshot_dialect: Dialect::hermes_snapshot(),
            references: Vec::new(),
            categories: CategoryRegistry::builtin(),
            snapshots: None,
        }
    }

    /// Dialect used to normalize the primary tree for its snapshot.
    #[must_use]
    pub fn snapshot_dialect(mut self, dialect: Dialect) -> Self {
        self.snapshot_dialect = dialect;
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    #[must_use]
    pub fn categories(mut self, categories: CategoryRegistry) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn snapshots(mut self, store: Arc<dyn SnapshotStore>, mode: SnapshotMode) -> Self {
        self.snapshots = Some((store, mode));
        self
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn category_registry(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// Run one case. Failures are recorded on the report, never propagated.
    pub fn run(&self, case: &AlignmentCase) -> CaseReport {
        let mut report = CaseReport::new(&case.name);
        if let Err(error) = self.evaluate(case, &mut report) {
            warn!(case = %case.name, %error, "alignment case errored");
            report.verdict = None;
            report.per_reference_verdicts.clear();
            report.differences.clear();
            report.stale_expectations.clear();
            report.error = Some(error);
        }
        report
    }

    fn evaluate(&self, case: &AlignmentCase, report: &mut CaseReport) -> Result<(), CaseError> {
        for declared in case.tolerances.keys() {
            if !self.references.iter().any(|r| &r.name == declared) {
                warn!(case = %case.name, reference = %declared, "tolerance declared for unconfigured reference");
            }
        }

        let primary = self.primary.parse(&case.code).map_err(|error| match error {
            ParserError::Syntax(error) => CaseError::PrimaryParse(error),
            ParserError::Failure(message) => CaseError::parser_failure(self.primary.name(), message),
        })?;

        report.snapshot_result = self.snapshot(case, &primary)?;

        let mut verdicts = Vec::with_capacity(self.references.len());
        for reference in &self.references {
            let tolerance = case
                .tolerance_for(&reference.name)
                .cloned()
                .unwrap_or_default();
            let differences = self.differences(&primary, reference, &tolerance, case)?;
            let verdict = classify(&differences, &tolerance, &self.categories).map_err(|e| {
                CaseError::UnknownCategory {
                    reference: reference.name.clone(),
                    tag: e.tag,
                }
            })?;
            debug!(
                case = %case.name,
                reference = %reference.name,
                %verdict,
                differences = differences.len(),
                "reference compared"
            );
            if is_stale(verdict, &tolerance) {
                report.stale_expectations.push(reference.name.clone());
            }
            report.per_reference_verdicts.insert(reference.name.clone(), verdict);
            report.differences.insert(reference.name.clone(), differences);
            verdicts.push(verdict);
        }

        report.verdict = Some(AlignmentVerdict::most_severe(verdicts));
        Ok(())
    }

    fn differences(
        &self,
        primary: &serde_json::Value,
        reference: &Reference,
        tolerance: &ToleranceSpec,
        case: &AlignmentCase,
    ) -> Result<Vec<DifferenceRecord>, CaseError> {
        let options = match tolerance {
            ToleranceSpec::Category(tag) => {
                let category = self
                    .categories
                    .get(tag)
                    .ok_or_else(|| CaseError::UnknownCategory {
                        reference: reference.name.clone(),
                        tag: tag.clone(),
                    })?;
                NormalizeOptions::unwrapping(category.unwrap.iter().cloned())
            }
            ToleranceSpec::Exact | ToleranceSpec::AnyMismatch => NormalizeOptions::default(),
        };

        let raw = match reference.parser.parse(&case.code) {
            Ok(raw) => raw,
            Err(ParserError::Syntax(error)) => {
                debug!(case = %case.name, reference = %reference.name, %error, "reference rejected source");
                return Ok(vec![DifferenceRecord::reference_parse_error(&error)]);
            }
            Err(ParserError::Failure(message)) => {
                return Err(CaseError::parser_failure(&reference.name, message));
            }
        };

        let primary_tree = normalize_with(primary, &reference.dialect, &options).map_err(|source| {
            CaseError::Normalization {
                parser: self.primary.name().to_string(),
                source,
            }
        })?;
        let reference_tree =
            normalize_with(&raw, &reference.dialect, &options).map_err(|source| {
                CaseError::Normalization {
                    parser: reference.name.clone(),
                    source,
                }
            })?;
        Ok(compare(&primary_tree, &reference_tree))
    }

    fn snapshot(
        &self,
        case: &AlignmentCase,
        primary: &serde_json::Value,
    ) -> Result<Option<SnapshotOutcome>, CaseError> {
        let Some((store, mode)) = &self.snapshots else {
            return Ok(None);
        };
        let tree = normalize(primary, &self.snapshot_dialect).map_err(|source| {
            CaseError::Normalization {
                parser: self.primary.name().to_string(),
                source,
            }
        })?;
        let outcome = match record(store.as_ref(), &case.name, &render(&tree), *mode) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(case = %case.name, %error, "snapshot store failed");
                SnapshotOutcome::Error {
                    message: error.to_string(),
                }
            }
        };
        Ok(Some(outcome))
    }

    /// Run every case whose name contains `filter`, keeping corpus order.
    pub fn run_corpus(&self, corpus: &Corpus, filter: Option<&str>) -> RunSummary {
        let start = Instant::now();
        let selected: Vec<&AlignmentCase> = corpus
            .iter()
            .filter(|case| filter.is_none_or(|pattern| case.name.contains(pattern)))
            .collect();
        info!(cases = selected.len(), references = self.references.len(), "running corpus");

        #[cfg(feature = "parallel")]
        let reports: Vec<CaseReport> = selected.par_iter().map(|case| self.run(case)).collect();
        #[cfg(not(feature = "parallel"))]
        let reports: Vec<CaseReport> = selected.iter().map(|case| self.run(case)).collect();

        let summary = RunSummary::from_reports(reports, start.elapsed());
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            "corpus finished"
        );
        summary
    }
}

impl std::fmt::Debug for AlignmentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentRunner")
            .field("primary", &self.primary.name())
            .field("references", &self.references)
            .field("categories", &self.categories.len())
            .field("snapshots", &self.snapshots.as_ref().map(|(_, mode)| *mode))
            .finish_non_exhaustive()
    }
}
