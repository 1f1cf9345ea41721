//! Divergence Classifier: differences plus declared tolerance to a verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::CategoryRegistry;
use crate::compare::DifferenceRecord;

/// How much divergence a case declares acceptable against one reference.
///
/// Written as the literal `false`, `true` or `"<category tag>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ToleranceLiteral", into = "ToleranceLiteral")]
pub enum ToleranceSpec {
    /// Trees must match exactly.
    #[default]
    Exact,
    /// Any mismatch is expected.
    AnyMismatch,
    /// Mismatch is expected only within the named category.
    Category(String),
}

impl ToleranceSpec {
    pub fn category(tag: impl Into<String>) -> Self {
        Self::Category(tag.into())
    }

    /// Whether the declaration expects the comparison to fail.
    pub const fn expects_failure(&self) -> bool {
        !matches!(self, Self::Exact)
    }
}

impl fmt::Display for ToleranceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("false"),
            Self::AnyMismatch => f.write_str("true"),
            Self::Category(tag) => write!(f, "{tag:?}"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ToleranceLiteral {
    Flag(bool),
    Tag(String),
}

impl From<ToleranceLiteral> for ToleranceSpec {
    fn from(literal: ToleranceLiteral) -> Self {
        match literal {
            ToleranceLiteral::Flag(false) => Self::Exact,
            ToleranceLiteral::Flag(true) => Self::AnyMismatch,
            ToleranceLiteral::Tag(tag) => Self::Category(tag),
        }
    }
}

impl From<ToleranceSpec> for ToleranceLiteral {
    fn from(spec: ToleranceSpec) -> Self {
        match spec {
            ToleranceSpec::Exact => Self::Flag(false),
            ToleranceSpec::AnyMismatch => Self::Flag(true),
            ToleranceSpec::Category(tag) => Self::Tag(tag),
        }
    }
}

/// Outcome of one case against one reference, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentVerdict {
    Pass,
    ExpectedFail,
    UnexpectedFail,
}

impl AlignmentVerdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::ExpectedFail => "EXPECTED_FAIL",
            Self::UnexpectedFail => "UNEXPECTED_FAIL",
        }
    }

    /// The most severe verdict, `Pass` when there are none.
    pub fn most_severe(verdicts: impl IntoIterator<Item = Self>) -> Self {
        verdicts.into_iter().max().unwrap_or(Self::Pass)
    }
}

impl fmt::Display for AlignmentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification against a tag the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown divergence category `{tag}`")]
pub struct UnknownCategory {
    pub tag: String,
}

/// Decide the verdict for `differences` under `tolerance`.
///
/// No differences is always `Pass`, whatever was declared.
pub fn classify(
    differences: &[DifferenceRecord],
    tolerance: &ToleranceSpec,
    registry: &CategoryRegistry,
) -> Result<AlignmentVerdict, UnknownCategory> {
    if differences.is_empty() {
        return Ok(AlignmentVerdict::Pass);
    }
    match tolerance {
        ToleranceSpec::Exact => Ok(AlignmentVerdict::UnexpectedFail),
        ToleranceSpec::AnyMismatch => Ok(AlignmentVerdict::ExpectedFail),
        ToleranceSpec::Category(tag) => {
            let category = registry
                .get(tag)
                .ok_or_else(|| UnknownCategory { tag: tag.clone() })?;
            if differences.iter().all(|record| category.accepts(record)) {
                Ok(AlignmentVerdict::ExpectedFail)
            } else {
                Ok(AlignmentVerdict::UnexpectedFail)
            }
        }
    }
}

/// Whether a declared failure expectation no longer fires.
pub const fn is_stale(verdict: AlignmentVerdict, tolerance: &ToleranceSpec) -> bool {
    matches!(verdict, AlignmentVerdict::Pass) && tolerance.expects_failure()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{DifferenceKind, Observed};
    use crate::node::{NodePath, Scalar};

    fn chain_mismatch() -> DifferenceRecord {
        DifferenceRecord {
            path: NodePath::root().child("body").index(0).child("expression"),
            kind: DifferenceKind::TypeMismatch,
            primary: Some(Observed::Node("OptionalMemberExpression".into())),
            reference: Some(Observed::Node("ChainExpression".into())),
        }
    }

    fn name_mismatch() -> DifferenceRecord {
        DifferenceRecord {
            path: NodePath::root().child("name"),
            kind: DifferenceKind::FieldMismatch,
            primary: Some(Observed::Scalar(Scalar::from("x"))),
            reference: Some(Observed::Scalar(Scalar::from("y"))),
        }
    }

    #[test]
    fn empty_differences_pass_under_any_tolerance() {
        let registry = CategoryRegistry::builtin();
        for tolerance in [
            ToleranceSpec::Exact,
            ToleranceSpec::AnyMismatch,
            ToleranceSpec::category("ast-diff"),
            ToleranceSpec::category("not-registered"),
        ] {
            assert_eq!(classify(&[], &tolerance, &registry), Ok(AlignmentVerdict::Pass));
        }
    }

    #[test]
    fn exact_and_any_mismatch() {
        let registry = CategoryRegistry::builtin();
        let diffs = [name_mismatch()];
        assert_eq!(classify(&diffs, &ToleranceSpec::Exact, &registry), Ok(AlignmentVerdict::UnexpectedFail));
        assert_eq!(classify(&diffs, &ToleranceSpec::AnyMismatch, &registry), Ok(AlignmentVerdict::ExpectedFail));
    }

    #[test]
    fn category_requires_every_record_to_fit() {
        let registry = CategoryRegistry::builtin();
        let ast_diff = ToleranceSpec::category("ast-diff");
        assert_eq!(classify(&[chain_mismatch()], &ast_diff, &registry), Ok(AlignmentVerdict::ExpectedFail));
        assert_eq!(
            classify(&[chain_mismatch(), name_mismatch()], &ast_diff, &registry),
            Ok(AlignmentVerdict::UnexpectedFail)
        );
    }

    #[test]
    fn unknown_category_is_an_error() {
        let registry = CategoryRegistry::builtin();
        let err = classify(&[chain_mismatch()], &ToleranceSpec::category("typo"), &registry).unwrap_err();
        assert_eq!(err.to_string(), "unknown divergence category `typo`");
    }

    #[test]
    fn verdicts_fold_to_most_severe() {
        use AlignmentVerdict::{ExpectedFail, Pass, UnexpectedFail};
        assert_eq!(AlignmentVerdict::most_severe([]), Pass);
        assert_eq!(AlignmentVerdict::most_severe([Pass, ExpectedFail]), ExpectedFail);
        assert_eq!(AlignmentVerdict::most_severe([UnexpectedFail, ExpectedFail, Pass]), UnexpectedFail);
    }

    #[test]
    fn stale_expectations() {
        assert!(is_stale(AlignmentVerdict::Pass, &ToleranceSpec::AnyMismatch));
        assert!(is_stale(AlignmentVerdict::Pass, &ToleranceSpec::category("ast-diff")));
        assert!(!is_stale(AlignmentVerdict::Pass, &ToleranceSpec::Exact));
        assert!(!is_stale(AlignmentVerdict::ExpectedFail, &ToleranceSpec::AnyMismatch));
    }

    #[test]
    fn tolerance_literals() {
        let parsed: Vec<ToleranceSpec> = serde_json::from_str(r#"[false, true, "ast-diff"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![ToleranceSpec::Exact, ToleranceSpec::AnyMismatch, ToleranceSpec::category("ast-diff")]
        );
        assert_eq!(serde_json::to_string(&ToleranceSpec::AnyMismatch).unwrap(), "true");
        assert_eq!(serde_json::to_string(&AlignmentVerdict::ExpectedFail).unwrap(), "\"EXPECTED_FAIL\"");
    }
}
