//! Declared test corpus: named alignment cases with per-reference tolerance.
//!
//! ```json
//! {
//!   "member_expression_non_computed": {
//!     "code": "x.y;",
//!     "espree": { "expectToFail": false },
//!     "babel": { "expectToFail": false }
//!   }
//! }
//! ```
//!
//! The same shape is accepted as TOML. Cases keep their declaration order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::classify::ToleranceSpec;
use crate::snapshot::sanitize_key;

/// One unit of comparison work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentCase {
    pub name: String,
    pub code: String,
    /// Declared tolerance per reference name.
    pub tolerances: BTreeMap<String, ToleranceSpec>,
}

impl AlignmentCase {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            tolerances: BTreeMap::new(),
        }
    }

    /// Declare the tolerance against `reference`.
    #[must_use]
    pub fn expect(mut self, reference: impl Into<String>, tolerance: ToleranceSpec) -> Self {
        self.tolerances.insert(reference.into(), tolerance);
        self
    }

    pub fn tolerance_for(&self, reference: &str) -> Option<&ToleranceSpec> {
        self.tolerances.get(reference)
    }
}

/// Corpus loading failure.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON corpus: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML corpus: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported corpus format for {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("corpus declares no cases")]
    Empty,

    #[error("corpus declares a case with an empty name")]
    EmptyName,

    #[error("corpus declares case `{0}` more than once")]
    DuplicateCase(String),

    #[error("cases `{first}` and `{second}` would share the snapshot baseline `{key}.snap`")]
    SnapshotKeyCollision {
        first: String,
        second: String,
        key: String,
    },
}

/// An ordered collection of alignment cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    cases: Vec<AlignmentCase>,
}

impl Corpus {
    /// Build a corpus, rejecting unnamed and duplicate cases.
    ///
    /// Names must also stay distinct once mapped onto snapshot file names
    /// (ignoring ASCII case), so every case owns its own baseline.
    pub fn new(cases: Vec<AlignmentCase>) -> Result<Self, CorpusError> {
        if cases.is_empty() {
            return Err(CorpusError::Empty);
        }
        let mut seen = BTreeSet::new();
        let mut keys: BTreeMap<String, &str> = BTreeMap::new();
        for case in &cases {
            if case.name.trim().is_empty() {
                return Err(CorpusError::EmptyName);
            }
            if !seen.insert(case.name.as_str()) {
                return Err(CorpusError::DuplicateCase(case.name.clone()));
            }
            let key = sanitize_key(&case.name);
            if let Some(first) = keys.insert(key.to_ascii_lowercase(), &case.name) {
                return Err(CorpusError::SnapshotKeyCollision {
                    first: first.to_string(),
                    second: case.name.clone(),
                    key,
                });
            }
        }
        Ok(Self { cases })
    }

    pub fn from_json_str(text: &str) -> Result<Self, CorpusError> {
        let raw: RawCorpus = serde_json::from_str(text)?;
        raw.into_corpus()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CorpusError> {
        let raw: RawCorpus = toml::from_str(text)?;
        raw.into_corpus()
    }

    /// Load a `.json` or `.toml` corpus file.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let format = path.extension().and_then(|ext| ext.to_str());
        if !matches!(format, Some("json" | "toml")) {
            return Err(CorpusError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if format == Some("json") {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn cases(&self) -> &[AlignmentCase] {
        &self.cases
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignmentCase> {
        self.cases.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AlignmentCase> {
        self.cases.iter().find(|case| case.name == name)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a AlignmentCase;
    type IntoIter = std::slice::Iter<'a, AlignmentCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

/// Remove the indentation shared by all non-blank lines, plus leading and
/// trailing blank lines, as for an indented template-literal fixture.
pub fn dedent(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let last = lines.iter().rposition(|l| !l.trim().is_empty()).unwrap_or(first);
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for line in lines {
        out.push_str(line.get(indent..).unwrap_or_else(|| line.trim_start()).trim_end());
        out.push('\n');
    }
    out
}

/// Per-reference entry: `{ "expectToFail": ... }`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Expectation {
    #[serde(rename = "expectToFail")]
    expect_to_fail: ToleranceSpec,
}

struct RawCase {
    code: String,
    tolerances: BTreeMap<String, ToleranceSpec>,
}

impl<'de> Deserialize<'de> for RawCase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CaseVisitor;

        impl<'de> Visitor<'de> for CaseVisitor {
            type Value = RawCase;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a case table with `code` and per-reference expectations")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawCase, A::Error> {
                let mut code = None;
                let mut tolerances = BTreeMap::new();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "code" {
                        if code.is_some() {
                            return Err(de::Error::duplicate_field("code"));
                        }
                        code = Some(map.next_value::<String>()?);
                    } else {
                        let expectation: Expectation = map.next_value()?;
                        if tolerances.insert(key.clone(), expectation.expect_to_fail).is_some() {
                            return Err(de::Error::custom(format!("reference `{key}` declared twice")));
                        }
                    }
                }
                let code = code.ok_or_else(|| de::Error::missing_field("code"))?;
                Ok(RawCase { code, tolerances })
            }
        }

        deserializer.deserialize_map(CaseVisitor)
    }
}

/// Top-level map in declaration order.
struct RawCorpus(Vec<(String, RawCase)>);

impl<'de> Deserialize<'de> for RawCorpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = RawCorpus;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from case name to case")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawCorpus, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, RawCase>()? {
                    entries.push(entry);
                }
                Ok(RawCorpus(entries))
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}

impl RawCorpus {
    fn into_corpus(self) -> Result<Corpus, CorpusError> {
        let cases = self
            .0
            .into_iter()
            .map(|(name, raw)| AlignmentCase {
                name,
                code: dedent(&raw.code),
                tolerances: raw.tolerances,
            })
            .collect();
        Corpus::new(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_strips_template_indentation() {
        let code = "\n        one?.two;\n          one?.two.three;\n      ";
        assert_eq!(dedent(code), "one?.two;\n  one?.two.three;\n");
        assert_eq!(dedent("   \n  "), "");
        assert_eq!(dedent("x.y;"), "x.y;\n");
    }

    #[test]
    fn json_corpus_preserves_declaration_order() {
        let corpus = Corpus::from_json_str(
            r#"{
                "zeta": {"code": "x.y;", "espree": {"expectToFail": false}},
                "alpha": {"code": "one?.two;", "espree": {"expectToFail": "ast-diff"}, "babel": {"expectToFail": true}}
            }"#,
        )
        .unwrap();
        let names: Vec<_> = corpus.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        let alpha = corpus.get("alpha").unwrap();
        assert_eq!(alpha.tolerance_for("espree"), Some(&ToleranceSpec::category("ast-diff")));
        assert_eq!(alpha.tolerance_for("babel"), Some(&ToleranceSpec::AnyMismatch));
        assert_eq!(alpha.tolerance_for("flow"), None);
    }

    #[test]
    fn toml_corpus() {
        let corpus = Corpus::from_toml_str(
            r#"
            [computed]
            code = """
                x['y'];
            """
            espree = { expectToFail = false }
            babel = { expectToFail = "ast-diff" }
            "#,
        )
        .unwrap();
        let case = &corpus.cases()[0];
        assert_eq!(case.name, "computed");
        assert_eq!(case.code, "x['y'];\n");
        assert_eq!(case.tolerance_for("babel"), Some(&ToleranceSpec::category("ast-diff")));
    }

    #[test]
    fn corpus_validation() {
        assert!(matches!(Corpus::from_json_str("{}"), Err(CorpusError::Empty)));
        assert!(matches!(
            Corpus::from_json_str(r#"{"": {"code": "x;"}}"#),
            Err(CorpusError::EmptyName)
        ));
        assert!(matches!(
            Corpus::from_json_str(r#"{"a": {"code": "x;"}, "a": {"code": "y;"}}"#),
            Err(CorpusError::DuplicateCase(name)) if name == "a"
        ));
        assert!(matches!(
            Corpus::from_json_str(r#"{"a": {"espree": {"expectToFail": false}}}"#),
            Err(CorpusError::Json(_))
        ));
        assert!(matches!(
            Corpus::from_json_str(r#"{"a": {"code": "x;", "espree": {"expectToFail": 3}}}"#),
            Err(CorpusError::Json(_))
        ));
    }

    #[test]
    fn names_must_map_to_distinct_snapshot_files() {
        let err = Corpus::from_json_str(r#"{"member a": {"code": "a.b;"}, "member_a": {"code": "c.d;"}}"#).unwrap_err();
        assert!(matches!(
            &err,
            CorpusError::SnapshotKeyCollision { first, second, key }
                if first == "member a" && second == "member_a" && key == "member_a"
        ));
        assert_eq!(
            err.to_string(),
            "cases `member a` and `member_a` would share the snapshot baseline `member_a.snap`"
        );

        assert!(matches!(
            Corpus::new(vec![AlignmentCase::new("Member", "x;"), AlignmentCase::new("member", "y;")]),
            Err(CorpusError::SnapshotKeyCollision { .. })
        ));
        assert!(Corpus::new(vec![AlignmentCase::new("member-a", "x;"), AlignmentCase::new("member_a", "y;")]).is_ok());
    }

    #[test]
    fn load_rejects_unknown_extensions() {
        let err = Corpus::load(Path::new("cases.yaml")).unwrap_err();
        assert!(matches!(err, CorpusError::UnsupportedFormat { .. }));
    }
}
