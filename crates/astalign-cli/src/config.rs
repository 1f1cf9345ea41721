//! `astalign.toml`: which parsers to align and how to compare them.
//!
//! ```toml
//! snapshot_dir = "snapshots"
//!
//! [primary]
//! builtin = "hermes"
//!
//! [[reference]]
//! name = "espree"
//! command = "node"
//! args = ["scripts/espree-json.js"]
//! dialect = "espree"
//!
//! [[reference]]
//! name = "legacy"
//! builtin = "estree"
//! dialect = { name = "legacy", ignore = [{ field = "raw" }] }
//!
//! [[category]]
//! tag = "raw-drift"
//! kinds = ["field-mismatch"]
//! path_pattern = "**.raw"
//! ```
//!
//! Without a file the primary is the Hermes-shaped minijs parser, aligned
//! against espree- and babel-shaped references.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use astalign::{AlignmentRunner, CategoryRegistry, Dialect, DivergenceCategory, Reference, SourceParser};
use minijs::{MiniJsParser, Shape};
use serde::Deserialize;
use tracing::debug;

use crate::command::CommandParser;

/// File name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "astalign.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("parser `{parser}` needs exactly one of `builtin` or `command`")]
    ParserSource { parser: String },

    #[error("parser `{parser}`: {reason}")]
    UnknownShape { parser: String, reason: String },

    #[error("parser `{parser}` uses unknown dialect `{dialect}` (built-in: {})", Dialect::BUILTIN_NAMES.join(", "))]
    UnknownDialect { parser: String, dialect: String },

    #[error("every [[reference]] needs a `name`")]
    MissingName,

    #[error("reference `{0}` is declared twice")]
    DuplicateReference(String),
}

/// A dialect given by built-in name or spelled out inline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DialectSpec {
    Named(String),
    Inline(Dialect),
}

/// How to obtain one parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserSpec {
    pub name: Option<String>,
    /// A minijs shape: `hermes`, `babel` or `estree`.
    pub builtin: Option<String>,
    /// External program reading source on stdin, writing a JSON tree.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// For references, the comparison dialect; for the primary, the snapshot dialect.
    pub dialect: Option<DialectSpec>,
}

impl ParserSpec {
    fn builtin(name: &str, shape: Shape) -> Self {
        Self {
            name: Some(name.to_string()),
            builtin: Some(shape.as_str().to_string()),
            ..Self::default()
        }
    }

    fn shape(&self, parser: &str) -> Result<Option<Shape>, ConfigError> {
        self.builtin
            .as_deref()
            .map(|shape| {
                shape.parse::<Shape>().map_err(|reason| ConfigError::UnknownShape {
                    parser: parser.to_string(),
                    reason,
                })
            })
            .transpose()
    }

    fn parser(&self, name: &str) -> Result<Arc<dyn SourceParser>, ConfigError> {
        match (self.shape(name)?, &self.command) {
            (Some(shape), None) => Ok(Arc::new(MiniJsParser::new(name, shape))),
            (None, Some(program)) => Ok(Arc::new(CommandParser::new(name, program, self.args.clone()))),
            _ => Err(ConfigError::ParserSource {
                parser: name.to_string(),
            }),
        }
    }

    /// The declared dialect, else one named like the parser, else one
    /// matching its built-in shape.
    fn dialect(&self, name: &str) -> Result<Dialect, ConfigError> {
        match &self.dialect {
            Some(DialectSpec::Inline(dialect)) => Ok(dialect.clone()),
            Some(DialectSpec::Named(dialect)) => {
                Dialect::builtin(dialect).ok_or_else(|| ConfigError::UnknownDialect {
                    parser: name.to_string(),
                    dialect: dialect.clone(),
                })
            }
            None => Ok(Dialect::builtin(name)
                .or_else(|| {
                    self.shape(name).ok().flatten().and_then(|shape| match shape {
                        Shape::Hermes => Dialect::builtin("hermes"),
                        Shape::Babel => Dialect::builtin("babel"),
                        Shape::Estree => Dialect::builtin("espree"),
                    })
                })
                .unwrap_or_default()),
        }
    }
}

/// Parsed `astalign.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Baseline directory, relative to the configuration file.
    pub snapshot_dir: Option<PathBuf>,
    pub primary: Option<ParserSpec>,
    #[serde(rename = "reference")]
    pub references: Vec<ParserSpec>,
    #[serde(rename = "category")]
    pub categories: Vec<DivergenceCategory>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load `explicit`, else `./astalign.toml` when present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            debug!(path = %fallback.display(), "using configuration file");
            Self::load(fallback)
        } else {
            debug!("no configuration file, using built-in parsers");
            Ok(Self::default())
        }
    }

    /// Configured snapshot directory, resolved against the file's location.
    pub fn snapshot_dir(&self) -> Option<PathBuf> {
        let dir = self.snapshot_dir.as_ref()?;
        Some(match &self.base_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.clone(),
        })
    }

    /// Built-in categories plus the configured ones; same-tag entries replace built-ins.
    pub fn category_registry(&self) -> CategoryRegistry {
        let mut registry = CategoryRegistry::builtin();
        for category in &self.categories {
            registry.register(category.clone());
        }
        registry
    }

    fn reference_specs(&self) -> Vec<ParserSpec> {
        if self.references.is_empty() {
            vec![
                ParserSpec::builtin("espree", Shape::Estree),
                ParserSpec::builtin("babel", Shape::Babel),
            ]
        } else {
            self.references.clone()
        }
    }

    /// Assemble a runner; snapshot storage is left to the caller.
    pub fn build_runner(&self) -> Result<AlignmentRunner, ConfigError> {
        let primary_spec = self
            .primary
            .clone()
            .unwrap_or_else(|| ParserSpec::builtin("hermes", Shape::Hermes));
        let primary_name = primary_spec.name.clone().unwrap_or_else(|| "primary".to_string());
        let mut runner = AlignmentRunner::new(primary_spec.parser(&primary_name)?)
            .categories(self.category_registry());
        if primary_spec.dialect.is_some() {
            runner = runner.snapshot_dialect(primary_spec.dialect(&primary_name)?);
        }

        let mut seen = BTreeSet::new();
        for spec in self.reference_specs() {
            let name = spec.name.clone().ok_or(ConfigError::MissingName)?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateReference(name));
            }
            let dialect = spec.dialect(&name)?;
            debug!(reference = %name, dialect = %dialect.name, "configured reference");
            runner = runner.reference(Reference::new(name.clone(), spec.parser(&name)?, dialect));
        }
        Ok(runner)
    }
}
