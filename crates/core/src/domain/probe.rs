// Probe Domain Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::error::{DomainError, Result};
use super::metadata::parse_probe_source;
use super::statement::{parse_statements, Statement};

/// Probe identifier (file stem for discovered probes)
pub type ProbeId = String;

/// Indexable description of one divergence.
///
/// Parsed from the leading metadata block of a probe file without
/// executing anything, so tooling can search probes cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeMetadata {
    pub categories: BTreeSet<String>,
    pub description: String,
    pub cause: String,
    pub workaround: String,
}

impl ProbeMetadata {
    pub fn new(
        categories: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
        cause: impl Into<String>,
        workaround: impl Into<String>,
    ) -> Result<Self> {
        let metadata = Self {
            categories: categories.into_iter().map(Into::into).collect(),
            description: description.into(),
            cause: cause.into(),
            workaround: workaround.into(),
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Categories must be present and non-empty; workaround may be empty.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(DomainError::ValidationError(
                "at least one category is required".to_string(),
            ));
        }
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(DomainError::ValidationError(
                "categories must be non-empty strings".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "description must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }

    /// Categories in rendering order, joined the way the metadata block writes them
    pub fn categories_line(&self) -> String {
        self.categories
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Executable fragment of a probe, kept as source text.
///
/// Statements are only parsed when an in-process runtime needs them;
/// subprocess runtimes hand the text to a real interpreter untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeBody(String);

impl ProbeBody {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the body into the statement subset the model runtime executes
    pub fn statements(&self) -> Result<Vec<Statement>> {
        parse_statements(&self.0)
    }
}

/// Probe Entity
///
/// Authored once and never mutated; the collector reads and executes it
/// once per runtime per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe {
    pub id: ProbeId,
    pub metadata: ProbeMetadata,
    pub body: ProbeBody,
    pub source_path: Option<PathBuf>,
}

impl Probe {
    pub fn new(id: impl Into<String>, metadata: ProbeMetadata, body: ProbeBody) -> Self {
        Self {
            id: id.into(),
            metadata,
            body,
            source_path: None,
        }
    }

    /// Build a probe from the full text of a probe file
    pub fn from_source(id: impl Into<String>, source: &str) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "probe id must not be empty".to_string(),
            ));
        }
        let (metadata, body) = parse_probe_source(source)?;
        Ok(Self::new(id, metadata, body))
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}
