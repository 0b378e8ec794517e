use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Remote-execution target for one language, plus the file aliases it accepts.
pub struct LanguageDescriptor {
    pub language: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageDescriptor {
    pub fn matches_alias(&self, candidate: &str) -> bool {
        let candidate = normalize_alias(candidate);
        !candidate.is_empty() && self.aliases.iter().any(|alias| *alias == candidate)
    }

    /// True when `tag` names this descriptor by language id or by any alias.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let tag = normalize_alias(tag);
        !tag.is_empty() && (self.language.eq_ignore_ascii_case(&tag) || self.matches_alias(&tag))
    }
}

#[derive(Debug, Error)]
/// Enumerates failures raised while loading the language configuration file.
pub enum LanguageConfigError {
    #[error("failed to read language config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse language config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("language config must declare at least one language")]
    Empty,
    #[error("language entry {index} has an empty '{field}'")]
    EmptyField { index: usize, field: &'static str },
}

pub(crate) fn normalize_alias(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}

pub fn parse_language_descriptors(
    raw: &str,
) -> Result<Vec<LanguageDescriptor>, LanguageConfigError> {
    let parsed = serde_json::from_str::<Vec<LanguageDescriptor>>(raw)?;
    if parsed.is_empty() {
        return Err(LanguageConfigError::Empty);
    }

    let mut descriptors = Vec::with_capacity(parsed.len());
    for (index, descriptor) in parsed.into_iter().enumerate() {
        descriptors.push(normalize_descriptor(index, descriptor)?);
    }
    Ok(descriptors)
}

pub fn load_language_descriptors(
    path: &Path,
) -> Result<Vec<LanguageDescriptor>, LanguageConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LanguageConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_language_descriptors(&raw)
}

fn normalize_descriptor(
    index: usize,
    descriptor: LanguageDescriptor,
) -> Result<LanguageDescriptor, LanguageConfigError> {
    let language = descriptor.language.trim().to_string();
    if language.is_empty() {
        return Err(LanguageConfigError::EmptyField {
            index,
            field: "language",
        });
    }
    let version = descriptor.version.trim().to_string();
    if version.is_empty() {
        return Err(LanguageConfigError::EmptyField {
            index,
            field: "version",
        });
    }
    let runtime = descriptor
        .runtime
        .map(|runtime| runtime.trim().to_string())
        .filter(|runtime| !runtime.is_empty());

    let mut seen = HashSet::new();
    let aliases = descriptor
        .aliases
        .iter()
        .map(|alias| normalize_alias(alias))
        .filter(|alias| !alias.is_empty())
        .filter(|alias| seen.insert(alias.clone()))
        .collect::<Vec<_>>();
    if aliases.is_empty() {
        return Err(LanguageConfigError::EmptyField {
            index,
            field: "aliases",
        });
    }

    Ok(LanguageDescriptor {
        language,
        version,
        runtime,
        aliases,
    })
}
