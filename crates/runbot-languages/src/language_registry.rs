use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::language_descriptor::{
    load_language_descriptors, normalize_alias, parse_language_descriptors, LanguageConfigError,
    LanguageDescriptor,
};

const BUILTIN_LANGUAGES_JSON: &str = include_str!("../default_languages.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// An alias claimed by more than one descriptor; the earlier entry keeps it.
pub struct AliasConflict {
    pub alias: String,
    pub kept_language: String,
    pub ignored_language: String,
}

#[derive(Debug, Clone)]
/// Ordered language descriptors indexed by lowercase alias.
pub struct LanguageRegistry {
    descriptors: Vec<LanguageDescriptor>,
    alias_index: HashMap<String, usize>,
    conflicts: Vec<AliasConflict>,
}

impl LanguageRegistry {
    pub fn new(descriptors: Vec<LanguageDescriptor>) -> Self {
        let mut alias_index = HashMap::new();
        let mut conflicts = Vec::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            for alias in &descriptor.aliases {
                let alias = normalize_alias(alias);
                if alias.is_empty() {
                    continue;
                }
                match alias_index.get(&alias).copied() {
                    Some(kept) if kept != index => {
                        let kept_language: &LanguageDescriptor = &descriptors[kept];
                        tracing::warn!(
                            alias = %alias,
                            kept = %kept_language.language,
                            ignored = %descriptor.language,
                            "language alias declared twice; keeping the first entry"
                        );
                        conflicts.push(AliasConflict {
                            alias,
                            kept_language: kept_language.language.clone(),
                            ignored_language: descriptor.language.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        alias_index.insert(alias, index);
                    }
                }
            }
        }
        Self {
            descriptors,
            alias_index,
            conflicts,
        }
    }

    /// Registry shipped with the binary, used when no language file is configured.
    pub fn builtin() -> Result<Self, LanguageConfigError> {
        Ok(Self::new(parse_language_descriptors(BUILTIN_LANGUAGES_JSON)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, LanguageConfigError> {
        Ok(Self::new(load_language_descriptors(path)?))
    }

    pub fn descriptors(&self) -> &[LanguageDescriptor] {
        &self.descriptors
    }

    pub fn conflicts(&self) -> &[AliasConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn lookup_extension(&self, extension: &str) -> Option<&LanguageDescriptor> {
        let key = normalize_alias(extension);
        if key.is_empty() {
            return None;
        }
        self.alias_index
            .get(&key)
            .and_then(|index| self.descriptors.get(*index))
    }

    /// Resolve a `/execute-<tag>` tag by language id first, then by alias.
    pub fn resolve_tag(&self, tag: &str) -> Option<&LanguageDescriptor> {
        let tag = normalize_alias(tag);
        if tag.is_empty() {
            return None;
        }
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.language.eq_ignore_ascii_case(&tag))
            .or_else(|| self.lookup_extension(&tag))
    }
}
