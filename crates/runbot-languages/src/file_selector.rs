use serde::{Deserialize, Serialize};

use crate::language_descriptor::LanguageDescriptor;
use crate::language_registry::LanguageRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One file touched by a pull request, as listed by the host.
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl FileChange {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A changed file paired with the descriptor its extension resolved to.
pub struct SelectedFile {
    pub file: FileChange,
    pub descriptor: LanguageDescriptor,
}

/// Lowercase text after the final `.` of the last path segment.
pub fn file_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let (_, extension) = name.rsplit_once('.')?;
    let extension = extension.trim();
    if extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

pub fn select_files(files: &[FileChange], registry: &LanguageRegistry) -> Vec<SelectedFile> {
    files
        .iter()
        .filter_map(|file| {
            let extension = file_extension(&file.filename)?;
            let descriptor = registry.lookup_extension(&extension)?;
            Some(SelectedFile {
                file: file.clone(),
                descriptor: descriptor.clone(),
            })
        })
        .collect()
}

/// Like [`select_files`], narrowed to one language when `tag` resolves in the
/// registry. An unknown tag falls back to plain extension matching.
pub fn select_files_for_tag(
    files: &[FileChange],
    registry: &LanguageRegistry,
    tag: Option<&str>,
) -> Vec<SelectedFile> {
    let selected = select_files(files, registry);
    let Some(tag) = tag else {
        return selected;
    };
    let Some(target) = registry.resolve_tag(tag) else {
        tracing::warn!(
            tag,
            "unsupported /execute language tag; selecting files by extension"
        );
        return selected;
    };
    selected
        .into_iter()
        .filter(|selected| selected.descriptor.language == target.language)
        .collect()
}
