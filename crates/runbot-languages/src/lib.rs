//! Language registry and changed-file selection for runbot.
//!
//! Maps file extensions to remote-execution language descriptors and narrows a
//! pull request's changed files to the ones the execution service can run.

pub mod file_selector;
pub mod language_descriptor;
pub mod language_registry;

pub use file_selector::{
    file_extension, select_files, select_files_for_tag, FileChange, SelectedFile,
};
pub use language_descriptor::{
    load_language_descriptors, parse_language_descriptors, LanguageConfigError,
    LanguageDescriptor,
};
pub use language_registry::{AliasConflict, LanguageRegistry};
