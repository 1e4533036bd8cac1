//! The input to a single resolution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::amd::AmdConfig;
use crate::module_kind::SyntaxFacts;

/// A configuration that is either absent, given inline, or read from disk.
#[derive(Debug, Clone)]
pub enum ConfigInput<T> {
    Absent,
    Inline(T),
    FilePath(PathBuf),
}

impl<T> Default for ConfigInput<T> {
    fn default() -> Self {
        ConfigInput::Absent
    }
}

impl<T> ConfigInput<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, ConfigInput::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }
}

/// Raw tsconfig JSON. Identity of the `Arc` is the options cache key, so
/// passing a freshly allocated value forces the options to be re-derived.
pub type TsConfigInput = ConfigInput<Arc<serde_json::Value>>;
pub type AmdConfigInput = ConfigInput<Arc<AmdConfig>>;

/// One specifier to resolve, with everything the strategies may consult.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    /// The string written in the import statement (the "partial").
    pub specifier: String,
    /// The file containing the import.
    pub source_file: PathBuf,
    /// Project directory used as the search root.
    pub directory: PathBuf,
    /// Extensions the caller wants matched in addition to the source file's own.
    pub extensions: Vec<String>,
    pub ts_config: TsConfigInput,
    pub amd_config: AmdConfigInput,
    pub webpack_config: Option<PathBuf>,
    /// Preferred package.json entry field, e.g. `"module"` over `"main"`.
    pub node_module_entry: Option<String>,
    /// Pre-parsed syntax summary of the source file.
    pub syntax: Option<SyntaxFacts>,
    /// Prefer implementation files over `.d.ts` results.
    pub no_type_definitions: bool,
}

impl ResolutionRequest {
    pub fn new(
        specifier: impl Into<String>,
        source_file: impl Into<PathBuf>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        ResolutionRequest {
            specifier: specifier.into(),
            source_file: source_file.into(),
            directory: directory.into(),
            ..ResolutionRequest::default()
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(normalize_extension(&extension.into()));
        self
    }

    pub fn with_ts_config(mut self, config: TsConfigInput) -> Self {
        self.ts_config = config;
        self
    }

    pub fn with_amd_config(mut self, config: AmdConfigInput) -> Self {
        self.amd_config = config;
        self
    }

    pub fn with_webpack_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.webpack_config = Some(path.into());
        self
    }

    pub fn with_node_module_entry(mut self, field: impl Into<String>) -> Self {
        self.node_module_entry = Some(field.into());
        self
    }

    pub fn with_syntax(mut self, facts: SyntaxFacts) -> Self {
        self.syntax = Some(facts);
        self
    }

    pub fn no_type_definitions(mut self, value: bool) -> Self {
        self.no_type_definitions = value;
        self
    }

    /// Directory of the source file, `.` for a bare file name.
    pub fn source_dir(&self) -> &Path {
        match self.source_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// The source file's extension including the leading dot.
    pub fn file_extension(&self) -> Option<String> {
        extension_of(&self.source_file)
    }

    /// Extensions a registry entry must intersect to be a candidate.
    pub fn target_extensions(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.file_extension().into_iter().collect();
        for ext in &self.extensions {
            if !targets.contains(ext) {
                targets.push(ext.clone());
            }
        }
        targets
    }

    pub fn has_specifier(&self) -> bool {
        !self.specifier.trim().is_empty()
    }

    pub fn is_relative_specifier(&self) -> bool {
        is_relative(&self.specifier)
    }
}

/// `./x`, `../x`, `.` and `..`.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with(".\\")
        || specifier.starts_with("..\\")
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
}

pub(crate) fn normalize_extension(extension: &str) -> String {
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

/// Make `path` absolute against the process working directory and drop
/// `.`/`..` components lexically.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_lexically(&joined)
}

pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
