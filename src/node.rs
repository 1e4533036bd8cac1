//! Node-style (`require.resolve`) resolution.
//!
//! Implements the classic CommonJS algorithm: a relative or absolute path is
//! probed as a file (as-is, then with each extension) and then as a
//! directory (package.json entry fields, then index files); a bare specifier
//! walks up through every `node_modules` directory from the base directory.
//! The same engine, configured differently, backs the webpack resolver.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::collaborators::NodeResolve;
use crate::error::{ResolveError, ResolveResult};

/// Where to look for bare specifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulesDir {
    /// A directory name searched in every ancestor, like `node_modules`.
    Hierarchical(String),
    /// A single absolute directory.
    Absolute(PathBuf),
}

impl ModulesDir {
    pub fn from_config(value: &str) -> Self {
        let path = Path::new(value);
        if path.is_absolute() {
            ModulesDir::Absolute(path.to_path_buf())
        } else {
            ModulesDir::Hierarchical(value.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Extensions appended when probing files, in order.
    pub extensions: Vec<String>,
    /// package.json fields naming the entry point, in order.
    pub main_fields: Vec<String>,
    /// File stems tried inside a directory.
    pub main_files: Vec<String>,
    pub modules: Vec<ModulesDir>,
    /// Field that replaces `main` before entry fields are read.
    pub entry_override: Option<String>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        NodeOptions {
            extensions: [".js", ".jsx", ".mjs", ".cjs", ".json", ".node"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            main_fields: vec!["main".to_string()],
            main_files: vec!["index".to_string()],
            modules: vec![ModulesDir::Hierarchical("node_modules".to_string())],
            entry_override: None,
        }
    }
}

impl NodeOptions {
    pub fn with_entry_override(mut self, field: Option<String>) -> Self {
        self.entry_override = field;
        self
    }
}

/// Subset of package.json consulted by the resolvers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: Option<String>,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub typings: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub exports: Option<PackageExports>,
    pub imports: Option<IndexMap<String, PackageExports>>,
    pub types_versions: Option<serde_json::Value>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl PackageJson {
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// String value of an entry field.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "main" => self.main.as_deref(),
            "module" => self.module.as_deref(),
            "types" => self.types.as_deref(),
            "typings" => self.typings.as_deref(),
            _ => self.other.get(name).and_then(|value| value.as_str()),
        };
        value.filter(|value| !value.trim().is_empty())
    }

    /// Point `main` at `field` when the package declares it.
    pub fn apply_entry_override(&mut self, field: &str) {
        if let Some(value) = self.field(field).map(str::to_string) {
            self.main = Some(value);
        }
    }
}

/// The `exports`/`imports` value grammar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageExports {
    Excluded,
    Path(String),
    Fallbacks(Vec<PackageExports>),
    /// Either a subpath map (keys start with `.`) or a condition map.
    Object(IndexMap<String, PackageExports>),
}

impl PackageExports {
    pub fn is_subpath_map(&self) -> bool {
        match self {
            PackageExports::Object(map) => map.keys().any(|key| key.starts_with('.')),
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct PackageJsonCache {
    entries: FxHashMap<PathBuf, Option<Arc<PackageJson>>>,
}

impl PackageJsonCache {
    /// Read `dir/package.json`. Missing is `Ok(None)`; malformed is an error.
    pub fn load(&mut self, dir: &Path) -> ResolveResult<Option<Arc<PackageJson>>> {
        if let Some(cached) = self.entries.get(dir) {
            return Ok(cached.clone());
        }

        let path = dir.join("package.json");
        let loaded = if path.is_file() {
            let source = std::fs::read_to_string(&path)?;
            let package = PackageJson::parse(&source).map_err(|err| {
                ResolveError::strategy("node", format!("{}: {}", path.display(), err))
            })?;
            Some(Arc::new(package))
        } else {
            None
        };

        self.entries.insert(dir.to_path_buf(), loaded.clone());
        Ok(loaded)
    }
}

#[derive(Debug, Default)]
pub struct NodeResolver {
    packages: PackageJsonCache,
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_as_file(&self, path: &Path, options: &NodeOptions) -> Option<PathBuf> {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        options
            .extensions
            .iter()
            .map(|ext| append_extension(path, ext))
            .find(|candidate| candidate.is_file())
    }

    fn load_index(&self, dir: &Path, options: &NodeOptions) -> Option<PathBuf> {
        options.main_files.iter().find_map(|stem| {
            options
                .extensions
                .iter()
                .map(|ext| dir.join(format!("{}{}", stem, ext)))
                .find(|candidate| candidate.is_file())
        })
    }

    fn load_as_directory(
        &mut self,
        dir: &Path,
        options: &NodeOptions,
    ) -> ResolveResult<Option<PathBuf>> {
        if !dir.is_dir() {
            return Ok(None);
        }

        if let Some(package) = self.packages.load(dir)? {
            let mut package = PackageJson::clone(&package);
            if let Some(field) = options.entry_override.as_deref() {
                package.apply_entry_override(field);
            }

            for field in &options.main_fields {
                let Some(entry) = package.field(field) else {
                    continue;
                };
                let entry_path = dir.join(entry);
                if let Some(found) = self.load_as_file(&entry_path, options) {
                    return Ok(Some(found));
                }
                if let Some(found) = self.load_index(&entry_path, options) {
                    return Ok(Some(found));
                }
            }
        }

        Ok(self.load_index(dir, options))
    }

    fn load_path(&mut self, path: &Path, options: &NodeOptions) -> ResolveResult<Option<PathBuf>> {
        if let Some(found) = self.load_as_file(path, options) {
            return Ok(Some(found));
        }
        self.load_as_directory(path, options)
    }

    fn load_modules(
        &mut self,
        specifier: &str,
        basedir: &Path,
        options: &NodeOptions,
    ) -> ResolveResult<Option<PathBuf>> {
        for modules in &options.modules {
            match modules {
                ModulesDir::Absolute(dir) => {
                    if let Some(found) = self.load_path(&dir.join(specifier), options)? {
                        return Ok(Some(found));
                    }
                }
                ModulesDir::Hierarchical(name) => {
                    for ancestor in basedir.ancestors() {
                        if ancestor.file_name() == Some(OsStr::new(name)) {
                            continue;
                        }
                        let dir = ancestor.join(name);
                        if !dir.is_dir() {
                            continue;
                        }
                        if let Some(found) = self.load_path(&dir.join(specifier), options)? {
                            return Ok(Some(found));
                        }
                    }
                }
            }
        }
        Ok(None)
    }
}

impl NodeResolve for NodeResolver {
    fn resolve(
        &mut self,
        specifier: &str,
        basedir: &Path,
        options: &NodeOptions,
    ) -> ResolveResult<Option<PathBuf>> {
        if specifier.is_empty() {
            return Ok(None);
        }

        let is_path = Path::new(specifier).is_absolute()
            || crate::request::is_relative(specifier)
            || specifier.starts_with('/');
        let found = if is_path {
            self.load_path(&basedir.join(specifier), options)?
        } else {
            self.load_modules(specifier, basedir, options)?
        };

        tracing::trace!(specifier, basedir = %basedir.display(), found = ?found, "node resolve");
        Ok(found.map(|path| crate::request::absolutize(&path)))
    }
}

/// `foo.bar` + `.js` is `foo.bar.js`, not `foo.js`.
pub(crate) fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(extension);
    PathBuf::from(raw)
}

/// Split `@scope/pkg/sub/path` into (`@scope/pkg`, `Some("sub/path")`).
pub(crate) fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let mut separators = specifier.match_indices('/').map(|(idx, _)| idx);
    let split_at = if specifier.starts_with('@') {
        separators.nth(1)
    } else {
        separators.next()
    };

    match split_at {
        Some(idx) => (&specifier[..idx], Some(&specifier[idx + 1..])),
        None => (specifier, None),
    }
}
