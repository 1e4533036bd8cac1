//! The compiler host and module resolution cache.
//!
//! A host memoizes filesystem probes for one resolution directory. Building
//! one is the expensive part of a TypeScript lookup, so the engine keeps a
//! single [`TsHostState`] alive for as long as callers keep resolving in
//! the same directory.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::node::PackageJson;

use super::resolver::ResolvedModuleWithFailedLookupLocations;

/// Cached filesystem access used by the resolver.
#[derive(Debug, Default)]
pub struct CompilerHost {
    current_directory: PathBuf,
    files: RefCell<FxHashMap<PathBuf, bool>>,
    directories: RefCell<FxHashMap<PathBuf, bool>>,
    package_json: RefCell<FxHashMap<PathBuf, Option<Arc<PackageJson>>>>,
}

impl CompilerHost {
    pub fn new(current_directory: &Path) -> Self {
        CompilerHost {
            current_directory: current_directory.to_path_buf(),
            ..CompilerHost::default()
        }
    }

    pub fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        if let Some(&cached) = self.files.borrow().get(path) {
            return cached;
        }
        let exists = path.is_file();
        self.files.borrow_mut().insert(path.to_path_buf(), exists);
        exists
    }

    pub fn directory_exists(&self, path: &Path) -> bool {
        if let Some(&cached) = self.directories.borrow().get(path) {
            return cached;
        }
        let exists = path.is_dir();
        self.directories.borrow_mut().insert(path.to_path_buf(), exists);
        exists
    }

    /// `dir/package.json`, parsed. Unreadable or malformed files count as
    /// absent, as they do for tsc.
    pub fn read_package_json(&self, dir: &Path) -> Option<Arc<PackageJson>> {
        if let Some(cached) = self.package_json.borrow().get(dir) {
            return cached.clone();
        }

        let path = dir.join("package.json");
        let parsed = if self.file_exists(&path) {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|source| PackageJson::parse(&source))
            {
                Ok(package) => Some(Arc::new(package)),
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "skipping package.json");
                    None
                }
            }
        } else {
            None
        };

        self.package_json
            .borrow_mut()
            .insert(dir.to_path_buf(), parsed.clone());
        parsed
    }
}

/// Resolution results keyed by containing directory, specifier and the
/// identity of the options they were computed with.
#[derive(Debug, Default)]
pub struct ModuleResolutionCache {
    entries: FxHashMap<(PathBuf, String, usize), ResolvedModuleWithFailedLookupLocations>,
}

impl ModuleResolutionCache {
    pub fn get(
        &self,
        containing_dir: &Path,
        specifier: &str,
        options_id: usize,
    ) -> Option<&ResolvedModuleWithFailedLookupLocations> {
        self.entries
            .get(&(containing_dir.to_path_buf(), specifier.to_string(), options_id))
    }

    pub fn insert(
        &mut self,
        containing_dir: &Path,
        specifier: &str,
        options_id: usize,
        result: ResolvedModuleWithFailedLookupLocations,
    ) {
        self.entries.insert(
            (containing_dir.to_path_buf(), specifier.to_string(), options_id),
            result,
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A host and its resolution cache, bound to one directory.
#[derive(Debug)]
pub struct TsHostState {
    pub host: CompilerHost,
    pub cache: ModuleResolutionCache,
    pub directory: PathBuf,
}

impl TsHostState {
    pub fn new(directory: &Path) -> Self {
        TsHostState {
            host: CompilerHost::new(directory),
            cache: ModuleResolutionCache::default(),
            directory: directory.to_path_buf(),
        }
    }
}
