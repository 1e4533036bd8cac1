//! Seams for the resolution algorithms the dispatcher treats as opaque.
//!
//! Each trait has a built-in implementation that a [`ResolverContext`]
//! constructs on first use. Callers can inject their own through the
//! `with_*` builders on the context.
//!
//! [`ResolverContext`]: crate::ResolverContext

use std::path::{Path, PathBuf};

use crate::amd::AmdConfig;
use crate::error::ResolveResult;
use crate::module_kind::{ModuleKind, SyntaxFacts};
use crate::node::NodeOptions;
use crate::stylesheet::StyleSyntax;
use crate::webpack::WebpackResolveConfig;

/// Decides which module system a JS-family file uses.
pub trait ModuleKindClassifier {
    /// `Ok(None)` means the kind could not be determined.
    fn classify(
        &mut self,
        filename: &Path,
        syntax: Option<&SyntaxFacts>,
    ) -> ResolveResult<Option<ModuleKind>>;
}

/// Node's `require.resolve` algorithm.
pub trait NodeResolve {
    /// Resolve `specifier` (bare or absolute) searching from `basedir`.
    fn resolve(
        &mut self,
        specifier: &str,
        basedir: &Path,
        options: &NodeOptions,
    ) -> ResolveResult<Option<PathBuf>>;
}

/// webpack's `resolve` algorithm, driven by a loaded `resolve` config.
pub trait WebpackResolve {
    fn resolve(
        &mut self,
        config: &WebpackResolveConfig,
        lookup_dir: &Path,
        specifier: &str,
    ) -> ResolveResult<Option<PathBuf>>;
}

/// RequireJS module-id to file resolution.
pub trait AmdResolve {
    /// `base_dir` anchors a relative `baseUrl`; `source_dir` anchors
    /// relative module ids.
    fn resolve(
        &mut self,
        config: &AmdConfig,
        base_dir: &Path,
        source_dir: &Path,
        specifier: &str,
    ) -> ResolveResult<Option<PathBuf>>;
}

/// `@import` resolution for stylesheet languages.
pub trait StylesheetResolve {
    fn resolve(
        &mut self,
        syntax: StyleSyntax,
        specifier: &str,
        source_file: &Path,
        directory: &Path,
    ) -> ResolveResult<Option<PathBuf>>;
}
