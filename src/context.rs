//! Resolution state and the dispatcher.
//!
//! Everything that outlives a single lookup lives in a [`ResolverContext`]:
//! the registry, the TypeScript engine with its option and host caches,
//! loaded webpack and AMD configs, and the collaborators that do the actual
//! module-system work. Contexts are independent; nothing is process-global.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::amd::{self, AmdConfig, AmdResolver};
use crate::collaborators::{
    AmdResolve, ModuleKindClassifier, NodeResolve, StylesheetResolve, WebpackResolve,
};
use crate::error::{ResolveError, ResolveResult};
use crate::generic::GenericStrategy;
use crate::module_kind::SourceClassifier;
use crate::node::NodeResolver;
use crate::registry::{ResolveStrategy, ResolverEntry, ResolverRegistry};
use crate::request::ResolutionRequest;
use crate::stylesheet::StylesheetResolver;
use crate::typescript::TsEngine;
use crate::webpack::{self, WebpackResolveConfig, WebpackResolver};

/// State the strategies share. Collaborators are built on first use unless
/// one was injected.
#[derive(Default)]
pub struct Services {
    typescript: TsEngine,
    classifier: Option<Box<dyn ModuleKindClassifier>>,
    node: Option<Box<dyn NodeResolve>>,
    webpack: Option<Box<dyn WebpackResolve>>,
    amd: Option<Box<dyn AmdResolve>>,
    stylesheets: Option<Box<dyn StylesheetResolve>>,
    webpack_configs: FxHashMap<(PathBuf, PathBuf), Option<Arc<WebpackResolveConfig>>>,
    amd_configs: FxHashMap<PathBuf, Arc<AmdConfig>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(mut self, classifier: impl ModuleKindClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn with_node(mut self, node: impl NodeResolve + 'static) -> Self {
        self.node = Some(Box::new(node));
        self
    }

    pub fn with_webpack(mut self, webpack: impl WebpackResolve + 'static) -> Self {
        self.webpack = Some(Box::new(webpack));
        self
    }

    pub fn with_amd(mut self, amd: impl AmdResolve + 'static) -> Self {
        self.amd = Some(Box::new(amd));
        self
    }

    pub fn with_stylesheets(mut self, stylesheets: impl StylesheetResolve + 'static) -> Self {
        self.stylesheets = Some(Box::new(stylesheets));
        self
    }

    pub fn classifier(&mut self) -> &mut dyn ModuleKindClassifier {
        &mut **self
            .classifier
            .get_or_insert_with(|| Box::new(SourceClassifier))
    }

    pub fn node(&mut self) -> &mut dyn NodeResolve {
        &mut **self.node.get_or_insert_with(|| Box::new(NodeResolver::new()))
    }

    pub fn webpack(&mut self) -> &mut dyn WebpackResolve {
        &mut **self
            .webpack
            .get_or_insert_with(|| Box::new(WebpackResolver::default()))
    }

    pub fn amd(&mut self) -> &mut dyn AmdResolve {
        &mut **self.amd.get_or_insert_with(|| Box::new(AmdResolver))
    }

    pub fn stylesheets(&mut self) -> &mut dyn StylesheetResolve {
        &mut **self
            .stylesheets
            .get_or_insert_with(|| Box::new(StylesheetResolver))
    }

    pub fn typescript(&self) -> &TsEngine {
        &self.typescript
    }

    pub fn typescript_mut(&mut self) -> &mut TsEngine {
        &mut self.typescript
    }

    /// The webpack `resolve` config at `path`, loaded once per request
    /// directory since the defaults add that directory as a module root. A
    /// config that fails to load is remembered as absent.
    pub fn webpack_config(
        &mut self,
        path: &Path,
        directory: &Path,
    ) -> Option<Arc<WebpackResolveConfig>> {
        let key = (path.to_path_buf(), directory.to_path_buf());
        if let Some(cached) = self.webpack_configs.get(&key) {
            return cached.clone();
        }
        let loaded = webpack::load_cached(path, directory);
        self.webpack_configs.insert(key, loaded.clone());
        loaded
    }

    /// The RequireJS config at `path`, loaded once. Load failures are not
    /// cached.
    pub fn amd_config(&mut self, path: &Path) -> ResolveResult<Arc<AmdConfig>> {
        if let Some(cached) = self.amd_configs.get(path) {
            return Ok(cached.clone());
        }
        let loaded = amd::load_cached(path)?;
        self.amd_configs.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }
}

/// Owner of all resolution state. Pass it by `&mut` to every dispatch.
pub struct ResolverContext {
    registry: ResolverRegistry,
    services: Services,
    generic: FxHashMap<Vec<String>, GenericStrategy>,
}

impl ResolverContext {
    /// A context with the built-in resolvers registered.
    pub fn new() -> Self {
        ResolverContext {
            registry: ResolverRegistry::with_builtins(),
            services: Services::new(),
            generic: FxHashMap::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl ModuleKindClassifier + 'static) -> Self {
        self.services = self.services.with_classifier(classifier);
        self
    }

    pub fn with_node(mut self, node: impl NodeResolve + 'static) -> Self {
        self.services = self.services.with_node(node);
        self
    }

    pub fn with_webpack(mut self, webpack: impl WebpackResolve + 'static) -> Self {
        self.services = self.services.with_webpack(webpack);
        self
    }

    pub fn with_amd(mut self, amd: impl AmdResolve + 'static) -> Self {
        self.services = self.services.with_amd(amd);
        self
    }

    pub fn with_stylesheets(mut self, stylesheets: impl StylesheetResolve + 'static) -> Self {
        self.services = self.services.with_stylesheets(stylesheets);
        self
    }

    /// Resolve a request to an absolute path.
    ///
    /// Candidates are the registry entries handling the source file's
    /// extension or one of the request's extra extensions. They run in
    /// priority order until one finds a file; failures other than
    /// configuration faults are logged and skipped. When no entry handles
    /// any of the extensions, a generic relative lookup is used.
    pub fn dispatch(&mut self, request: &ResolutionRequest) -> ResolveResult<Option<PathBuf>> {
        if request.source_file.as_os_str().is_empty() {
            return Err(ResolveError::MissingSourceFile);
        }

        let targets = request.target_extensions();
        let mut matched = false;
        for entry in self.registry.matching(&targets) {
            matched = true;
            if let Some(found) =
                attempt(&entry.name, entry.strategy.as_ref(), &mut self.services, request)?
            {
                return Ok(Some(found));
            }
        }

        if !matched {
            let generic = self
                .generic
                .entry(targets.clone())
                .or_insert_with(|| GenericStrategy::new(targets));
            return attempt("generic", &*generic, &mut self.services, request);
        }

        tracing::debug!(
            specifier = %request.specifier,
            source = %request.source_file.display(),
            "unresolved"
        );
        Ok(None)
    }

    /// Give `strategy` top priority for `extension`.
    pub fn register(&mut self, extension: &str, strategy: impl ResolveStrategy + 'static) {
        self.registry.register(extension, strategy);
    }

    pub fn register_entry(&mut self, entry: ResolverEntry) {
        self.registry.register_entry(entry);
    }

    /// Move the resolver named `name` to the front of the registry.
    pub fn promote_default(&mut self, name: &str) -> ResolveResult<()> {
        self.registry.promote_default(name)
    }

    /// Every extension some resolver handles, in registration order.
    pub fn supported_extensions(&self) -> Vec<String> {
        self.registry
            .supported_extensions()
            .map(str::to_string)
            .collect()
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn typescript(&self) -> &TsEngine {
        self.services.typescript()
    }

    pub fn typescript_mut(&mut self) -> &mut TsEngine {
        self.services.typescript_mut()
    }

    /// Number of generic strategies created so far, one per distinct
    /// extension set.
    pub fn generic_strategies(&self) -> usize {
        self.generic.len()
    }
}

impl Default for ResolverContext {
    fn default() -> Self {
        Self::new()
    }
}

fn attempt(
    name: &str,
    strategy: &dyn ResolveStrategy,
    services: &mut Services,
    request: &ResolutionRequest,
) -> ResolveResult<Option<PathBuf>> {
    match strategy.resolve(services, request) {
        Ok(found) => {
            tracing::trace!(resolver = name, specifier = %request.specifier, found = ?found, "resolver finished");
            Ok(found)
        }
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            tracing::warn!(
                resolver = name,
                specifier = %request.specifier,
                source = %request.source_file.display(),
                error = %err,
                "resolver failed, trying next"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
