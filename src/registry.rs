//! The ordered resolver registry.
//!
//! Entries are consulted front to back and the first one whose extension
//! set intersects the request's wins the first attempt. [`register`] puts a
//! custom entry ahead of everything else; [`promote_default`] moves an
//! existing entry to the front without disturbing the relative order of
//! the rest.
//!
//! [`register`]: ResolverRegistry::register
//! [`promote_default`]: ResolverRegistry::promote_default

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexSet;

use crate::context::Services;
use crate::error::{ResolveError, ResolveResult};
use crate::javascript::JavaScriptStrategy;
use crate::request::{ResolutionRequest, normalize_extension};
use crate::stylesheet::{StyleSyntax, StylesheetStrategy};
use crate::typescript::TypeScriptStrategy;
use crate::vue::VueStrategy;

/// A way of turning a request into a file path.
pub trait ResolveStrategy {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// `Ok(None)` means "not resolved by this strategy".
    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>>;
}

/// Adapts a closure into a [`ResolveStrategy`].
pub struct FnStrategy<F> {
    name: String,
    func: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&mut Services, &ResolutionRequest) -> ResolveResult<Option<PathBuf>>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        FnStrategy {
            name: name.into(),
            func,
        }
    }
}

impl<F> ResolveStrategy for FnStrategy<F>
where
    F: Fn(&mut Services, &ResolutionRequest) -> ResolveResult<Option<PathBuf>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        (self.func)(services, request)
    }
}

pub struct ResolverEntry {
    pub name: String,
    pub extensions: Vec<String>,
    pub strategy: Box<dyn ResolveStrategy>,
}

impl ResolverEntry {
    pub fn new(
        name: impl Into<String>,
        extensions: &[&str],
        strategy: impl ResolveStrategy + 'static,
    ) -> Self {
        ResolverEntry {
            name: name.into(),
            extensions: extensions.iter().map(|ext| normalize_extension(ext)).collect(),
            strategy: Box::new(strategy),
        }
    }

    pub fn handles_any(&self, targets: &[String]) -> bool {
        self.extensions.iter().any(|ext| targets.contains(ext))
    }
}

impl fmt::Debug for ResolverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverEntry")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ResolverRegistry {
    entries: Vec<ResolverEntry>,
    supported: IndexSet<String>,
}

impl ResolverRegistry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in entries, in priority order.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        let builtins = [
            ResolverEntry::new(
                "typescript",
                &[".ts", ".tsx", ".js", ".jsx"],
                TypeScriptStrategy,
            ),
            ResolverEntry::new(
                "javascript",
                &[".js", ".jsx", ".mjs", ".cjs"],
                JavaScriptStrategy,
            ),
            ResolverEntry::new(
                "sass",
                &[".scss", ".sass"],
                StylesheetStrategy::new(StyleSyntax::Sass),
            ),
            ResolverEntry::new("less", &[".less"], StylesheetStrategy::new(StyleSyntax::Less)),
            ResolverEntry::new(
                "stylus",
                &[".styl"],
                StylesheetStrategy::new(StyleSyntax::Stylus),
            ),
            ResolverEntry::new("vue", &[".vue"], VueStrategy),
        ];
        for entry in builtins {
            registry.supported.extend(entry.extensions.iter().cloned());
            registry.entries.push(entry);
        }
        registry
    }

    /// Give `strategy` top priority for `extension`. Registering the same
    /// extension again adds another entry in front but never duplicates the
    /// extension in [`supported_extensions`](Self::supported_extensions).
    pub fn register(&mut self, extension: &str, strategy: impl ResolveStrategy + 'static) {
        let extension = normalize_extension(extension);
        let entry = ResolverEntry {
            name: strategy.name().to_string(),
            extensions: vec![extension],
            strategy: Box::new(strategy),
        };
        self.register_entry(entry);
    }

    /// Insert a fully described entry at the front.
    pub fn register_entry(&mut self, entry: ResolverEntry) {
        tracing::debug!(name = %entry.name, extensions = ?entry.extensions, "registering resolver");
        self.supported.extend(entry.extensions.iter().cloned());
        self.entries.insert(0, entry);
    }

    /// Move the first entry named `name` to the front.
    pub fn promote_default(&mut self, name: &str) -> ResolveResult<()> {
        let Some(index) = self.entries.iter().position(|entry| entry.name == name) else {
            return Err(ResolveError::UnknownResolver(name.to_string()));
        };
        if index > 0 {
            let entry = self.entries.remove(index);
            self.entries.insert(0, entry);
        }
        Ok(())
    }

    /// Entries whose extension set intersects `targets`, in priority order.
    pub fn matching<'a>(
        &'a self,
        targets: &'a [String],
    ) -> impl Iterator<Item = &'a ResolverEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.handles_any(targets))
    }

    pub fn supported_extensions(&self) -> impl Iterator<Item = &str> {
        self.supported.iter().map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
