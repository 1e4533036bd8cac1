//! Fallback used when no registry entry claims a request's extensions.
//!
//! It knows nothing about module systems: a relative specifier is tried
//! as-is, then with each target extension, then as `<dir>/index<ext>`.
//! Bare specifiers are looked up relative to the request directory the
//! same way.

use std::path::PathBuf;

use crate::context::Services;
use crate::error::ResolveResult;
use crate::node::append_extension;
use crate::registry::ResolveStrategy;
use crate::request::{ResolutionRequest, absolutize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericStrategy {
    extensions: Vec<String>,
}

impl GenericStrategy {
    pub fn new(extensions: Vec<String>) -> Self {
        GenericStrategy { extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl ResolveStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn resolve(
        &self,
        _services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        if !request.has_specifier() {
            return Ok(None);
        }

        let base = if request.is_relative_specifier() {
            request.source_dir().to_path_buf()
        } else {
            request.directory.clone()
        };
        let target = base.join(&request.specifier);

        let mut candidates = vec![target.clone()];
        candidates.extend(self.extensions.iter().map(|ext| append_extension(&target, ext)));
        candidates.extend(
            self.extensions
                .iter()
                .map(|ext| target.join(format!("index{}", ext))),
        );

        let found = candidates.into_iter().find(|candidate| candidate.is_file());
        Ok(found.map(|path| absolutize(&path)))
    }
}
