//! Module-kind aware routing for JavaScript sources.
//!
//! An AMD config wins over a webpack config, which wins over whatever the
//! classifier reports for the file. AMD sources go to the RequireJS
//! resolver, webpack sources to the webpack adapter, and everything else
//! (CommonJS, ES modules, unknown) to the Node-style resolver.

use std::path::PathBuf;

use crate::amd;
use crate::context::Services;
use crate::error::ResolveResult;
use crate::module_kind::ModuleKind;
use crate::node::NodeOptions;
use crate::registry::ResolveStrategy;
use crate::request::{ResolutionRequest, absolutize};
use crate::webpack;

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptStrategy;

impl ResolveStrategy for JavaScriptStrategy {
    fn name(&self) -> &str {
        "javascript"
    }

    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        resolve_js(services, request)
    }
}

/// The module system `request.source_file` is treated as.
pub fn module_kind_for(
    services: &mut Services,
    request: &ResolutionRequest,
) -> ResolveResult<Option<ModuleKind>> {
    if request.amd_config.is_present() {
        return Ok(Some(ModuleKind::Amd));
    }
    if request.webpack_config.is_some() {
        return Ok(Some(ModuleKind::Webpack));
    }
    services
        .classifier()
        .classify(&request.source_file, request.syntax.as_ref())
}

pub(crate) fn resolve_js(
    services: &mut Services,
    request: &ResolutionRequest,
) -> ResolveResult<Option<PathBuf>> {
    if !request.has_specifier() {
        return Ok(None);
    }

    let kind = module_kind_for(services, request)?;
    tracing::debug!(
        specifier = %request.specifier,
        source = %request.source_file.display(),
        kind = kind.map(ModuleKind::as_str).unwrap_or("unknown"),
        "javascript lookup"
    );

    match (kind, &request.webpack_config) {
        (Some(ModuleKind::Amd), _) => amd::resolve_request(services, request),
        (Some(ModuleKind::Webpack), Some(config_path)) => {
            webpack::resolve_request(services, request, config_path)
        }
        _ => resolve_commonjs(services, request),
    }
}

/// Relative specifiers are anchored at the source file; bare ones are
/// searched from the request directory.
fn resolve_commonjs(
    services: &mut Services,
    request: &ResolutionRequest,
) -> ResolveResult<Option<PathBuf>> {
    let specifier = if request.is_relative_specifier() {
        absolutize(&request.source_dir().join(&request.specifier))
            .to_string_lossy()
            .into_owned()
    } else {
        request.specifier.clone()
    };

    let options = NodeOptions::default().with_entry_override(request.node_module_entry.clone());
    services
        .node()
        .resolve(&specifier, &request.directory, &options)
}
