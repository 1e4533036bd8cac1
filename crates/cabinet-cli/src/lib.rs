//! Command-line front end: turn parsed arguments into a resolution request
//! and run it.

pub mod args;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cabinet::{AmdConfigInput, ResolutionRequest, ResolveError, ResolverContext, TsConfigInput};

use crate::args::CliArgs;

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved(PathBuf),
    Unresolved,
    Extensions(Vec<String>),
}

/// Build the request described by `args`, with relative paths taken from
/// `cwd`.
pub fn build_request(args: &CliArgs, cwd: &Path) -> Result<ResolutionRequest> {
    let specifier = args.specifier.clone().unwrap_or_default();
    let filename = args
        .filename
        .as_ref()
        .map(|path| cwd.join(path))
        .unwrap_or_default();
    let directory = args
        .directory
        .as_ref()
        .map(|dir| cwd.join(dir))
        .unwrap_or_else(|| cwd.to_path_buf());

    let mut request = ResolutionRequest::new(specifier, filename, directory)
        .no_type_definitions(args.no_type_definitions);

    for extension in &args.extensions {
        request = request.with_extension(extension.as_str());
    }
    if let Some(ts_config) = &args.ts_config {
        request = request.with_ts_config(parse_ts_config(ts_config, cwd)?);
    }
    if let Some(webpack_config) = &args.webpack_config {
        request = request.with_webpack_config(cwd.join(webpack_config));
    }
    if let Some(amd_config) = &args.amd_config {
        request = request.with_amd_config(AmdConfigInput::FilePath(cwd.join(amd_config)));
    }
    if let Some(entry) = &args.node_module_entry {
        request = request.with_node_module_entry(entry.as_str());
    }
    Ok(request)
}

/// An argument starting with `{` is an inline tsconfig; anything else is a
/// path.
fn parse_ts_config(value: &str, cwd: &Path) -> Result<TsConfigInput> {
    let trimmed = value.trim_start();
    if trimmed.starts_with('{') {
        let json: serde_json::Value = serde_json::from_str(trimmed)
            .context("failed to parse inline --ts-config JSON")
            .map_err(ResolveError::ConfigInvalid)?;
        return Ok(TsConfigInput::Inline(Arc::new(json)));
    }
    Ok(TsConfigInput::FilePath(cwd.join(value)))
}

/// Run one resolution with a fresh context.
pub fn run(args: &CliArgs, cwd: &Path) -> Result<Outcome> {
    let mut ctx = ResolverContext::new();

    if args.list_extensions {
        return Ok(Outcome::Extensions(ctx.supported_extensions()));
    }

    let request = build_request(args, cwd)?;
    tracing::debug!(?request, "resolving");
    match ctx.dispatch(&request)? {
        Some(path) => Ok(Outcome::Resolved(path)),
        None => Ok(Outcome::Unresolved),
    }
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
