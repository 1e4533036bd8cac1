//! RequireJS (AMD) module id resolution.
//!
//! Supports the config keys that decide where a module id lives on disk:
//! `baseUrl`, `paths` (with fallback arrays), `packages` and the `"*"`
//! entry of `map`. Loader plugin prefixes (`text!`, `css!`) are stripped
//! and the resource id is resolved instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::collaborators::AmdResolve;
use crate::context::Services;
use crate::error::{ResolveError, ResolveResult};
use crate::node::append_extension;
use crate::request::{AmdConfigInput, ResolutionRequest, absolutize, is_relative};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathTarget {
    One(String),
    Fallbacks(Vec<String>),
}

impl PathTarget {
    fn candidates(&self) -> Vec<&str> {
        match self {
            PathTarget::One(value) => vec![value.as_str()],
            PathTarget::Fallbacks(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmdPackage {
    Name(String),
    Spec {
        name: String,
        location: Option<String>,
        main: Option<String>,
    },
}

impl AmdPackage {
    fn name(&self) -> &str {
        match self {
            AmdPackage::Name(name) | AmdPackage::Spec { name, .. } => name,
        }
    }

    fn location(&self) -> &str {
        match self {
            AmdPackage::Spec {
                location: Some(location),
                ..
            } => location,
            _ => self.name(),
        }
    }

    fn main(&self) -> &str {
        match self {
            AmdPackage::Spec {
                main: Some(main), ..
            } => main.trim_start_matches("./"),
            _ => "main",
        }
    }
}

/// The subset of a RequireJS config that affects file lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmdConfig {
    pub base_url: Option<String>,
    #[serde(default)]
    pub paths: IndexMap<String, PathTarget>,
    #[serde(default)]
    pub packages: Vec<AmdPackage>,
    #[serde(default)]
    pub map: IndexMap<String, IndexMap<String, String>>,
}

impl AmdConfig {
    /// Directory module ids are resolved from.
    pub fn base_dir(&self, config_dir: &Path) -> PathBuf {
        match self.base_url.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => config_dir.join(base.trim_start_matches("./")),
            _ => config_dir.to_path_buf(),
        }
    }

    /// Apply `map["*"]`, longest matching prefix first.
    fn apply_star_map(&self, id: &str) -> String {
        let Some(star) = self.map.get("*") else {
            return id.to_string();
        };
        longest_prefix(star.keys().map(String::as_str), id)
            .and_then(|(key, rest)| star.get(key).map(|target| format!("{}{}", target, rest)))
            .unwrap_or_else(|| id.to_string())
    }

    /// Module id to paths relative to the base directory, in preference order.
    fn id_to_paths(&self, id: &str) -> Vec<String> {
        if let Some((key, rest)) = longest_prefix(self.paths.keys().map(String::as_str), id) {
            if let Some(target) = self.paths.get(key) {
                return target
                    .candidates()
                    .into_iter()
                    .map(|value| format!("{}{}", value, rest))
                    .collect();
            }
        }

        for package in &self.packages {
            let name = package.name();
            if id == name {
                return vec![format!("{}/{}", package.location(), package.main())];
            }
            if let Some(rest) = id.strip_prefix(name).filter(|rest| rest.starts_with('/')) {
                return vec![format!("{}{}", package.location(), rest)];
            }
        }

        vec![id.to_string()]
    }
}

/// Longest key that equals `id` or is a `/`-segment prefix of it, with the
/// remainder of `id` (including its leading `/`).
fn longest_prefix<'a, 'b>(
    keys: impl Iterator<Item = &'a str>,
    id: &'b str,
) -> Option<(&'a str, &'b str)> {
    keys.filter_map(|key| {
        if id == key {
            Some((key, ""))
        } else {
            id.strip_prefix(key)
                .filter(|rest| rest.starts_with('/'))
                .map(|rest| (key, rest))
        }
    })
    .max_by_key(|(key, _)| key.len())
}

/// Read a RequireJS config file: plain JSON, or a script whose
/// `require.config(...)` argument (or first object literal) holds the config.
pub fn load_amd_config(path: &Path) -> Result<AmdConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read AMD config {}", path.display()))?;

    if let Ok(config) = crate::jsonc::parse_jsonc::<AmdConfig>(&source) {
        return Ok(config);
    }

    let literal = crate::jsonc::object_literal_after(&source, &CONFIG_CALLS)
        .ok_or_else(|| anyhow!("no config object found in {}", path.display()))?;
    crate::jsonc::parse_json5(literal)
        .with_context(|| format!("failed to parse AMD config {}", path.display()))
}

const CONFIG_CALLS: [&str; 2] = ["requirejs.config(", "require.config("];

/// Strip `plugin!` prefixes, keeping the resource id.
fn strip_plugin(specifier: &str) -> &str {
    match specifier.rfind('!') {
        Some(idx) => &specifier[idx + 1..],
        None => specifier,
    }
}

#[derive(Debug, Default)]
pub struct AmdResolver;

impl AmdResolver {
    fn probe(candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        let with_js = append_extension(candidate, ".js");
        with_js.is_file().then_some(with_js)
    }
}

impl AmdResolve for AmdResolver {
    fn resolve(
        &mut self,
        config: &AmdConfig,
        base_dir: &Path,
        source_dir: &Path,
        specifier: &str,
    ) -> ResolveResult<Option<PathBuf>> {
        let id = strip_plugin(specifier).trim();
        if id.is_empty() {
            return Ok(None);
        }

        let candidates: Vec<PathBuf> = if is_relative(id) {
            vec![source_dir.join(id)]
        } else {
            let root = config.base_dir(base_dir);
            config
                .id_to_paths(&config.apply_star_map(id))
                .into_iter()
                .map(|path| root.join(path))
                .collect()
        };

        let found = candidates.iter().find_map(|candidate| Self::probe(candidate));
        tracing::trace!(specifier, ?candidates, found = ?found, "amd lookup");
        Ok(found.map(|path| absolutize(&path)))
    }
}

/// Resolve a JS request through its RequireJS config. Without one, module
/// ids resolve from the request directory.
pub(crate) fn resolve_request(
    services: &mut Services,
    request: &ResolutionRequest,
) -> ResolveResult<Option<PathBuf>> {
    if !request.has_specifier() {
        return Ok(None);
    }

    let (config, config_dir): (Arc<AmdConfig>, PathBuf) = match &request.amd_config {
        AmdConfigInput::Absent => (Arc::new(AmdConfig::default()), request.directory.clone()),
        AmdConfigInput::Inline(config) => (config.clone(), request.directory.clone()),
        AmdConfigInput::FilePath(path) => {
            let config = services.amd_config(path)?;
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| request.directory.clone());
            (config, dir)
        }
    };

    let source_dir = request.source_dir().to_path_buf();
    services
        .amd()
        .resolve(&config, &config_dir, &source_dir, &request.specifier)
}

pub(crate) fn load_cached(path: &Path) -> ResolveResult<Arc<AmdConfig>> {
    load_amd_config(path)
        .map(Arc::new)
        .map_err(|err| ResolveError::strategy("amd", format!("{:#}", err)))
}
