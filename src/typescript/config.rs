//! tsconfig loading and `compilerOptions` normalization.
//!
//! Only the options that influence module resolution are read. Relative
//! paths are anchored at the directory of the config that declared them,
//! so an option inherited through `extends` keeps pointing where its author
//! intended.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer};

/// Accepts `true` as well as `"true"` for boolean options.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => {
            let normalized = s.trim().to_lowercase();
            match normalized.as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(Error::custom(format!(
                    "invalid boolean value: '{}'. Expected true, false, 'true', or 'false'",
                    s
                ))),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub compiler_options: Option<CompilerOptions>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub module_resolution: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub paths: Option<IndexMap<String, Vec<String>>>,
    #[serde(default)]
    pub type_roots: Option<Vec<String>>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub allow_js: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub resolve_json_module: Option<bool>,
    #[serde(default)]
    pub custom_conditions: Option<Vec<String>>,
    /// Directory `paths` targets are relative to when inherited from a base
    /// config without `baseUrl`.
    #[serde(skip)]
    pub paths_base: Option<PathBuf>,
}

/// The `module` compiler option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    None,
    CommonJs,
    Amd,
    Umd,
    System,
    Es2015,
    Es2020,
    Es2022,
    EsNext,
    Node16,
    Node18,
    NodeNext,
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolutionKind {
    Classic,
    Node10,
    Node16,
    NodeNext,
    Bundler,
}

impl ModuleResolutionKind {
    /// Whether package.json `exports`, `imports` and self-references apply.
    pub fn supports_exports(self) -> bool {
        matches!(
            self,
            ModuleResolutionKind::Node16
                | ModuleResolutionKind::NodeNext
                | ModuleResolutionKind::Bundler
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub(crate) pattern: String,
    pub(crate) prefix: String,
    pub(crate) suffix: String,
    pub(crate) targets: Vec<String>,
}

impl PathMapping {
    pub(crate) fn match_specifier(&self, specifier: &str) -> Option<String> {
        if !self.pattern.contains('*') {
            return if self.pattern == specifier {
                Some(String::new())
            } else {
                None
            };
        }

        if !specifier.starts_with(&self.prefix) || !specifier.ends_with(&self.suffix) {
            return None;
        }

        let start = self.prefix.len();
        let end = specifier.len().saturating_sub(self.suffix.len());
        if end < start {
            return None;
        }

        Some(specifier[start..end].to_string())
    }

    pub(crate) fn specificity(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }
}

/// Compiler options after normalization. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCompilerOptions {
    pub module: ModuleKind,
    pub module_resolution: Option<ModuleResolutionKind>,
    pub base_url: Option<PathBuf>,
    pub paths: Vec<PathMapping>,
    /// Directory `paths` targets are joined to.
    pub paths_base: PathBuf,
    pub type_roots: Option<Vec<PathBuf>>,
    pub types: Option<Vec<String>>,
    pub allow_js: bool,
    pub resolve_json_module: bool,
    pub custom_conditions: Vec<String>,
    /// Directory relative options were resolved against.
    pub base_path: PathBuf,
}

impl ResolvedCompilerOptions {
    /// Options for an absent tsconfig.
    pub fn defaults(base_path: &Path) -> Self {
        ResolvedCompilerOptions {
            module: ModuleKind::Amd,
            module_resolution: None,
            base_url: None,
            paths: Vec::new(),
            paths_base: base_path.to_path_buf(),
            type_roots: None,
            types: None,
            allow_js: false,
            resolve_json_module: false,
            custom_conditions: Vec::new(),
            base_path: base_path.to_path_buf(),
        }
    }

    pub fn effective_module_resolution(&self) -> ModuleResolutionKind {
        if let Some(resolution) = self.module_resolution {
            return resolution;
        }

        match self.module {
            ModuleKind::CommonJs => ModuleResolutionKind::Node10,
            ModuleKind::Node16 | ModuleKind::Node18 => ModuleResolutionKind::Node16,
            ModuleKind::NodeNext => ModuleResolutionKind::NodeNext,
            ModuleKind::Preserve => ModuleResolutionKind::Bundler,
            _ => ModuleResolutionKind::Classic,
        }
    }
}

/// Normalize `compilerOptions` against `base_path`. A missing `module`
/// becomes AMD.
pub fn resolve_compiler_options(
    options: Option<&CompilerOptions>,
    base_path: &Path,
) -> Result<ResolvedCompilerOptions> {
    let mut resolved = ResolvedCompilerOptions::defaults(base_path);
    let Some(options) = options else {
        return Ok(resolved);
    };

    if let Some(module) = options.module.as_deref()
        && !module.trim().is_empty()
    {
        resolved.module = parse_module_kind(module)?;
    }

    if let Some(module_resolution) = options.module_resolution.as_deref() {
        let value = module_resolution.trim();
        if !value.is_empty() {
            resolved.module_resolution = Some(parse_module_resolution(value)?);
        }
    }

    let base_url = options.base_url.as_deref().map(str::trim);
    if let Some(base_url) = base_url
        && !base_url.is_empty()
    {
        resolved.base_url = Some(crate::request::normalize_lexically(
            &base_path.join(base_url),
        ));
    }

    resolved.paths_base = resolved
        .base_url
        .clone()
        .or_else(|| {
            options
                .paths_base
                .as_deref()
                .map(crate::request::normalize_lexically)
        })
        .unwrap_or_else(|| base_path.to_path_buf());

    if let Some(paths) = options.paths.as_ref() {
        resolved.paths = build_path_mappings(paths);
    }

    if let Some(type_roots) = options.type_roots.as_ref() {
        let roots: Vec<PathBuf> = type_roots
            .iter()
            .filter_map(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(crate::request::normalize_lexically(&base_path.join(trimmed)))
                }
            })
            .collect();
        resolved.type_roots = Some(roots);
    }

    if let Some(types) = options.types.as_ref() {
        let list: Vec<String> = types
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        resolved.types = Some(list);
    }

    resolved.allow_js = options.allow_js.unwrap_or(false);
    resolved.resolve_json_module = options.resolve_json_module.unwrap_or(false);
    resolved.custom_conditions = options.custom_conditions.clone().unwrap_or_default();

    Ok(resolved)
}

pub fn parse_tsconfig(source: &str) -> Result<TsConfig> {
    crate::jsonc::parse_jsonc(source).context("failed to parse tsconfig JSON")
}

/// Read a tsconfig file, following `extends`.
pub fn load_tsconfig(path: &Path) -> Result<TsConfig> {
    let mut visited = FxHashSet::default();
    load_tsconfig_inner(path, &mut visited)
}

/// Build a config from an in-memory JSON object, following `extends`
/// relative to `base_path`.
pub fn tsconfig_from_value(value: &serde_json::Value, base_path: &Path) -> Result<TsConfig> {
    let mut config: TsConfig =
        serde_json::from_value(value.clone()).context("failed to parse tsconfig object")?;
    if let Some(extends) = config.extends.take() {
        let base = resolve_extends_path(base_path, &extends)?;
        let mut visited = FxHashSet::default();
        let mut base_config = load_tsconfig_inner(&base, &mut visited)?;
        if let (Some(options), Some(base_dir)) =
            (base_config.compiler_options.as_mut(), base.parent())
        {
            anchor_relative_options(options, base_dir);
        }
        config = merge_configs(base_config, config);
    }
    Ok(config)
}

fn load_tsconfig_inner(path: &Path, visited: &mut FxHashSet<PathBuf>) -> Result<TsConfig> {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical.clone()) {
        bail!("tsconfig extends cycle detected at {}", canonical.display());
    }

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tsconfig: {}", path.display()))?;
    let mut config = parse_tsconfig(&source)
        .with_context(|| format!("failed to parse tsconfig: {}", path.display()))?;

    let extends = config.extends.take();
    if let Some(extends_path) = extends {
        let config_dir = path
            .parent()
            .ok_or_else(|| anyhow!("tsconfig has no parent directory"))?;
        let base_path = resolve_extends_path(config_dir, &extends_path)?;
        let mut base_config = load_tsconfig_inner(&base_path, visited)?;
        if let (Some(options), Some(base_dir)) =
            (base_config.compiler_options.as_mut(), base_path.parent())
        {
            anchor_relative_options(options, base_dir);
        }
        config = merge_configs(base_config, config);
    }

    visited.remove(&canonical);
    Ok(config)
}

/// `extends` is either a path (relative to the extending config) or a
/// package specifier looked up in `node_modules`.
fn resolve_extends_path(config_dir: &Path, extends: &str) -> Result<PathBuf> {
    let mut candidate = PathBuf::from(extends);
    if candidate.extension().is_none() {
        candidate.set_extension("json");
    }

    if candidate.is_absolute() {
        return Ok(candidate);
    }
    if crate::request::is_relative(extends) {
        return Ok(config_dir.join(candidate));
    }

    for dir in config_dir.ancestors() {
        let package_dir = dir.join("node_modules").join(extends);
        let in_package = dir.join("node_modules").join(&candidate);
        if in_package.is_file() {
            return Ok(in_package);
        }
        if package_dir.is_dir() {
            return Ok(package_dir.join("tsconfig.json"));
        }
    }
    bail!("cannot find base config '{}'", extends)
}

/// Make a base config's relative paths absolute so they survive the merge.
fn anchor_relative_options(options: &mut CompilerOptions, base_dir: &Path) {
    let anchor = |value: &str| {
        let path = Path::new(value.trim());
        if path.is_absolute() {
            value.to_string()
        } else {
            base_dir.join(path).display().to_string()
        }
    };

    if let Some(base_url) = options.base_url.as_mut() {
        *base_url = anchor(base_url.as_str());
    } else if options.paths.is_some() && options.paths_base.is_none() {
        options.paths_base = Some(base_dir.to_path_buf());
    }
    if let Some(type_roots) = options.type_roots.as_mut() {
        for root in type_roots.iter_mut() {
            *root = anchor(root.as_str());
        }
    }
}

fn merge_configs(base: TsConfig, mut child: TsConfig) -> TsConfig {
    let merged_compiler_options = match (base.compiler_options, child.compiler_options.take()) {
        (Some(base_opts), Some(child_opts)) => Some(merge_compiler_options(base_opts, child_opts)),
        (Some(base_opts), None) => Some(base_opts),
        (None, Some(child_opts)) => Some(child_opts),
        (None, None) => None,
    };

    TsConfig {
        extends: None,
        compiler_options: merged_compiler_options,
    }
}

fn merge_compiler_options(base: CompilerOptions, child: CompilerOptions) -> CompilerOptions {
    let child_has_paths = child.paths.is_some();
    CompilerOptions {
        module: child.module.or(base.module),
        module_resolution: child.module_resolution.or(base.module_resolution),
        base_url: child.base_url.or(base.base_url),
        paths_base: if child_has_paths {
            child.paths_base
        } else {
            base.paths_base
        },
        paths: child.paths.or(base.paths),
        type_roots: child.type_roots.or(base.type_roots),
        types: child.types.or(base.types),
        allow_js: child.allow_js.or(base.allow_js),
        resolve_json_module: child.resolve_json_module.or(base.resolve_json_module),
        custom_conditions: child.custom_conditions.or(base.custom_conditions),
    }
}

fn parse_module_kind(value: &str) -> Result<ModuleKind> {
    let normalized = normalize_option(value);
    let module = match normalized.as_str() {
        "none" => ModuleKind::None,
        "commonjs" => ModuleKind::CommonJs,
        "amd" => ModuleKind::Amd,
        "umd" => ModuleKind::Umd,
        "system" => ModuleKind::System,
        "es6" | "es2015" => ModuleKind::Es2015,
        "es2020" => ModuleKind::Es2020,
        "es2022" => ModuleKind::Es2022,
        "esnext" => ModuleKind::EsNext,
        "node16" => ModuleKind::Node16,
        "node18" => ModuleKind::Node18,
        "nodenext" => ModuleKind::NodeNext,
        "preserve" => ModuleKind::Preserve,
        _ => bail!("unsupported compilerOptions.module '{}'", value),
    };

    Ok(module)
}

fn parse_module_resolution(value: &str) -> Result<ModuleResolutionKind> {
    let normalized = normalize_option(value);
    let resolution = match normalized.as_str() {
        "classic" => ModuleResolutionKind::Classic,
        "node" | "node10" => ModuleResolutionKind::Node10,
        "node16" => ModuleResolutionKind::Node16,
        "nodenext" => ModuleResolutionKind::NodeNext,
        "bundler" => ModuleResolutionKind::Bundler,
        _ => bail!("unsupported compilerOptions.moduleResolution '{}'", value),
    };

    Ok(resolution)
}

fn build_path_mappings(paths: &IndexMap<String, Vec<String>>) -> Vec<PathMapping> {
    let mut mappings = Vec::new();
    for (pattern, targets) in paths {
        if targets.is_empty() {
            continue;
        }
        let pattern = normalize_path_pattern(pattern);
        let targets = targets
            .iter()
            .map(|target| normalize_path_pattern(target))
            .collect();
        let (prefix, suffix) = split_path_pattern(&pattern);
        mappings.push(PathMapping {
            pattern,
            prefix,
            suffix,
            targets,
        });
    }
    mappings.sort_by(|left, right| {
        right
            .specificity()
            .cmp(&left.specificity())
            .then_with(|| right.pattern.len().cmp(&left.pattern.len()))
            .then_with(|| left.pattern.cmp(&right.pattern))
    });
    mappings
}

fn normalize_path_pattern(value: &str) -> String {
    value.trim().replace('\\', "/")
}

fn split_path_pattern(pattern: &str) -> (String, String) {
    match pattern.find('*') {
        Some(star_idx) => {
            let (prefix, rest) = pattern.split_at(star_idx);
            (prefix.to_string(), rest[1..].to_string())
        }
        None => (pattern.to_string(), String::new()),
    }
}

fn normalize_option(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            continue;
        }
        normalized.push(ch.to_ascii_lowercase());
    }
    normalized
}

#[cfg(test)]
#[path = "../tests/ts_config_tests.rs"]
mod tests;
