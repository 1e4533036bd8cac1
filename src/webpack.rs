//! webpack-style resolution: `resolve.alias`, `resolve.modules`,
//! `resolve.extensions`, `resolve.mainFields` and loader-prefixed requests.
//!
//! Configs are read from JSON/JSONC files, or from scripts whose exported
//! value (`module.exports = {...}`, `export default {...}`) is a plain object
//! literal. Computed values such as `path.resolve(...)` make the config
//! unloadable. An array config contributes its first element.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::collaborators::{NodeResolve, WebpackResolve};
use crate::context::Services;
use crate::error::ResolveResult;
use crate::node::{ModulesDir, NodeOptions, NodeResolver};
use crate::request::{ResolutionRequest, absolutize, is_relative};

const DEFAULT_EXTENSIONS: [&str; 3] = [".js", ".json", ".wasm"];
const DEFAULT_MAIN_FIELDS: [&str; 3] = ["browser", "module", "main"];

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AliasTarget {
    /// `false` ignores the module.
    Ignore(bool),
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    #[default]
    Empty,
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::Empty => Vec::new(),
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

/// The `resolve` section of a webpack config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpackResolveConfig {
    #[serde(default)]
    pub alias: IndexMap<String, AliasTarget>,
    pub extensions: Option<Vec<String>>,
    pub modules: Option<Vec<String>>,
    /// webpack 1 spelling of `modules`.
    pub modules_directories: Option<Vec<String>>,
    /// webpack 1 absolute module roots.
    #[serde(default)]
    pub root: OneOrMany,
    pub main_fields: Option<Vec<String>>,
    pub main_files: Option<Vec<String>>,
}

impl WebpackResolveConfig {
    /// Apply webpack's defaults, using `directory` as an extra module root
    /// when the config names none.
    pub fn with_defaults(mut self, directory: &Path) -> Self {
        if self.modules.is_none() && self.modules_directories.is_none() {
            self.modules = Some(vec![
                "node_modules".to_string(),
                absolutize(directory).display().to_string(),
            ]);
        }
        self
    }

    pub fn node_options(&self) -> NodeOptions {
        let mut modules: Vec<ModulesDir> = self
            .modules
            .iter()
            .chain(self.modules_directories.iter())
            .flatten()
            .map(|value| ModulesDir::from_config(value))
            .collect();
        modules.extend(
            self.root
                .to_vec()
                .into_iter()
                .map(|root| ModulesDir::Absolute(PathBuf::from(root))),
        );

        NodeOptions {
            extensions: self
                .extensions
                .clone()
                .map(|exts| exts.into_iter().filter(|ext| !ext.is_empty()).collect())
                .unwrap_or_else(|| owned(&DEFAULT_EXTENSIONS)),
            main_fields: self
                .main_fields
                .clone()
                .unwrap_or_else(|| owned(&DEFAULT_MAIN_FIELDS)),
            main_files: self
                .main_files
                .clone()
                .unwrap_or_else(|| vec!["index".to_string()]),
            modules,
            entry_override: None,
        }
    }

    /// Rewrite `specifier` through the alias table. `Some(vec![])` means
    /// the module is aliased to `false`.
    pub fn apply_alias(&self, specifier: &str) -> Option<Vec<String>> {
        for (key, target) in &self.alias {
            let rest = if let Some(exact) = key.strip_suffix('$') {
                if specifier != exact {
                    continue;
                }
                ""
            } else if specifier == key {
                ""
            } else if let Some(rest) = specifier
                .strip_prefix(key.as_str())
                .filter(|rest| rest.starts_with('/'))
            {
                rest
            } else {
                continue;
            };

            let targets = match target {
                AliasTarget::Ignore(_) => Vec::new(),
                AliasTarget::One(value) => vec![format!("{}{}", value, rest)],
                AliasTarget::Many(values) => {
                    values.iter().map(|value| format!("{}{}", value, rest)).collect()
                }
            };
            return Some(targets);
        }
        None
    }
}

/// Load the `resolve` section from a webpack config file.
pub fn load_webpack_config(path: &Path) -> Result<WebpackResolveConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read webpack config {}", path.display()))?;
    let value: serde_json::Value = match crate::jsonc::parse_jsonc(&source) {
        Ok(value) => value,
        Err(_) => {
            let literal = crate::jsonc::object_literal_after(&source, &EXPORT_FORMS)
                .with_context(|| format!("no config object found in {}", path.display()))?;
            crate::jsonc::parse_json5(literal)
                .with_context(|| format!("failed to parse webpack config {}", path.display()))?
        }
    };

    let config = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    let Some(object) = config.as_object() else {
        bail!("webpack config {} is not an object", path.display());
    };

    match object.get("resolve") {
        Some(resolve) => serde_json::from_value(resolve.clone())
            .with_context(|| format!("invalid resolve section in {}", path.display())),
        None => Ok(WebpackResolveConfig::default()),
    }
}

const EXPORT_FORMS: [&str; 2] = ["module.exports", "export default"];

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Strip `loader!other-loader!` prefixes from a request.
pub fn strip_loaders(specifier: &str) -> &str {
    match specifier.rfind('!') {
        Some(idx) => &specifier[idx + 1..],
        None => specifier,
    }
}

#[derive(Debug, Default)]
pub struct WebpackResolver {
    node: NodeResolver,
}

impl WebpackResolve for WebpackResolver {
    fn resolve(
        &mut self,
        config: &WebpackResolveConfig,
        lookup_dir: &Path,
        specifier: &str,
    ) -> ResolveResult<Option<PathBuf>> {
        let options = config.node_options();
        let candidates = config
            .apply_alias(specifier)
            .unwrap_or_else(|| vec![specifier.to_string()]);

        for candidate in candidates {
            if let Some(found) = self.node.resolve(&candidate, lookup_dir, &options)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

/// Resolve a JS request under its webpack config. A config that cannot be
/// loaded yields no result rather than an error.
pub(crate) fn resolve_request(
    services: &mut Services,
    request: &ResolutionRequest,
    config_path: &Path,
) -> ResolveResult<Option<PathBuf>> {
    let Some(config) = services.webpack_config(config_path, &request.directory) else {
        return Ok(None);
    };

    let specifier = strip_loaders(&request.specifier);
    if specifier.is_empty() {
        return Ok(None);
    }
    let lookup_dir = if is_relative(specifier) {
        request.source_dir().to_path_buf()
    } else {
        request.directory.clone()
    };

    tracing::debug!(
        specifier,
        lookup_dir = %lookup_dir.display(),
        config = %config_path.display(),
        "webpack lookup"
    );
    services
        .webpack()
        .resolve(&config, &absolutize(&lookup_dir), specifier)
}

pub(crate) fn load_cached(path: &Path, directory: &Path) -> Option<Arc<WebpackResolveConfig>> {
    match load_webpack_config(path) {
        Ok(config) => Some(Arc::new(config.with_defaults(directory))),
        Err(err) => {
            let reason = format!("{:#}", err);
            tracing::warn!(config = %path.display(), error = %reason, "ignoring webpack config");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(json: &str) -> WebpackResolveConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn strips_loader_chain() {
        assert_eq!(strip_loaders("hgn!resolve"), "resolve");
        assert_eq!(strip_loaders("style!css!./app.css"), "./app.css");
        assert_eq!(strip_loaders("plain"), "plain");
    }

    #[test]
    fn alias_prefix_and_exact_forms() {
        let config = config(
            r#"{"alias": {"lib$": "/abs/lib/index.js", "utils": "/abs/utils", "gone": false}}"#,
        );
        assert_eq!(
            config.apply_alias("lib"),
            Some(vec!["/abs/lib/index.js".to_string()])
        );
        assert_eq!(config.apply_alias("lib/sub"), None);
        assert_eq!(
            config.apply_alias("utils/date"),
            Some(vec!["/abs/utils/date".to_string()])
        );
        assert_eq!(config.apply_alias("utilsx"), None);
        assert_eq!(config.apply_alias("gone"), Some(Vec::new()));
    }

    #[test]
    fn defaults_add_directory_as_module_root() {
        let config = WebpackResolveConfig::default().with_defaults(Path::new("/project"));
        assert_eq!(
            config.node_options().modules,
            vec![
                ModulesDir::Hierarchical("node_modules".to_string()),
                ModulesDir::Absolute(PathBuf::from("/project")),
            ]
        );
    }

    #[test]
    fn loads_first_element_of_array_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webpack.config.json");
        fs::write(
            &path,
            r#"[{"resolve": {"extensions": [".ts", ".js"]}}, {"resolve": {}}]"#,
        )
        .unwrap();

        let config = load_webpack_config(&path).unwrap();
        assert_eq!(
            config.extensions,
            Some(vec![".ts".to_string(), ".js".to_string()])
        );
    }

    #[test]
    fn loads_module_exports_script() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webpack.config.js");
        fs::write(
            &path,
            "// build config\nmodule.exports = {\n  entry: './src/index.js',\n  resolve: {\n    extensions: ['.js', '.jsx'],\n    alias: { '@app': '/abs/app' },\n  },\n};\n",
        )
        .unwrap();

        let config = load_webpack_config(&path).unwrap();
        assert_eq!(
            config.extensions,
            Some(vec![".js".to_string(), ".jsx".to_string()])
        );
        assert_eq!(
            config.apply_alias("@app/main"),
            Some(vec!["/abs/app/main".to_string()])
        );
    }

    #[test]
    fn computed_script_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webpack.config.js");
        fs::write(
            &path,
            "module.exports = { resolve: { modules: [path.resolve(__dirname, 'src')] } };",
        )
        .unwrap();
        assert!(load_webpack_config(&path).is_err());
    }

    #[test]
    fn non_object_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("webpack.config.json");
        fs::write(&path, "42").unwrap();
        assert!(load_webpack_config(&path).is_err());
    }

    #[test]
    fn resolver_follows_alias_to_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("shared/components/button.js");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "").unwrap();

        let config = config(&format!(
            r#"{{"alias": {{"@components": "{}"}}}}"#,
            temp.path().join("shared/components").display()
        ))
        .with_defaults(temp.path());

        let mut resolver = WebpackResolver::default();
        let found = resolver
            .resolve(&config, temp.path(), "@components/button")
            .unwrap();
        assert_eq!(found, Some(target));
    }
}
