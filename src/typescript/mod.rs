//! TypeScript resolution engine.
//!
//! Wraps the module name resolver with everything a dispatch needs around
//! it: deriving compiler options from whichever form of tsconfig the caller
//! supplied, keeping a compiler host alive across calls in the same
//! directory, and the fallbacks for results tsc itself would not return
//! (`.vue` and friends through their failed `.d.ts` probes, implementation
//! files in place of declarations).

mod config;
mod host;
mod resolver;

pub use config::{
    CompilerOptions, ModuleKind as TsModuleKind, ModuleResolutionKind, PathMapping,
    ResolvedCompilerOptions, TsConfig, load_tsconfig, parse_tsconfig, resolve_compiler_options,
    tsconfig_from_value,
};
pub use host::{CompilerHost, ModuleResolutionCache, TsHostState};
pub use resolver::{
    ModuleExtension, ResolvedModule, ResolvedModuleWithFailedLookupLocations, resolve_js_module,
    resolve_module_name,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::Services;
use crate::error::{ResolveError, ResolveResult};
use crate::registry::ResolveStrategy;
use crate::request::{ResolutionRequest, TsConfigInput, absolutize};

/// Identity of a tsconfig input. Inline values are keyed by the address of
/// their `Arc`, so the same allocation never parses twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OptionsKey {
    Absent,
    Inline(usize),
    Path(PathBuf),
}

#[derive(Debug)]
struct CachedOptions {
    options: Arc<ResolvedCompilerOptions>,
    /// Holds an inline value alive so its address cannot be reused by a
    /// different value while the key is cached.
    _inline: Option<Arc<serde_json::Value>>,
}

#[derive(Debug, Default)]
pub struct TsEngine {
    options: FxHashMap<OptionsKey, CachedOptions>,
    host_state: Option<TsHostState>,
    disable_host_cache: bool,
    host_builds: usize,
    last_options: Option<Arc<ResolvedCompilerOptions>>,
}

impl TsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a compiler host has been built.
    pub fn host_builds(&self) -> usize {
        self.host_builds
    }

    /// Options used by the most recent [`resolve`](Self::resolve).
    pub fn last_options(&self) -> Option<&ResolvedCompilerOptions> {
        self.last_options.as_deref()
    }

    /// Number of distinct tsconfig inputs converted so far.
    pub fn cached_options(&self) -> usize {
        self.options.len()
    }

    /// Force a fresh host on every call.
    pub fn set_disable_host_cache(&mut self, disable: bool) {
        self.disable_host_cache = disable;
    }

    /// Compiler options for `config`, converted once per identity.
    pub fn options_for(
        &mut self,
        config: &TsConfigInput,
    ) -> ResolveResult<Arc<ResolvedCompilerOptions>> {
        let key = match config {
            TsConfigInput::Absent => OptionsKey::Absent,
            TsConfigInput::Inline(value) => OptionsKey::Inline(Arc::as_ptr(value) as usize),
            TsConfigInput::FilePath(path) => OptionsKey::Path(path.clone()),
        };
        if let Some(cached) = self.options.get(&key) {
            return Ok(cached.options.clone());
        }

        let (options, inline) = match config {
            TsConfigInput::Absent => {
                let cwd = std::env::current_dir()?;
                (ResolvedCompilerOptions::defaults(&cwd), None)
            }
            TsConfigInput::Inline(value) => {
                if !value.is_object() {
                    return Err(ResolveError::ConfigType {
                        found: json_type_name(value),
                    });
                }
                let cwd = std::env::current_dir()?;
                let tsconfig =
                    tsconfig_from_value(value, &cwd).map_err(ResolveError::ConfigInvalid)?;
                let options = resolve_compiler_options(tsconfig.compiler_options.as_ref(), &cwd)
                    .map_err(ResolveError::ConfigInvalid)?;
                (options, Some(value.clone()))
            }
            TsConfigInput::FilePath(path) => {
                let tsconfig = load_tsconfig(path).map_err(|source| ResolveError::ConfigRead {
                    path: path.clone(),
                    source,
                })?;
                let base_path = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => absolutize(parent),
                    _ => std::env::current_dir()?,
                };
                let options =
                    resolve_compiler_options(tsconfig.compiler_options.as_ref(), &base_path)
                        .map_err(ResolveError::ConfigInvalid)?;
                (options, None)
            }
        };

        tracing::debug!(
            key = ?key,
            module = ?options.module,
            resolution = ?options.effective_module_resolution(),
            "converted tsconfig"
        );
        let options = Arc::new(options);
        self.options.insert(
            key,
            CachedOptions {
                options: options.clone(),
                _inline: inline,
            },
        );
        Ok(options)
    }

    /// Resolve `specifier` as imported from `source_file`.
    pub fn resolve(
        &mut self,
        specifier: &str,
        source_file: &Path,
        directory: &Path,
        config: &TsConfigInput,
        no_type_definitions: bool,
    ) -> ResolveResult<Option<PathBuf>> {
        if specifier.trim().is_empty() {
            return Ok(None);
        }

        let options = self.options_for(config)?;
        self.last_options = Some(options.clone());

        let containing_dir = match source_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let options_id = Arc::as_ptr(&options) as usize;

        let state = self.host_state_for(directory);
        let result = match state.cache.get(containing_dir, specifier, options_id) {
            Some(cached) => cached.clone(),
            None => {
                let result = resolve_module_name(specifier, source_file, &options, &state.host);
                state
                    .cache
                    .insert(containing_dir, specifier, options_id, result.clone());
                result
            }
        };

        let found = match &result.resolved_module {
            Some(module) if module.extension.is_declaration() && no_type_definitions => {
                match resolve_js_module(specifier, containing_dir, &state.host) {
                    Some(implementation) => Some(implementation),
                    None => Some(module.resolved_file_name.clone()),
                }
            }
            Some(module) => Some(module.resolved_file_name.clone()),
            None => declaration_lookup_fallback(&result, &state.host),
        };

        tracing::debug!(
            specifier,
            source = %source_file.display(),
            found = ?found,
            failed_lookups = result.failed_lookup_locations.len(),
            "typescript lookup"
        );
        Ok(found.map(|path| absolutize(&path)))
    }

    pub fn resolve_request(&mut self, request: &ResolutionRequest) -> ResolveResult<Option<PathBuf>> {
        self.resolve(
            &request.specifier,
            &request.source_file,
            &request.directory,
            &request.ts_config,
            request.no_type_definitions,
        )
    }

    fn host_state_for(&mut self, directory: &Path) -> &mut TsHostState {
        let stale = self.disable_host_cache
            || self
                .host_state
                .as_ref()
                .is_none_or(|state| state.directory != directory);
        if stale {
            self.host_builds += 1;
            tracing::debug!(directory = %directory.display(), builds = self.host_builds, "building compiler host");
            self.host_state = Some(TsHostState::new(directory));
        }
        self.host_state
            .get_or_insert_with(|| TsHostState::new(directory))
    }
}

/// tsc probes `./Widget.vue` as `./Widget.vue.d.ts`; when that misses, the
/// file without the suffix is usually what the import meant.
fn declaration_lookup_fallback(
    result: &ResolvedModuleWithFailedLookupLocations,
    host: &CompilerHost,
) -> Option<PathBuf> {
    result
        .failed_lookup_locations
        .iter()
        .filter_map(|location| location.to_str()?.strip_suffix(".d.ts"))
        .map(PathBuf::from)
        .find(|candidate| host.file_exists(candidate))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn is_javascript_source(extension: Option<&str>) -> bool {
    matches!(extension, Some(".js" | ".jsx" | ".mjs" | ".cjs"))
}

/// Registry strategy for `.ts`/`.tsx` sources, and JS-family sources whose
/// tsconfig sets `allowJs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptStrategy;

impl ResolveStrategy for TypeScriptStrategy {
    fn name(&self) -> &str {
        "typescript"
    }

    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        if !request.has_specifier() {
            return Ok(None);
        }

        let engine = services.typescript_mut();
        if is_javascript_source(request.file_extension().as_deref()) {
            let options = engine.options_for(&request.ts_config)?;
            if !options.allow_js {
                return Ok(None);
            }
        }
        engine.resolve_request(request)
    }
}

#[cfg(test)]
#[path = "../tests/ts_engine_tests.rs"]
mod tests;
