//! TypeScript module name resolution.
//!
//! Implements the Classic, Node10, Node16, NodeNext and Bundler algorithms:
//! - Relative and absolute specifiers
//! - `paths` and `baseUrl` from tsconfig
//! - `node_modules` lookup with `@types` fallbacks
//! - package.json `exports`, `imports`, `typesVersions`, `types`/`typings`/`main`
//!
//! Every file probe that misses is recorded; callers use the list of failed
//! lookup locations to recover declarations that TypeScript itself would
//! reject (for example `./Component.vue` probed as `./Component.vue.d.ts`).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::node::{PackageExports, append_extension, split_package_specifier};
use crate::request::{is_relative, normalize_lexically};

use super::config::{ModuleResolutionKind, ResolvedCompilerOptions};
use super::host::CompilerHost;

/// Module file extensions TypeScript can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleExtension {
    Ts,
    Tsx,
    Dts,
    DmTs,
    DCts,
    Js,
    Jsx,
    Mjs,
    Cjs,
    Mts,
    Cts,
    Json,
    Unknown,
}

impl ModuleExtension {
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy();

        // Compound extensions first
        if path_str.ends_with(".d.ts") {
            return ModuleExtension::Dts;
        }
        if path_str.ends_with(".d.mts") {
            return ModuleExtension::DmTs;
        }
        if path_str.ends_with(".d.cts") {
            return ModuleExtension::DCts;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") => ModuleExtension::Ts,
            Some("tsx") => ModuleExtension::Tsx,
            Some("js") => ModuleExtension::Js,
            Some("jsx") => ModuleExtension::Jsx,
            Some("mjs") => ModuleExtension::Mjs,
            Some("cjs") => ModuleExtension::Cjs,
            Some("mts") => ModuleExtension::Mts,
            Some("cts") => ModuleExtension::Cts,
            Some("json") => ModuleExtension::Json,
            _ => ModuleExtension::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleExtension::Ts => ".ts",
            ModuleExtension::Tsx => ".tsx",
            ModuleExtension::Dts => ".d.ts",
            ModuleExtension::DmTs => ".d.mts",
            ModuleExtension::DCts => ".d.cts",
            ModuleExtension::Js => ".js",
            ModuleExtension::Jsx => ".jsx",
            ModuleExtension::Mjs => ".mjs",
            ModuleExtension::Cjs => ".cjs",
            ModuleExtension::Mts => ".mts",
            ModuleExtension::Cts => ".cts",
            ModuleExtension::Json => ".json",
            ModuleExtension::Unknown => "",
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            ModuleExtension::Dts | ModuleExtension::DmTs | ModuleExtension::DCts
        )
    }

    fn is_javascript(&self) -> bool {
        matches!(
            self,
            ModuleExtension::Js | ModuleExtension::Jsx | ModuleExtension::Mjs | ModuleExtension::Cjs
        )
    }

    fn is_typescript(&self) -> bool {
        matches!(
            self,
            ModuleExtension::Ts
                | ModuleExtension::Tsx
                | ModuleExtension::Mts
                | ModuleExtension::Cts
                | ModuleExtension::Dts
                | ModuleExtension::DmTs
                | ModuleExtension::DCts
        )
    }

    /// .mts, .mjs, .d.mts files are always ESM
    fn forces_esm(&self) -> bool {
        matches!(
            self,
            ModuleExtension::Mts | ModuleExtension::Mjs | ModuleExtension::DmTs
        )
    }

    /// .cts, .cjs, .d.cts files are always CommonJS
    fn forces_cjs(&self) -> bool {
        matches!(
            self,
            ModuleExtension::Cts | ModuleExtension::Cjs | ModuleExtension::DCts
        )
    }
}

/// Package type from package.json "type" field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    Module,
    CommonJs,
}

/// Module kind for the importing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportingModuleKind {
    Esm,
    #[default]
    CommonJs,
}

/// Which family of files a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extensions {
    /// TypeScript sources and declarations, plus JavaScript under `allowJs`.
    TypeScript,
    /// `.js`/`.jsx` only; package `main` only.
    JavaScript,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: PathBuf,
    pub extension: ModuleExtension,
    /// Whether the module came from `node_modules`
    pub is_external_library_import: bool,
    pub package_name: Option<String>,
}

impl ResolvedModule {
    fn local(path: PathBuf) -> Self {
        ResolvedModule {
            extension: ModuleExtension::from_path(&path),
            resolved_file_name: path,
            is_external_library_import: false,
            package_name: None,
        }
    }

    fn external(path: PathBuf, package_name: &str) -> Self {
        ResolvedModule {
            extension: ModuleExtension::from_path(&path),
            resolved_file_name: path,
            is_external_library_import: true,
            package_name: Some(package_name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedModuleWithFailedLookupLocations {
    pub resolved_module: Option<ResolvedModule>,
    pub failed_lookup_locations: Vec<PathBuf>,
}

/// Resolve `specifier` as imported from `containing_file`.
pub fn resolve_module_name(
    specifier: &str,
    containing_file: &Path,
    options: &ResolvedCompilerOptions,
    host: &CompilerHost,
) -> ResolvedModuleWithFailedLookupLocations {
    let containing_dir = match containing_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut resolver = ModuleResolver::new(options, host, Extensions::TypeScript);
    resolver.importing = resolver.importing_module_kind(containing_file);
    resolver.run(specifier, containing_dir)
}

/// Resolve `specifier` to a JavaScript file with Node10 rules, ignoring
/// declaration files and `types` fields.
pub fn resolve_js_module(
    specifier: &str,
    containing_dir: &Path,
    host: &CompilerHost,
) -> Option<PathBuf> {
    let mut options = ResolvedCompilerOptions::defaults(containing_dir);
    options.module_resolution = Some(ModuleResolutionKind::Node10);
    options.allow_js = true;

    ModuleResolver::new(&options, host, Extensions::JavaScript)
        .run(specifier, containing_dir)
        .resolved_module
        .map(|module| module.resolved_file_name)
}

const TS_EXTENSION_CANDIDATES: [&str; 3] = [".ts", ".tsx", ".d.ts"];
const NODE16_EXTENSION_CANDIDATES: [&str; 7] =
    [".ts", ".tsx", ".d.ts", ".mts", ".cts", ".d.mts", ".d.cts"];
const NODE16_MODULE_EXTENSION_CANDIDATES: [&str; 7] =
    [".mts", ".d.mts", ".ts", ".tsx", ".d.ts", ".cts", ".d.cts"];
const NODE16_COMMONJS_EXTENSION_CANDIDATES: [&str; 7] =
    [".cts", ".d.cts", ".ts", ".tsx", ".d.ts", ".mts", ".d.mts"];
const JS_EXTENSION_CANDIDATES: [&str; 2] = [".js", ".jsx"];

struct ModuleResolver<'a> {
    options: &'a ResolvedCompilerOptions,
    host: &'a CompilerHost,
    kind: ModuleResolutionKind,
    extensions: Extensions,
    importing: ImportingModuleKind,
    package_type: Option<PackageType>,
    failed_lookups: Vec<PathBuf>,
}

impl<'a> ModuleResolver<'a> {
    fn new(
        options: &'a ResolvedCompilerOptions,
        host: &'a CompilerHost,
        extensions: Extensions,
    ) -> Self {
        ModuleResolver {
            options,
            host,
            kind: options.effective_module_resolution(),
            extensions,
            importing: ImportingModuleKind::default(),
            package_type: None,
            failed_lookups: Vec::new(),
        }
    }

    fn run(
        mut self,
        specifier: &str,
        containing_dir: &Path,
    ) -> ResolvedModuleWithFailedLookupLocations {
        if matches!(
            self.kind,
            ModuleResolutionKind::Node16 | ModuleResolutionKind::NodeNext
        ) {
            self.package_type = self.package_type_for_dir(containing_dir);
        }

        let resolved_module = self.resolve_uncached(specifier, containing_dir);
        tracing::trace!(
            specifier,
            kind = ?self.kind,
            resolved = ?resolved_module.as_ref().map(|m| &m.resolved_file_name),
            failed = self.failed_lookups.len(),
            "module name resolution"
        );
        ResolvedModuleWithFailedLookupLocations {
            resolved_module,
            failed_lookup_locations: self.failed_lookups,
        }
    }

    /// Determine the module kind of the importing file based on extension and package.json type
    fn importing_module_kind(&self, file_path: &Path) -> ImportingModuleKind {
        let extension = ModuleExtension::from_path(file_path);
        if extension.forces_esm() {
            return ImportingModuleKind::Esm;
        }
        if extension.forces_cjs() {
            return ImportingModuleKind::CommonJs;
        }

        match file_path.parent().and_then(|dir| self.package_type_for_dir(dir)) {
            Some(PackageType::Module) => ImportingModuleKind::Esm,
            _ => ImportingModuleKind::CommonJs,
        }
    }

    /// The `type` of the nearest package.json.
    fn package_type_for_dir(&self, dir: &Path) -> Option<PackageType> {
        let package = dir
            .ancestors()
            .find_map(|ancestor| self.host.read_package_json(ancestor))?;
        match package.package_type.as_deref() {
            Some("module") => Some(PackageType::Module),
            Some("commonjs") => Some(PackageType::CommonJs),
            _ => None,
        }
    }

    fn resolve_uncached(&mut self, specifier: &str, containing_dir: &Path) -> Option<ResolvedModule> {
        // Subpath imports from the nearest package.json
        if specifier.starts_with('#') {
            if !self.kind.supports_exports() {
                return None;
            }
            return self.resolve_package_imports(specifier, containing_dir);
        }

        if is_relative(specifier) || Path::new(specifier).is_absolute() {
            let candidate = normalize_lexically(&containing_dir.join(specifier));
            return self
                .load_file_or_directory(&candidate)
                .map(ResolvedModule::local);
        }

        if let Some(resolved) = self.try_path_mappings(specifier) {
            return Some(resolved);
        }

        let options = self.options;
        if let Some(base_url) = &options.base_url {
            let candidate = base_url.join(specifier);
            if let Some(resolved) = self.load_file_or_directory(&candidate) {
                return Some(ResolvedModule::local(resolved));
            }
        }

        match self.kind {
            ModuleResolutionKind::Classic => self.resolve_classic(specifier, containing_dir),
            _ => self.resolve_bare_specifier(specifier, containing_dir),
        }
    }

    /// Only the most specific matching pattern is tried, as tsc does.
    fn try_path_mappings(&mut self, specifier: &str) -> Option<ResolvedModule> {
        let options = self.options;
        let mapping = options
            .paths
            .iter()
            .find(|mapping| mapping.match_specifier(specifier).is_some())?;
        let star_match = mapping.match_specifier(specifier)?;

        for target in &mapping.targets {
            let substituted = if target.contains('*') {
                target.replace('*', &star_match)
            } else {
                target.clone()
            };
            let candidate = options.paths_base.join(&substituted);
            if let Some(resolved) = self.load_file_or_directory(&candidate) {
                return Some(ResolvedModule::local(resolved));
            }
        }
        None
    }

    /// Classic walks up from the importing directory trying the specifier
    /// as a file, then falls back to `@types`.
    fn resolve_classic(&mut self, specifier: &str, containing_dir: &Path) -> Option<ResolvedModule> {
        for dir in containing_dir.ancestors() {
            let candidate = dir.join(specifier);
            if let Some(resolved) = self.try_file(&candidate) {
                return Some(ResolvedModule::local(resolved));
            }
        }
        self.resolve_from_types(specifier, containing_dir)
    }

    /// Resolve a bare specifier (npm package)
    fn resolve_bare_specifier(
        &mut self,
        specifier: &str,
        containing_dir: &Path,
    ) -> Option<ResolvedModule> {
        let (package_name, subpath) = split_package_specifier(specifier);
        let conditions = self.export_conditions();

        if self.kind.supports_exports()
            && let Some(resolved) =
                self.try_self_reference(package_name, subpath, containing_dir, &conditions)
        {
            return Some(resolved);
        }

        for dir in containing_dir.ancestors() {
            if dir.file_name().is_some_and(|name| name == "node_modules") {
                continue;
            }
            let node_modules = dir.join("node_modules");
            if !self.host.directory_exists(&node_modules) {
                continue;
            }

            let package_dir = node_modules.join(package_name);
            if let Some(resolved) = self.resolve_package(&package_dir, subpath, &conditions) {
                return Some(ResolvedModule::external(resolved, package_name));
            }

            if self.extensions == Extensions::TypeScript {
                let types_dir = node_modules
                    .join("@types")
                    .join(mangle_scoped_package_name(package_name));
                if let Some(resolved) = self.resolve_package(&types_dir, subpath, &conditions) {
                    return Some(ResolvedModule::external(resolved, package_name));
                }
            }
        }

        if self.extensions == Extensions::TypeScript && self.options.type_roots.is_some() {
            return self.resolve_from_type_roots(package_name, subpath, &conditions);
        }
        None
    }

    fn resolve_from_types(&mut self, specifier: &str, containing_dir: &Path) -> Option<ResolvedModule> {
        if self.extensions != Extensions::TypeScript {
            return None;
        }
        let (package_name, subpath) = split_package_specifier(specifier);
        let conditions = self.export_conditions();

        for dir in containing_dir.ancestors() {
            let types_root = dir.join("node_modules").join("@types");
            if !self.host.directory_exists(&types_root) {
                continue;
            }
            let types_dir = types_root.join(mangle_scoped_package_name(package_name));
            if let Some(resolved) = self.resolve_package(&types_dir, subpath, &conditions) {
                return Some(ResolvedModule::external(resolved, package_name));
            }
        }
        self.resolve_from_type_roots(package_name, subpath, &conditions)
    }

    /// Explicit `typeRoots`; each contains packages named like `@types` entries.
    fn resolve_from_type_roots(
        &mut self,
        package_name: &str,
        subpath: Option<&str>,
        conditions: &[String],
    ) -> Option<ResolvedModule> {
        let roots = match &self.options.type_roots {
            Some(roots) => roots.clone(),
            None => return None,
        };
        for root in roots {
            let types_dir = root.join(mangle_scoped_package_name(package_name));
            if let Some(resolved) = self.resolve_package(&types_dir, subpath, conditions) {
                return Some(ResolvedModule::external(resolved, package_name));
            }
        }
        None
    }

    /// A package importing itself by name through its own `exports`.
    fn try_self_reference(
        &mut self,
        package_name: &str,
        subpath: Option<&str>,
        containing_dir: &Path,
        conditions: &[String],
    ) -> Option<ResolvedModule> {
        let (package_dir, package) = containing_dir.ancestors().find_map(|dir| {
            self.host
                .read_package_json(dir)
                .map(|package| (dir.to_path_buf(), package))
        })?;

        if package.name.as_deref() != Some(package_name) {
            return None;
        }
        let exports = package.exports.as_ref()?;
        let subpath_key = match subpath {
            Some(sp) => format!("./{}", sp),
            None => ".".to_string(),
        };
        self.resolve_exports(&package_dir, exports, &subpath_key, conditions)
            .map(|resolved| ResolvedModule::external(resolved, package_name))
    }

    /// Resolve within a package directory
    fn resolve_package(
        &mut self,
        package_dir: &Path,
        subpath: Option<&str>,
        conditions: &[String],
    ) -> Option<PathBuf> {
        // `node_modules/pkg.ts` and friends
        if subpath.is_none()
            && let Some(resolved) = self.try_file(package_dir)
        {
            return Some(resolved);
        }

        if !self.host.directory_exists(package_dir) {
            return None;
        }
        let package = self.host.read_package_json(package_dir);

        // `exports` is authoritative where supported.
        if self.kind.supports_exports()
            && let Some(exports) = package.as_ref().and_then(|pkg| pkg.exports.as_ref())
        {
            let subpath_key = match subpath {
                Some(sp) => format!("./{}", sp),
                None => ".".to_string(),
            };
            return self.resolve_exports(package_dir, exports, &subpath_key, conditions);
        }

        let types_versions = package
            .as_ref()
            .filter(|_| self.extensions == Extensions::TypeScript)
            .and_then(|pkg| pkg.types_versions.clone());

        if let Some(subpath) = subpath {
            if let Some(types_versions) = &types_versions
                && let Some(resolved) =
                    self.resolve_types_versions(package_dir, subpath, types_versions)
            {
                return Some(resolved);
            }
            return self.load_file_or_directory(&package_dir.join(subpath));
        }

        if let Some(types_versions) = &types_versions
            && let Some(resolved) = self.resolve_types_versions(package_dir, "index", types_versions)
        {
            return Some(resolved);
        }

        self.load_directory(package_dir)
    }

    /// Resolve package.json imports field (#-prefixed specifiers)
    fn resolve_package_imports(
        &mut self,
        specifier: &str,
        containing_dir: &Path,
    ) -> Option<ResolvedModule> {
        let (scope_dir, package) = containing_dir.ancestors().find_map(|dir| {
            self.host
                .read_package_json(dir)
                .map(|package| (dir.to_path_buf(), package))
        })?;
        let imports = package.imports.as_ref()?;
        let conditions = self.export_conditions();

        let (target, wildcard) = match_subpath_map(imports, specifier)?;
        self.resolve_export_target(&scope_dir, target, &wildcard, &conditions, true)
            .map(ResolvedModule::local)
    }

    /// Resolve `subpath` (`.` or `./x`) through an `exports` value.
    fn resolve_exports(
        &mut self,
        package_dir: &Path,
        exports: &PackageExports,
        subpath: &str,
        conditions: &[String],
    ) -> Option<PathBuf> {
        match exports {
            PackageExports::Object(map) if exports.is_subpath_map() => {
                let (target, wildcard) = match_subpath_map(map, subpath)?;
                self.resolve_export_target(package_dir, target, &wildcard, conditions, false)
            }
            // Sugar for `{".": exports}`
            _ if subpath == "." => {
                self.resolve_export_target(package_dir, exports, "", conditions, false)
            }
            _ => None,
        }
    }

    /// Conditions are visited in the object's key order; the first active
    /// condition whose target resolves wins.
    fn resolve_export_target(
        &mut self,
        package_dir: &Path,
        target: &PackageExports,
        wildcard: &str,
        conditions: &[String],
        allow_bare: bool,
    ) -> Option<PathBuf> {
        match target {
            PackageExports::Excluded => None,
            PackageExports::Path(value) => {
                let substituted = apply_wildcard_substitution(value, wildcard);
                if let Some(relative) = substituted.strip_prefix("./") {
                    let candidate = package_dir.join(relative);
                    return self
                        .try_file(&candidate)
                        .or_else(|| self.load_directory(&candidate));
                }
                if allow_bare && !substituted.starts_with('/') {
                    return self
                        .resolve_bare_specifier(&substituted, package_dir)
                        .map(|module| module.resolved_file_name);
                }
                None
            }
            PackageExports::Fallbacks(items) => items.iter().find_map(|item| {
                self.resolve_export_target(package_dir, item, wildcard, conditions, allow_bare)
            }),
            PackageExports::Object(map) => {
                for (condition, value) in map {
                    let active = condition == "default" || conditions.contains(condition);
                    if !active {
                        continue;
                    }
                    if let Some(resolved) = self.resolve_export_target(
                        package_dir,
                        value,
                        wildcard,
                        conditions,
                        allow_bare,
                    ) {
                        return Some(resolved);
                    }
                }
                None
            }
        }
    }

    /// Conditions active for `exports`/`imports` matching, besides `default`.
    fn export_conditions(&self) -> Vec<String> {
        let mut conditions: Vec<String> = self.options.custom_conditions.clone();

        if self.extensions == Extensions::TypeScript {
            conditions.push("types".to_string());
        }

        match self.kind {
            ModuleResolutionKind::Bundler => {
                conditions.push("import".to_string());
            }
            ModuleResolutionKind::Node16 | ModuleResolutionKind::NodeNext => {
                conditions.push("node".to_string());
                conditions.push(
                    match self.importing {
                        ImportingModuleKind::Esm => "import",
                        ImportingModuleKind::CommonJs => "require",
                    }
                    .to_string(),
                );
            }
            ModuleResolutionKind::Classic | ModuleResolutionKind::Node10 => {
                conditions.push("node".to_string());
                conditions.push("require".to_string());
            }
        }

        conditions
    }

    /// Resolve typesVersions field
    fn resolve_types_versions(
        &mut self,
        package_dir: &Path,
        subpath: &str,
        types_versions: &serde_json::Value,
    ) -> Option<PathBuf> {
        let map = types_versions.as_object()?;

        // Only ranges that current compilers satisfy are considered.
        let paths = map.iter().find_map(|(version_range, value)| {
            let applies = version_range == "*"
                || version_range.starts_with(">=")
                || version_range.starts_with('>');
            if applies { value.as_object() } else { None }
        })?;

        let mut best: Option<(usize, String)> = None;
        for (pattern, value) in paths {
            let Some(wildcard) = match_types_versions_pattern(pattern, subpath) else {
                continue;
            };
            let specificity = pattern.len();
            if best.as_ref().is_some_and(|(len, _)| *len >= specificity) {
                continue;
            }
            let target = match value {
                serde_json::Value::String(s) => s.as_str(),
                serde_json::Value::Array(arr) => {
                    arr.first().and_then(|v| v.as_str()).unwrap_or_default()
                }
                _ => continue,
            };
            best = Some((specificity, apply_wildcard_substitution(target, &wildcard)));
        }

        let (_, target) = best?;
        let resolved = package_dir.join(target.trim_start_matches("./"));
        self.load_file_or_directory(&resolved)
    }

    fn probe(&mut self, path: &Path) -> bool {
        if self.host.file_exists(path) {
            return true;
        }
        self.failed_lookups.push(path.to_path_buf());
        false
    }

    /// Try `path` as a file: an explicit extension is honored (with
    /// `.js` mapped to its TypeScript sources), otherwise each candidate
    /// extension is appended.
    fn try_file(&mut self, path: &Path) -> Option<PathBuf> {
        let extension = ModuleExtension::from_path(path);

        if extension.is_javascript() {
            if self.extensions == Extensions::TypeScript {
                for candidate in typescript_sources_for(path, extension) {
                    if self.probe(&candidate) {
                        return Some(candidate);
                    }
                }
            }
            if self.javascript_allowed() && self.probe(path) {
                return Some(path.to_path_buf());
            }
            return None;
        }

        if extension.is_typescript() {
            if self.extensions == Extensions::TypeScript && self.probe(path) {
                return Some(path.to_path_buf());
            }
            return None;
        }

        if extension == ModuleExtension::Json
            && (self.options.resolve_json_module || self.extensions == Extensions::JavaScript)
            && self.probe(path)
        {
            return Some(path.to_path_buf());
        }

        for ext in self.extension_candidates() {
            let candidate = append_extension(path, ext);
            if self.probe(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn javascript_allowed(&self) -> bool {
        self.extensions == Extensions::JavaScript || self.options.allow_js
    }

    fn extension_candidates(&self) -> Vec<&'static str> {
        if self.extensions == Extensions::JavaScript {
            return JS_EXTENSION_CANDIDATES.to_vec();
        }

        let mut candidates: Vec<&'static str> = match self.kind {
            ModuleResolutionKind::Node16 | ModuleResolutionKind::NodeNext => {
                match self.package_type {
                    Some(PackageType::Module) => NODE16_MODULE_EXTENSION_CANDIDATES.to_vec(),
                    Some(PackageType::CommonJs) => NODE16_COMMONJS_EXTENSION_CANDIDATES.to_vec(),
                    None => NODE16_EXTENSION_CANDIDATES.to_vec(),
                }
            }
            _ => TS_EXTENSION_CANDIDATES.to_vec(),
        };
        if self.options.allow_js {
            candidates.extend(JS_EXTENSION_CANDIDATES);
        }
        candidates
    }

    /// Try a path as a file or directory
    fn load_file_or_directory(&mut self, path: &Path) -> Option<PathBuf> {
        if let Some(resolved) = self.try_file(path) {
            return Some(resolved);
        }
        self.load_directory(path)
    }

    /// package.json entry fields, then `index`.
    fn load_directory(&mut self, dir: &Path) -> Option<PathBuf> {
        if !self.host.directory_exists(dir) {
            return None;
        }

        if let Some(package) = self.host.read_package_json(dir) {
            let fields: &[&str] = match self.extensions {
                Extensions::TypeScript => &["types", "typings", "main"],
                Extensions::JavaScript => &["main"],
            };
            for field in fields {
                let Some(entry) = package.field(field) else {
                    continue;
                };
                let entry_path = dir.join(entry);
                if let Some(resolved) = self.try_file(&entry_path) {
                    return Some(resolved);
                }
                if entry_path != dir
                    && self.host.directory_exists(&entry_path)
                    && let Some(resolved) = self.try_file(&entry_path.join("index"))
                {
                    return Some(resolved);
                }
            }
        }

        self.try_file(&dir.join("index"))
    }
}

/// `foo.js` may be written for `foo.ts`, `foo.tsx` or `foo.d.ts`.
fn typescript_sources_for(path: &Path, extension: ModuleExtension) -> Vec<PathBuf> {
    let replacements: &[&str] = match extension {
        ModuleExtension::Js => &[".ts", ".tsx", ".d.ts"],
        ModuleExtension::Jsx => &[".tsx", ".d.ts"],
        ModuleExtension::Mjs => &[".mts", ".d.mts"],
        ModuleExtension::Cjs => &[".cts", ".d.cts"],
        _ => return Vec::new(),
    };
    let stem = path.with_extension("");
    replacements
        .iter()
        .map(|ext| append_extension(&stem, ext))
        .collect()
}

/// Look `key` up in an `exports`/`imports` map: exact keys first, then the
/// longest matching `*` pattern. Returns the target and the `*` capture.
fn match_subpath_map<'m>(
    map: &'m IndexMap<String, PackageExports>,
    key: &str,
) -> Option<(&'m PackageExports, String)> {
    if let Some(value) = map.get(key)
        && !key.contains('*')
    {
        return Some((value, String::new()));
    }

    let mut best_match: Option<(usize, String, &PackageExports)> = None;
    for (pattern, value) in map {
        if !pattern.contains('*') {
            continue;
        }
        if let Some(wildcard) = match_export_pattern(pattern, key) {
            let specificity = pattern.find('*').unwrap_or(pattern.len());
            let is_better = match &best_match {
                None => true,
                Some((best_len, _, _)) => specificity > *best_len,
            };
            if is_better {
                best_match = Some((specificity, wildcard, value));
            }
        }
    }
    best_match.map(|(_, wildcard, value)| (value, wildcard))
}

/// Match an export pattern against a subpath
fn match_export_pattern(pattern: &str, subpath: &str) -> Option<String> {
    if !pattern.contains('*') {
        return if pattern == subpath {
            Some(String::new())
        } else {
            None
        };
    }

    let (prefix, suffix) = pattern.split_once('*')?;
    if suffix.contains('*') {
        return None;
    }
    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }

    let start = prefix.len();
    let end = subpath.len().saturating_sub(suffix.len());
    if end < start {
        return None;
    }

    Some(subpath[start..end].to_string())
}

/// Match a typesVersions pattern against a subpath
fn match_types_versions_pattern(pattern: &str, subpath: &str) -> Option<String> {
    if !pattern.contains('*') {
        return if pattern == subpath {
            Some(String::new())
        } else {
            None
        };
    }

    let star_pos = pattern.find('*')?;
    let (prefix, suffix) = pattern.split_at(star_pos);
    let suffix = &suffix[1..];

    if !subpath.starts_with(prefix) || !subpath.ends_with(suffix) {
        return None;
    }

    let start = prefix.len();
    let end = subpath.len().saturating_sub(suffix.len());
    if end < start {
        return None;
    }

    Some(subpath[start..end].to_string())
}

fn apply_wildcard_substitution(target: &str, wildcard: &str) -> String {
    if target.contains('*') {
        target.replace('*', wildcard)
    } else {
        target.to_string()
    }
}

/// `@scope/pkg` lives at `@types/scope__pkg`.
fn mangle_scoped_package_name(package_name: &str) -> String {
    match package_name.strip_prefix('@') {
        Some(scoped) => scoped.replacen('/', "__", 1),
        None => package_name.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/ts_resolver_tests.rs"]
mod tests;
