//! Tests for TypeScript module name resolution

use super::*;
use crate::typescript::config::PathMapping;
use std::fs;
use tempfile::TempDir;

fn touch(root: &Path, rel: &str) -> PathBuf {
    write(root, rel, "")
}

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn options(root: &Path, kind: Option<ModuleResolutionKind>) -> ResolvedCompilerOptions {
    let mut options = ResolvedCompilerOptions::defaults(root);
    options.module_resolution = kind;
    options
}

fn resolve(
    specifier: &str,
    containing_file: &Path,
    options: &ResolvedCompilerOptions,
) -> ResolvedModuleWithFailedLookupLocations {
    let host = CompilerHost::new(options.base_path.as_path());
    resolve_module_name(specifier, containing_file, options, &host)
}

fn resolved_path(result: &ResolvedModuleWithFailedLookupLocations) -> Option<&Path> {
    result
        .resolved_module
        .as_ref()
        .map(|module| module.resolved_file_name.as_path())
}

// =============================================================================
// Extensions
// =============================================================================

#[test]
fn test_module_extension_from_path() {
    assert_eq!(ModuleExtension::from_path(Path::new("a.d.ts")), ModuleExtension::Dts);
    assert_eq!(ModuleExtension::from_path(Path::new("a.d.mts")), ModuleExtension::DmTs);
    assert_eq!(ModuleExtension::from_path(Path::new("a.ts")), ModuleExtension::Ts);
    assert_eq!(ModuleExtension::from_path(Path::new("a.cjs")), ModuleExtension::Cjs);
    assert_eq!(ModuleExtension::from_path(Path::new("a.vue")), ModuleExtension::Unknown);
    assert!(ModuleExtension::Dts.is_declaration());
    assert!(!ModuleExtension::Ts.is_declaration());
}

#[test]
fn test_mangle_scoped_package_name() {
    assert_eq!(mangle_scoped_package_name("@babel/core"), "babel__core");
    assert_eq!(mangle_scoped_package_name("lodash"), "lodash");
}

// =============================================================================
// Relative specifiers
// =============================================================================

#[test]
fn test_relative_probes_ts_then_tsx_then_dts() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/app.ts");
    let target = touch(root, "src/view.tsx");

    let opts = options(root, None);
    let result = resolve("./view", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
    assert_eq!(result.failed_lookup_locations, vec![root.join("src/view.ts")]);
}

#[test]
fn test_js_extension_maps_to_typescript_source() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let target = touch(root, "util.ts");
    touch(root, "util.js");

    let opts = options(root, Some(ModuleResolutionKind::Node16));
    let result = resolve("./util.js", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
}

#[test]
fn test_js_file_needs_allow_js() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let target = touch(root, "legacy.js");

    let mut opts = options(root, Some(ModuleResolutionKind::Node10));
    assert!(resolve("./legacy", &source, &opts).resolved_module.is_none());

    opts.allow_js = true;
    let result = resolve("./legacy", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
    assert_eq!(result.resolved_module.unwrap().extension, ModuleExtension::Js);
}

#[test]
fn test_unknown_extension_records_declaration_probe() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    touch(root, "Widget.vue");

    let opts = options(root, None);
    let result = resolve("./Widget.vue", &source, &opts);
    assert!(result.resolved_module.is_none());
    assert!(
        result
            .failed_lookup_locations
            .contains(&root.join("Widget.vue.d.ts"))
    );
}

#[test]
fn test_dotted_name_keeps_full_stem() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let target = touch(root, "jquery.min.d.ts");

    let opts = options(root, None);
    let result = resolve("./jquery.min", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
}

#[test]
fn test_directory_index_and_package_types() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let index = touch(root, "lib/index.ts");
    write(root, "typed/package.json", r#"{"types": "dist/main.d.ts"}"#);
    let typed = touch(root, "typed/dist/main.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    assert_eq!(resolved_path(&resolve("./lib", &source, &opts)), Some(index.as_path()));
    assert_eq!(resolved_path(&resolve("./typed", &source, &opts)), Some(typed.as_path()));
}

// =============================================================================
// Classic
// =============================================================================

#[test]
fn test_classic_walks_up_for_bare_specifiers() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "a/b/c/app.ts");
    let target = touch(root, "a/shared.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Classic));
    let result = resolve("shared", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
    assert!(result.failed_lookup_locations.contains(&root.join("a/b/c/shared.ts")));
}

#[test]
fn test_classic_falls_back_to_types_packages() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/app.ts");
    let target = touch(root, "node_modules/@types/node/index.d.ts");

    let opts = options(root, None);
    let result = resolve("node", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
    assert!(result.resolved_module.unwrap().is_external_library_import);
}

// =============================================================================
// Node10
// =============================================================================

#[test]
fn test_node10_package_types_field() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/app.ts");
    write(
        root,
        "node_modules/pkg/package.json",
        r#"{"name": "pkg", "main": "lib/index.js", "types": "lib/index.d.ts"}"#,
    );
    let target = touch(root, "node_modules/pkg/lib/index.d.ts");
    touch(root, "node_modules/pkg/lib/index.js");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    let result = resolve("pkg", &source, &opts);
    let module = result.resolved_module.unwrap();
    assert_eq!(module.resolved_file_name, target);
    assert_eq!(module.package_name.as_deref(), Some("pkg"));
    assert!(module.extension.is_declaration());
}

#[test]
fn test_node10_main_maps_to_declaration() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    write(root, "node_modules/old/package.json", r#"{"main": "./dist/old.js"}"#);
    let target = touch(root, "node_modules/old/dist/old.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    assert_eq!(resolved_path(&resolve("old", &source, &opts)), Some(target.as_path()));
}

#[test]
fn test_node10_scoped_types_fallback() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    touch(root, "node_modules/@scope/pkg/index.js");
    let target = touch(root, "node_modules/@types/scope__pkg/index.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    assert_eq!(
        resolved_path(&resolve("@scope/pkg", &source, &opts)),
        Some(target.as_path())
    );
}

#[test]
fn test_node10_ignores_exports() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    write(
        root,
        "node_modules/dual/package.json",
        r#"{"exports": {".": {"types": "./exported.d.ts"}}}"#,
    );
    touch(root, "node_modules/dual/exported.d.ts");
    let index = touch(root, "node_modules/dual/index.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    assert_eq!(resolved_path(&resolve("dual", &source, &opts)), Some(index.as_path()));
}

#[test]
fn test_types_versions_redirects_subpaths() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    write(
        root,
        "node_modules/tv/package.json",
        r#"{"typesVersions": {">=4.0": {"*": ["ts4/*"]}}}"#,
    );
    let target = touch(root, "node_modules/tv/ts4/helpers.d.ts");

    let opts = options(root, Some(ModuleResolutionKind::Node10));
    assert_eq!(
        resolved_path(&resolve("tv/helpers", &source, &opts)),
        Some(target.as_path())
    );
}

#[test]
fn test_explicit_type_roots() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let target = touch(root, "typings/globals/index.d.ts");

    let mut opts = options(root, Some(ModuleResolutionKind::Node10));
    opts.type_roots = Some(vec![root.join("typings")]);
    assert_eq!(
        resolved_path(&resolve("globals", &source, &opts)),
        Some(target.as_path())
    );
}

// =============================================================================
// paths and baseUrl
// =============================================================================

fn mapping(pattern: &str, targets: &[&str]) -> PathMapping {
    let (prefix, suffix) = match pattern.split_once('*') {
        Some((prefix, suffix)) => (prefix.to_string(), suffix.to_string()),
        None => (pattern.to_string(), String::new()),
    };
    PathMapping {
        pattern: pattern.to_string(),
        prefix,
        suffix,
        targets: targets.iter().map(|t| t.to_string()).collect(),
    }
}

#[test]
fn test_paths_try_each_target() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/app.ts");
    let target = touch(root, "generated/api/client.ts");

    let mut opts = options(root, Some(ModuleResolutionKind::Node10));
    opts.paths = vec![mapping("@api/*", &["src/api/*", "generated/api/*"])];
    let result = resolve("@api/client", &source, &opts);
    assert_eq!(resolved_path(&result), Some(target.as_path()));
    assert!(result.failed_lookup_locations.contains(&root.join("src/api/client.ts")));
}

#[test]
fn test_paths_failure_continues_to_node_modules() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let target = touch(root, "node_modules/@api/client/index.d.ts");

    let mut opts = options(root, Some(ModuleResolutionKind::Node10));
    opts.paths = vec![mapping("@api/*", &["missing/*"])];
    assert_eq!(
        resolved_path(&resolve("@api/client", &source, &opts)),
        Some(target.as_path())
    );
}

#[test]
fn test_base_url_resolves_bare_specifiers() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/feature/app.ts");
    let target = touch(root, "src/core/store.ts");

    let mut opts = options(root, Some(ModuleResolutionKind::Node10));
    opts.base_url = Some(root.join("src"));
    assert_eq!(
        resolved_path(&resolve("core/store", &source, &opts)),
        Some(target.as_path())
    );
}

// =============================================================================
// exports / imports
// =============================================================================

fn exports_package(root: &Path) {
    write(
        root,
        "node_modules/modern/package.json",
        r#"{
            "name": "modern",
            "exports": {
                ".": {
                    "import": { "types": "./esm/index.d.mts", "default": "./esm/index.mjs" },
                    "require": { "types": "./cjs/index.d.ts", "default": "./cjs/index.js" }
                },
                "./features/*": { "types": "./types/features/*.d.ts" },
                "./internal/*": null
            }
        }"#,
    );
    touch(root, "node_modules/modern/esm/index.d.mts");
    touch(root, "node_modules/modern/cjs/index.d.ts");
    touch(root, "node_modules/modern/types/features/search.d.ts");
    touch(root, "node_modules/modern/internal/secret.d.ts");
}

#[test]
fn test_node16_exports_follow_importing_module_kind() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    exports_package(root);
    let cjs_source = touch(root, "src/app.cts");
    let esm_source = touch(root, "src/app.mts");

    let opts = options(root, Some(ModuleResolutionKind::Node16));
    assert_eq!(
        resolved_path(&resolve("modern", &cjs_source, &opts)),
        Some(root.join("node_modules/modern/cjs/index.d.ts").as_path())
    );
    assert_eq!(
        resolved_path(&resolve("modern", &esm_source, &opts)),
        Some(root.join("node_modules/modern/esm/index.d.mts").as_path())
    );
}

#[test]
fn test_package_type_module_makes_ts_files_esm() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    exports_package(root);
    write(root, "package.json", r#"{"type": "module"}"#);
    let source = touch(root, "src/app.ts");

    let opts = options(root, Some(ModuleResolutionKind::NodeNext));
    assert_eq!(
        resolved_path(&resolve("modern", &source, &opts)),
        Some(root.join("node_modules/modern/esm/index.d.mts").as_path())
    );
}

#[test]
fn test_exports_wildcards_and_exclusions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    exports_package(root);
    let source = touch(root, "src/app.ts");

    let opts = options(root, Some(ModuleResolutionKind::Bundler));
    assert_eq!(
        resolved_path(&resolve("modern/features/search", &source, &opts)),
        Some(root.join("node_modules/modern/types/features/search.d.ts").as_path())
    );
    // Excluded by a null target even though the file exists
    assert!(
        resolve("modern/internal/secret", &source, &opts)
            .resolved_module
            .is_none()
    );
    // Not exported at all
    assert!(resolve("modern/cjs/index", &source, &opts).resolved_module.is_none());
}

#[test]
fn test_custom_conditions_take_part_in_matching() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "node_modules/cond/package.json",
        r#"{"exports": {"development": "./dev.d.ts", "default": "./prod.d.ts"}}"#,
    );
    touch(root, "node_modules/cond/dev.d.ts");
    touch(root, "node_modules/cond/prod.d.ts");
    let source = touch(root, "app.ts");

    let mut opts = options(root, Some(ModuleResolutionKind::Bundler));
    assert_eq!(
        resolved_path(&resolve("cond", &source, &opts)),
        Some(root.join("node_modules/cond/prod.d.ts").as_path())
    );

    opts.custom_conditions = vec!["development".to_string()];
    assert_eq!(
        resolved_path(&resolve("cond", &source, &opts)),
        Some(root.join("node_modules/cond/dev.d.ts").as_path())
    );
}

#[test]
fn test_package_imports() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "package.json",
        r##"{"name": "app", "imports": {"#utils/*": "./src/utils/*.ts", "#dep": "dep"}}"##,
    );
    let util = touch(root, "src/utils/strings.ts");
    let dep = touch(root, "node_modules/dep/index.d.ts");
    let source = touch(root, "src/app.ts");

    let opts = options(root, Some(ModuleResolutionKind::Bundler));
    assert_eq!(
        resolved_path(&resolve("#utils/strings", &source, &opts)),
        Some(util.as_path())
    );
    assert_eq!(resolved_path(&resolve("#dep", &source, &opts)), Some(dep.as_path()));

    let classic = options(root, Some(ModuleResolutionKind::Classic));
    assert!(resolve("#dep", &source, &classic).resolved_module.is_none());
}

#[test]
fn test_self_reference_through_exports() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "package.json",
        r#"{"name": "me", "exports": {"./tools": "./src/tools.ts"}}"#,
    );
    let tools = touch(root, "src/tools.ts");
    let source = touch(root, "test/run.ts");

    let opts = options(root, Some(ModuleResolutionKind::NodeNext));
    assert_eq!(resolved_path(&resolve("me/tools", &source, &opts)), Some(tools.as_path()));
}

// =============================================================================
// JavaScript-only lookups
// =============================================================================

#[test]
fn test_js_module_skips_declarations_and_types() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(root, "lib.d.ts");
    let lib = touch(root, "lib.js");
    write(
        root,
        "node_modules/pkg/package.json",
        r#"{"types": "index.d.ts", "main": "main.js"}"#,
    );
    touch(root, "node_modules/pkg/index.d.ts");
    let main = touch(root, "node_modules/pkg/main.js");

    let host = CompilerHost::new(root);
    assert_eq!(resolve_js_module("./lib", root, &host), Some(lib));
    assert_eq!(resolve_js_module("pkg", root, &host), Some(main));
    assert_eq!(resolve_js_module("./absent", root, &host), None);
}
