//! Tests for dispatch: candidate selection, fault isolation and fallbacks

use super::*;
use crate::module_kind::{ModuleKind, SyntaxFacts};
use crate::node::{ModulesDir, NodeOptions};
use crate::registry::FnStrategy;
use crate::request::{AmdConfigInput, TsConfigInput};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
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

/// Node resolver double that records what it was asked.
#[derive(Clone, Default)]
struct RecordingNode {
    calls: Rc<RefCell<Vec<(String, PathBuf, Option<String>)>>>,
}

impl NodeResolve for RecordingNode {
    fn resolve(
        &mut self,
        specifier: &str,
        basedir: &Path,
        options: &NodeOptions,
    ) -> ResolveResult<Option<PathBuf>> {
        self.calls.borrow_mut().push((
            specifier.to_string(),
            basedir.to_path_buf(),
            options.entry_override.clone(),
        ));
        Ok(None)
    }
}

struct FixedClassifier(Option<ModuleKind>);

impl ModuleKindClassifier for FixedClassifier {
    fn classify(
        &mut self,
        _filename: &Path,
        _syntax: Option<&SyntaxFacts>,
    ) -> ResolveResult<Option<ModuleKind>> {
        Ok(self.0)
    }
}

// =============================================================================
// Request validation
// =============================================================================

#[test]
fn test_missing_source_file_is_request_error() {
    let mut ctx = ResolverContext::new();
    let request = ResolutionRequest::new("./a", "", "/p");
    let err = ctx.dispatch(&request).unwrap_err();
    assert!(matches!(err, ResolveError::MissingSourceFile));
}

#[test]
fn test_empty_specifier_is_unresolved_for_every_extension() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let mut ctx = ResolverContext::new();

    for extension in ctx.supported_extensions() {
        let source = touch(root, &format!("main{}", extension));
        for specifier in ["", "   "] {
            let request = ResolutionRequest::new(specifier, &source, root);
            assert_eq!(ctx.dispatch(&request).unwrap(), None, "extension {}", extension);
        }
    }
}

// =============================================================================
// Registration and ordering
// =============================================================================

#[test]
fn test_registered_resolver_runs_before_builtins() {
    let mut ctx = ResolverContext::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    ctx.register(
        ".foo",
        FnStrategy::new(
            "foo",
            move |_services: &mut Services, request: &ResolutionRequest| {
                log.borrow_mut().push(request.specifier.clone());
                Ok(Some(PathBuf::from("/resolved/by/foo")))
            },
        ),
    );
    ctx.register(
        ".foo",
        FnStrategy::new("foo-again", |_: &mut Services, _: &ResolutionRequest| Ok(None)),
    );

    let request = ResolutionRequest::new("./thing", "/p/main.foo", "/p");
    assert_eq!(
        ctx.dispatch(&request).unwrap(),
        Some(PathBuf::from("/resolved/by/foo"))
    );
    assert_eq!(*seen.borrow(), vec!["./thing".to_string()]);

    let extensions = ctx.supported_extensions();
    assert_eq!(extensions.iter().filter(|ext| *ext == ".foo").count(), 1);
}

#[test]
fn test_registered_resolver_shadows_builtin_for_js() {
    let mut ctx = ResolverContext::new();
    ctx.register(
        "js",
        FnStrategy::new("custom", |_: &mut Services, _: &ResolutionRequest| {
            Ok(Some(PathBuf::from("/custom.js")))
        }),
    );
    let request = ResolutionRequest::new("./a", "/p/main.js", "/p");
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(PathBuf::from("/custom.js")));
}

#[test]
fn test_promote_default_reorders_candidates() {
    let mut ctx = ResolverContext::new();
    ctx.register(
        ".js",
        FnStrategy::new("first", |_: &mut Services, _: &ResolutionRequest| {
            Ok(Some(PathBuf::from("/first.js")))
        }),
    );
    ctx.register_entry(ResolverEntry::new(
        "second",
        &[".js"],
        FnStrategy::new("second", |_: &mut Services, _: &ResolutionRequest| {
            Ok(Some(PathBuf::from("/second.js")))
        }),
    ));
    let request = ResolutionRequest::new("./a", "/p/main.js", "/p");
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(PathBuf::from("/second.js")));

    ctx.promote_default("first").unwrap();
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(PathBuf::from("/first.js")));

    assert!(matches!(
        ctx.promote_default("nope"),
        Err(ResolveError::UnknownResolver(_))
    ));
}

// =============================================================================
// Fault isolation
// =============================================================================

#[test]
fn test_strategy_error_falls_through_to_next_candidate() {
    let mut ctx = ResolverContext::new();
    ctx.register(
        ".bar",
        FnStrategy::new("fallback", |_: &mut Services, _: &ResolutionRequest| {
            Ok(Some(PathBuf::from("/fallback.bar")))
        }),
    );
    ctx.register(
        ".bar",
        FnStrategy::new("broken", |_: &mut Services, _: &ResolutionRequest| {
            Err(ResolveError::strategy("broken", "exploded"))
        }),
    );

    let request = ResolutionRequest::new("./x", "/p/main.bar", "/p");
    assert_eq!(
        ctx.dispatch(&request).unwrap(),
        Some(PathBuf::from("/fallback.bar"))
    );
}

#[test]
fn test_io_error_is_absorbed() {
    let mut ctx = ResolverContext::new();
    ctx.register(
        ".bar",
        FnStrategy::new("io", |_: &mut Services, _: &ResolutionRequest| {
            Err(ResolveError::Io(std::io::Error::other("disk on fire")))
        }),
    );
    let request = ResolutionRequest::new("./x", "/p/main.bar", "/p");
    assert_eq!(ctx.dispatch(&request).unwrap(), None);
}

#[test]
fn test_config_error_propagates() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "app.ts");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./x", &source, root)
        .with_ts_config(TsConfigInput::FilePath(root.join("missing-tsconfig.json")));
    let err = ctx.dispatch(&request).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_malformed_amd_config_yields_unresolved() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = write(root, "main.js", "define(['./a'], function (a) {});");
    touch(root, "a.js");
    let config = write(root, "config.js", "this is not a config");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./a", &source, root)
        .with_amd_config(AmdConfigInput::FilePath(config));
    assert_eq!(ctx.dispatch(&request).unwrap(), None);
}

#[test]
fn test_webpack_config_is_cached_per_request_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let config = write(root, "webpack.config.json", r#"{"resolve": {}}"#);
    let mut services = Services::new();

    let first = services.webpack_config(&config, &root.join("a")).unwrap();
    let again = services.webpack_config(&config, &root.join("a")).unwrap();
    let other = services.webpack_config(&config, &root.join("b")).unwrap();

    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(
        other.node_options().modules.last(),
        Some(&ModulesDir::Absolute(root.join("b")))
    );
}

// =============================================================================
// Generic fallback
// =============================================================================

#[test]
fn test_unknown_extension_uses_generic_strategy() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "docs/guide.md");
    let target = touch(root, "docs/intro.md");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./intro", &source, root);
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(target));
    assert!(ctx.dispatch(&request).unwrap().is_some());
    assert_eq!(ctx.generic_strategies(), 1);

    let other = ResolutionRequest::new("./intro", &source, root).with_extension(".rst");
    assert!(ctx.dispatch(&other).unwrap().is_some());
    assert_eq!(ctx.generic_strategies(), 2);
}

#[test]
fn test_extra_extension_selects_builtin() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "templates/page.html");
    write(root, "templates/_mixins.scss", "");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("mixins", &source, root).with_extension("scss");
    assert_eq!(
        ctx.dispatch(&request).unwrap(),
        Some(root.join("templates/_mixins.scss"))
    );
    assert_eq!(ctx.generic_strategies(), 0);
}

// =============================================================================
// Collaborator injection
// =============================================================================

#[test]
fn test_injected_node_resolver_receives_request() {
    let node = RecordingNode::default();
    let calls = node.calls.clone();
    let mut ctx = ResolverContext::new()
        .with_node(node)
        .with_classifier(FixedClassifier(Some(ModuleKind::CommonJs)));

    let request = ResolutionRequest::new("left-pad", "/p/src/main.js", "/p")
        .with_node_module_entry("module");
    assert_eq!(ctx.dispatch(&request).unwrap(), None);

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "left-pad");
    assert_eq!(calls[0].1, PathBuf::from("/p"));
    assert_eq!(calls[0].2.as_deref(), Some("module"));
}

#[test]
fn test_relative_commonjs_specifier_is_anchored_at_source() {
    let node = RecordingNode::default();
    let calls = node.calls.clone();
    let mut ctx = ResolverContext::new()
        .with_node(node)
        .with_classifier(FixedClassifier(None));

    let request = ResolutionRequest::new("../lib/x", "/p/src/main.js", "/p");
    ctx.dispatch(&request).unwrap();
    assert_eq!(calls.borrow()[0].0, "/p/lib/x");
}

// =============================================================================
// Built-in routes
// =============================================================================

#[test]
fn test_typescript_source_resolves_through_engine() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let source = touch(root, "src/index.ts");
    let target = touch(root, "src/store.ts");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./store", &source, root);
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(target));
    assert_eq!(ctx.typescript().host_builds(), 1);
}

#[test]
fn test_vue_component_with_typescript_script() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let component = write(
        root,
        "src/App.vue",
        "<template><Nav/></template>\n<script setup lang=\"ts\">\nimport Nav from './Nav.vue';\n</script>\n",
    );
    let nav = touch(root, "src/Nav.vue");
    let helper = touch(root, "src/helper.ts");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./Nav.vue", &component, root);
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(nav));

    let request = ResolutionRequest::new("./helper", &component, root);
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(helper));
}

#[test]
fn test_vue_component_with_javascript_script() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let component = write(
        root,
        "src/App.vue",
        "<script>\nimport util from './util';\nexport default {};\n</script>\n",
    );
    let util = touch(root, "src/util.js");
    let mut ctx = ResolverContext::new();

    let request = ResolutionRequest::new("./util", &component, root);
    assert_eq!(ctx.dispatch(&request).unwrap(), Some(util));
}
