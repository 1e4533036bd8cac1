//! Resolve the module specifiers found in JavaScript, TypeScript,
//! stylesheet and Vue sources to absolute file paths.
//!
//! A [`ResolverContext`] owns an ordered registry of resolvers keyed by file
//! extension. [`ResolverContext::dispatch`] picks the resolvers that handle
//! the importing file's extension and runs them in priority order:
//!
//! ```no_run
//! use cabinet::{ResolutionRequest, ResolverContext};
//!
//! let mut ctx = ResolverContext::new();
//! let request = ResolutionRequest::new("./util", "/project/src/app.ts", "/project");
//! if let Some(path) = ctx.dispatch(&request)? {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), cabinet::ResolveError>(())
//! ```

// Errors surfaced by dispatch
pub mod error;
pub use error::{ResolveError, ResolveResult};

// Request model and path helpers
pub mod request;
pub use request::{AmdConfigInput, ConfigInput, ResolutionRequest, TsConfigInput};

// JSON with comments, shared by tsconfig and RequireJS configs
pub mod jsonc;

// Module-system detection for JS-family files
pub mod module_kind;
pub use module_kind::{ModuleKind, SourceClassifier, SyntaxFacts};

// Pluggable collaborator seams
pub mod collaborators;
pub use collaborators::{
    AmdResolve, ModuleKindClassifier, NodeResolve, StylesheetResolve, WebpackResolve,
};

// Registry and dispatcher
pub mod context;
pub mod generic;
pub mod registry;
pub use context::{ResolverContext, Services};
pub use registry::{FnStrategy, ResolveStrategy, ResolverEntry, ResolverRegistry};

// Resolution strategies
pub mod amd;
pub mod javascript;
pub mod node;
pub mod stylesheet;
pub mod typescript;
pub mod vue;
pub mod webpack;

pub use amd::{AmdConfig, AmdResolver};
pub use node::{NodeOptions, NodeResolver, PackageJson};
pub use stylesheet::{StyleSyntax, StylesheetResolver};
pub use typescript::{TsEngine, TypeScriptStrategy};
pub use webpack::{WebpackResolveConfig, WebpackResolver};

// Logging setup for binaries
pub mod tracing_config;
