//! `@import` resolution for Sass, Less and Stylus.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::collaborators::StylesheetResolve;
use crate::context::Services;
use crate::error::ResolveResult;
use crate::registry::ResolveStrategy;
use crate::request::{ResolutionRequest, absolutize, extension_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleSyntax {
    Sass,
    Less,
    Stylus,
}

impl StyleSyntax {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleSyntax::Sass => "sass",
            StyleSyntax::Less => "less",
            StyleSyntax::Stylus => "stylus",
        }
    }

    /// Extensions probed for an import without one, in order.
    fn probe_extensions(self, source_extension: Option<&str>) -> Vec<&'static str> {
        match self {
            // Prefer the importing file's own flavor.
            StyleSyntax::Sass if source_extension == Some(".sass") => {
                vec![".sass", ".scss", ".css"]
            }
            StyleSyntax::Sass => vec![".scss", ".sass", ".css"],
            StyleSyntax::Less => vec![".less", ".css"],
            StyleSyntax::Stylus => vec![".styl", ".css"],
        }
    }

    /// Whether partials (`_name`) and `_index` are candidates.
    fn uses_partials(self) -> bool {
        matches!(self, StyleSyntax::Sass | StyleSyntax::Less)
    }
}

impl fmt::Display for StyleSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate paths for `import` inside `dir`, in lookup order.
fn candidates(
    syntax: StyleSyntax,
    dir: &Path,
    import: &str,
    source_extension: Option<&str>,
) -> Vec<PathBuf> {
    let target = dir.join(import);
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = target.with_file_name(format!("_{}", file_name));

    let mut out = Vec::new();
    if extension_of(Path::new(import)).is_some() {
        out.push(target.clone());
        if syntax.uses_partials() {
            out.push(partial.clone());
        }
    }

    for ext in syntax.probe_extensions(source_extension) {
        out.push(PathBuf::from(format!("{}{}", target.display(), ext)));
        if syntax.uses_partials() {
            out.push(PathBuf::from(format!("{}{}", partial.display(), ext)));
        }
        out.push(target.join(format!("index{}", ext)));
        if syntax.uses_partials() {
            out.push(target.join(format!("_index{}", ext)));
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct StylesheetResolver;

impl StylesheetResolve for StylesheetResolver {
    fn resolve(
        &mut self,
        syntax: StyleSyntax,
        specifier: &str,
        source_file: &Path,
        directory: &Path,
    ) -> ResolveResult<Option<PathBuf>> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return Ok(None);
        }

        let source_dir = match source_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let source_extension = extension_of(source_file);

        // `~pkg/file` is webpack's sass-loader spelling for a node_modules import.
        let roots: Vec<(PathBuf, &str)> = match specifier.strip_prefix('~') {
            Some(package) => vec![(directory.join("node_modules"), package)],
            None => vec![
                (source_dir.to_path_buf(), specifier),
                (directory.to_path_buf(), specifier),
            ],
        };

        for (root, import) in roots {
            let found = candidates(syntax, &root, import, source_extension.as_deref())
                .into_iter()
                .find(|candidate| candidate.is_file());
            if let Some(found) = found {
                tracing::trace!(%syntax, specifier, found = %found.display(), "stylesheet import");
                return Ok(Some(absolutize(&found)));
            }
        }
        Ok(None)
    }
}

/// Registry strategy for one stylesheet syntax.
#[derive(Debug, Clone, Copy)]
pub struct StylesheetStrategy {
    syntax: StyleSyntax,
}

impl StylesheetStrategy {
    pub fn new(syntax: StyleSyntax) -> Self {
        StylesheetStrategy { syntax }
    }
}

impl ResolveStrategy for StylesheetStrategy {
    fn name(&self) -> &str {
        self.syntax.as_str()
    }

    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        if !request.has_specifier() {
            return Ok(None);
        }
        services.stylesheets().resolve(
            self.syntax,
            &request.specifier,
            &request.source_file,
            &request.directory,
        )
    }
}
