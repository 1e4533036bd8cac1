//! Single-file component support.
//!
//! A `.vue` file whose `<script>` block is written in TypeScript resolves its
//! imports with the TypeScript engine; any other component resolves like a
//! JavaScript source.

use std::path::PathBuf;

use crate::context::Services;
use crate::error::ResolveResult;
use crate::javascript;
use crate::registry::ResolveStrategy;
use crate::request::ResolutionRequest;

#[derive(Debug, Clone, Copy, Default)]
pub struct VueStrategy;

impl ResolveStrategy for VueStrategy {
    fn name(&self) -> &str {
        "vue"
    }

    fn resolve(
        &self,
        services: &mut Services,
        request: &ResolutionRequest,
    ) -> ResolveResult<Option<PathBuf>> {
        if !request.has_specifier() {
            return Ok(None);
        }

        let typescript = match std::fs::read_to_string(&request.source_file) {
            Ok(source) => script_is_typescript(&source),
            Err(err) => {
                tracing::debug!(
                    file = %request.source_file.display(),
                    error = %err,
                    "could not read component; treating as javascript"
                );
                false
            }
        };

        if typescript {
            services.typescript_mut().resolve_request(request)
        } else {
            javascript::resolve_js(services, request)
        }
    }
}

/// Whether any `<script>` tag declares `lang="ts"` or `lang="tsx"`.
pub fn script_is_typescript(source: &str) -> bool {
    let mut rest = source;
    while let Some(start) = rest.find("<script") {
        let after = &rest[start + "<script".len()..];
        let Some(end) = after.find('>') else {
            return false;
        };
        if matches!(script_lang(&after[..end]), Some("ts" | "tsx")) {
            return true;
        }
        rest = &after[end..];
    }
    false
}

fn script_lang(attributes: &str) -> Option<&str> {
    let idx = attributes.find("lang")?;
    let value = attributes[idx + "lang".len()..].trim_start().strip_prefix('=')?;
    let value = value.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &value[1..];
    let close = inner.find(quote)?;
    Some(inner[..close].trim())
}
