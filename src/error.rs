//! Errors produced while resolving a specifier.
//!
//! Only a subset of these ever reaches the caller of
//! [`ResolverContext::dispatch`](crate::ResolverContext::dispatch): see
//! [`ResolveError::is_fatal`]. Everything else is absorbed at the dispatcher
//! boundary and treated as "this strategy found nothing".

use std::fmt;
use std::path::PathBuf;

pub type ResolveResult<T> = Result<T, ResolveError>;

#[derive(Debug)]
pub enum ResolveError {
    /// A tsconfig file could not be read or parsed.
    ConfigRead {
        path: PathBuf,
        source: anyhow::Error,
    },
    /// An inline tsconfig value was not a JSON object.
    ConfigType { found: &'static str },
    /// A tsconfig parsed but carried an unsupported compiler option.
    ConfigInvalid(anyhow::Error),
    /// `promote_default` was called with a name that is not registered.
    UnknownResolver(String),
    /// The request did not name the file containing the specifier.
    MissingSourceFile,
    /// A resolution strategy or collaborator failed.
    Strategy { resolver: String, message: String },
    Io(std::io::Error),
}

impl ResolveError {
    pub fn strategy(resolver: impl Into<String>, message: impl fmt::Display) -> Self {
        ResolveError::Strategy {
            resolver: resolver.into(),
            message: message.to_string(),
        }
    }

    /// Fatal errors propagate out of a dispatch. Non-fatal errors are logged
    /// and the dispatcher moves on to the next candidate strategy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ResolveError::ConfigRead { .. }
                | ResolveError::ConfigType { .. }
                | ResolveError::ConfigInvalid(_)
                | ResolveError::UnknownResolver(_)
                | ResolveError::MissingSourceFile
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ResolveError::ConfigRead { .. }
                | ResolveError::ConfigType { .. }
                | ResolveError::ConfigInvalid(_)
        )
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::ConfigRead { path, source } => {
                write!(f, "failed to load tsconfig {}: {:#}", path.display(), source)
            }
            ResolveError::ConfigType { found } => {
                write!(f, "tsconfig must be an object or a file path, found {}", found)
            }
            ResolveError::ConfigInvalid(source) => write!(f, "invalid tsconfig: {:#}", source),
            ResolveError::UnknownResolver(name) => {
                write!(f, "no resolver named '{}' is registered", name)
            }
            ResolveError::MissingSourceFile => write!(f, "a source file name must be supplied"),
            ResolveError::Strategy { resolver, message } => {
                write!(f, "{} resolver failed: {}", resolver, message)
            }
            ResolveError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::ConfigRead { source, .. } | ResolveError::ConfigInvalid(source) => {
                Some(&**source)
            }
            ResolveError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_fatal() {
        assert!(ResolveError::ConfigType { found: "number" }.is_fatal());
        assert!(ResolveError::ConfigInvalid(anyhow::anyhow!("bad module")).is_fatal());
        assert!(ResolveError::UnknownResolver("x".into()).is_fatal());
        assert!(ResolveError::MissingSourceFile.is_fatal());
    }

    #[test]
    fn strategy_and_io_errors_are_absorbed() {
        assert!(!ResolveError::strategy("webpack", "boom").is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!ResolveError::from(io).is_fatal());
    }

    #[test]
    fn display_names_the_resolver() {
        let err = ResolveError::strategy("amd", "config missing baseUrl");
        assert_eq!(err.to_string(), "amd resolver failed: config missing baseUrl");
    }
}
