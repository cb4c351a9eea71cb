//! Error types and result aliases for spn operations.
//!
//! Provides a unified error type that covers every failure the resolver and
//! build engine can hit, with actionable suggestions for the fatal ones.

use thiserror::Error;

/// Unified error type for all spn operations
#[derive(Error, Debug)]
pub enum SpnError {
    // Version algebra errors
    #[error("Invalid version '{input}': {reason}")]
    VersionParse { input: String, reason: String },

    #[error("Invalid version range '{input}': {reason}")]
    RangeParse { input: String, reason: String },

    // Config errors
    #[error("Failed to parse {file}: {message}")]
    TomlParse { file: String, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Resolution errors
    #[error("Package '{name}' not found in any package source")]
    PackageNotFound { name: String },

    #[error(
        "Version conflict on {package}: {requester} requires {range}, but {conflicting_requester} requires {conflicting_range}"
    )]
    VersionConflict {
        package: String,
        requester: String,
        range: String,
        conflicting_requester: String,
        conflicting_range: String,
    },

    #[error("No version of {package} satisfies {range} (required by {requester})")]
    NoMatchingVersion {
        package: String,
        range: String,
        requester: String,
    },

    #[error("Circular dependency detected: {package} transitively depends on itself")]
    CircularDependency { package: String },

    #[error("Lock file is out of date: {reason}")]
    LockMismatch { reason: String },

    // Per-dependency build errors
    #[error("{operation} failed for {repo}: {message}")]
    Vcs {
        operation: String,
        repo: String,
        message: String,
    },

    #[error("{phase} hook failed for {package}: {message}")]
    Hook {
        phase: String,
        package: String,
        message: String,
    },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for spn operations
pub type SpnResult<T> = Result<T, SpnError>;

impl SpnError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a source-control error
    pub fn vcs(operation: &str, repo: impl ToString, message: impl Into<String>) -> Self {
        Self::Vcs {
            operation: operation.to_string(),
            repo: repo.to_string(),
            message: message.into(),
        }
    }

    /// Create a build/package hook error
    pub fn hook(phase: &str, package: &str, message: impl Into<String>) -> Self {
        Self::Hook {
            phase: phase.to_string(),
            package: package.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole run.
    ///
    /// Per-dependency failures (source control, hooks, IO) are absorbed into
    /// the failing dependency's state; everything else stops before any
    /// worker is spawned.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SpnError::Vcs { .. } | SpnError::Hook { .. } | SpnError::Io { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SpnError::VersionParse { .. } | SpnError::RangeParse { .. } => {
                Some("Use dotted versions (1.2.3) with an optional ^, ~, *, >, >=, <, <= or == prefix")
            },
            SpnError::PackageNotFound { .. } => {
                Some("Check the package name spelling or add the directory that provides it to `sources`")
            },
            SpnError::VersionConflict { .. } | SpnError::NoMatchingVersion { .. } => {
                Some("Relax one of the ranges above, or run 'spn update' after refreshing package sources")
            },
            SpnError::CircularDependency { .. } => {
                Some("Remove the dependency edge that points back at this package")
            },
            SpnError::LockMismatch { .. } => Some("Run 'spn update' to regenerate spn.lock"),
            _ => None,
        }
    }
}
