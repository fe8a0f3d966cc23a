//! Error types, one per stage, tied together by [`GenerationError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::module::Variant;

/// Settings could not be resolved. Fatal to the whole run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("duplicate module `{0}`")]
    DuplicateModule(String),

    #[error("unknown module `{0}`")]
    UnknownModule(String),
}

/// Failure reported by the parser collaborator.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no declaration dump found for `{header}`")]
    MissingDump { header: String, searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed declaration dump {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Failure raised by a rule hook or while folding its rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("required symbol `{0}` not found")]
    MissingSymbol(String),

    /// Something asked for per-target behavior in a pass whose variant forbids it.
    #[error("{variant} module cannot diverge per target ({detail})")]
    Divergent { variant: Variant, detail: String },

    #[error("{0}")]
    Hook(String),
}

/// Failure reported by the emission collaborator.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Per-module failure. Recorded against the module; the batch continues.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    RuleApplication(RuleError),

    #[error("{0}")]
    VariantPolicyViolation(RuleError),

    #[error("{0}")]
    Emit(#[from] EmitError),
}

impl GenerationError {
    /// Short name used in the one-line failure report.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Parse(_) => "ParseError",
            GenerationError::RuleApplication(_) => "RuleApplicationError",
            GenerationError::VariantPolicyViolation(_) => "VariantPolicyViolation",
            GenerationError::Emit(_) => "EmitError",
        }
    }
}

impl From<RuleError> for GenerationError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::Divergent { .. } => GenerationError::VariantPolicyViolation(err),
            other => GenerationError::RuleApplication(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_maps_to_policy_violation() {
        let err: GenerationError = RuleError::Divergent {
            variant: Variant::PureShared,
            detail: "rule scoped to client".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "VariantPolicyViolation");
        assert_eq!(
            err.to_string(),
            "pure_shared module cannot diverge per target (rule scoped to client)"
        );
    }

    #[test]
    fn hook_failures_map_to_rule_application() {
        let err: GenerationError = RuleError::MissingSymbol("CTakeDamageInfo".to_string()).into();
        assert_eq!(err.kind(), "RuleApplicationError");
        assert_eq!(err.to_string(), "required symbol `CTakeDamageInfo` not found");
    }

    #[test]
    fn config_error_messages() {
        let err = ConfigError::DuplicateModule("anim".to_string());
        assert_eq!(err.to_string(), "duplicate module `anim`");
        assert_eq!(
            ConfigError::UnknownModule("physics".to_string()).to_string(),
            "unknown module `physics`"
        );
    }
}
