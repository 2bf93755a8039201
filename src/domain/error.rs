//! Domain error types.
//!
//! Only conditions that stop a run (or one strategy slot) become errors.
//! Data-quality problems degrade with a warning instead: dropped join rows,
//! selection names absent from the table, missing capitalization values and
//! degenerate volatilities are logged and recorded on the strategy outcome,
//! never raised.

/// Top-level error type for foliosim.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FoliosimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("empty price table: {reason}")]
    EmptyTable { reason: String },

    #[error("unknown asset '{asset}' (not in the price table)")]
    UnknownAsset { asset: String },

    #[error("market-cap table misaligned with price table: {reason}")]
    MisalignedCaps { reason: String },

    #[error("duplicate strategy name '{name}'")]
    DuplicateStrategy { name: String },

    #[error("no strategies configured")]
    NoStrategies,

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for FoliosimError {
    fn from(err: std::io::Error) -> Self {
        FoliosimError::Io {
            reason: err.to_string(),
        }
    }
}

fn exit_code_class(err: &FoliosimError) -> u8 {
    match err {
        FoliosimError::Io { .. } => 1,
        FoliosimError::ConfigParse { .. }
        | FoliosimError::ConfigMissing { .. }
        | FoliosimError::ConfigInvalid { .. } => 2,
        FoliosimError::Data { .. } | FoliosimError::EmptyTable { .. } => 3,
        FoliosimError::UnknownAsset { .. }
        | FoliosimError::MisalignedCaps { .. }
        | FoliosimError::DuplicateStrategy { .. }
        | FoliosimError::NoStrategies
        | FoliosimError::InvalidParameter { .. } => 4,
    }
}

impl From<&FoliosimError> for std::process::ExitCode {
    fn from(err: &FoliosimError) -> Self {
        std::process::ExitCode::from(exit_code_class(err))
    }
}
