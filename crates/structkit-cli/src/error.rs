use std::path::PathBuf;
use structkit::core::io::report::ReportError;
use structkit::core::models::structure::StructureError;
use structkit::core::selection::SelectionError;
use structkit::engine::config::ConfigError;
use structkit::engine::error::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Invalid atom selection: {0}")]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write file '{path}': {source}", path = path.display())]
    FileWriting {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl CliError {
    pub fn parsing(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        CliError::FileParsing {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn writing(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        CliError::FileWriting {
            path: path.into(),
            source: source.into(),
        }
    }
}
