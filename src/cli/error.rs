//! CLI-specific error types

use crate::config::ConfigError;
use crate::error::{CompileErrors, SchemaError};
use crate::model::{LoadError, SaveError};
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Project is invalid: {0} problem(s) found")]
    InvalidProject(usize),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Compile(#[from] CompileErrors),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
