//! CLI command implementations

pub mod compile;
pub mod fmt;
pub mod validate;

use crate::cli::error::CliError;
use crate::model::{ProjectFormat, ProjectLoadResult, ProjectLoader};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where a project document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// `-` selects stdin, anything else is a path
    pub fn parse(input: &str) -> Self {
        if input == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(input))
        }
    }

    /// Format of the input; stdin is read as JSON unless `--yaml` is given
    fn format(&self, yaml: bool) -> ProjectFormat {
        match self {
            _ if yaml => ProjectFormat::Yaml,
            InputSource::File(path) => ProjectFormat::from_path(path),
            InputSource::Stdin => ProjectFormat::Json,
        }
    }
}

/// Read and normalize a project, reporting anything the loader had to drop
pub fn load_project(input: &InputSource, yaml: bool) -> Result<ProjectLoadResult, CliError> {
    let content = match input {
        InputSource::File(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::FileReadError(path.clone(), e.to_string()))?,
        InputSource::Stdin => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
            content
        }
    };

    let result = ProjectLoader::new().parse(&content, input.format(yaml))?;
    for relationship in &result.orphaned_relationships {
        warn!("Skipped orphaned relationship {}", relationship.id);
    }
    Ok(result)
}

/// Print to stdout or write to `output`
pub fn write_output(content: &str, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
