//! Format command implementation

use super::{InputSource, load_project, write_output};
use crate::cli::error::CliError;
use crate::model::{ProjectFormat, ProjectSaver};
use std::path::PathBuf;

/// Arguments of the fmt command
#[derive(Debug, Clone)]
pub struct FmtArgs {
    pub input: InputSource,
    pub yaml_input: bool,
    /// Output format
    pub to: ProjectFormat,
    pub output: Option<PathBuf>,
}

/// Handle the fmt command: rewrite a project in canonical form
pub fn handle_fmt(args: &FmtArgs) -> Result<(), CliError> {
    let loaded = load_project(&args.input, args.yaml_input)?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    let mut content = ProjectSaver::new().render(&loaded.project, args.to)?;
    if !content.ends_with('\n') {
        content.push('\n');
    }
    write_output(&content, args.output.as_deref())
}
