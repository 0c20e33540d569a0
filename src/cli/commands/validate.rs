//! Validate command implementation

use super::{InputSource, load_project};
use crate::cli::error::CliError;
use crate::compiler::DdlCompiler;
use crate::config::SdkConfig;

/// Arguments of the validate command
#[derive(Debug, Clone)]
pub struct ValidateArgs {
    pub input: InputSource,
    /// Read the input as YAML regardless of its extension
    pub yaml: bool,
    pub config: SdkConfig,
}

/// Handle the validate command
///
/// Loads the project and runs the full compile-time validation, printing every problem.
pub fn handle_validate(args: &ValidateArgs) -> Result<(), CliError> {
    let loaded = load_project(&args.input, args.yaml)?;
    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }

    let errors = DdlCompiler::new(args.config.compile_options()).validate(&loaded.project);
    if errors.is_empty() {
        println!(
            "Validation successful: {} table(s), {} relationship(s), {} view(s)",
            loaded.project.tables.len(),
            loaded.project.relationships.len(),
            loaded.project.metric_views.len() + loaded.project.traditional_views.len()
        );
        return Ok(());
    }

    for error in &errors {
        eprintln!("  - {}", error);
    }
    Err(CliError::InvalidProject(errors.len()))
}
