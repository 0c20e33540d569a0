//! Compile command implementation

use super::{InputSource, load_project, write_output};
use crate::cli::error::CliError;
use crate::compiler::{CompileOptions, CreateMode, DdlCompiler};
use crate::config::SdkConfig;
use std::path::PathBuf;
use tracing::info;

/// Output format of the compile command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One `;`-terminated script
    #[default]
    Sql,
    /// The ordered statements with their entity ids
    Json,
}

/// Arguments of the compile command
#[derive(Debug, Clone)]
pub struct CompileArgs {
    pub input: InputSource,
    pub yaml: bool,
    pub format: OutputFormat,
    pub config: SdkConfig,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub create_mode: Option<CreateMode>,
    pub no_tags: bool,
    pub output: Option<PathBuf>,
}

impl CompileArgs {
    /// Configuration values overridden by explicit flags
    pub fn options(&self) -> CompileOptions {
        let mut options = self.config.compile_options();
        if let Some(catalog) = &self.catalog {
            options.catalog_name = Some(catalog.clone());
        }
        if let Some(schema) = &self.schema {
            options.schema_name = Some(schema.clone());
        }
        if let Some(create_mode) = self.create_mode {
            options.create_mode = create_mode;
        }
        if self.no_tags {
            options.include_tags = false;
        }
        options
    }
}

/// Handle the compile command
pub fn handle_compile(args: &CompileArgs) -> Result<(), CliError> {
    let loaded = load_project(&args.input, args.yaml)?;
    let compiler = DdlCompiler::new(args.options());
    let statements = compiler.compile(&loaded.project)?;

    let content = match args.format {
        OutputFormat::Sql => DdlCompiler::render_script(&statements),
        OutputFormat::Json => serde_json::to_string_pretty(&statements)
            .map(|json| json + "\n")
            .map_err(|e| CliError::Serialization(e.to_string()))?,
    };
    write_output(&content, args.output.as_deref())?;
    info!(
        "Compiled {} statement(s) for project '{}'",
        statements.len(),
        loaded.project.name
    );
    Ok(())
}
