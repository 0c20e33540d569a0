//! CLI binary entry point for schema-graph

#[cfg(feature = "cli")]
use anyhow::Context;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use schema_graph_sdk::cli::commands::compile::{CompileArgs, OutputFormat, handle_compile};
#[cfg(feature = "cli")]
use schema_graph_sdk::cli::commands::fmt::{FmtArgs, handle_fmt};
#[cfg(feature = "cli")]
use schema_graph_sdk::cli::commands::validate::{ValidateArgs, handle_validate};
#[cfg(feature = "cli")]
use schema_graph_sdk::cli::commands::InputSource;
#[cfg(feature = "cli")]
use schema_graph_sdk::compiler::CreateMode;
#[cfg(feature = "cli")]
use schema_graph_sdk::config::SdkConfig;
#[cfg(feature = "cli")]
use schema_graph_sdk::model::ProjectFormat;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "schema-graph")]
#[command(about = "Validate, compile and format schema graph projects")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to .schema-graph.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Check a project for every problem that would stop compilation
    Validate {
        /// Project file, or '-' for stdin
        input: String,
        /// Read the input as YAML
        #[arg(long)]
        yaml: bool,
    },
    /// Compile a project into ordered DDL
    Compile {
        /// Project file, or '-' for stdin
        input: String,
        /// Read the input as YAML
        #[arg(long)]
        yaml: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value = "sql")]
        format: OutputFormatArg,
        /// Target catalog, overriding the project and configuration
        #[arg(long)]
        catalog: Option<String>,
        /// Target schema, overriding the project and configuration
        #[arg(long)]
        schema: Option<String>,
        /// How CREATE statements treat existing objects
        #[arg(long, value_enum)]
        create_mode: Option<CreateModeArg>,
        /// Skip SET TAGS statements
        #[arg(long)]
        no_tags: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrite a project in canonical form
    Fmt {
        /// Project file, or '-' for stdin
        input: String,
        /// Read the input as YAML
        #[arg(long)]
        yaml: bool,
        /// Emit YAML instead of JSON
        #[arg(long)]
        to_yaml: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Sql,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum CreateModeArg {
    Create,
    CreateOrReplace,
    IfNotExists,
}

#[cfg(feature = "cli")]
fn convert_output_format(format: OutputFormatArg) -> OutputFormat {
    match format {
        OutputFormatArg::Sql => OutputFormat::Sql,
        OutputFormatArg::Json => OutputFormat::Json,
    }
}

#[cfg(feature = "cli")]
fn convert_create_mode(mode: CreateModeArg) -> CreateMode {
    match mode {
        CreateModeArg::Create => CreateMode::Create,
        CreateModeArg::CreateOrReplace => CreateMode::CreateOrReplace,
        CreateModeArg::IfNotExists => CreateMode::IfNotExists,
    }
}

/// Explicit configuration file, or `.schema-graph.toml` beside the input (cwd for stdin)
#[cfg(feature = "cli")]
fn load_config(explicit: Option<&Path>, input: &InputSource) -> anyhow::Result<SdkConfig> {
    if let Some(path) = explicit {
        let mut config = SdkConfig::load_file(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        config.apply_env_overrides();
        return Ok(config);
    }
    let workspace = match input {
        InputSource::File(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        InputSource::Stdin => PathBuf::from("."),
    };
    Ok(SdkConfig::load(&workspace)?)
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Validate { input, yaml } => {
            let input = InputSource::parse(&input);
            let config = load_config(cli.config.as_deref(), &input)?;
            handle_validate(&ValidateArgs {
                input,
                yaml,
                config,
            })?;
        }
        Commands::Compile {
            input,
            yaml,
            format,
            catalog,
            schema,
            create_mode,
            no_tags,
            output,
        } => {
            let input = InputSource::parse(&input);
            let config = load_config(cli.config.as_deref(), &input)?;
            let args = CompileArgs {
                input,
                yaml,
                format: convert_output_format(format),
                config,
                catalog,
                schema,
                create_mode: create_mode.map(convert_create_mode),
                no_tags,
                output,
            };
            handle_compile(&args).context("compilation failed")?;
        }
        Commands::Fmt {
            input,
            yaml,
            to_yaml,
            output,
        } => {
            let args = FmtArgs {
                input: InputSource::parse(&input),
                yaml_input: yaml,
                to: if to_yaml {
                    ProjectFormat::Yaml
                } else {
                    ProjectFormat::Json
                },
                output,
            };
            handle_fmt(&args)?;
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
