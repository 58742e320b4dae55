// Flowline CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so stdout stays machine-readable.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flowline")]
#[command(about = "Flowline CLI - Run process definitions through the execution core")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed a command script through one partition engine
    Run {
        /// Process definition files (YAML or JSON, repeatable)
        #[arg(long = "definition", short, required = true)]
        definitions: Vec<String>,

        /// Command script: a list of commands (YAML or JSON)
        #[arg(long, short)]
        commands: String,

        /// Partition encoded into generated keys, overrides FLOWLINE_PARTITION_ID
        #[arg(long)]
        partition_id: Option<u16>,

        /// Activations allowed per command, overrides FLOWLINE_MAX_STEPS_PER_COMMAND
        #[arg(long)]
        max_steps: Option<usize>,

        /// Stop at the first rejected command instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Check that process definition files are well formed
    Validate {
        /// Process definition files (YAML or JSON)
        #[arg(required = true)]
        definitions: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowline_engine=info,flowline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Run {
            definitions,
            commands: script,
            partition_id,
            max_steps,
            strict,
        } => commands::run::run(
            output_format,
            cli.quiet,
            commands::run::RunOptions {
                definitions,
                commands: script,
                partition_id,
                max_steps,
                strict,
            },
        ),
        Commands::Validate { definitions } => {
            commands::validate::run(output_format, cli.quiet, &definitions)
        }
    }
}
