use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use protodiff::{compare_named, ALL};
use protodiff_loader::{load_schema, SchemaError};

#[derive(Parser)]
#[command(name = "protodiff")]
#[command(about = "Report structural differences between two versions of a protobuf schema", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two `.proto` files, or one named message or enum in them
    Diff {
        /// Import root of the first schema
        root_a: PathBuf,
        /// First `.proto` file, relative to `root_a`
        file_a: PathBuf,
        /// Import root of the second schema
        root_b: PathBuf,
        /// Second `.proto` file, relative to `root_b`
        file_b: PathBuf,
        /// Fully qualified message or enum name; `.` compares all top-level types
        #[arg(default_value = ALL)]
        name: String,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Keep sections that contain no differences
        #[arg(long)]
        no_trim: bool,
    },

    /// Load a `.proto` file and print its descriptors as JSON
    Dump {
        /// Import root
        root: PathBuf,
        /// `.proto` file, relative to `root`
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Diff { root_a, file_a, root_b, file_b, name, format, no_trim } => {
            let schema_a = load_schema(&file_a, &root_a)?;
            let schema_b = load_schema(&file_b, &root_b)?;

            let mut root = compare_named(&schema_a, &schema_b, &name);
            if !no_trim {
                root.trim();
            }
            info!(changes = root.change_count(), "comparison finished");

            match format {
                Format::Text => print!("{}", root.render()),
                Format::Json => println!("{}", serde_json::to_string_pretty(&root)?),
            }
            Ok(())
        }

        Commands::Dump { root, file } => {
            let schema = load_schema(&file, &root)?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
