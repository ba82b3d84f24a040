use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pgdiff::api::{compare, compare_snapshots, CompareRequest};
use pgdiff::config::{CompareOptions, DEFAULT_CONFIG_FILE};
use pgdiff::model::SchemaSnapshot;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pgdiff")]
#[command(about = "PostgreSQL schema comparison and patch script generator", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the source and target databases of a configuration and write a patch file
    Compare {
        /// Configuration name inside the configuration file
        config_name: String,
        /// Suffix of the generated patch file name
        script_name: String,
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Print the patch script between two serialized snapshots
    DiffSnapshots {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        target: PathBuf,
        #[command(flatten)]
        flags: CompareFlags,
    },
}

#[derive(Args)]
struct CompareFlags {
    #[arg(long)]
    idempotent: bool,
    #[arg(long)]
    no_grants: bool,
    #[arg(long)]
    no_indexes: bool,
    #[arg(long)]
    drop_missing_table: bool,
    #[arg(long)]
    drop_missing_view: bool,
    #[arg(long)]
    drop_missing_function: bool,
}

impl CompareFlags {
    fn to_options(&self) -> CompareOptions {
        CompareOptions {
            idempotent_script: self.idempotent,
            grants: !self.no_grants,
            indexes: !self.no_indexes,
            drop_missing_table: self.drop_missing_table,
            drop_missing_view: self.drop_missing_view,
            drop_missing_function: self.drop_missing_function,
            ..CompareOptions::default()
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn read_snapshot(path: &Path) -> Result<SchemaSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Compare {
            config_name,
            script_name,
            config,
        } => {
            let request = CompareRequest::from_config_file(&config, &config_name, script_name)?;
            let result = compare(request).await?;
            if result.is_empty {
                println!("No differences found");
            }
            println!(
                "SQL patch file has been created at: {}",
                result.script_path.display()
            );
            Ok(())
        }
        Commands::DiffSnapshots {
            source,
            target,
            flags,
        } => {
            let source = read_snapshot(&source)?;
            let target = read_snapshot(&target)?;
            let statements = compare_snapshots(&source, &target, &flags.to_options());
            print!("{}", pgdiff::script::clear_empty_lines(&statements.concat()));
            Ok(())
        }
    }
}
