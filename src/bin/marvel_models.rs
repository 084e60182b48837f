use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use marvel_models::app::{Setup, SetupOutcome};
use marvel_models::config::{SetupConfig, SetupPaths};
use marvel_models::error::SetupError;
use marvel_models::output::StreamSink;
use marvel_models::store::ModelStore;
use marvel_models::tools::SystemToolbox;

const USAGE: &str = "Usage: [Dest_Dir] [Tmp_Dir]";

#[derive(Parser)]
#[command(name = "marvel-models")]
#[command(about = "Download and prepare the MARVEL HMM database and classifier models")]
#[command(version)]
struct Cli {
    /// Destination directory (default: ./models/)
    dest_dir: Option<String>,

    /// Scratch directory for the archive (default: /tmp/)
    tmp_dir: Option<String>,
}

fn main() -> ExitCode {
    eprintln!("{USAGE}");
    if let Err(report) = run() {
        if let Some(setup) = report.downcast_ref::<SetupError>() {
            println!("FATAL ERROR: {setup}\n");
            if let SetupError::IndexBuild { reason, .. } = setup {
                eprintln!("{reason}");
            }
            tracing::debug!(error = ?setup, "setup aborted");
            return ExitCode::from(map_exit_code(setup));
        }
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SetupError) -> u8 {
    match error {
        // clap reserves 2 for usage errors
        SetupError::Extraction(_) => 3,
        SetupError::IndexBuild { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().into_diagnostic()?;
    let paths = SetupPaths::resolve(cli.dest_dir.as_deref(), cli.tmp_dir.as_deref(), &cwd);
    eprintln!(
        "Destination directory: {}\nTemp directory: {}",
        paths.dest_dir, paths.tmp_dir
    );

    let config = SetupConfig::from_env();
    let tools = SystemToolbox::new(config.hmmpress.clone())?;
    let setup = Setup::new(ModelStore::new(&paths), config, tools);

    match setup.run(&StreamSink::stderr())? {
        SetupOutcome::AlreadyPresent => println!("INFO: HMM Database found.\n"),
        SetupOutcome::Installed(report) => {
            tracing::info!(
                database = %report.database_path,
                bytes = report.database_bytes,
                models = report.model_paths.len(),
                "setup finished"
            );
        }
    }
    Ok(())
}
