mod commands;
mod engine;
mod evaluator;
mod executor;
mod report;
mod vcs;

use anyhow::Result;
use clap::{Parser, Subcommand};
use grade_common::config::{ConfigFile, ConfigOverrides, GraderConfig, Verbosity};
use grade_common::types::Credentials;
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "grade")]
#[command(about = "Build student repositories, run test suites against them, and report rubric scores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// How remote URLs are formed: https or ssh
    #[arg(short, long, global = true)]
    credentials: Option<Credentials>,

    /// Path substituted for $digital in test commands
    #[arg(short, long, global = true)]
    digital: Option<PathBuf>,

    /// Local repository directory (test, pull)
    #[arg(short, long, global = true)]
    local: Option<PathBuf>,

    /// Run only the tests with this name
    #[arg(short = 'n', long, global = true)]
    test_name: Option<String>,

    /// GitHub organization
    #[arg(short, long, global = true)]
    org: Option<String>,

    /// Project name (e.g., project01)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Student IDs, comma separated or repeated
    #[arg(short, long, global = true, value_delimiter = ',')]
    students: Vec<String>,

    /// Root directory holding <project>/<project>.toml
    #[arg(short, long, global = true)]
    tests_path: Option<PathBuf>,

    /// Per-command timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show a diff when a test fails
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show expected and actual output for every test (implies --verbose)
    #[arg(long = "vv", visible_alias = "verbose2", global = true)]
    verbose2: bool,

    /// Echo every command and its output
    #[arg(long = "vvv", visible_alias = "very-verbose", global = true)]
    very_verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and test every student repository and report scores
    Class,

    /// Clone every student repository
    Clone,

    /// Pull every student repository (or --local)
    Pull,

    /// Build and test one local directory (--local, default ".")
    Test,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            credentials: self.credentials,
            digital: self.digital.clone(),
            local: self.local.clone(),
            test_name: self.test_name.clone(),
            org: self.org.clone(),
            project: self.project.clone(),
            students: self.students.clone(),
            tests_path: self.tests_path.clone(),
            timeout_secs: self.timeout,
            verbosity: Verbosity::from_flags(self.verbose, self.verbose2, self.very_verbose),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with report lines
    let default_filter = if cli.very_verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let file = ConfigFile::load_default().map_err(|e| {
        error!("Failed to load defaults file: {}", e);
        e
    })?;
    let config = GraderConfig::resolve(file, cli.overrides());
    debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Class => commands::grade_class(&config).await?,
        Commands::Clone => commands::clone_class(&config).await?,
        Commands::Pull => commands::pull_class(&config).await?,
        Commands::Test => commands::grade_local(&config).await?,
    }

    Ok(())
}
