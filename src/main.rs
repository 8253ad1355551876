use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "gitsect")]
#[command(version, about = "Automated git bisect driver")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for the first commit that breaks the test
    Run {
        /// Known-good revision the search starts from
        good: String,

        /// Test procedure run against each candidate revision. Falls back to
        /// the [test] command in .gitsect.toml
        test: Option<String>,

        /// Repository to bisect
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Known-bad revision
        #[arg(long, default_value = "HEAD")]
        bad: String,

        /// Build command run against each candidate before the test
        #[arg(long)]
        build: Option<String>,

        /// Extra build argument (repeatable)
        #[arg(long = "build-arg")]
        build_args: Vec<String>,

        /// Substring of test stderr that marks a failing revision
        #[arg(long)]
        marker: Option<String>,

        /// Classification strategy: marker, exit-code
        #[arg(long, default_value = "marker")]
        classifier: String,

        /// Abort after this many skipped revisions (0 disables the guard)
        #[arg(long)]
        max_skips: Option<u32>,

        /// Scratch directory for per-step logs
        #[arg(long)]
        tmp_dir: Option<String>,

        /// Print the outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// End any bisection in progress and rebuild the working tree
    Reset {
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        #[arg(long)]
        build: Option<String>,

        #[arg(long = "build-arg")]
        build_args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            good,
            test,
            repo,
            bad,
            build,
            build_args,
            marker,
            classifier,
            max_skips,
            tmp_dir,
            json,
        } => {
            cmd::cmd_run(
                &cli,
                good,
                test.clone(),
                repo.clone(),
                bad,
                build.clone(),
                build_args.clone(),
                marker.clone(),
                classifier,
                *max_skips,
                tmp_dir.clone(),
                *json,
            )
            .await?;
        }
        Commands::Reset {
            repo,
            build,
            build_args,
        } => {
            cmd::cmd_reset(&cli, repo.clone(), build.clone(), build_args.clone()).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
