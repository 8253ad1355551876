//! Manual cleanup, `gitsect reset`.
//!
//! For sessions that were killed before their own cleanup could run: ends
//! any bisection in progress and rebuilds the restored head.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::super::Cli;

pub async fn cmd_reset(
    cli: &Cli,
    repo: PathBuf,
    build: Option<String>,
    build_args: Vec<String>,
) -> Result<()> {
    use dialoguer::Confirm;
    use gitsect::config::SectToml;
    use gitsect::process::EnvSnapshot;
    use gitsect::repo::BisectRepo;
    use gitsect::stage::BuildStage;
    use gitsect::ui::{BisectUi, icons};

    let file = SectToml::load_or_default(&repo)?;
    let repo_path = repo
        .canonicalize()
        .with_context(|| format!("Failed to resolve repository directory {}", repo.display()))?;
    let build_command = build.or(file.build.command);
    let build_args = if build_args.is_empty() {
        file.build.args
    } else {
        build_args
    };

    if !cli.yes {
        let confirm = Confirm::new()
            .with_prompt("This will abort any bisection in progress. Continue?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    let env = EnvSnapshot::capture();
    let repo = BisectRepo::open(&repo_path, env.clone())?;
    repo.reset().await?;

    let ui = BisectUi::new(cli.verbose);
    let build_stage = BuildStage::new(build_command, build_args, &repo_path, env);
    if build_stage.is_configured() {
        build_stage.run(&ui).await?;
        ui.print_line(format!("{}Rebuild completed", icons::HAMMER));
    }

    println!("Reset complete");
    Ok(())
}
