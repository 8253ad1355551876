//! The bisection search, `gitsect run`.

use anyhow::Result;
use gitsect::bisector::BisectOutcome;
use std::path::PathBuf;

use super::super::Cli;

#[allow(clippy::too_many_arguments)]
pub async fn cmd_run(
    cli: &Cli,
    good: &str,
    test: Option<String>,
    repo: PathBuf,
    bad: &str,
    build: Option<String>,
    build_args: Vec<String>,
    marker: Option<String>,
    classifier: &str,
    max_skips: Option<u32>,
    tmp_dir: Option<String>,
    json: bool,
) -> Result<()> {
    use gitsect::bisector::Bisector;
    use gitsect::classify::ClassifierKind;
    use gitsect::config::{BisectConfig, CliOverrides, SectToml};
    use gitsect::ui::BisectUi;
    use std::str::FromStr;

    let classifier = ClassifierKind::from_str(classifier)?;
    let file = SectToml::load_or_default(&repo)?;
    let config = BisectConfig::resolve(
        CliOverrides {
            repo,
            test,
            build,
            build_args,
            marker,
            classifier,
            max_skips,
            tmp_dir,
        },
        &file,
    )?;

    let ui = BisectUi::new(cli.verbose);
    let mut bisector = Bisector::new(config, ui)?;
    let outcome = bisector.run(bad, good).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_summary(outcome: &BisectOutcome) {
    println!();
    match &outcome.first_bad {
        Some(sha) => println!(
            "First bad commit: {}",
            console::style(sha).red().bold()
        ),
        None => println!("Bisection finished without isolating a single commit"),
    }
    println!(
        "{}",
        summary_line(
            outcome.iterations,
            outcome.skips,
            outcome.duration().num_seconds()
        )
    );
    println!();
}

/// Build a human-readable note for how the search went.
///
/// Returns a string like "4 iterations, 1 skipped, 12s elapsed".
/// This is pure logic that can be unit-tested without external processes.
pub fn summary_line(iterations: u32, skips: u32, elapsed_secs: i64) -> String {
    format!(
        "{} iteration{}, {} skipped, {}s elapsed",
        iterations,
        if iterations == 1 { "" } else { "s" },
        skips,
        elapsed_secs
    )
}
