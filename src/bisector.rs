//! The bisection controller.
//!
//! Drives the checkout → build → test → classify → mark cycle against one
//! repository until git reports the first bad commit or a structural
//! failure aborts the search. A revision that cannot be built (or whose
//! stages cannot even be launched) never aborts: it is excluded with
//! `bisect skip`, bounded by the configured skip budget. Whatever the
//! outcome, the repository is restored afterwards: the bisection state is
//! reset and the restored head rebuilt.

use crate::classify::{Classifier, Verdict};
use crate::config::BisectConfig;
use crate::errors::BisectError;
use crate::process::{EnvSnapshot, StageResult};
use crate::repo::BisectRepo;
use crate::stage::{BuildStage, TestStage};
use crate::ui::{BisectUi, icons};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Git prints this phrase once the search has narrowed to a single commit.
pub const FIRST_BAD_PHRASE: &str = "is the first bad commit";

/// Lifecycle of one bisection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Running => "running",
            SessionPhase::Completed => "completed",
            SessionPhase::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

/// Summary of a finished search.
#[derive(Debug, Clone, Serialize)]
pub struct BisectOutcome {
    /// Commit git identified as the first bad one, when the terminal
    /// narration could be parsed
    pub first_bad: Option<String>,
    /// Search iterations performed, skipped revisions included
    pub iterations: u32,
    /// Revisions excluded from the search
    pub skips: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BisectOutcome {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// What one search iteration decided.
enum StepOutcome {
    /// Revision marked; git has moved to the next candidate
    Continue,
    /// Revision excluded; git has moved to another candidate
    Skipped,
    /// Git announced the first bad commit
    Finished { narration: String },
}

/// One bisection session over a repository.
///
/// Holds the repository adapter, the build and test stages and the
/// classifier together with the session counters. `run` is the only entry
/// point; a session is not reusable across runs.
pub struct Bisector {
    config: BisectConfig,
    repo: BisectRepo,
    build: BuildStage,
    test: TestStage,
    classifier: Box<dyn Classifier>,
    ui: BisectUi,
    phase: SessionPhase,
    iterations: u32,
    skips: u32,
    log_dir: Option<PathBuf>,
}

impl Bisector {
    /// Assemble a session from resolved configuration.
    ///
    /// The environment is snapshotted here, once, and shared by every child
    /// process the session spawns.
    pub fn new(config: BisectConfig, ui: BisectUi) -> anyhow::Result<Self> {
        let env = EnvSnapshot::capture();
        let repo = BisectRepo::open(&config.repo_path, env.clone())?;
        let build = BuildStage::new(
            config.build_command.clone(),
            config.build_args.clone(),
            &config.repo_path,
            env.clone(),
        );
        let test = TestStage::new(config.test_command.clone(), &config.repo_path, env);
        let classifier = config.classifier.build(&config.marker);

        Ok(Self {
            config,
            repo,
            build,
            test,
            classifier,
            ui,
            phase: SessionPhase::Idle,
            iterations: 0,
            skips: 0,
            log_dir: None,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Run the search between `bad` and `good`, then restore the repository.
    ///
    /// Restoration runs on every path, success or failure. When it fails the
    /// session error becomes `CleanupFailed`; a search error superseded that
    /// way has already been printed, so it is never silently lost.
    pub async fn run(&mut self, bad: &str, good: &str) -> Result<BisectOutcome, BisectError> {
        let started_at = Utc::now();
        self.phase = SessionPhase::Running;
        self.iterations = 0;
        self.skips = 0;
        self.log_dir = self.prepare_log_dir();

        let outcome = self.search(bad, good).await;
        if outcome.is_err() {
            self.phase = SessionPhase::Aborted;
        }

        if let Err(cleanup_err) = self.restore().await {
            self.phase = SessionPhase::Aborted;
            if let Err(search_err) = &outcome {
                self.ui.print_line(format!(
                    "{}Bisection failed before cleanup did: {search_err}",
                    icons::CROSS
                ));
            }
            return Err(BisectError::CleanupFailed(Box::new(cleanup_err)));
        }

        let first_bad = outcome?;
        self.phase = SessionPhase::Completed;
        Ok(BisectOutcome {
            first_bad,
            iterations: self.iterations,
            skips: self.skips,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn search(&mut self, bad: &str, good: &str) -> Result<Option<String>, BisectError> {
        self.ui.print_line(format!(
            "{}Bisecting {} between {} (bad) and {} (good)",
            icons::SPARKLE,
            self.config.repo_path.display(),
            bad,
            good
        ));
        self.repo.start(bad, good).await?;

        loop {
            self.iterations += 1;
            self.ui.iteration_header(self.iterations);

            match self.step().await {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Skipped) => self.note_skip()?,
                Ok(StepOutcome::Finished { narration }) => {
                    let first_bad = detect_first_bad(&narration);
                    match &first_bad {
                        Some(sha) => self
                            .ui
                            .print_line(format!("{}First bad commit: {sha}", icons::TARGET)),
                        None => self
                            .ui
                            .print_line(format!("{}Bisection finished", icons::TARGET)),
                    }
                    return Ok(first_bad);
                }
                Err(err) if err.is_skippable() => {
                    self.ui.print_line(format!(
                        "{}Skipping untestable revision: {err}",
                        icons::SKIP
                    ));
                    self.repo.skip().await?;
                    self.note_skip()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Build, test, classify and mark the currently checked-out revision.
    async fn step(&mut self) -> Result<StepOutcome, BisectError> {
        let build_pb = self
            .build
            .is_configured()
            .then(|| self.ui.step_spinner("Building"));
        let build_result = self.build.run(&self.ui).await;
        if let Some(pb) = build_pb {
            pb.finish_and_clear();
        }
        if let Some(output) = build_result? {
            self.write_step_log("build", &output);
            self.ui
                .print_line(format!("{}Build completed", icons::CHECK));
        }

        let test_pb = self.ui.step_spinner("Running test");
        let test_result = self.test.run(&self.ui).await;
        test_pb.finish_and_clear();
        let output = test_result?;
        self.write_step_log("test", &output);

        let verdict = self.classifier.classify(&output);
        let label = match verdict {
            Verdict::Good => style(verdict.to_string()).green(),
            Verdict::Bad => style(verdict.to_string()).red(),
            Verdict::Skip => style(verdict.to_string()).yellow(),
        };
        self.ui
            .print_line(format!("{}Test verdict: {label}", icons::FLASK));

        let narration = match verdict {
            Verdict::Good => self.repo.mark_good().await?,
            Verdict::Bad => self.repo.mark_bad().await?,
            Verdict::Skip => {
                self.repo.skip().await?;
                return Ok(StepOutcome::Skipped);
            }
        };

        // Git narrates the narrowing range on every mark; relay it verbatim
        self.ui.print_raw(&narration.stdout);
        if !narration.stderr.trim().is_empty() {
            self.ui.print_raw(&narration.stderr);
        }

        if narration.stdout.contains(FIRST_BAD_PHRASE) {
            return Ok(StepOutcome::Finished {
                narration: narration.stdout,
            });
        }
        Ok(StepOutcome::Continue)
    }

    fn note_skip(&mut self) -> Result<(), BisectError> {
        self.skips += 1;
        if self.config.max_skips > 0 && self.skips >= self.config.max_skips {
            return Err(BisectError::SkipLimitExceeded {
                skips: self.skips,
                limit: self.config.max_skips,
            });
        }
        Ok(())
    }

    /// Reset the bisection state and rebuild the restored head.
    ///
    /// A failed reset leaves the checkout unknown, so the rebuild is not
    /// attempted after one.
    async fn restore(&self) -> Result<(), BisectError> {
        self.ui.print_line(format!("{}Cleaning up", icons::BROOM));
        self.repo.reset().await?;

        if self.build.is_configured() {
            let pb = self.ui.step_spinner("Rebuilding restored head");
            let result = self.build.run(&self.ui).await;
            pb.finish_and_clear();
            result?;
            self.ui
                .print_line(format!("{}Rebuild completed", icons::HAMMER));
        }
        Ok(())
    }

    fn prepare_log_dir(&self) -> Option<PathBuf> {
        let dir = self
            .config
            .tmp_dir
            .join("gitsect")
            .join(Utc::now().format("%Y%m%d-%H%M%S").to_string());
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                debug!(dir = %dir.display(), "writing step logs");
                Some(dir)
            }
            Err(err) => {
                debug!(error = %err, "could not create step log directory, logging disabled");
                None
            }
        }
    }

    fn write_step_log(&self, stage: &str, result: &StageResult) {
        let Some(dir) = &self.log_dir else { return };
        let path = dir.join(format!("step-{:03}-{stage}.log", self.iterations));
        let mut content = format!("exit code: {}\n", result.exit_code);
        content.push_str(&result.stdout);
        if !result.stderr.is_empty() {
            content.push_str("\n--- stderr ---\n");
            content.push_str(&result.stderr);
        }
        if let Err(err) = std::fs::write(&path, content) {
            debug!(path = %path.display(), error = %err, "failed to write step log");
        }
    }
}

/// Extract the commit hash from git's terminal narration.
///
/// The announcement line leads with the hash, e.g.
/// `d6e1a9f... is the first bad commit`.
pub fn detect_first_bad(narration: &str) -> Option<String> {
    narration
        .lines()
        .find(|line| line.contains(FIRST_BAD_PHRASE))
        .and_then(|line| line.split_whitespace().next())
        .map(|sha| sha.to_string())
}
