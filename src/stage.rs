//! Build and test stages of one bisection step.
//!
//! Both stages run captured: build noise is suppressed unless the build
//! fails, and test output is the classification signal so it never reaches
//! the terminal directly.

use crate::errors::BisectError;
use crate::process::{self, CommandSpec, EnvSnapshot, StageResult};
use crate::ui::BisectUi;
use std::path::Path;
use tracing::debug;

/// Rebuilds the working tree at the currently checked-out revision.
///
/// The build command is optional; without one the stage is a spawn-free
/// no-op. Invoked once per search iteration and once more during final
/// cleanup, so it must tolerate repeated runs against the same checkout.
pub struct BuildStage {
    spec: Option<CommandSpec>,
    env: EnvSnapshot,
}

impl BuildStage {
    pub fn new(
        command: Option<String>,
        args: Vec<String>,
        work_tree: &Path,
        env: EnvSnapshot,
    ) -> Self {
        let spec = command.map(|program| CommandSpec::new(program, work_tree).args(args));
        Self { spec, env }
    }

    pub fn is_configured(&self) -> bool {
        self.spec.is_some()
    }

    /// Run the configured build, capturing its output.
    ///
    /// Returns `Ok(None)` when no build command is configured. On a
    /// non-zero exit the captured stdout is surfaced for diagnosis and the
    /// failure propagates with the reconstructed command line.
    pub async fn run(&self, ui: &BisectUi) -> Result<Option<StageResult>, BisectError> {
        let Some(spec) = &self.spec else {
            return Ok(None);
        };

        ui.verbose_command(&spec.display());
        let result = process::run_captured(spec, &self.env).await?;

        if !result.success() {
            debug!(exit_code = result.exit_code, "build failed");
            if !result.stdout.trim().is_empty() {
                ui.print_raw(&result.stdout);
            }
            return Err(BisectError::BuildFailed {
                command: spec.display(),
                exit_code: result.exit_code,
            });
        }

        Ok(Some(result))
    }
}

/// Runs the test procedure against the current checkout.
///
/// Never fails on a non-zero exit; the captured result is handed to the
/// classifier untouched.
pub struct TestStage {
    spec: CommandSpec,
    env: EnvSnapshot,
}

impl TestStage {
    pub fn new(test_command: impl Into<String>, work_tree: &Path, env: EnvSnapshot) -> Self {
        Self {
            spec: CommandSpec::new(test_command, work_tree),
            env,
        }
    }

    pub async fn run(&self, ui: &BisectUi) -> Result<StageResult, BisectError> {
        ui.verbose_command(&self.spec.display());
        let result = process::run_captured(&self.spec, &self.env).await?;
        debug!(exit_code = result.exit_code, "test finished");
        Ok(result)
    }
}
