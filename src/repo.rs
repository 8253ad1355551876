//! Repository adapter over the git bisection oracle.
//!
//! Six operations, all thin wrappers around one git invocation each:
//! `start`, `checkout`, `mark_good`, `mark_bad`, `skip`, `reset`. The
//! marking operations capture git's output and return it verbatim for the
//! controller to scan; the rest require success and let git's output reach
//! the operator's terminal directly.

use crate::errors::RunnerError;
use crate::process::{self, CommandSpec, EnvSnapshot, StageResult};
use anyhow::{Context, Result};
use git2::Repository;
use std::path::{Path, PathBuf};

/// Handle on one working tree under bisection.
///
/// Every git call passes `--git-dir`/`--work-tree` explicitly, so the
/// adapter behaves the same regardless of the driver's own cwd. The
/// bisection log inside `.git` is the only durable state; this type holds
/// none of its own.
#[derive(Debug)]
pub struct BisectRepo {
    work_tree: PathBuf,
    git_dir: PathBuf,
    env: EnvSnapshot,
}

impl BisectRepo {
    /// Open the adapter over `work_tree`, verifying it is a git repository
    /// before any child process is spawned.
    pub fn open(work_tree: impl AsRef<Path>, env: EnvSnapshot) -> Result<Self> {
        let work_tree = work_tree.as_ref().to_path_buf();
        let repo = Repository::open(&work_tree).with_context(|| {
            format!("Failed to open git repository at {}", work_tree.display())
        })?;
        // repo.path() resolves gitfile indirection, so linked worktrees work
        let git_dir = repo.path().to_path_buf();
        Ok(Self {
            work_tree,
            git_dir,
            env,
        })
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn git_command(&self) -> CommandSpec {
        CommandSpec::new("git", &self.work_tree)
            .arg(format!("--git-dir={}", self.git_dir.display()))
            .arg(format!("--work-tree={}", self.work_tree.display()))
    }

    /// Begin a bisection between `bad` and `good`. Git checks out the first
    /// candidate revision as a side effect.
    pub async fn start(&self, bad: &str, good: &str) -> Result<(), RunnerError> {
        let spec = self.git_command().args(["bisect", "start", bad, good]);
        process::run_checked(&spec, &self.env).await
    }

    /// Check out an arbitrary revision.
    pub async fn checkout(&self, revision: &str) -> Result<(), RunnerError> {
        let spec = self.git_command().args(["checkout", revision]);
        process::run_checked(&spec, &self.env).await
    }

    /// Mark the current revision good. Returns git's raw output; the caller
    /// interprets it.
    pub async fn mark_good(&self) -> Result<StageResult, RunnerError> {
        let spec = self.git_command().args(["bisect", "good"]);
        process::run_captured(&spec, &self.env).await
    }

    /// Mark the current revision bad. Returns git's raw output; the caller
    /// interprets it.
    pub async fn mark_bad(&self) -> Result<StageResult, RunnerError> {
        let spec = self.git_command().args(["bisect", "bad"]);
        process::run_captured(&spec, &self.env).await
    }

    /// Exclude the current revision from the search.
    pub async fn skip(&self) -> Result<(), RunnerError> {
        let spec = self.git_command().args(["bisect", "skip"]);
        process::run_checked(&spec, &self.env).await
    }

    /// End the bisection and restore the pre-bisection checkout.
    pub async fn reset(&self) -> Result<(), RunnerError> {
        let spec = self.git_command().args(["bisect", "reset"]);
        process::run_checked(&spec, &self.env).await
    }
}
