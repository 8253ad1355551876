//! Typed error hierarchy for the bisection driver.
//!
//! Two top-level enums cover the two layers:
//! - `RunnerError` — child-process spawning and checked-mode failures
//! - `BisectError` — failures surfaced by a bisection run

use thiserror::Error;

/// Errors from the process runner layer.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to launch `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with non-zero code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },
}

/// Errors from a bisection run.
#[derive(Debug, Error)]
pub enum BisectError {
    #[error("Build command `{command}` exited with non-zero code {exit_code}")]
    BuildFailed { command: String, exit_code: i32 },

    #[error("Skip count {skips} reached the limit of {limit}")]
    SkipLimitExceeded { skips: u32, limit: u32 },

    #[error("Cleanup after bisection failed: {0}")]
    CleanupFailed(#[source] Box<BisectError>),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BisectError {
    /// Whether the search loop absorbs this failure by marking the current
    /// revision as skipped instead of aborting the run.
    ///
    /// A failed build and a stage that could not even be launched both leave
    /// the revision untestable. A checked-mode git failure means the
    /// bisection state itself is broken, so it is never absorbed.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            BisectError::BuildFailed { .. } | BisectError::Runner(RunnerError::SpawnFailed { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_error_spawn_failed_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "git not found");
        let err = RunnerError::SpawnFailed {
            command: "git bisect start".to_string(),
            source: io_err,
        };
        match &err {
            RunnerError::SpawnFailed { command, source } => {
                assert_eq!(command, "git bisect start");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected SpawnFailed variant"),
        }
    }

    #[test]
    fn runner_error_command_failed_carries_exit_code() {
        let err = RunnerError::CommandFailed {
            command: "git checkout v1.2".to_string(),
            exit_code: 128,
        };
        match &err {
            RunnerError::CommandFailed { exit_code, .. } => assert_eq!(*exit_code, 128),
            _ => panic!("Expected CommandFailed"),
        }
        assert!(err.to_string().contains("128"));
        assert!(err.to_string().contains("git checkout v1.2"));
    }

    #[test]
    fn bisect_error_build_failed_carries_command_line() {
        let err = BisectError::BuildFailed {
            command: "make -j4 all".to_string(),
            exit_code: 2,
        };
        match &err {
            BisectError::BuildFailed { command, exit_code } => {
                assert_eq!(command, "make -j4 all");
                assert_eq!(*exit_code, 2);
            }
            _ => panic!("Expected BuildFailed"),
        }
        assert!(err.to_string().contains("make -j4 all"));
    }

    #[test]
    fn bisect_error_skip_limit_names_the_reached_limit() {
        let err = BisectError::SkipLimitExceeded {
            skips: 12,
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("Skip count 12"));
        assert!(msg.contains("reached the limit of 10"));
    }

    #[test]
    fn bisect_error_converts_from_runner_error() {
        let inner = RunnerError::CommandFailed {
            command: "git bisect reset".to_string(),
            exit_code: 1,
        };
        let err: BisectError = inner.into();
        match &err {
            BisectError::Runner(RunnerError::CommandFailed { command, .. }) => {
                assert_eq!(command, "git bisect reset");
            }
            _ => panic!("Expected BisectError::Runner(CommandFailed(...))"),
        }
    }

    #[test]
    fn cleanup_failed_wraps_and_displays_source() {
        let inner = BisectError::BuildFailed {
            command: "make".to_string(),
            exit_code: 1,
        };
        let err = BisectError::CleanupFailed(Box::new(inner));
        assert!(matches!(err, BisectError::CleanupFailed(_)));
        assert!(err.to_string().contains("Cleanup after bisection failed"));
        assert!(err.to_string().contains("make"));
    }

    #[test]
    fn build_and_spawn_failures_are_skippable() {
        let build = BisectError::BuildFailed {
            command: "make".to_string(),
            exit_code: 1,
        };
        assert!(build.is_skippable());

        let spawn = BisectError::Runner(RunnerError::SpawnFailed {
            command: "./missing-test.sh".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
        assert!(spawn.is_skippable());
    }

    #[test]
    fn checked_mode_failures_are_not_skippable() {
        let checked = BisectError::Runner(RunnerError::CommandFailed {
            command: "git bisect start".to_string(),
            exit_code: 128,
        });
        assert!(!checked.is_skippable());

        let limit = BisectError::SkipLimitExceeded {
            skips: 10,
            limit: 10,
        };
        assert!(!limit.is_skippable());
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        let runner_err = RunnerError::CommandFailed {
            command: "git".to_string(),
            exit_code: 1,
        };
        assert_std_error(&runner_err);
        let bisect_err = BisectError::SkipLimitExceeded { skips: 1, limit: 1 };
        assert_std_error(&bisect_err);
    }
}
