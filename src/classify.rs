//! Test-outcome classification.
//!
//! The controller never inspects test output itself; it hands the captured
//! result to a `Classifier` and reports the verdict to the oracle. The
//! strategy is pluggable so the controller stays untouched when the
//! classification rule changes.

use crate::process::StageResult;

/// How one evaluated revision is reported to the bisection oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
    Skip,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Good => write!(f, "good"),
            Verdict::Bad => write!(f, "bad"),
            Verdict::Skip => write!(f, "skip"),
        }
    }
}

/// Maps one captured test result to a verdict.
///
/// Implementations must be pure functions of the result: identical captured
/// output yields an identical verdict.
pub trait Classifier {
    fn classify(&self, result: &StageResult) -> Verdict;
}

/// Default strategy: a known failure marker in the test's stderr means the
/// revision is bad; anything else is good.
///
/// A test run that crashes without printing the marker still classifies
/// Good. That silent-pass rule matches the manual bisect workflow this
/// tool automates, where a test that cannot fail loudly reads as passing;
/// select the exit-code strategy when the test signals failure through its
/// status instead.
pub struct MarkerClassifier {
    marker: String,
}

impl MarkerClassifier {
    pub const DEFAULT_MARKER: &'static str = "AssertionError";

    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Classifier for MarkerClassifier {
    fn classify(&self, result: &StageResult) -> Verdict {
        if result.stderr.contains(&self.marker) {
            Verdict::Bad
        } else {
            Verdict::Good
        }
    }
}

/// Exit-code strategy, following the convention the oracle's own automated
/// mode uses: 0 is good, 125 requests a skip, anything else is bad.
pub struct ExitCodeClassifier;

impl Classifier for ExitCodeClassifier {
    fn classify(&self, result: &StageResult) -> Verdict {
        match result.exit_code {
            0 => Verdict::Good,
            125 => Verdict::Skip,
            _ => Verdict::Bad,
        }
    }
}

/// Which classification strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierKind {
    #[default]
    Marker,
    ExitCode,
}

impl ClassifierKind {
    /// Build the classifier this kind names. The marker is only consulted
    /// by the marker strategy.
    pub fn build(&self, marker: &str) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::Marker => Box::new(MarkerClassifier::new(marker)),
            ClassifierKind::ExitCode => Box::new(ExitCodeClassifier),
        }
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::Marker => write!(f, "marker"),
            ClassifierKind::ExitCode => write!(f, "exit-code"),
        }
    }
}

impl std::str::FromStr for ClassifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "marker" => Ok(ClassifierKind::Marker),
            "exit-code" => Ok(ClassifierKind::ExitCode),
            _ => anyhow::bail!(
                "Invalid classifier '{}'. Valid values: marker, exit-code",
                s
            ),
        }
    }
}
