use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal UI for the bisection driver, rendered via `indicatif`.
///
/// A single spinner tracks the step in flight (building, testing,
/// rebuilding); narration lines are routed through the `MultiProgress`
/// handle so they never tear an active spinner.
pub struct BisectUi {
    multi: MultiProgress,
    verbose: bool,
}

impl BisectUi {
    /// Create the UI.
    ///
    /// # Arguments
    /// * `verbose` - when `true`, every spawned command line is echoed
    pub fn new(verbose: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    ///
    /// This prevents silent loss of user-facing messages when the terminal
    /// or stdout is unavailable.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Print captured child-process output verbatim, line by line.
    pub fn print_raw(&self, text: &str) {
        for line in text.lines() {
            self.print_line(line);
        }
    }

    /// Echo a command line as a dim `$`-prefixed line (verbose mode only).
    pub fn verbose_command(&self, command_line: &str) {
        if self.verbose {
            self.print_line(format!(
                "    {} {}",
                style("$").dim(),
                style(command_line).dim()
            ));
        }
    }

    /// Start a ticking spinner for one step. The caller stops it with
    /// `finish_and_clear` (or `finish_with_message`) once the step ends.
    pub fn step_spinner(&self, msg: impl Into<String>) -> ProgressBar {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style);
        bar.set_message(msg.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Print the banner line that opens one search iteration.
    pub fn iteration_header(&self, iteration: u32) {
        self.print_line("");
        self.print_line(format!(
            "{} Iteration {}",
            style("▶").cyan().bold(),
            style(iteration).cyan()
        ));
    }
}
