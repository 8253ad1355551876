//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `run`    | `Run`            |
//! | `reset`  | `Reset`          |

pub mod reset;
pub mod run;

pub use reset::cmd_reset;
pub use run::cmd_run;
