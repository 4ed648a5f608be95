//! CLI prompts using cliclack (Charm-style inline prompts)
//!
//! This module is optional and only available when the `tui` feature is enabled.

#[cfg(feature = "tui")]
mod feature;
#[cfg(feature = "tui")]
mod prompts;

#[cfg(feature = "tui")]
pub use feature::{print_feature_list, render_report, run_add, AddArgs};
#[cfg(feature = "tui")]
pub use prompts::{run_create, CreateArgs};
