//! CLI command handlers. Each command is in its own file.

mod completions;
mod upload;

pub use completions::run_completions;
pub use upload::run_upload;
#[cfg(test)]
pub(crate) use upload::{build_options, is_yes, plan_summary};
