//! Terminal output and progress reporting.

mod output;
mod progress;

pub use output::{Output, Verbosity};
pub use progress::ProgressManager;
