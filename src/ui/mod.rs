//! Terminal user interface.
//!
//! - [`display`]: result messages and manifest tables
//! - [`progress`]: progress bar fed by bulk jobs
//! - [`prompt`]: password, mode and file prompts

pub mod display;
pub mod progress;
pub mod prompt;
