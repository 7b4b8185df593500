//! Command-line front end: argument parsing, overwrite prompt, summaries

pub mod args;
pub mod output;
pub mod prompt;
