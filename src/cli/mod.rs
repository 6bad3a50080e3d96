//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes defining commands, the interactive prompts, and the terminal
//! presentation surface that renders published snapshots.

mod commands;
mod display;

pub use commands::*;
