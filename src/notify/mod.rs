//! Notification module for console output.
//!
//! Colored findings, per-item reports, summaries and progress bars.

pub mod console;

pub use console::ConsoleOutput;
