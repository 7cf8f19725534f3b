//! CLI output helpers: colored messages and progress spinners.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print an informational message
pub fn print_info(message: &str) {
    println!("{}", message.cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{}", message.green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{}", message.red());
}

/// Create a spinner with a message, ticking on its own thread
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
