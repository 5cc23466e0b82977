//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;

/// Semantic styling for CLI output
pub trait Stylize {
    /// De-emphasized text
    fn muted(&self) -> String;
    /// Highlighted value (branch names, PR numbers)
    fn accent(&self) -> String;
    /// Section emphasis
    fn emphasis(&self) -> String;
    /// Success
    fn success(&self) -> String;
    /// Warning
    fn warn(&self) -> String;
    /// Error
    fn error(&self) -> String;
}

impl<T: std::fmt::Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }

    fn error(&self) -> String {
        self.red().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    "✓".green().to_string()
}

/// Red cross mark
pub fn cross() -> String {
    "✗".red().to_string()
}

/// Spinner style shared by the long-running commands
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
