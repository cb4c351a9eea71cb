//! Error message formatting with actionable suggestions.
//!
//! Fatal errors get a `help:` line when `SpnError` has a suggestion and the
//! full source chain; failed dependency builds are printed with their log.

use spn_build::Failure;
use spn_core::error::SpnError;
use std::error::Error;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &SpnError) -> String {
        let mut output = self.headline(&error.to_string());

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        self.push_chain(&mut output, error.source());
        output
    }

    /// Format whatever reached the top of the binary
    pub fn format_any(&self, error: &anyhow::Error) -> String {
        if let Some(spn) = error.downcast_ref::<SpnError>() {
            return self.format_error(spn);
        }
        let mut output = self.headline(&error.to_string());
        self.push_chain(&mut output, error.source());
        output
    }

    /// Format one dependency that did not finish, followed by its build log
    pub fn format_failure(&self, failure: &Failure) -> String {
        let reason = failure.error.as_deref().unwrap_or("did not finish");
        let mut output = format!(
            "{} {} ({}): {}\n",
            self.colors.red("✗"),
            failure.name,
            failure.state,
            reason
        );

        let log = failure.log.trim_end();
        if !log.is_empty() {
            output.push_str(&self.colors.dim(&format!("--- {} build log ---", failure.name)));
            output.push('\n');
            output.push_str(log);
            output.push('\n');
        }
        output
    }

    fn headline(&self, message: &str) -> String {
        format!("{}: {}\n", self.colors.red("error"), message)
    }

    fn push_chain(&self, output: &mut String, mut source: Option<&(dyn Error + 'static)>) {
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
