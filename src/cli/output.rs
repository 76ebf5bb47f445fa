//! Colored output helpers for CLI
//!
//! Status lines go to stdout, errors to stderr. Values meant for piping
//! (hashes, secrets) are printed bare with [`Output::value`].

use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n",
                "quill".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n   quill {}\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Raw value on its own line, no decoration regardless of color mode.
    pub fn value(&self, value: &str) {
        println!("{}", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_default_is_colored() {
        assert!(Output::default().colored);
        assert!(!Output::no_color().colored);
    }

    #[test]
    fn test_output_methods_no_panic() {
        for output in [Output::new(), Output::no_color()] {
            output.banner();
            output.success("test success");
            output.info("test info");
            output.warning("test warning");
            output.error("test error");
            output.header("Test Header");
            output.kv("key", "value");
            output.hint("hint message");
            output.value("raw");
        }
    }
}
