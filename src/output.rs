#![forbid(unsafe_code)]

use console::{style, Term};

pub struct Output {
    term: Term,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    pub fn success(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("✓").green().bold(), msg));
    }

    pub fn error(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("✗").red().bold(), msg));
    }

    pub fn warn(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("!").yellow().bold(), msg));
    }

    pub fn header(&self, msg: &str) {
        let _ = self.term.write_line(&format!("\n{}", style(msg).bold()));
    }

    pub fn field(&self, label: &str, value: &str) {
        let _ = self
            .term
            .write_line(&format!("  {}: {}", style(label).dim(), value));
    }

    /// A labelled relay list, `(none)` when empty.
    pub fn relay_list(&self, label: &str, relays: &[String]) {
        if relays.is_empty() {
            self.field(label, &style("(none)").dim().to_string());
            return;
        }
        let _ = self
            .term
            .write_line(&format!("  {}:", style(label).dim()));
        for relay in relays {
            let _ = self.term.write_line(&format!("    {}", style(relay).cyan()));
        }
    }
}
