//! Terminal output for CLI commands.

use console::{Style, Term};
use la_site::ContentDocument;

/// Terminal output formatter.
///
/// Status lines go to stderr so stdout carries only command results and can
/// be piped.
pub(crate) struct Output {
    status: Term,
    results: Term,
    ok: Style,
    warn: Style,
    err: Style,
    target: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            results: Term::stdout(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            err: Style::new().red(),
            target: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print a command result to stdout.
    pub(crate) fn data(&self, text: &str) {
        let _ = self.results.write_line(text);
    }

    /// Print a `verb url from filename (view: ...)` line for a document.
    pub(crate) fn document(&self, verb: &str, doc: &ContentDocument) {
        let line = format!(
            "{verb} {} from {} (view: {})",
            doc.url(),
            doc.filename(),
            doc.view()
        );
        self.line(&self.ok, &line);
    }

    /// Print an indented `name: value` detail line.
    pub(crate) fn field(&self, name: &str, value: &str) {
        let _ = self
            .status
            .write_line(&format!("  {}: {value}", self.dim.apply_to(name)));
    }

    /// Print where a request is sent instead of being rendered.
    pub(crate) fn forward(&self, kind: &str, url: &str) {
        let _ = self
            .status
            .write_line(&format!("{kind} -> {}", self.target.apply_to(url)));
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.err, msg);
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.status.write_line(&style.apply_to(msg).to_string());
    }
}
