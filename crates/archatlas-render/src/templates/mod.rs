//! Mermaid templates, one module per atlas layer

pub mod capability;
pub mod flow;
pub mod goroutine;
pub mod package;

pub use flow::FlowStyle;

/// Newline-terminated text buffer for diagram output.
#[derive(Debug, Default)]
pub(crate) struct Lines(String);

impl Lines {
    pub(crate) fn new(header: &str) -> Self {
        let mut lines = Lines::default();
        lines.push(header);
        lines
    }

    pub(crate) fn push(&mut self, line: impl AsRef<str>) {
        self.0.push_str(line.as_ref());
        self.0.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.0.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.0
    }
}
